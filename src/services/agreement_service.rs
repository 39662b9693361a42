//! Agreement Service - buying phones into inventory and selling them out
//!
//! Every agreement is written together with its side effects (phone record or
//! status change, history row, sales transaction) inside one database
//! transaction.

use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{
    AgreementType, HistoryAction, PaymentMethod, PhoneCondition, PhoneEvent, PhoneState,
    TransactionStatus,
};
use crate::models::agreement::{self, Entity as Agreement};
use crate::models::phone::{self, Entity as Phone};
use crate::models::phone_history;
use crate::models::sales_transaction;
use crate::models::user::{self, Entity as User};
use crate::modules::documents::{self, AgreementSheet, SheetImages};
use crate::modules::media::{self, MediaStore};
use crate::services::customer_service::{self, CustomerContact};
use crate::services::{
    day_end, day_start, now, page_index, parse_date, required, Page, ServiceError,
};

pub const AGREEMENTS_PER_PAGE: u64 = 20;
pub const PROFILE_INCOMPLETE: &str = "Please complete your profile before creating agreements.";

/// A phone bought from a walk-in supplier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuyPhoneInput {
    #[serde(alias = "imei_number")]
    pub imei: String,
    pub serial_number: String,
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub color: String,
    pub condition: Option<String>,
    pub purchase_price: Decimal,
    pub supplier_name: String,
    /// Supplier's national ID number
    pub supplier_id: String,
    pub supplier_phone: String,
    pub supplier_address: String,
    pub supplier_id_photo: Option<String>,
    pub supplier_signature_photo: Option<String>,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub notes: String,
}

/// Sale of an in-stock phone to a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SellPhoneInput {
    pub buyer_name: String,
    /// Buyer's national ID number
    pub buyer_id: String,
    pub buyer_phone: String,
    pub buyer_address: String,
    #[serde(default)]
    pub buyer_email: String,
    pub agreed_price: Decimal,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_reference: String,
    pub buyer_id_photo: Option<String>,
    pub buyer_signature_photo: Option<String>,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AgreementFilter {
    #[serde(rename = "type")]
    pub agreement_type: Option<String>,
    pub search: Option<String>,
    pub date: Option<String>,
    pub page: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgreementSummary {
    pub id: i32,
    pub reference: String,
    pub agreement_type: String,
    pub customer_name: String,
    pub price: Decimal,
    pub phone_id: i32,
    pub phone_name: Option<String>,
    pub seller_id: i32,
    pub seller_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgreementDetail {
    pub reference: String,
    pub agreement: agreement::Model,
    pub phone: phone::Model,
    pub seller: user::Model,
    /// Present for sell agreements
    pub transaction: Option<sales_transaction::Model>,
}

/// A rendered agreement document.
pub struct AgreementPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

fn ensure_profile(actor: &user::Model) -> Result<(), ServiceError> {
    if actor.profile_complete() {
        Ok(())
    } else {
        Err(ServiceError::Validation(PROFILE_INCOMPLETE.to_string()))
    }
}

async fn store_optional(
    media: &dyn MediaStore,
    folder: &str,
    data: Option<&str>,
) -> Result<Option<String>, ServiceError> {
    match data.map(str::trim) {
        Some(data) if !data.is_empty() => {
            Ok(Some(media::store_data_url(media, folder, data).await?))
        }
        _ => Ok(None),
    }
}

fn history_row(
    phone_id: i32,
    action: HistoryAction,
    from_user_id: Option<i32>,
    to_user_id: Option<i32>,
    agreement_id: Option<i32>,
    notes: String,
    created_at: String,
) -> phone_history::ActiveModel {
    phone_history::ActiveModel {
        phone_id: Set(phone_id),
        action: Set(action.as_str().to_string()),
        from_user_id: Set(from_user_id),
        to_user_id: Set(to_user_id),
        agreement_id: Set(agreement_id),
        notes: Set(notes),
        created_at: Set(created_at),
        ..Default::default()
    }
}

pub(crate) async fn append_history<C: ConnectionTrait>(
    db: &C,
    phone_id: i32,
    action: HistoryAction,
    from_user_id: Option<i32>,
    to_user_id: Option<i32>,
    agreement_id: Option<i32>,
    notes: String,
) -> Result<phone_history::Model, ServiceError> {
    Ok(history_row(
        phone_id,
        action,
        from_user_id,
        to_user_id,
        agreement_id,
        notes,
        now(),
    )
    .insert(db)
    .await?)
}

/// Re-read a phone inside a write transaction, insisting it still belongs to
/// `owner_id`. Another request may have sold or handed it over meanwhile.
pub async fn reload_owned_phone<C: ConnectionTrait>(
    conn: &C,
    phone_id: i32,
    owner_id: i32,
) -> Result<phone::Model, ServiceError> {
    let phone = Phone::find_by_id(phone_id)
        .one(conn)
        .await?
        .ok_or(ServiceError::NotFound("Phone"))?;
    if phone.current_owner_id != owner_id {
        return Err(ServiceError::InvalidState(
            "This phone is no longer in your inventory.".to_string(),
        ));
    }
    Ok(phone)
}

/// Register a phone bought from a supplier, with its purchase agreement.
pub async fn buy_phone(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    actor: &user::Model,
    input: BuyPhoneInput,
) -> Result<AgreementDetail, ServiceError> {
    // 1. Validate
    ensure_profile(actor)?;

    let imei = required(&input.imei, "IMEI number is required.")?;
    let serial_number = required(&input.serial_number, "Serial number is required.")?;
    let brand = required(&input.brand, "Brand is required.")?;
    let model = required(&input.model, "Model is required.")?;
    let supplier_name = required(&input.supplier_name, "Supplier name is required.")?;
    let supplier_id = required(&input.supplier_id, "Supplier national ID is required.")?;
    let supplier_phone = required(&input.supplier_phone, "Supplier phone is required.")?;
    let supplier_address = required(&input.supplier_address, "Supplier address is required.")?;
    let condition: PhoneCondition = match input.condition.as_deref().filter(|c| !c.is_empty()) {
        Some(c) => c.parse()?,
        None => PhoneCondition::Used,
    };
    if input.purchase_price.is_sign_negative() {
        return Err(ServiceError::Validation(
            "Purchase price cannot be negative.".to_string(),
        ));
    }

    if Phone::find()
        .filter(phone::Column::Imei.eq(imei.as_str()))
        .count(db)
        .await?
        > 0
    {
        return Err(ServiceError::Validation(
            "A phone with this IMEI already exists.".to_string(),
        ));
    }
    if Phone::find()
        .filter(phone::Column::SerialNumber.eq(serial_number.as_str()))
        .count(db)
        .await?
        > 0
    {
        return Err(ServiceError::Validation(
            "A phone with this serial number already exists.".to_string(),
        ));
    }

    // 2. Store captures before opening the transaction
    let id_photo = store_optional(media, media::ID_PHOTOS, input.supplier_id_photo.as_deref()).await?;
    let signature_photo = store_optional(
        media,
        media::AGREEMENT_SIGNATURES,
        input.supplier_signature_photo.as_deref(),
    )
    .await?;

    // 3. Phone, agreement and history together
    let now = now();
    let price = crate::domain::finance::money(input.purchase_price);
    let state = PhoneState::acquired(actor.id);
    let txn = db.begin().await?;

    let phone = phone::ActiveModel {
        imei: Set(imei),
        serial_number: Set(serial_number),
        brand: Set(brand),
        model_name: Set(model),
        color: Set(input.color.trim().to_string()),
        condition: Set(condition.as_str().to_string()),
        status: Set(state.status.as_str().to_string()),
        purchase_price: Set(Some(price)),
        current_owner_id: Set(state.owner_id),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let agreement = agreement::ActiveModel {
        agreement_type: Set(AgreementType::Buy.as_str().to_string()),
        phone_id: Set(phone.id),
        seller_id: Set(actor.id),
        customer_name: Set(supplier_name),
        customer_national_id: Set(supplier_id),
        customer_phone: Set(supplier_phone),
        customer_address: Set(supplier_address),
        id_photo: Set(id_photo),
        passport_photo: Set(None),
        signature: Set(input.signature),
        signature_photo: Set(signature_photo),
        price: Set(price),
        notes: Set(input.notes.trim().to_string()),
        created_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    history_row(
        phone.id,
        HistoryAction::Buy,
        Some(actor.id),
        None,
        Some(agreement.id),
        format!("Phone purchased from {}", agreement.customer_name),
        now,
    )
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        "{} bought {} ({})",
        actor.username,
        phone.display_name(),
        agreement.reference()
    );

    Ok(AgreementDetail {
        reference: agreement.reference(),
        agreement,
        phone,
        seller: actor.clone(),
        transaction: None,
    })
}

/// Sell one of the caller's available phones.
pub async fn sell_phone(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    commission_rate: Decimal,
    actor: &user::Model,
    phone_id: i32,
    input: SellPhoneInput,
) -> Result<AgreementDetail, ServiceError> {
    // 1. Validate
    let phone = Phone::find_by_id(phone_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Phone"))?;

    if phone.current_owner_id != actor.id {
        tracing::warn!("User {} tried to sell phone {} they do not own", actor.username, phone.id);
        return Err(ServiceError::Forbidden(
            "You can only sell phones from your own inventory.".to_string(),
        ));
    }
    if phone.state()?.apply(PhoneEvent::Sell).is_err() {
        return Err(ServiceError::InvalidState(
            "This phone is not available for sale.".to_string(),
        ));
    }
    ensure_profile(actor)?;

    let buyer_name = required(&input.buyer_name, "Buyer name is required.")?;
    let buyer_id = required(&input.buyer_id, "Buyer national ID is required.")?;
    let buyer_phone = required(&input.buyer_phone, "Buyer phone is required.")?;
    let buyer_address = required(&input.buyer_address, "Buyer address is required.")?;
    if input.agreed_price.is_sign_negative() {
        return Err(ServiceError::Validation(
            "Agreed price cannot be negative.".to_string(),
        ));
    }
    let payment_method: PaymentMethod = match input.payment_method.as_deref().filter(|m| !m.is_empty()) {
        Some(m) => m.parse()?,
        None => PaymentMethod::Cash,
    };

    // 2. Store captures
    let id_photo = store_optional(media, media::ID_PHOTOS, input.buyer_id_photo.as_deref()).await?;
    let signature_photo = store_optional(
        media,
        media::AGREEMENT_SIGNATURES,
        input.buyer_signature_photo.as_deref(),
    )
    .await?;

    // 3. Agreement, status change, transaction, customer and history together
    let now = now();
    let price = crate::domain::finance::money(input.agreed_price);
    let txn = db.begin().await?;

    let phone = reload_owned_phone(&txn, phone_id, actor.id).await?;
    let next = phone.state()?.apply(PhoneEvent::Sell)?;

    let agreement = agreement::ActiveModel {
        agreement_type: Set(AgreementType::Sell.as_str().to_string()),
        phone_id: Set(phone.id),
        seller_id: Set(actor.id),
        customer_name: Set(buyer_name.clone()),
        customer_national_id: Set(buyer_id.clone()),
        customer_phone: Set(buyer_phone.clone()),
        customer_address: Set(buyer_address.clone()),
        id_photo: Set(id_photo),
        passport_photo: Set(None),
        signature: Set(input.signature),
        signature_photo: Set(signature_photo),
        price: Set(price),
        notes: Set(input.notes.trim().to_string()),
        created_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let cost_price = phone.purchase_price.unwrap_or(Decimal::ZERO);
    let mut sold: phone::ActiveModel = phone.into();
    sold.status = Set(next.status.as_str().to_string());
    sold.updated_at = Set(now.clone());
    let phone = sold.update(&txn).await?;

    // profit and commission are filled in by the model on save
    let transaction = sales_transaction::ActiveModel {
        transaction_id: Set(format!("TXN-{}", agreement.id)),
        seller_id: Set(actor.id),
        phone_id: Set(phone.id),
        agreement_id: Set(Some(agreement.id)),
        customer_name: Set(buyer_name.clone()),
        customer_phone: Set(buyer_phone.clone()),
        customer_email: Set(input.buyer_email.trim().to_string()),
        sale_price: Set(price),
        cost_price: Set(cost_price),
        commission_rate: Set(commission_rate),
        payment_method: Set(payment_method.as_str().to_string()),
        payment_reference: Set(input.payment_reference.trim().to_string()),
        status: Set(TransactionStatus::Completed.as_str().to_string()),
        notes: Set(String::new()),
        sale_date: Set(now.clone()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    customer_service::record_purchase(
        &txn,
        CustomerContact {
            name: buyer_name,
            phone: buyer_phone,
            email: input.buyer_email.trim().to_string(),
            national_id: buyer_id,
            address: buyer_address,
        },
        actor.id,
    )
    .await?;

    history_row(
        phone.id,
        HistoryAction::Sell,
        Some(actor.id),
        None,
        Some(agreement.id),
        format!("Phone sold to {}", agreement.customer_name),
        now,
    )
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        "{} sold {} ({}, {})",
        actor.username,
        phone.display_name(),
        agreement.reference(),
        transaction.transaction_id
    );

    Ok(AgreementDetail {
        reference: agreement.reference(),
        agreement,
        phone,
        seller: actor.clone(),
        transaction: Some(transaction),
    })
}

/// `AGR-000012`, `agr-12` or `12` name agreement 12.
pub fn parse_reference(search: &str) -> Option<i32> {
    let search = search.trim();
    let digits = match search.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("AGR-") => &search[4..],
        _ => search,
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

async fn summarize(
    db: &DatabaseConnection,
    rows: Vec<(agreement::Model, Option<phone::Model>)>,
) -> Result<Vec<AgreementSummary>, ServiceError> {
    let seller_ids: Vec<i32> = rows.iter().map(|(a, _)| a.seller_id).collect();
    let mut sellers: HashMap<i32, String> = HashMap::new();
    if !seller_ids.is_empty() {
        for seller in User::find()
            .filter(user::Column::Id.is_in(seller_ids))
            .all(db)
            .await?
        {
            sellers.insert(seller.id, seller.full_name());
        }
    }

    Ok(rows
        .into_iter()
        .map(|(agreement, phone)| AgreementSummary {
            id: agreement.id,
            reference: agreement.reference(),
            phone_name: phone.map(|p| p.display_name()),
            seller_name: sellers.get(&agreement.seller_id).cloned(),
            agreement_type: agreement.agreement_type,
            customer_name: agreement.customer_name,
            price: agreement.price,
            phone_id: agreement.phone_id,
            seller_id: agreement.seller_id,
            created_at: agreement.created_at,
        })
        .collect())
}

pub async fn list_agreements(
    db: &DatabaseConnection,
    actor: &user::Model,
    filter: AgreementFilter,
) -> Result<Page<AgreementSummary>, ServiceError> {
    let mut condition = Condition::all();

    if !actor.can_manage() {
        condition = condition.add(agreement::Column::SellerId.eq(actor.id));
    }

    if let Some(kind) = filter.agreement_type.filter(|t| !t.is_empty()) {
        let kind: AgreementType = kind.parse()?;
        condition = condition.add(agreement::Column::AgreementType.eq(kind.as_str()));
    }

    if let Some(search) = filter.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        let mut any = Condition::any().add(agreement::Column::CustomerName.contains(&search));
        if let Some(id) = parse_reference(&search) {
            any = any.add(agreement::Column::Id.eq(id));
        }
        condition = condition.add(any);
    }

    if let Some(date) = filter.date.filter(|d| !d.is_empty()) {
        let date = parse_date(&date, "date")?;
        condition = condition.add(agreement::Column::CreatedAt.between(day_start(date), day_end(date)));
    }

    let paginator = Agreement::find()
        .filter(condition)
        .order_by_desc(agreement::Column::CreatedAt)
        .order_by_desc(agreement::Column::Id)
        .find_also_related(Phone)
        .paginate(db, AGREEMENTS_PER_PAGE);

    let totals = paginator.num_items_and_pages().await?;
    let index = page_index(filter.page);
    let rows = paginator.fetch_page(index).await?;

    Ok(Page {
        items: summarize(db, rows).await?,
        page: index + 1,
        per_page: AGREEMENTS_PER_PAGE,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

pub async fn recent_agreements(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<AgreementSummary>, ServiceError> {
    let rows = Agreement::find()
        .order_by_desc(agreement::Column::CreatedAt)
        .order_by_desc(agreement::Column::Id)
        .find_also_related(Phone)
        .limit(limit)
        .all(db)
        .await?;
    summarize(db, rows).await
}

pub async fn agreement_detail(
    db: &DatabaseConnection,
    actor: &user::Model,
    id: i32,
) -> Result<AgreementDetail, ServiceError> {
    let agreement = Agreement::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Agreement"))?;

    if agreement.seller_id != actor.id && !actor.can_manage() {
        tracing::warn!("User {} tried to open agreement {}", actor.username, id);
        return Err(ServiceError::Forbidden(
            "You do not have permission to view this agreement.".to_string(),
        ));
    }

    let phone = Phone::find_by_id(agreement.phone_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Phone"))?;
    let seller = User::find_by_id(agreement.seller_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Seller"))?;
    let transaction = sales_transaction::Entity::find()
        .filter(sales_transaction::Column::AgreementId.eq(agreement.id))
        .one(db)
        .await?;

    Ok(AgreementDetail {
        reference: agreement.reference(),
        agreement,
        phone,
        seller,
        transaction,
    })
}

async fn load_image(media: &dyn MediaStore, path: Option<&str>) -> Option<Vec<u8>> {
    let path = path.filter(|p| !p.is_empty())?;
    match media.load(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("Image {} unavailable for agreement document: {}", path, e);
            None
        }
    }
}

/// Render the printable agreement.
pub async fn agreement_pdf(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    actor: &user::Model,
    id: i32,
) -> Result<AgreementPdf, ServiceError> {
    let detail = agreement_detail(db, actor, id).await?;

    let images = SheetImages {
        id_photo: load_image(media, detail.agreement.id_photo.as_deref()).await,
        seller_signature: load_image(media, detail.seller.signature.as_deref()).await,
        customer_signature: load_image(media, detail.agreement.signature_photo.as_deref()).await,
    };

    let sheet = AgreementSheet::build(&detail.agreement, &detail.phone, &detail.seller)?;
    let bytes = documents::render_pdf(&sheet, &images).map_err(ServiceError::Storage)?;

    Ok(AgreementPdf {
        filename: documents::filename(&detail.agreement),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse_reference("AGR-000042"), Some(42));
        assert_eq!(parse_reference("agr-7"), Some(7));
        assert_eq!(parse_reference("15"), Some(15));
        assert_eq!(parse_reference("Alice"), None);
        assert_eq!(parse_reference("AGR-"), None);
    }
}
