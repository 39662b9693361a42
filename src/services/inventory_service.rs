//! Inventory Service - listing and editing phones

use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::{PhoneCondition, PhoneStatus};
use crate::models::phone::{self, Entity as Phone};
use crate::models::phone_history::{self, Entity as PhoneHistory};
use crate::models::user::{self, Entity as User};
use crate::services::{now, page_index, required, Page, ServiceError};

pub const PHONES_PER_PAGE: u64 = 12;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PhoneFilter {
    pub status: Option<String>,
    pub owner: Option<i32>,
    pub search: Option<String>,
    pub page: Option<u64>,
}

/// Descriptive fields only; status and owner move through agreements and
/// assignments.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneUpdate {
    pub brand: String,
    pub model: String,
    #[serde(default)]
    pub color: String,
    pub condition: Option<String>,
    pub purchase_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhoneView {
    #[serde(flatten)]
    pub phone: phone::Model,
    pub owner_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhoneDetail {
    #[serde(flatten)]
    pub phone: PhoneView,
    pub history: Vec<phone_history::Model>,
}

fn view(phone: phone::Model, owner: Option<user::Model>) -> PhoneView {
    PhoneView {
        phone,
        owner_name: owner.map(|o| o.full_name()),
    }
}

pub async fn list_phones(
    db: &DatabaseConnection,
    actor: &user::Model,
    filter: PhoneFilter,
) -> Result<Page<PhoneView>, ServiceError> {
    let mut condition = Condition::all();

    // Sellers only ever see their own stock
    if !actor.can_manage() {
        condition = condition.add(phone::Column::CurrentOwnerId.eq(actor.id));
    }

    if let Some(status) = filter.status.filter(|s| !s.is_empty()) {
        let status: PhoneStatus = status.parse()?;
        condition = condition.add(phone::Column::Status.eq(status.as_str()));
    }

    if let Some(owner) = filter.owner {
        condition = condition.add(phone::Column::CurrentOwnerId.eq(owner));
    }

    if let Some(search) = filter.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(phone::Column::Imei.contains(&search))
                .add(phone::Column::SerialNumber.contains(&search))
                .add(phone::Column::Brand.contains(&search))
                .add(phone::Column::ModelName.contains(&search)),
        );
    }

    let paginator = Phone::find()
        .filter(condition)
        .order_by_desc(phone::Column::CreatedAt)
        .order_by_desc(phone::Column::Id)
        .find_also_related(User)
        .paginate(db, PHONES_PER_PAGE);

    let totals = paginator.num_items_and_pages().await?;
    let index = page_index(filter.page);
    let rows = paginator.fetch_page(index).await?;

    Ok(Page {
        items: rows.into_iter().map(|(p, owner)| view(p, owner)).collect(),
        page: index + 1,
        per_page: PHONES_PER_PAGE,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

pub async fn phone_detail(db: &DatabaseConnection, id: i32) -> Result<PhoneDetail, ServiceError> {
    let (phone, owner) = Phone::find_by_id(id)
        .find_also_related(User)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Phone"))?;

    let history = PhoneHistory::find()
        .filter(phone_history::Column::PhoneId.eq(phone.id))
        .order_by_desc(phone_history::Column::CreatedAt)
        .order_by_desc(phone_history::Column::Id)
        .all(db)
        .await?;

    Ok(PhoneDetail {
        phone: view(phone, owner),
        history,
    })
}

pub async fn update_phone(
    db: &DatabaseConnection,
    actor: &user::Model,
    id: i32,
    update: PhoneUpdate,
) -> Result<phone::Model, ServiceError> {
    let phone = Phone::find_by_id(id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Phone"))?;

    if phone.current_owner_id != actor.id && !actor.can_manage() {
        tracing::warn!("User {} tried to edit phone {}", actor.username, id);
        return Err(ServiceError::Forbidden(
            "You do not have permission to edit this phone.".to_string(),
        ));
    }

    let brand = required(&update.brand, "Brand is required.")?;
    let model = required(&update.model, "Model is required.")?;
    if update.purchase_price.is_some_and(|p| p.is_sign_negative()) {
        return Err(ServiceError::Validation(
            "Purchase price cannot be negative.".to_string(),
        ));
    }

    let mut active: phone::ActiveModel = phone.into();
    active.brand = Set(brand);
    active.model_name = Set(model);
    active.color = Set(update.color.trim().to_string());
    if let Some(condition) = update.condition.filter(|c| !c.is_empty()) {
        let condition: PhoneCondition = condition.parse()?;
        active.condition = Set(condition.as_str().to_string());
    }
    // An omitted price keeps the recorded cost
    if let Some(price) = update.purchase_price {
        active.purchase_price = Set(Some(price));
    }
    active.updated_at = Set(now());

    let phone = active.update(db).await?;
    tracing::info!("Phone {} updated by {}", phone.id, actor.username);
    Ok(phone)
}
