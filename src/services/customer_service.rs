//! Customer Service - repeat-customer records keyed by phone number

use rust_decimal::Decimal;
use sea_orm::*;
use serde::Deserialize;

use crate::domain::finance;
use crate::domain::TransactionStatus;
use crate::models::customer::{self, Entity as Customer};
use crate::models::sales_transaction::{self, Entity as SalesTransaction};
use crate::models::user;
use crate::services::{now, page_index, require_manager, Page, ServiceError};

pub const CUSTOMERS_PER_PAGE: u64 = 25;

/// Contact details captured on a sell agreement.
#[derive(Debug, Clone, Default)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub national_id: String,
    pub address: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub page: Option<u64>,
}

/// Create the customer on first purchase, refresh contact details on later
/// ones, then recompute the purchase metrics.
pub async fn record_purchase<C: ConnectionTrait>(
    db: &C,
    contact: CustomerContact,
    registered_by: i32,
) -> Result<customer::Model, ServiceError> {
    let now = now();
    let existing = Customer::find()
        .filter(customer::Column::Phone.eq(contact.phone.as_str()))
        .one(db)
        .await?;

    let customer = match existing {
        Some(found) => {
            let mut active: customer::ActiveModel = found.into();
            active.name = Set(contact.name);
            if !contact.email.is_empty() {
                active.email = Set(contact.email);
            }
            if !contact.national_id.is_empty() {
                active.national_id = Set(contact.national_id);
            }
            if !contact.address.is_empty() {
                active.address = Set(contact.address);
            }
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            customer::ActiveModel {
                name: Set(contact.name),
                phone: Set(contact.phone),
                email: Set(contact.email),
                national_id: Set(contact.national_id),
                address: Set(contact.address),
                total_purchases: Set(0),
                total_spent: Set(Decimal::ZERO),
                average_purchase_value: Set(Decimal::ZERO),
                registered_by: Set(Some(registered_by)),
                is_active: Set(true),
                notes: Set(String::new()),
                first_purchase_date: Set(None),
                last_purchase_date: Set(None),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    update_metrics(db, customer).await
}

/// Recompute totals from the completed transactions carrying this phone number.
pub async fn update_metrics<C: ConnectionTrait>(
    db: &C,
    customer: customer::Model,
) -> Result<customer::Model, ServiceError> {
    let transactions = SalesTransaction::find()
        .filter(sales_transaction::Column::CustomerPhone.eq(customer.phone.as_str()))
        .filter(sales_transaction::Column::Status.eq(TransactionStatus::Completed.as_str()))
        .order_by_asc(sales_transaction::Column::SaleDate)
        .all(db)
        .await?;

    let total_spent: Decimal = transactions.iter().map(|t| t.sale_price).sum();
    let count = transactions.len() as u64;

    let mut active: customer::ActiveModel = customer.into();
    active.total_purchases = Set(count as i32);
    active.total_spent = Set(finance::money(total_spent));
    active.average_purchase_value = Set(finance::average(total_spent, count));
    active.first_purchase_date = Set(transactions.first().map(|t| t.sale_date.clone()));
    active.last_purchase_date = Set(transactions.last().map(|t| t.sale_date.clone()));
    active.updated_at = Set(now());

    Ok(active.update(db).await?)
}

pub async fn list_customers(
    db: &DatabaseConnection,
    actor: &user::Model,
    filter: CustomerFilter,
) -> Result<Page<customer::Model>, ServiceError> {
    require_manager(actor)?;

    let mut query = Customer::find();
    if let Some(search) = filter.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) {
        query = query.filter(
            Condition::any()
                .add(customer::Column::Name.contains(&search))
                .add(customer::Column::Phone.contains(&search))
                .add(customer::Column::NationalId.contains(&search)),
        );
    }

    let paginator = query
        .order_by_desc(customer::Column::LastPurchaseDate)
        .order_by_desc(customer::Column::Id)
        .paginate(db, CUSTOMERS_PER_PAGE);

    let totals = paginator.num_items_and_pages().await?;
    let index = page_index(filter.page);
    let items = paginator.fetch_page(index).await?;

    Ok(Page {
        items,
        page: index + 1,
        per_page: CUSTOMERS_PER_PAGE,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Recompute metrics for every customer. Returns how many were refreshed.
pub async fn refresh_all_metrics(
    db: &DatabaseConnection,
    actor: &user::Model,
) -> Result<usize, ServiceError> {
    require_manager(actor)?;

    let customers = Customer::find().all(db).await?;
    let count = customers.len();
    for customer in customers {
        update_metrics(db, customer).await?;
    }

    tracing::info!("Refreshed metrics for {} customers", count);
    Ok(count)
}
