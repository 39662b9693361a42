//! Target Service - sales goals per seller

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::{Role, TargetType, TransactionStatus};
use crate::models::sales_target::{self, Entity as SalesTarget};
use crate::models::sales_transaction::{self, Entity as SalesTransaction};
use crate::models::user::{self, Entity as User};
use crate::services::{day_end, day_start, now, parse_date, require_manager, ServiceError};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTargetInput {
    pub seller_id: i32,
    pub target_type: String,
    pub target_value: Decimal,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub incentive_amount: Decimal,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TargetFilter {
    pub seller: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetView {
    #[serde(flatten)]
    pub target: sales_target::Model,
    pub seller_name: Option<String>,
    pub achievement_percentage: Decimal,
}

fn view(target: sales_target::Model, seller: Option<user::Model>) -> TargetView {
    TargetView {
        achievement_percentage: target.achievement_percentage(),
        seller_name: seller.map(|s| s.full_name()),
        target,
    }
}

/// Value a set of transactions contributes towards a target of `kind`.
pub fn achieved_value(kind: TargetType, transactions: &[sales_transaction::Model]) -> Decimal {
    match kind {
        TargetType::SalesCount => Decimal::from(transactions.len() as u64),
        TargetType::Revenue => transactions.iter().map(|t| t.sale_price).sum(),
        TargetType::Profit => transactions.iter().map(|t| t.profit).sum(),
    }
}

pub async fn list_targets(
    db: &DatabaseConnection,
    actor: &user::Model,
    filter: TargetFilter,
) -> Result<Vec<TargetView>, ServiceError> {
    let mut query = SalesTarget::find();

    if actor.can_manage() {
        if let Some(seller) = filter.seller {
            query = query.filter(sales_target::Column::SellerId.eq(seller));
        }
    } else {
        query = query.filter(sales_target::Column::SellerId.eq(actor.id));
    }
    if let Some(active) = filter.active {
        query = query.filter(sales_target::Column::IsActive.eq(active));
    }

    let rows = query
        .order_by_desc(sales_target::Column::StartDate)
        .order_by_desc(sales_target::Column::Id)
        .find_also_related(User)
        .all(db)
        .await?;

    Ok(rows.into_iter().map(|(t, s)| view(t, s)).collect())
}

pub async fn create_target(
    db: &DatabaseConnection,
    actor: &user::Model,
    input: CreateTargetInput,
) -> Result<TargetView, ServiceError> {
    require_manager(actor)?;

    let seller = User::find_by_id(input.seller_id)
        .filter(user::Column::Role.eq(Role::Seller.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::Validation("Invalid seller selected.".to_string()))?;

    let kind: TargetType = input.target_type.parse()?;
    let start = parse_date(&input.start_date, "start_date")?;
    let end = parse_date(&input.end_date, "end_date")?;
    if end < start {
        return Err(ServiceError::Validation(
            "End date must not be before start date.".to_string(),
        ));
    }
    if input.target_value <= Decimal::ZERO {
        return Err(ServiceError::Validation(
            "Target value must be greater than zero.".to_string(),
        ));
    }
    if input.incentive_amount.is_sign_negative() {
        return Err(ServiceError::Validation(
            "Incentive amount cannot be negative.".to_string(),
        ));
    }

    let now = now();
    let target = sales_target::ActiveModel {
        seller_id: Set(seller.id),
        target_type: Set(kind.as_str().to_string()),
        target_value: Set(input.target_value),
        achieved_value: Set(Decimal::ZERO),
        start_date: Set(start.format("%Y-%m-%d").to_string()),
        end_date: Set(end.format("%Y-%m-%d").to_string()),
        is_active: Set(true),
        is_achieved: Set(false),
        achievement_date: Set(None),
        incentive_amount: Set(input.incentive_amount),
        notes: Set(input.notes.trim().to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(
        "Target {} ({} {}) set for {} by {}",
        target.id,
        target.target_type,
        target.target_value,
        seller.username,
        actor.username
    );
    Ok(view(target, Some(seller)))
}

fn target_range(target: &sales_target::Model) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    Ok((
        parse_date(&target.start_date, "start_date")?,
        parse_date(&target.end_date, "end_date")?,
    ))
}

/// Recompute `achieved_value` from completed transactions in the target
/// window. Once achieved, a target stays achieved.
pub async fn refresh_target_progress(
    db: &DatabaseConnection,
    actor: &user::Model,
    target_id: i32,
) -> Result<TargetView, ServiceError> {
    let target = SalesTarget::find_by_id(target_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Target"))?;

    if target.seller_id != actor.id && !actor.can_manage() {
        return Err(ServiceError::NotFound("Target"));
    }

    let (start, end) = target_range(&target)?;
    let transactions = SalesTransaction::find()
        .filter(sales_transaction::Column::SellerId.eq(target.seller_id))
        .filter(sales_transaction::Column::Status.eq(TransactionStatus::Completed.as_str()))
        .filter(sales_transaction::Column::SaleDate.between(day_start(start), day_end(end)))
        .all(db)
        .await?;

    let achieved = crate::domain::finance::money(achieved_value(target.target_type()?, &transactions));
    let reached = !target.is_achieved && achieved >= target.target_value;

    let now = now();
    let mut active: sales_target::ActiveModel = target.into();
    active.achieved_value = Set(achieved);
    if reached {
        active.is_achieved = Set(true);
        active.achievement_date = Set(Some(now.clone()));
    }
    active.updated_at = Set(now);
    let target = active.update(db).await?;

    if reached {
        tracing::info!("Target {} achieved by seller {}", target.id, target.seller_id);
    }

    let seller = User::find_by_id(target.seller_id).one(db).await?;
    Ok(view(target, seller))
}

pub async fn set_target_active(
    db: &DatabaseConnection,
    actor: &user::Model,
    target_id: i32,
    is_active: bool,
) -> Result<TargetView, ServiceError> {
    require_manager(actor)?;

    let target = SalesTarget::find_by_id(target_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Target"))?;

    let mut active: sales_target::ActiveModel = target.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(now());
    let target = active.update(db).await?;

    tracing::info!(
        "Target {} {} by {}",
        target.id,
        if is_active { "activated" } else { "deactivated" },
        actor.username
    );
    let seller = User::find_by_id(target.seller_id).one(db).await?;
    Ok(view(target, seller))
}
