//! Assignment Service - moving phones between sellers
//!
//! The sender proposes, the recipient decides. While a request is pending the
//! phone is `assigned` and cannot be sold or offered again.

use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::{AssignmentDecision, AssignmentStatus, PhoneEvent, Role};
use crate::models::phone::{self, Entity as Phone};
use crate::models::phone_assignment::{self, Entity as PhoneAssignment};
use crate::models::user::{self, Entity as User};
use crate::services::agreement_service::{append_history, reload_owned_phone};
use crate::services::{now, ServiceError};

#[derive(Debug, Clone, Deserialize)]
pub struct AssignInput {
    pub to_seller: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    #[serde(flatten)]
    pub assignment: phone_assignment::Model,
    pub phone_name: Option<String>,
    pub from_seller_name: Option<String>,
    pub to_seller_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentLists {
    pub sent: Vec<AssignmentView>,
    pub received: Vec<AssignmentView>,
}

/// Active sellers other than `actor`: the possible recipients.
pub async fn assignable_sellers(
    db: &DatabaseConnection,
    actor: &user::Model,
) -> Result<Vec<user::Model>, ServiceError> {
    Ok(User::find()
        .filter(user::Column::Role.eq(Role::Seller.as_str()))
        .filter(user::Column::IsSuspended.eq(false))
        .filter(user::Column::Id.ne(actor.id))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await?)
}

pub async fn assign_phone(
    db: &DatabaseConnection,
    actor: &user::Model,
    phone_id: i32,
    input: AssignInput,
) -> Result<phone_assignment::Model, ServiceError> {
    // 1. Validate
    let phone = Phone::find_by_id(phone_id)
        .filter(phone::Column::CurrentOwnerId.eq(actor.id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("Phone"))?;

    if !phone.is_available() {
        return Err(ServiceError::InvalidState(
            "Only available phones can be assigned.".to_string(),
        ));
    }

    if input.to_seller == actor.id {
        return Err(ServiceError::Validation(
            "You cannot assign a phone to yourself.".to_string(),
        ));
    }

    let recipient = User::find_by_id(input.to_seller)
        .filter(user::Column::Role.eq(Role::Seller.as_str()))
        .filter(user::Column::IsSuspended.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::Validation("Invalid seller selected.".to_string()))?;

    // 2. Request, status change and history together
    let now = now();
    let txn = db.begin().await?;

    let phone = reload_owned_phone(&txn, phone.id, actor.id).await?;
    let next = phone.state()?.apply(PhoneEvent::Assign)?;

    let assignment = phone_assignment::ActiveModel {
        phone_id: Set(phone.id),
        from_seller_id: Set(actor.id),
        to_seller_id: Set(recipient.id),
        status: Set(AssignmentStatus::Pending.as_str().to_string()),
        message: Set(input.message.trim().to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut assigned: phone::ActiveModel = phone.into();
    assigned.status = Set(next.status.as_str().to_string());
    assigned.updated_at = Set(now);
    let phone = assigned.update(&txn).await?;

    append_history(
        &txn,
        phone.id,
        PhoneEvent::Assign.history_action(),
        Some(actor.id),
        Some(recipient.id),
        None,
        format!("Assignment requested to {}", recipient.full_name()),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(
        "{} offered {} to {}",
        actor.username,
        phone.display_name(),
        recipient.username
    );
    Ok(assignment)
}

async fn views(
    db: &DatabaseConnection,
    rows: Vec<(phone_assignment::Model, Option<phone::Model>)>,
) -> Result<Vec<AssignmentView>, ServiceError> {
    let mut ids: Vec<i32> = rows
        .iter()
        .flat_map(|(a, _)| [a.from_seller_id, a.to_seller_id])
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let names: std::collections::HashMap<i32, String> = if ids.is_empty() {
        Default::default()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.full_name()))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|(assignment, phone)| AssignmentView {
            phone_name: phone.map(|p| p.display_name()),
            from_seller_name: names.get(&assignment.from_seller_id).cloned(),
            to_seller_name: names.get(&assignment.to_seller_id).cloned(),
            assignment,
        })
        .collect())
}

pub async fn list_assignments(
    db: &DatabaseConnection,
    actor: &user::Model,
) -> Result<AssignmentLists, ServiceError> {
    let sent = PhoneAssignment::find()
        .filter(phone_assignment::Column::FromSellerId.eq(actor.id))
        .order_by_desc(phone_assignment::Column::CreatedAt)
        .order_by_desc(phone_assignment::Column::Id)
        .find_also_related(Phone)
        .all(db)
        .await?;
    let received = PhoneAssignment::find()
        .filter(phone_assignment::Column::ToSellerId.eq(actor.id))
        .order_by_desc(phone_assignment::Column::CreatedAt)
        .order_by_desc(phone_assignment::Column::Id)
        .find_also_related(Phone)
        .all(db)
        .await?;

    Ok(AssignmentLists {
        sent: views(db, sent).await?,
        received: views(db, received).await?,
    })
}

pub async fn approve_assignment(
    db: &DatabaseConnection,
    actor: &user::Model,
    assignment_id: i32,
) -> Result<phone_assignment::Model, ServiceError> {
    decide(db, actor, assignment_id, AssignmentDecision::Approve).await
}

pub async fn reject_assignment(
    db: &DatabaseConnection,
    actor: &user::Model,
    assignment_id: i32,
) -> Result<phone_assignment::Model, ServiceError> {
    decide(db, actor, assignment_id, AssignmentDecision::Reject).await
}

async fn decide(
    db: &DatabaseConnection,
    actor: &user::Model,
    assignment_id: i32,
    decision: AssignmentDecision,
) -> Result<phone_assignment::Model, ServiceError> {
    let now = now();
    let txn = db.begin().await?;

    // Only the recipient may answer, and only once
    let assignment = PhoneAssignment::find_by_id(assignment_id)
        .filter(phone_assignment::Column::ToSellerId.eq(actor.id))
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Assignment"))?;
    let status = assignment.status()?.decide(decision)?;

    let phone = Phone::find_by_id(assignment.phone_id)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Phone"))?;
    let event = decision.phone_event(assignment.to_seller_id);
    let next = phone.state()?.apply(event)?;

    let mut moved: phone::ActiveModel = phone.into();
    moved.status = Set(next.status.as_str().to_string());
    moved.current_owner_id = Set(next.owner_id);
    moved.updated_at = Set(now.clone());
    let phone = moved.update(&txn).await?;

    let (from, to, notes) = match decision {
        AssignmentDecision::Approve => (
            assignment.from_seller_id,
            assignment.to_seller_id,
            format!("Assignment approved by {}", actor.full_name()),
        ),
        AssignmentDecision::Reject => (
            assignment.to_seller_id,
            assignment.from_seller_id,
            format!("Assignment rejected by {}", actor.full_name()),
        ),
    };
    append_history(
        &txn,
        phone.id,
        event.history_action(),
        Some(from),
        Some(to),
        None,
        notes,
    )
    .await?;

    let mut decided: phone_assignment::ActiveModel = assignment.into();
    decided.status = Set(status.as_str().to_string());
    decided.updated_at = Set(now);
    let assignment = decided.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        "Assignment {} {} by {}",
        assignment.id,
        assignment.status,
        actor.username
    );
    Ok(assignment)
}
