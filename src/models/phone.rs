use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, PhoneCondition, PhoneState, PhoneStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phones")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub imei: String, // 15 digits
    #[sea_orm(unique)]
    pub serial_number: String,
    pub brand: String,
    #[serde(rename = "model")]
    pub model_name: String,
    pub color: String,
    /// 'new', 'used' or 'other'
    pub condition: String,
    /// Lifecycle status, see `domain::lifecycle`.
    /// Valid values:
    /// - `available`: in the owner's inventory, can be sold or assigned
    /// - `sold`: sold through a sell agreement (terminal)
    /// - `assigned`: waiting for the recipient of an assignment to answer
    pub status: String,
    pub purchase_price: Option<Decimal>,
    pub current_owner_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CurrentOwnerId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    CurrentOwner,
    #[sea_orm(has_many = "super::agreement::Entity")]
    Agreements,
    #[sea_orm(has_many = "super::phone_history::Entity")]
    History,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CurrentOwner.def()
    }
}

impl Related<super::agreement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agreements.def()
    }
}

impl Related<super::phone_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Result<PhoneStatus, DomainError> {
        self.status.parse()
    }

    pub fn condition(&self) -> Result<PhoneCondition, DomainError> {
        self.condition.parse()
    }

    pub fn state(&self) -> Result<PhoneState, DomainError> {
        Ok(PhoneState {
            status: self.status()?,
            owner_id: self.current_owner_id,
        })
    }

    pub fn is_available(&self) -> bool {
        self.status == PhoneStatus::Available.as_str()
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model_name)
    }
}
