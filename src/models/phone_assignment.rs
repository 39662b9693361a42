use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{AssignmentStatus, DomainError};

/// Peer-to-peer transfer request of a phone between two sellers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phone_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub phone_id: i32,
    pub from_seller_id: i32,
    pub to_seller_id: i32,
    pub status: String, // 'pending', 'approved', 'rejected'
    pub message: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::phone::Entity",
        from = "Column::PhoneId",
        to = "super::phone::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Phone,
}

impl Related<super::phone::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Phone.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn status(&self) -> Result<AssignmentStatus, DomainError> {
        self.status.parse()
    }
}
