use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HistoryAction};

/// Audit trail of everything that happened to a phone.
/// Append-only: rows are never updated or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "phone_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub phone_id: i32,
    /// 'buy', 'sell', 'assign', 'approve', 'reject'
    pub action: String,
    pub from_user_id: Option<i32>, // user initiating the action
    pub to_user_id: Option<i32>,   // user receiving (assignments)
    pub agreement_id: Option<i32>,
    pub notes: String,
    pub created_at: String,
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
    #[sea_orm(
        belongs_to = "super::agreement::Entity",
        from = "Column::AgreementId",
        to = "super::agreement::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Agreement,
}

impl Related<super::phone::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Phone.def()
    }
}

impl Related<super::agreement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agreement.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom("phone history is append-only".to_owned()));
        }
        Ok(self)
    }

    async fn before_delete<C>(self, _db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Err(DbErr::Custom("phone history is append-only".to_owned()))
    }
}

impl Model {
    pub fn action(&self) -> Result<HistoryAction, DomainError> {
        self.action.parse()
    }
}
