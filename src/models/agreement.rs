use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{AgreementType, DomainError};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "agreements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// 'buy' (dealer buys from the customer) or 'sell' (dealer sells to the customer)
    pub agreement_type: String,
    pub phone_id: i32,
    pub seller_id: i32,
    // Customer / previous owner
    pub customer_name: String,
    pub customer_national_id: String,
    pub customer_phone: String,
    pub customer_address: String,
    // Captured documents, stored paths relative to the media root
    pub id_photo: Option<String>,
    pub passport_photo: Option<String>,
    /// Raw canvas signature (data URL) as submitted
    pub signature: String,
    pub signature_photo: Option<String>,
    pub price: Decimal,
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
        belongs_to = "super::user::Entity",
        from = "Column::SellerId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Seller,
}

impl Related<super::phone::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Phone.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

/// Agreements are audit records: written once, never changed or removed.
#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom("agreements cannot be modified".to_owned()));
        }
        Ok(self)
    }

    async fn before_delete<C>(self, _db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Err(DbErr::Custom("agreements cannot be deleted".to_owned()))
    }
}

/// `AGR-000042`
pub fn reference_for(id: i32) -> String {
    format!("AGR-{:06}", id)
}

impl Model {
    pub fn kind(&self) -> Result<AgreementType, DomainError> {
        self.agreement_type.parse()
    }

    pub fn reference(&self) -> String {
        reference_for(self.id)
    }
}
