use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repeat-customer record, keyed by phone number.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub phone: String,
    pub email: String,
    pub national_id: String,
    pub address: String,
    // Metrics, recomputed from completed sales
    pub total_purchases: i32,
    pub total_spent: Decimal,
    pub average_purchase_value: Decimal,
    pub registered_by: Option<i32>, // seller who first recorded this customer
    pub is_active: bool,
    pub notes: String,
    pub first_purchase_date: Option<String>,
    pub last_purchase_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
