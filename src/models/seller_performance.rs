use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Aggregated sales metrics of one seller over one period.
/// Derived from `sales_transactions`; recomputed on demand.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seller_performance")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub seller_id: i32,
    pub period_type: String, // 'daily' .. 'yearly'
    pub period_start: String,
    pub period_end: String,
    pub total_sales: i32,
    pub total_revenue: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_commission: Decimal,
    pub average_sale_price: Decimal,
    pub average_profit_margin: Decimal, // percent
    pub rank_in_period: Option<i32>,
    pub calculated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SellerId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Seller,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
