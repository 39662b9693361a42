use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::finance;
use crate::domain::{DomainError, TargetType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_targets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub seller_id: i32,
    pub target_type: String, // 'sales_count', 'revenue', 'profit'
    pub target_value: Decimal,
    pub achieved_value: Decimal,
    pub start_date: String,
    pub end_date: String,
    pub is_active: bool,
    pub is_achieved: bool,
    pub achievement_date: Option<String>,
    pub incentive_amount: Decimal, // bonus paid when the target is reached
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
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

impl Model {
    pub fn target_type(&self) -> Result<TargetType, DomainError> {
        self.target_type.parse()
    }

    pub fn achievement_percentage(&self) -> Decimal {
        finance::percentage(self.achieved_value, self.target_value)
    }
}
