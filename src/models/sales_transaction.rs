use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

use crate::domain::finance;
use crate::domain::{DomainError, PaymentMethod, TransactionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub seller_id: i32,
    pub phone_id: i32,
    #[sea_orm(unique)]
    pub agreement_id: Option<i32>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    /// Always `sale_price - cost_price`, recomputed on save
    pub profit: Decimal,
    pub commission_rate: Decimal, // percent
    /// Always `profit * commission_rate / 100`, recomputed on save
    pub commission_amount: Decimal,
    pub payment_method: String,
    pub payment_reference: String,
    pub status: String, // 'completed', 'pending', 'cancelled', 'refunded'
    pub notes: String,
    pub sale_date: String,
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
    #[sea_orm(
        belongs_to = "super::phone::Entity",
        from = "Column::PhoneId",
        to = "super::phone::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
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

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
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

fn current<V>(value: &ActiveValue<V>) -> Option<V>
where
    V: Into<sea_orm::Value> + Clone,
{
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v.clone()),
        ActiveValue::NotSet => None,
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let derived = finance::sale_financials(
            current(&self.sale_price).unwrap_or_default(),
            current(&self.cost_price).unwrap_or_default(),
            current(&self.commission_rate).unwrap_or_default(),
        );
        self.profit = Set(derived.profit);
        self.commission_amount = Set(derived.commission_amount);

        Ok(self)
    }
}

impl Model {
    pub fn status(&self) -> Result<TransactionStatus, DomainError> {
        self.status.parse()
    }

    pub fn payment_method(&self) -> Result<PaymentMethod, DomainError> {
        self.payment_method.parse()
    }

    /// Profit as a percentage of the cost price.
    pub fn profit_margin(&self) -> Decimal {
        finance::percentage(self.profit, self.cost_price)
    }
}
