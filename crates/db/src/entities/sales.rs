//! `SeaORM` Entity for sales table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{SaftRequirement, SaleStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub token_symbol: String,
    pub status: SaleStatus,
    pub initial_token_quantity: Decimal,
    pub available_token_quantity: Decimal,
    pub minimum_token_buy_per_user: Option<Decimal>,
    pub maximum_token_buy_per_user: Option<Decimal>,
    pub token_price_per_unit: Decimal,
    pub currency: String,
    pub sale_closing_date: DateTimeWithTimeZone,
    pub requires_kyc: bool,
    pub saft: SaftRequirement,
    pub to_wallet_address: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
