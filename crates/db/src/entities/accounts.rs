//! `SeaORM` Entity for accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_number: String,
    pub name: String,
    pub kind: String,
    pub booking_direction: String,
    pub currency: String,
    pub status: String,
    pub bank_id: Uuid,
    pub branch_id: Uuid,
    pub category_code: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub current_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub debit_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub credit_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub last_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub beginning_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub beginning_debit_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub beginning_credit_balance: Decimal,
    pub version: i64,
    pub is_deleted: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::accounting_entries::Entity")]
    AccountingEntries,
}

impl Related<super::accounting_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountingEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
