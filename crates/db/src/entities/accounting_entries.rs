//! `SeaORM` Entity for accounting_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounting_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entry_date: DateTimeWithTimeZone,
    pub value_date: DateTimeWithTimeZone,
    pub entry_type: String,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub debit_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub credit_amount: Decimal,
    pub account_id: Uuid,
    pub counter_account_id: Uuid,
    pub account_version: i64,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub previous_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub current_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub debit_balance_bf: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub credit_balance_bf: Decimal,
    pub reference_id: String,
    pub event_code: String,
    pub operation_type: String,
    pub narration: String,
    pub initiated_by: Uuid,
    pub initiator_name: String,
    pub branch_id: Uuid,
    pub status: String,
    pub is_auxiliary: bool,
    pub reverses_entry_id: Option<Uuid>,
    pub is_deleted: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
