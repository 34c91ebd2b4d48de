//! Postgres ledger store.
//!
//! A [`SeaUnitOfWork`] wraps one database transaction. Writes go to the
//! database as they are staged and stay invisible to other connections until
//! `commit`; dropping the unit rolls the transaction back. Accounts are
//! locked with `SELECT ... FOR UPDATE` in ascending id order, and the
//! `ledger_references` primary key is the final word on duplicate references.

mod convert;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use corebank_core::cash::CashRequest;
use corebank_core::ledger::{Account, AccountingEntry, EntryStatus, EventCode, ReferenceId};
use corebank_core::store::{
    CashMovementAccounts, LedgerStore, StoreError, UnitOfWork, cancellable,
};
use corebank_core::workflow::ReversalRequest;
use corebank_shared::types::{
    AccountId, AccountingEntryId, BranchId, CashRequestId, ReversalRequestId,
};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionTrait,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::{
    accounting_entries, accounts, branch_liaison_accounts, cash_movement_accounts, cash_requests,
    ledger_references, reversal_requests,
};
use convert::{
    account_balances_update, account_from_model, account_to_active, cash_request_from_model,
    cash_request_to_active, entry_from_model, entry_to_active, reversal_request_from_model,
    reversal_request_to_active, to_db_time,
};

/// Maps a database error, keeping unique violations distinguishable.
fn db_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::UniqueViolation(detail),
        _ => StoreError::Database(err.to_string()),
    }
}

/// Ledger store backed by a `SeaORM` connection pool.
#[derive(Clone)]
pub struct SeaLedgerStore {
    db: DatabaseConnection,
}

impl SeaLedgerStore {
    /// Creates a store over an open connection.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Inserts an account with its opening balances.
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails.
    pub async fn insert_account(&self, account: &Account) -> Result<AccountId, DbErr> {
        accounts::Entity::insert(account_to_active(account))
            .exec(&self.db)
            .await?;
        Ok(account.id)
    }

    /// Maps an event code at a branch to its source and destination accounts.
    ///
    /// An existing mapping for the same pair is replaced.
    ///
    /// # Errors
    ///
    /// Returns a database error if the upsert fails.
    pub async fn map_cash_movement(
        &self,
        event_code: &EventCode,
        branch_id: BranchId,
        mapping: CashMovementAccounts,
    ) -> Result<(), DbErr> {
        let model = cash_movement_accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            event_code: Set(event_code.to_string()),
            branch_id: Set(branch_id.into_inner()),
            source_account_id: Set(mapping.source_account_id.into_inner()),
            destination_account_id: Set(mapping.destination_account_id.into_inner()),
            created_at: Set(to_db_time(Utc::now())),
        };
        cash_movement_accounts::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    cash_movement_accounts::Column::EventCode,
                    cash_movement_accounts::Column::BranchId,
                ])
                .update_columns([
                    cash_movement_accounts::Column::SourceAccountId,
                    cash_movement_accounts::Column::DestinationAccountId,
                ])
                .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Sets the liaison account of a branch.
    ///
    /// # Errors
    ///
    /// Returns a database error if the upsert fails.
    pub async fn set_liaison_account(
        &self,
        branch_id: BranchId,
        account_id: AccountId,
    ) -> Result<(), DbErr> {
        let model = branch_liaison_accounts::ActiveModel {
            branch_id: Set(branch_id.into_inner()),
            account_id: Set(account_id.into_inner()),
            created_at: Set(to_db_time(Utc::now())),
        };
        branch_liaison_accounts::Entity::insert(model)
            .on_conflict(
                OnConflict::column(branch_liaison_accounts::Column::BranchId)
                    .update_column(branch_liaison_accounts::Column::AccountId)
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Returns the committed state of an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be mapped.
    pub async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_error)?
            .map(account_from_model)
            .transpose()
    }
}

#[async_trait]
impl LedgerStore for SeaLedgerStore {
    type Unit = SeaUnitOfWork;

    async fn begin(&self, cancel: CancellationToken) -> Result<Self::Unit, StoreError> {
        let txn = cancellable(&cancel, async { self.db.begin().await.map_err(db_error) }).await?;
        Ok(SeaUnitOfWork {
            txn,
            cancel,
            locked: BTreeSet::new(),
            rows: 0,
        })
    }
}

/// Unit of work over one database transaction.
pub struct SeaUnitOfWork {
    txn: DatabaseTransaction,
    cancel: CancellationToken,
    locked: BTreeSet<AccountId>,
    rows: u64,
}

#[async_trait]
impl UnitOfWork for SeaUnitOfWork {
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let txn = &self.txn;
        let model = cancellable(&self.cancel, async {
            accounts::Entity::find_by_id(id.into_inner())
                .filter(accounts::Column::IsDeleted.eq(false))
                .one(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        model.map(account_from_model).transpose()
    }

    async fn lock_accounts(
        &mut self,
        ids: &[AccountId],
    ) -> Result<BTreeMap<AccountId, Account>, StoreError> {
        let ordered: BTreeSet<AccountId> = ids.iter().copied().collect();
        let uuids: Vec<Uuid> = ordered.iter().map(|id| id.into_inner()).collect();

        let txn = &self.txn;
        let models = cancellable(&self.cancel, async {
            accounts::Entity::find()
                .filter(accounts::Column::Id.is_in(uuids))
                .filter(accounts::Column::IsDeleted.eq(false))
                .order_by_asc(accounts::Column::Id)
                .lock_exclusive()
                .all(txn)
                .await
                .map_err(db_error)
        })
        .await?;

        let mut locked = BTreeMap::new();
        for model in models {
            let account = account_from_model(model)?;
            debug!(account_id = %account.id, "account locked");
            self.locked.insert(account.id);
            locked.insert(account.id, account);
        }
        Ok(locked)
    }

    async fn cash_movement_accounts(
        &mut self,
        event_code: &EventCode,
        branch_id: BranchId,
    ) -> Result<Option<CashMovementAccounts>, StoreError> {
        let txn = &self.txn;
        let model = cancellable(&self.cancel, async {
            cash_movement_accounts::Entity::find()
                .filter(cash_movement_accounts::Column::EventCode.eq(event_code.as_str()))
                .filter(cash_movement_accounts::Column::BranchId.eq(branch_id.into_inner()))
                .one(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        Ok(model.map(|m| CashMovementAccounts {
            source_account_id: AccountId::from_uuid(m.source_account_id),
            destination_account_id: AccountId::from_uuid(m.destination_account_id),
        }))
    }

    async fn liaison_account(&mut self, branch_id: BranchId) -> Result<Option<AccountId>, StoreError> {
        let txn = &self.txn;
        let model = cancellable(&self.cancel, async {
            branch_liaison_accounts::Entity::find_by_id(branch_id.into_inner())
                .one(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        Ok(model.map(|m| AccountId::from_uuid(m.account_id)))
    }

    async fn has_entries(&mut self, reference: &ReferenceId) -> Result<bool, StoreError> {
        let txn = &self.txn;
        let count = cancellable(&self.cancel, async {
            accounting_entries::Entity::find()
                .filter(accounting_entries::Column::ReferenceId.eq(reference.as_str()))
                .filter(accounting_entries::Column::IsDeleted.eq(false))
                .count(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        Ok(count > 0)
    }

    async fn reference_exists(&mut self, reference: &ReferenceId) -> Result<bool, StoreError> {
        let txn = &self.txn;
        let model = cancellable(&self.cancel, async {
            ledger_references::Entity::find_by_id(reference.as_str().to_string())
                .one(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        Ok(model.is_some())
    }

    async fn entries_by_reference(
        &mut self,
        reference: &ReferenceId,
    ) -> Result<Vec<AccountingEntry>, StoreError> {
        let txn = &self.txn;
        let models = cancellable(&self.cancel, async {
            accounting_entries::Entity::find()
                .filter(accounting_entries::Column::ReferenceId.eq(reference.as_str()))
                .filter(accounting_entries::Column::IsDeleted.eq(false))
                .order_by_asc(accounting_entries::Column::EntryDate)
                .order_by_asc(accounting_entries::Column::Id)
                .all(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        models.into_iter().map(entry_from_model).collect()
    }

    async fn stage_entries(&mut self, entries: &[AccountingEntry]) -> Result<(), StoreError> {
        let references: BTreeSet<&ReferenceId> = entries.iter().map(|e| &e.reference_id).collect();
        let txn = &self.txn;

        for reference in references {
            let model = ledger_references::ActiveModel {
                reference_id: Set(reference.as_str().to_string()),
                created_at: Set(to_db_time(Utc::now())),
            };
            let inserted = cancellable(&self.cancel, async {
                ledger_references::Entity::insert(model)
                    .exec(txn)
                    .await
                    .map_err(db_error)
            })
            .await;
            match inserted {
                Ok(_) => self.rows += 1,
                Err(StoreError::UniqueViolation(_)) => {
                    warn!(reference_id = %reference, "reference registry rejected insert");
                    return Err(StoreError::UniqueViolation(reference.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        if entries.is_empty() {
            return Ok(());
        }
        let models: Vec<_> = entries.iter().map(entry_to_active).collect();
        cancellable(&self.cancel, async {
            accounting_entries::Entity::insert_many(models)
                .exec(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        self.rows += entries.len() as u64;
        debug!(entries = entries.len(), "entries staged");
        Ok(())
    }

    async fn stage_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if !self.locked.contains(&account.id) {
            return Err(StoreError::Database(format!(
                "account {} is not locked by this unit of work",
                account.id
            )));
        }
        let txn = &self.txn;
        let model = account_balances_update(account);
        cancellable(&self.cancel, async { model.update(txn).await.map_err(db_error) }).await?;
        self.rows += 1;
        Ok(())
    }

    async fn mark_reversed(&mut self, entry_ids: &[AccountingEntryId]) -> Result<(), StoreError> {
        let ids: Vec<Uuid> = entry_ids.iter().map(|id| id.into_inner()).collect();
        let txn = &self.txn;
        let result = cancellable(&self.cancel, async {
            accounting_entries::Entity::update_many()
                .col_expr(
                    accounting_entries::Column::Status,
                    Expr::value(EntryStatus::Reversed.as_str()),
                )
                .filter(accounting_entries::Column::Id.is_in(ids))
                .filter(accounting_entries::Column::Status.eq(EntryStatus::Posted.as_str()))
                .exec(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        self.rows += result.rows_affected;
        Ok(())
    }

    async fn find_reversal_request(
        &mut self,
        id: ReversalRequestId,
    ) -> Result<Option<ReversalRequest>, StoreError> {
        let txn = &self.txn;
        let model = cancellable(&self.cancel, async {
            reversal_requests::Entity::find_by_id(id.into_inner())
                .one(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        model.map(reversal_request_from_model).transpose()
    }

    async fn reversal_requests_for(
        &mut self,
        reference: &ReferenceId,
    ) -> Result<Vec<ReversalRequest>, StoreError> {
        let txn = &self.txn;
        let models = cancellable(&self.cancel, async {
            reversal_requests::Entity::find()
                .filter(reversal_requests::Column::ReferenceId.eq(reference.as_str()))
                .order_by_asc(reversal_requests::Column::RequestedAt)
                .all(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        models.into_iter().map(reversal_request_from_model).collect()
    }

    async fn save_reversal_request(&mut self, request: &ReversalRequest) -> Result<(), StoreError> {
        let model = reversal_request_to_active(request)?;
        let txn = &self.txn;
        cancellable(&self.cancel, async {
            reversal_requests::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(reversal_requests::Column::Id)
                        .update_columns([
                            reversal_requests::Column::State,
                            reversal_requests::Column::DecidedBy,
                            reversal_requests::Column::DecidedAt,
                            reversal_requests::Column::RejectionReason,
                            reversal_requests::Column::ReversalReference,
                            reversal_requests::Column::Snapshot,
                        ])
                        .to_owned(),
                )
                .exec(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        self.rows += 1;
        Ok(())
    }

    async fn find_cash_request(&mut self, id: CashRequestId) -> Result<Option<CashRequest>, StoreError> {
        let txn = &self.txn;
        let model = cancellable(&self.cancel, async {
            cash_requests::Entity::find_by_id(id.into_inner())
                .lock_exclusive()
                .one(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        model.map(cash_request_from_model).transpose()
    }

    async fn save_cash_request(&mut self, request: &CashRequest) -> Result<(), StoreError> {
        let model = cash_request_to_active(request);
        let txn = &self.txn;
        cancellable(&self.cancel, async {
            cash_requests::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(cash_requests::Column::Id)
                        .update_columns([
                            cash_requests::Column::ApprovedAmount,
                            cash_requests::Column::Status,
                            cash_requests::Column::DecidedBy,
                            cash_requests::Column::DecidedAt,
                            cash_requests::Column::RejectionReason,
                        ])
                        .to_owned(),
                )
                .exec(txn)
                .await
                .map_err(db_error)
        })
        .await?;
        self.rows += 1;
        Ok(())
    }

    async fn commit(self) -> Result<u64, StoreError> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let rows = self.rows;
        self.txn.commit().await.map_err(db_error)?;
        debug!(rows, "unit of work committed");
        Ok(rows)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        let locks = self.locked.len();
        self.txn.rollback().await.map_err(db_error)?;
        debug!(locks, "unit of work rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_constraint_errors_map_to_database() {
        let err = db_error(DbErr::Custom("connection reset".into()));
        assert!(matches!(err, StoreError::Database(msg) if msg.contains("connection reset")));
    }

    #[test]
    fn test_record_not_found_maps_to_database() {
        let err = db_error(DbErr::RecordNotFound("accounts".into()));
        assert!(matches!(err, StoreError::Database(_)));
    }
}
