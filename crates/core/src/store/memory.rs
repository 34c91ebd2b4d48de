//! In-memory ledger store.
//!
//! Committed state sits behind one `RwLock`; commits take the write half so
//! they apply atomically. Per-account row locks are async mutexes kept in a
//! `DashMap` and held by the unit of work as owned guards.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use corebank_shared::types::{AccountId, AccountingEntryId, BranchId, CashRequestId, ReversalRequestId};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{CashMovementAccounts, LedgerStore, StoreError, UnitOfWork, cancellable};
use crate::cash::CashRequest;
use crate::ledger::{Account, AccountingEntry, EntryStatus, EventCode, ReferenceId};
use crate::workflow::ReversalRequest;

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    entries: Vec<AccountingEntry>,
    references: HashSet<ReferenceId>,
    cash_movement_accounts: HashMap<(EventCode, BranchId), CashMovementAccounts>,
    liaison_accounts: HashMap<BranchId, AccountId>,
    reversal_requests: HashMap<ReversalRequestId, ReversalRequest>,
    cash_requests: HashMap<CashRequestId, CashRequest>,
}

/// Ledger store kept in process memory.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<RwLock<LedgerState>>,
    row_locks: Arc<DashMap<AccountId, Arc<Mutex<()>>>>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account and returns its id.
    pub async fn insert_account(&self, account: Account) -> AccountId {
        let id = account.id;
        self.state.write().await.accounts.insert(id, account);
        id
    }

    /// Maps an event code at a branch to its source and destination accounts.
    pub async fn map_cash_movement(
        &self,
        event_code: EventCode,
        branch_id: BranchId,
        accounts: CashMovementAccounts,
    ) {
        self.state
            .write()
            .await
            .cash_movement_accounts
            .insert((event_code, branch_id), accounts);
    }

    /// Sets the liaison account of a branch.
    pub async fn set_liaison_account(&self, branch_id: BranchId, account_id: AccountId) {
        self.state
            .write()
            .await
            .liaison_accounts
            .insert(branch_id, account_id);
    }

    /// Returns the committed state of an account.
    pub async fn account(&self, id: AccountId) -> Option<Account> {
        self.state.read().await.accounts.get(&id).cloned()
    }

    /// Returns every committed entry in posting order.
    pub async fn entries(&self) -> Vec<AccountingEntry> {
        self.state.read().await.entries.clone()
    }

    /// Returns a committed cash request.
    pub async fn cash_request(&self, id: CashRequestId) -> Option<CashRequest> {
        self.state.read().await.cash_requests.get(&id).cloned()
    }

    /// Returns a committed reversal request.
    pub async fn reversal_request(&self, id: ReversalRequestId) -> Option<ReversalRequest> {
        self.state.read().await.reversal_requests.get(&id).cloned()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Unit = MemoryUnitOfWork;

    async fn begin(&self, cancel: CancellationToken) -> Result<Self::Unit, StoreError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(MemoryUnitOfWork {
            state: Arc::clone(&self.state),
            row_locks: Arc::clone(&self.row_locks),
            cancel,
            held: BTreeMap::new(),
            staged: Staged::default(),
        })
    }
}

#[derive(Default)]
struct Staged {
    accounts: HashMap<AccountId, Account>,
    entries: Vec<AccountingEntry>,
    references: Vec<ReferenceId>,
    reversed: HashSet<AccountingEntryId>,
    reversal_requests: HashMap<ReversalRequestId, ReversalRequest>,
    cash_requests: HashMap<CashRequestId, CashRequest>,
}

/// Unit of work over a [`MemoryLedgerStore`].
pub struct MemoryUnitOfWork {
    state: Arc<RwLock<LedgerState>>,
    row_locks: Arc<DashMap<AccountId, Arc<Mutex<()>>>>,
    cancel: CancellationToken,
    held: BTreeMap<AccountId, OwnedMutexGuard<()>>,
    staged: Staged,
}

impl MemoryUnitOfWork {
    fn with_staged_status(&self, mut entry: AccountingEntry) -> AccountingEntry {
        if self.staged.reversed.contains(&entry.id) {
            entry.status = EntryStatus::Reversed;
        }
        entry
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        if let Some(account) = self.staged.accounts.get(&id) {
            return Ok(Some(account.clone()));
        }
        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(state.accounts.get(&id).filter(|a| !a.is_deleted).cloned())
    }

    async fn lock_accounts(
        &mut self,
        ids: &[AccountId],
    ) -> Result<BTreeMap<AccountId, Account>, StoreError> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        for id in &ordered {
            if self.held.contains_key(id) {
                continue;
            }
            let lock = Arc::clone(self.row_locks.entry(*id).or_default().value());
            let guard = cancellable(&self.cancel, async { Ok(lock.lock_owned().await) }).await?;
            debug!(account_id = %id, "account locked");
            self.held.insert(*id, guard);
        }

        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(ordered
            .iter()
            .filter_map(|id| {
                self.staged
                    .accounts
                    .get(id)
                    .or_else(|| state.accounts.get(id))
                    .filter(|a| !a.is_deleted)
                    .map(|a| (*id, a.clone()))
            })
            .collect())
    }

    async fn cash_movement_accounts(
        &mut self,
        event_code: &EventCode,
        branch_id: BranchId,
    ) -> Result<Option<CashMovementAccounts>, StoreError> {
        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(state
            .cash_movement_accounts
            .get(&(event_code.clone(), branch_id))
            .copied())
    }

    async fn liaison_account(&mut self, branch_id: BranchId) -> Result<Option<AccountId>, StoreError> {
        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(state.liaison_accounts.get(&branch_id).copied())
    }

    async fn has_entries(&mut self, reference: &ReferenceId) -> Result<bool, StoreError> {
        if self.staged.entries.iter().any(|e| &e.reference_id == reference) {
            return Ok(true);
        }
        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(state.entries.iter().any(|e| &e.reference_id == reference))
    }

    async fn reference_exists(&mut self, reference: &ReferenceId) -> Result<bool, StoreError> {
        if self.staged.references.contains(reference) {
            return Ok(true);
        }
        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(state.references.contains(reference))
    }

    async fn entries_by_reference(
        &mut self,
        reference: &ReferenceId,
    ) -> Result<Vec<AccountingEntry>, StoreError> {
        let committed: Vec<AccountingEntry> = {
            let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
            state
                .entries
                .iter()
                .filter(|e| &e.reference_id == reference)
                .cloned()
                .collect()
        };

        Ok(committed
            .into_iter()
            .chain(
                self.staged
                    .entries
                    .iter()
                    .filter(|e| &e.reference_id == reference)
                    .cloned(),
            )
            .map(|e| self.with_staged_status(e))
            .collect())
    }

    async fn stage_entries(&mut self, entries: &[AccountingEntry]) -> Result<(), StoreError> {
        let mut fresh: Vec<ReferenceId> = Vec::new();
        for entry in entries {
            if !self.staged.references.contains(&entry.reference_id)
                && !fresh.contains(&entry.reference_id)
            {
                fresh.push(entry.reference_id.clone());
            }
        }

        {
            let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
            if let Some(taken) = fresh.iter().find(|r| state.references.contains(*r)) {
                return Err(StoreError::UniqueViolation(taken.to_string()));
            }
        }

        debug!(entries = entries.len(), "entries staged");
        self.staged.references.extend(fresh);
        self.staged.entries.extend_from_slice(entries);
        Ok(())
    }

    async fn stage_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if !self.held.contains_key(&account.id) {
            return Err(StoreError::Database(format!(
                "account {} is not locked by this unit of work",
                account.id
            )));
        }
        self.staged.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn mark_reversed(&mut self, entry_ids: &[AccountingEntryId]) -> Result<(), StoreError> {
        self.staged.reversed.extend(entry_ids.iter().copied());
        Ok(())
    }

    async fn find_reversal_request(
        &mut self,
        id: ReversalRequestId,
    ) -> Result<Option<ReversalRequest>, StoreError> {
        if let Some(request) = self.staged.reversal_requests.get(&id) {
            return Ok(Some(request.clone()));
        }
        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(state.reversal_requests.get(&id).cloned())
    }

    async fn reversal_requests_for(
        &mut self,
        reference: &ReferenceId,
    ) -> Result<Vec<ReversalRequest>, StoreError> {
        let mut requests: HashMap<ReversalRequestId, ReversalRequest> = {
            let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
            state
                .reversal_requests
                .values()
                .filter(|r| &r.reference_id == reference)
                .map(|r| (r.id, r.clone()))
                .collect()
        };
        for request in self.staged.reversal_requests.values() {
            if &request.reference_id == reference {
                requests.insert(request.id, request.clone());
            }
        }

        let mut requests: Vec<ReversalRequest> = requests.into_values().collect();
        requests.sort_by_key(|r| r.requested_at);
        Ok(requests)
    }

    async fn save_reversal_request(&mut self, request: &ReversalRequest) -> Result<(), StoreError> {
        self.staged
            .reversal_requests
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn find_cash_request(&mut self, id: CashRequestId) -> Result<Option<CashRequest>, StoreError> {
        if let Some(request) = self.staged.cash_requests.get(&id) {
            return Ok(Some(request.clone()));
        }
        let state = cancellable(&self.cancel, async { Ok(self.state.read().await) }).await?;
        Ok(state.cash_requests.get(&id).cloned())
    }

    async fn save_cash_request(&mut self, request: &CashRequest) -> Result<(), StoreError> {
        self.staged.cash_requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn commit(self) -> Result<u64, StoreError> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }

        let Self {
            state,
            held,
            staged,
            ..
        } = self;
        let mut state = state.write().await;

        if let Some(taken) = staged.references.iter().find(|r| state.references.contains(*r)) {
            warn!(reference_id = %taken, "reference registry rejected commit");
            return Err(StoreError::UniqueViolation(taken.to_string()));
        }

        let mut rows = 0u64;
        for reference in staged.references {
            state.references.insert(reference);
            rows += 1;
        }
        for (id, account) in staged.accounts {
            state.accounts.insert(id, account);
            rows += 1;
        }
        for entry in &mut state.entries {
            if staged.reversed.contains(&entry.id) {
                entry.status = EntryStatus::Reversed;
                rows += 1;
            }
        }
        for mut entry in staged.entries {
            if staged.reversed.contains(&entry.id) {
                entry.status = EntryStatus::Reversed;
            }
            state.entries.push(entry);
            rows += 1;
        }
        for (id, request) in staged.reversal_requests {
            state.reversal_requests.insert(id, request);
            rows += 1;
        }
        for (id, request) in staged.cash_requests {
            state.cash_requests.insert(id, request);
            rows += 1;
        }

        drop(state);
        drop(held);
        debug!(rows, "unit of work committed");
        Ok(rows)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        debug!(locks = self.held.len(), "unit of work rolled back");
        Ok(())
    }
}
