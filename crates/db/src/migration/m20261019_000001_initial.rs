//! Initial database migration.
//!
//! Creates the ledger tables, the unique reference registry and the
//! cash/reversal workflow tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ACCOUNTS & LEDGER
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(ACCOUNTING_ENTRIES_SQL).await?;
        db.execute_unprepared(LEDGER_REFERENCES_SQL).await?;

        // ============================================================
        // PART 2: ACCOUNT RESOLUTION
        // ============================================================
        db.execute_unprepared(CASH_MOVEMENT_ACCOUNTS_SQL).await?;
        db.execute_unprepared(BRANCH_LIAISON_ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: WORKFLOWS
        // ============================================================
        db.execute_unprepared(REVERSAL_REQUESTS_SQL).await?;
        db.execute_unprepared(CASH_REQUESTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    account_number VARCHAR(34) NOT NULL,
    name VARCHAR(255) NOT NULL,
    kind VARCHAR(16) NOT NULL,
    booking_direction VARCHAR(16) NOT NULL,
    currency CHAR(3) NOT NULL,
    status VARCHAR(8) NOT NULL DEFAULT 'open',
    bank_id UUID NOT NULL,
    branch_id UUID NOT NULL,
    category_code VARCHAR(16) NOT NULL,
    current_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    debit_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    last_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    beginning_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    beginning_debit_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    beginning_credit_balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    version BIGINT NOT NULL DEFAULT 0,
    is_deleted BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_account_kind CHECK (kind IN ('customer', 'teller', 'vault', 'transit', 'liaison', 'bank', 'internal')),
    CONSTRAINT chk_booking_direction CHECK (booking_direction IN ('debit_normal', 'credit_normal')),
    CONSTRAINT chk_account_status CHECK (status IN ('open', 'closed')),
    CONSTRAINT chk_account_version CHECK (version >= 0)
);

CREATE UNIQUE INDEX idx_accounts_number ON accounts(bank_id, account_number) WHERE NOT is_deleted;
CREATE INDEX idx_accounts_branch ON accounts(branch_id, kind) WHERE NOT is_deleted;
";

const ACCOUNTING_ENTRIES_SQL: &str = r"
CREATE TABLE accounting_entries (
    id UUID PRIMARY KEY,
    entry_date TIMESTAMPTZ NOT NULL,
    value_date TIMESTAMPTZ NOT NULL,
    entry_type VARCHAR(6) NOT NULL,
    currency CHAR(3) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    debit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    account_id UUID NOT NULL REFERENCES accounts(id),
    counter_account_id UUID NOT NULL REFERENCES accounts(id),
    account_version BIGINT NOT NULL,
    previous_balance NUMERIC(19, 4) NOT NULL,
    current_balance NUMERIC(19, 4) NOT NULL,
    debit_balance_bf NUMERIC(19, 4) NOT NULL,
    credit_balance_bf NUMERIC(19, 4) NOT NULL,
    reference_id VARCHAR(64) NOT NULL,
    event_code VARCHAR(64) NOT NULL,
    operation_type VARCHAR(32) NOT NULL,
    narration TEXT NOT NULL DEFAULT '',
    initiated_by UUID NOT NULL,
    initiator_name VARCHAR(255) NOT NULL,
    branch_id UUID NOT NULL,
    status VARCHAR(8) NOT NULL DEFAULT 'posted',
    is_auxiliary BOOLEAN NOT NULL DEFAULT false,
    reverses_entry_id UUID REFERENCES accounting_entries(id),
    is_deleted BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_entry_type CHECK (entry_type IN ('debit', 'credit')),
    CONSTRAINT chk_entry_status CHECK (status IN ('posted', 'reversed')),
    CONSTRAINT chk_entry_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_entry_columns CHECK (
        (entry_type = 'debit' AND debit_amount = amount AND credit_amount = 0) OR
        (entry_type = 'credit' AND credit_amount = amount AND debit_amount = 0)
    ),
    CONSTRAINT uq_entry_account_version UNIQUE (account_id, account_version)
);

CREATE INDEX idx_entries_reference ON accounting_entries(reference_id) WHERE NOT is_deleted;
CREATE INDEX idx_entries_account ON accounting_entries(account_id, account_version);
";

const LEDGER_REFERENCES_SQL: &str = r"
-- Unique registry of reference ids; the ultimate guard against double posting
CREATE TABLE ledger_references (
    reference_id VARCHAR(64) PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const CASH_MOVEMENT_ACCOUNTS_SQL: &str = r"
CREATE TABLE cash_movement_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    event_code VARCHAR(64) NOT NULL,
    branch_id UUID NOT NULL,
    source_account_id UUID NOT NULL REFERENCES accounts(id),
    destination_account_id UUID NOT NULL REFERENCES accounts(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_cash_movement_event_branch UNIQUE (event_code, branch_id),
    CONSTRAINT chk_cash_movement_distinct CHECK (source_account_id <> destination_account_id)
);
";

const BRANCH_LIAISON_ACCOUNTS_SQL: &str = r"
CREATE TABLE branch_liaison_accounts (
    branch_id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const REVERSAL_REQUESTS_SQL: &str = r"
CREATE TABLE reversal_requests (
    id UUID PRIMARY KEY,
    reference_id VARCHAR(64) NOT NULL,
    branch_id UUID NOT NULL,
    state VARCHAR(20) NOT NULL,
    issued_by UUID NOT NULL,
    reason TEXT NOT NULL,
    requested_at TIMESTAMPTZ NOT NULL,
    decided_by UUID,
    decided_at TIMESTAMPTZ,
    rejection_reason TEXT,
    reversal_reference VARCHAR(64),
    snapshot JSONB,
    CONSTRAINT chk_reversal_state CHECK (state IN ('posted', 'reversal_requested', 'reversal_approved', 'reversed', 'rejected')),
    CONSTRAINT chk_reversal_not_self_approved CHECK (decided_by IS NULL OR state = 'rejected' OR decided_by <> issued_by)
);

CREATE INDEX idx_reversal_requests_reference ON reversal_requests(reference_id, requested_at);
-- At most one reversal awaiting a decision per reference
CREATE UNIQUE INDEX idx_reversal_requests_in_flight ON reversal_requests(reference_id)
    WHERE state IN ('reversal_requested', 'reversal_approved');
";

const CASH_REQUESTS_SQL: &str = r"
CREATE TABLE cash_requests (
    id UUID PRIMARY KEY,
    kind VARCHAR(32) NOT NULL,
    branch_id UUID NOT NULL,
    reference_id VARCHAR(64) NOT NULL,
    event_code VARCHAR(64) NOT NULL,
    requested_amount NUMERIC(19, 4) NOT NULL,
    approved_amount NUMERIC(19, 4),
    narration TEXT NOT NULL DEFAULT '',
    status VARCHAR(16) NOT NULL DEFAULT 'pending',
    requested_by UUID NOT NULL,
    requested_at TIMESTAMPTZ NOT NULL,
    decided_by UUID,
    decided_at TIMESTAMPTZ,
    rejection_reason TEXT,
    CONSTRAINT chk_cash_request_kind CHECK (kind IN ('replenishment', 'deposit_notification')),
    CONSTRAINT chk_cash_request_status CHECK (status IN ('pending', 'approved', 'rejected', 'redirect_bco', 'redirect_btb', 'redirect_bd', 'completed')),
    CONSTRAINT chk_cash_request_amount CHECK (requested_amount > 0),
    CONSTRAINT chk_cash_request_approved CHECK (approved_amount IS NULL OR (approved_amount > 0 AND approved_amount <= requested_amount))
);

CREATE INDEX idx_cash_requests_branch ON cash_requests(branch_id, status);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS cash_requests CASCADE;
DROP TABLE IF EXISTS reversal_requests CASCADE;
DROP TABLE IF EXISTS branch_liaison_accounts CASCADE;
DROP TABLE IF EXISTS cash_movement_accounts CASCADE;
DROP TABLE IF EXISTS ledger_references CASCADE;
DROP TABLE IF EXISTS accounting_entries CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";

#[cfg(test)]
mod tests {
    use super::*;
    use corebank_core::ledger::AMOUNT_SCALE;

    #[test]
    fn test_money_columns_use_amount_scale() {
        let expected = format!("NUMERIC(19, {AMOUNT_SCALE})");
        let mut columns = 0;
        for sql in [
            ACCOUNTS_SQL,
            ACCOUNTING_ENTRIES_SQL,
            LEDGER_REFERENCES_SQL,
            CASH_MOVEMENT_ACCOUNTS_SQL,
            BRANCH_LIAISON_ACCOUNTS_SQL,
            REVERSAL_REQUESTS_SQL,
            CASH_REQUESTS_SQL,
        ] {
            for (at, _) in sql.match_indices("NUMERIC(") {
                assert!(
                    sql[at..].starts_with(&expected),
                    "money column declared as {}",
                    sql[at..].lines().next().unwrap_or_default()
                );
                columns += 1;
            }
        }
        assert_eq!(columns, 16);
    }
}
