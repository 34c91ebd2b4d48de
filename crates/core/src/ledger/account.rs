//! Ledger account records.
//!
//! Balance fields are private: they change only through [`Account::apply`],
//! which the posting and reversal engines call. Storage rehydrates them with
//! [`Account::with_balances`].

use corebank_shared::types::{AccountId, BankId, BranchId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::balance::{AccountBalanceSnapshot, BalanceSnapshot, BookingDirection};
use super::error::LedgerError;
use super::types::{AccountKind, AccountStatus, EntryType};

/// Running balances of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountBalances {
    /// Balance after the latest entry, signed per booking direction.
    pub current: Decimal,
    /// Cumulative debits.
    pub debit: Decimal,
    /// Cumulative credits.
    pub credit: Decimal,
    /// Balance before the latest entry.
    pub last: Decimal,
    /// Opening balance.
    pub beginning: Decimal,
    /// Opening cumulative debits.
    pub beginning_debit: Decimal,
    /// Opening cumulative credits.
    pub beginning_credit: Decimal,
    /// Number of entries applied since opening.
    pub version: i64,
}

/// Descriptive part of an account, supplied when opening it.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Account number, unique within the bank.
    pub account_number: String,
    /// Display name.
    pub name: String,
    /// Kind of account.
    pub kind: AccountKind,
    /// Booking direction.
    pub booking_direction: BookingDirection,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Owning bank.
    pub bank_id: BankId,
    /// Owning branch.
    pub branch_id: BranchId,
    /// Chart-of-accounts category.
    pub category_code: String,
}

/// A ledger account (customer, teller, vault, transit, liaison or bank).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Account number.
    pub account_number: String,
    /// Display name.
    pub name: String,
    /// Kind of account.
    pub kind: AccountKind,
    /// Booking direction.
    pub booking_direction: BookingDirection,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Owning bank.
    pub bank_id: BankId,
    /// Owning branch.
    pub branch_id: BranchId,
    /// Chart-of-accounts category.
    pub category_code: String,
    /// Soft-delete flag; accounts are never physically removed.
    pub is_deleted: bool,
    balances: AccountBalances,
}

impl Account {
    /// Opens a new account with zero balances.
    #[must_use]
    pub fn open(details: NewAccount) -> Self {
        Self {
            id: AccountId::new(),
            account_number: details.account_number,
            name: details.name,
            kind: details.kind,
            booking_direction: details.booking_direction,
            currency: details.currency,
            status: AccountStatus::Open,
            bank_id: details.bank_id,
            branch_id: details.branch_id,
            category_code: details.category_code,
            is_deleted: false,
            balances: AccountBalances::default(),
        }
    }

    /// Replaces the generated id.
    #[must_use]
    pub fn with_id(mut self, id: AccountId) -> Self {
        self.id = id;
        self
    }

    /// Sets the opening balance of a freshly opened account.
    #[must_use]
    pub fn with_opening_balance(mut self, amount: Decimal) -> Self {
        self.balances.beginning = amount;
        self.balances.current = amount;
        self.balances.last = amount;
        self
    }

    /// Rehydrates balances loaded from storage.
    #[must_use]
    pub fn with_balances(mut self, balances: AccountBalances) -> Self {
        self.balances = balances;
        self
    }

    /// Returns all balance fields.
    #[must_use]
    pub fn balances(&self) -> &AccountBalances {
        &self.balances
    }

    /// Returns the current balance.
    #[must_use]
    pub fn current_balance(&self) -> Decimal {
        self.balances.current
    }

    /// Returns the number of entries applied so far.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.balances.version
    }

    /// Fails unless the account can receive postings.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountClosed` for closed or soft-deleted accounts.
    pub fn ensure_postable(&self) -> Result<(), LedgerError> {
        if self.is_deleted || self.status == AccountStatus::Closed {
            return Err(LedgerError::AccountClosed(self.id));
        }
        Ok(())
    }

    /// Applies one leg to the balances and returns the point-in-time snapshot.
    pub(crate) fn apply(&mut self, entry_type: EntryType, amount: Decimal) -> BalanceSnapshot {
        let (debit, credit) = match entry_type {
            EntryType::Debit => (amount, Decimal::ZERO),
            EntryType::Credit => (Decimal::ZERO, amount),
        };
        let change = self.booking_direction.calculate_balance_change(debit, credit);

        let balances = &mut self.balances;
        let snapshot = BalanceSnapshot {
            account_version: balances.version + 1,
            previous_balance: balances.current,
            current_balance: balances.current + change,
            debit_balance_bf: balances.debit,
            credit_balance_bf: balances.credit,
        };

        balances.last = balances.current;
        balances.current = snapshot.current_balance;
        balances.debit += debit;
        balances.credit += credit;
        balances.version = snapshot.account_version;

        snapshot
    }

    /// Captures the balances for an audit snapshot.
    #[must_use]
    pub fn balance_snapshot(&self) -> AccountBalanceSnapshot {
        AccountBalanceSnapshot {
            account_id: self.id,
            current_balance: self.balances.current,
            debit_balance: self.balances.debit,
            credit_balance: self.balances.credit,
            version: self.balances.version,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::account;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_on_debit_normal_increases() {
        let mut vault = account(AccountKind::Vault, BranchId::new()).with_opening_balance(dec!(500));

        let snapshot = vault.apply(EntryType::Debit, dec!(200));

        assert_eq!(snapshot.previous_balance, dec!(500));
        assert_eq!(snapshot.current_balance, dec!(700));
        assert_eq!(snapshot.debit_balance_bf, dec!(0));
        assert_eq!(snapshot.account_version, 1);
        assert_eq!(vault.current_balance(), dec!(700));
        assert_eq!(vault.balances().last, dec!(500));
        assert_eq!(vault.balances().debit, dec!(200));
    }

    #[test]
    fn test_debit_on_credit_normal_decreases() {
        let mut customer = account(AccountKind::Customer, BranchId::new());

        customer.apply(EntryType::Credit, dec!(1000));
        let snapshot = customer.apply(EntryType::Debit, dec!(250));

        assert_eq!(snapshot.previous_balance, dec!(1000));
        assert_eq!(snapshot.current_balance, dec!(750));
        assert_eq!(snapshot.credit_balance_bf, dec!(1000));
        assert_eq!(snapshot.account_version, 2);
    }

    #[test]
    fn test_opposite_legs_restore_balance() {
        let mut teller = account(AccountKind::Teller, BranchId::new()).with_opening_balance(dec!(42.10));

        teller.apply(EntryType::Credit, dec!(10.05));
        teller.apply(EntryType::Debit, dec!(10.05));

        assert_eq!(teller.current_balance(), dec!(42.10));
        assert_eq!(teller.version(), 2);
    }

    #[test]
    fn test_closed_or_deleted_not_postable() {
        let mut vault = account(AccountKind::Vault, BranchId::new());
        assert!(vault.ensure_postable().is_ok());

        vault.status = AccountStatus::Closed;
        assert!(matches!(vault.ensure_postable(), Err(LedgerError::AccountClosed(_))));

        vault.status = AccountStatus::Open;
        vault.is_deleted = true;
        assert!(matches!(vault.ensure_postable(), Err(LedgerError::AccountClosed(_))));
    }

    #[test]
    fn test_with_balances_rehydrates() {
        let balances = AccountBalances {
            current: dec!(10),
            debit: dec!(30),
            credit: dec!(20),
            last: dec!(5),
            beginning: dec!(0),
            beginning_debit: dec!(0),
            beginning_credit: dec!(0),
            version: 7,
        };
        let vault = account(AccountKind::Vault, BranchId::new()).with_balances(balances);
        assert_eq!(vault.balances(), &balances);
        assert_eq!(vault.balance_snapshot().version, 7);
    }
}
