//! Double-entry rule for posted batches.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::entry::AccountingEntry;
use super::error::LedgerError;

#[derive(Default)]
struct GroupTotals {
    debit: Decimal,
    credit: Decimal,
    legs: usize,
}

/// Validates a batch of entries before commit.
///
/// Entries are grouped by reference id; every group must have at least two
/// legs and equal debit and credit totals. Comparison is exact.
///
/// # Errors
///
/// - `InsufficientEntries` if the batch or any reference group has fewer than 2 legs
/// - `InvalidAmount` if a leg has a non-positive amount
/// - `InconsistentEntry` if a leg's debit/credit columns disagree with its type
/// - `UnbalancedBatch` if a reference group's debits and credits differ
pub fn validate_batch(entries: &[AccountingEntry]) -> Result<(), LedgerError> {
    if entries.len() < 2 {
        return Err(LedgerError::InsufficientEntries);
    }

    let mut groups: BTreeMap<&str, GroupTotals> = BTreeMap::new();
    for entry in entries {
        if entry.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(entry.amount));
        }
        if !entry.is_consistent() {
            return Err(LedgerError::InconsistentEntry(entry.id));
        }

        let totals = groups.entry(entry.reference_id.as_str()).or_default();
        totals.debit += entry.debit_amount;
        totals.credit += entry.credit_amount;
        totals.legs += 1;
    }

    for (reference, totals) in groups {
        if totals.legs < 2 {
            return Err(LedgerError::InsufficientEntries);
        }
        if totals.debit != totals.credit {
            return Err(LedgerError::UnbalancedBatch {
                reference: reference.to_string(),
                debit: totals.debit,
                credit: totals.credit,
            });
        }
    }

    Ok(())
}

/// Returns true if the batch satisfies the double-entry rule.
///
/// Callers treat `false` as fatal and discard the whole batch.
#[must_use]
pub fn evaluate_double_entry_rule(entries: &[AccountingEntry]) -> bool {
    validate_batch(entries).is_ok()
}
