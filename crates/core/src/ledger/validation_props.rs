//! Property-based tests for the double-entry rule.
//!
//! Property 2: Double-Entry Invariant

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::entry::AccountingEntry;
use super::entry::fixtures::entry;
use super::error::LedgerError;
use super::types::EntryType;
use super::validation::{evaluate_double_entry_rule, validate_batch};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn entry_type_strategy() -> impl Strategy<Value = EntryType> {
    prop_oneof![Just(EntryType::Debit), Just(EntryType::Credit)]
}

fn totals(entries: &[AccountingEntry]) -> (Decimal, Decimal) {
    entries.iter().fold((Decimal::ZERO, Decimal::ZERO), |(dr, cr), e| {
        (dr + e.debit_amount, cr + e.credit_amount)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 2.1: Mirrored legs always balance.
    ///
    /// *For any* list of amounts, a batch with one debit and one credit per
    /// amount is accepted.
    #[test]
    fn prop_mirrored_batch_accepted(
        amounts in prop::collection::vec(positive_amount(), 1..10),
    ) {
        let entries: Vec<_> = amounts
            .iter()
            .flat_map(|amount| {
                [
                    entry("R-1", EntryType::Debit, *amount),
                    entry("R-1", EntryType::Credit, *amount),
                ]
            })
            .collect();

        prop_assert!(evaluate_double_entry_rule(&entries));
    }

    /// Property 2.2: Accepted batches have equal totals.
    ///
    /// *For any* random batch the validator accepts, debit total equals
    /// credit total.
    #[test]
    fn prop_accepted_batches_have_equal_totals(
        legs in prop::collection::vec((entry_type_strategy(), 1i64..20i64), 0..8),
    ) {
        // Small integer amounts so that balanced batches occur often.
        let entries: Vec<_> = legs
            .iter()
            .map(|(entry_type, amount)| entry("R-1", *entry_type, Decimal::from(*amount)))
            .collect();

        if evaluate_double_entry_rule(&entries) {
            let (debit, credit) = totals(&entries);
            prop_assert_eq!(debit, credit);
            prop_assert!(entries.len() >= 2);
        }
    }

    /// Property 2.3: Single-legged batches are rejected.
    #[test]
    fn prop_single_leg_rejected(
        entry_type in entry_type_strategy(),
        amount in positive_amount(),
    ) {
        let entries = vec![entry("R-1", entry_type, amount)];
        prop_assert!(!evaluate_double_entry_rule(&entries));
    }

    /// Property 2.4: Any discrepancy is reported with the exact totals.
    ///
    /// *For any* amount and non-zero delta, a debit of `amount` against a
    /// credit of `amount + delta` is rejected.
    #[test]
    fn prop_discrepancy_reported(
        amount in positive_amount(),
        delta in 1i64..1_000i64,
    ) {
        let credit = amount + Decimal::new(delta, 2);
        let entries = vec![
            entry("R-9", EntryType::Debit, amount),
            entry("R-9", EntryType::Credit, credit),
        ];

        match validate_batch(&entries) {
            Err(LedgerError::UnbalancedBatch { reference, debit, credit: reported }) => {
                prop_assert_eq!(reference, "R-9");
                prop_assert_eq!(debit, amount);
                prop_assert_eq!(reported, credit);
            }
            other => prop_assert!(false, "expected UnbalancedBatch, got {:?}", other),
        }
    }
}
