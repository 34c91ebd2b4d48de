//! Property-based tests for posting and reversal balances.
//!
//! Property 1: Balance Property
//! Property 4: Reversal Round-Trip

use std::collections::BTreeMap;

use corebank_shared::types::{BankId, BranchId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::account::fixtures::account;
use super::balance::{BookingDirection, reconcile_account, statement_lines};
use super::posting::PostingEngine;
use super::reversal::{ReversalAuthorization, ReversalCommand, ReversalEngine};
use super::types::{AccountKind, ActorContext, EntryType, EventCode, MovementRequest, ReferenceId};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a signed opening balance.
fn opening_balance() -> impl Strategy<Value = Decimal> {
    (-100_000_000i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn kind_strategy() -> impl Strategy<Value = AccountKind> {
    prop_oneof![
        Just(AccountKind::Customer),
        Just(AccountKind::Teller),
        Just(AccountKind::Vault),
        Just(AccountKind::Transit),
        Just(AccountKind::Liaison),
        Just(AccountKind::Bank),
    ]
}

fn actor(branch_id: BranchId) -> ActorContext {
    ActorContext {
        user_id: UserId::new(),
        full_name: "Teller".to_string(),
        bank_id: BankId::new(),
        branch_id,
        branch_code: "002".to_string(),
        is_head_office: false,
    }
}

fn movement(actor: &ActorContext, reference: &str, amount: Decimal) -> MovementRequest {
    MovementRequest::new(
        actor,
        ReferenceId::new(reference).unwrap(),
        EventCode::new("TRANSFER").unwrap(),
        amount,
        "property",
    )
}

/// Expected balance change of one leg per booking direction.
fn expected_change(direction: BookingDirection, entry_type: EntryType, amount: Decimal) -> Decimal {
    match (direction, entry_type) {
        (BookingDirection::DebitNormal, EntryType::Debit)
        | (BookingDirection::CreditNormal, EntryType::Credit) => amount,
        (BookingDirection::DebitNormal, EntryType::Credit)
        | (BookingDirection::CreditNormal, EntryType::Debit) => -amount,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Balance Property
    // =========================================================================

    /// Property 1.1: Each account moves by the signed amount of its leg.
    ///
    /// *For any* pair of account kinds, opening balances and amount, the debit
    /// account moves by the debit effect and the credit account by the credit
    /// effect of its booking direction.
    #[test]
    fn prop_balances_move_by_signed_amount(
        debit_kind in kind_strategy(),
        credit_kind in kind_strategy(),
        debit_opening in opening_balance(),
        credit_opening in opening_balance(),
        amount in positive_amount(),
    ) {
        let branch = BranchId::new();
        let mut debit = account(debit_kind, branch).with_opening_balance(debit_opening);
        let mut credit = account(credit_kind, branch).with_opening_balance(credit_opening);

        PostingEngine::post_movement(&movement(&actor(branch), "P-1", amount), &mut debit, &mut credit, None)
            .unwrap();

        prop_assert_eq!(
            debit.current_balance() - debit_opening,
            expected_change(debit.booking_direction, EntryType::Debit, amount)
        );
        prop_assert_eq!(
            credit.current_balance() - credit_opening,
            expected_change(credit.booking_direction, EntryType::Credit, amount)
        );
    }

    /// Property 1.2: Accounts reconcile after any sequence of postings.
    ///
    /// *For any* sequence of amounts posted back and forth between two
    /// accounts, each account's balance equals its opening balance plus the
    /// signed sum of its entries, and the statement ends on that balance.
    #[test]
    fn prop_accounts_reconcile(
        opening in opening_balance(),
        postings in prop::collection::vec((positive_amount(), any::<bool>()), 1..20),
    ) {
        let branch = BranchId::new();
        let actor = actor(branch);
        let mut vault = account(AccountKind::Vault, branch).with_opening_balance(opening);
        let mut customer = account(AccountKind::Customer, branch);
        let mut entries = Vec::new();

        for (i, (amount, vault_debited)) in postings.iter().enumerate() {
            let request = movement(&actor, &format!("P-{i}"), *amount);
            let legs = if *vault_debited {
                PostingEngine::post_movement(&request, &mut vault, &mut customer, None)
            } else {
                PostingEngine::post_movement(&request, &mut customer, &mut vault, None)
            };
            entries.extend(legs.unwrap());
        }

        prop_assert!(reconcile_account(&vault, &entries).is_balanced());
        prop_assert!(reconcile_account(&customer, &entries).is_balanced());

        let statement = statement_lines(vault.id, &entries);
        prop_assert_eq!(statement.len(), postings.len());
        prop_assert_eq!(statement.last().map(|l| l.balance), Some(vault.current_balance()));
    }

    // =========================================================================
    // Property 4: Reversal Round-Trip
    // =========================================================================

    /// Property 4.1: Reversing restores both balances exactly.
    ///
    /// *For any* amount A posted from X to Y, reversing the reference returns
    /// X and Y to their pre-posting balances with no drift, and flags the
    /// originals reversed.
    #[test]
    fn prop_reversal_restores_balances(
        debit_kind in kind_strategy(),
        credit_kind in kind_strategy(),
        debit_opening in opening_balance(),
        credit_opening in opening_balance(),
        amount in positive_amount(),
    ) {
        let branch = BranchId::new();
        let actor = actor(branch);
        let mut debit = account(debit_kind, branch).with_opening_balance(debit_opening);
        let mut credit = account(credit_kind, branch).with_opening_balance(credit_opening);

        let mut originals = PostingEngine::post_movement(
            &movement(&actor, "P-1", amount),
            &mut debit,
            &mut credit,
            None,
        )
        .unwrap();

        let mut accounts = BTreeMap::from([(debit.id, debit.clone()), (credit.id, credit.clone())]);
        let reference = ReferenceId::new("P-1").unwrap();
        let command = ReversalCommand {
            reversal_reference: reference.reversal("REV-"),
            reference_id: reference,
            authorization: ReversalAuthorization {
                issued_by: actor.user_id,
                approved_by: UserId::new(),
            },
            approver_name: "Approver".to_string(),
        };

        let outcome = ReversalEngine::reverse(&command, &mut originals, &mut accounts).unwrap();

        prop_assert_eq!(accounts[&debit.id].current_balance(), debit_opening);
        prop_assert_eq!(accounts[&credit.id].current_balance(), credit_opening);
        prop_assert!(originals.iter().all(|e| e.is_reversed()));

        let all: Vec<_> = originals.iter().chain(&outcome.entries).cloned().collect();
        prop_assert!(reconcile_account(&accounts[&debit.id], &all).is_balanced());
        prop_assert!(reconcile_account(&accounts[&credit.id], &all).is_balanced());
    }
}
