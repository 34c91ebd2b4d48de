//! Database seeder for Corebank development and testing.
//!
//! Seeds a head office and one agency with their cash accounts, the
//! branch liaison accounts used for inter-branch settlement, and the
//! event-code mappings the cash handlers resolve.
//!
//! Running it twice is harmless: existing accounts are skipped and
//! mappings are upserted.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use corebank_core::ledger::{Account, AccountKind, BookingDirection, EventCode, NewAccount};
use corebank_core::store::CashMovementAccounts;
use corebank_db::SeaLedgerStore;
use corebank_shared::types::{AccountId, BankId, BranchId};
use corebank_shared::{AppConfig, telemetry};

/// Development bank id (consistent for all seeds)
const BANK_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);

struct SeedBranch {
    id: BranchId,
    code: &'static str,
    opening_vault: Decimal,
}

#[derive(Clone, Copy)]
struct BranchAccounts {
    vault: AccountId,
    transit: AccountId,
    bank: AccountId,
    customer: AccountId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    telemetry::init_tracing(&config.logging);

    let db = corebank_db::connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    let store = SeaLedgerStore::new(db);
    let currency = config.ledger.default_currency.as_str();

    let head_office = SeedBranch {
        id: BranchId::from_uuid(Uuid::from_u128(0x0100)),
        code: "001",
        opening_vault: Decimal::new(500_000_000, 0),
    };
    let agency = SeedBranch {
        id: BranchId::from_uuid(Uuid::from_u128(0x0200)),
        code: "002",
        opening_vault: Decimal::new(25_000_000, 0),
    };

    let ho = seed_branch(&store, &head_office, currency).await?;
    let branch = seed_branch(&store, &agency, currency).await?;

    info!("Seeding cash movement mappings");
    // head office vault feeds the agency vault through the liaison pair
    map(&store, "CASH_REPLENISHMENT", agency.id, ho.vault, branch.vault).await?;
    map(&store, "CASH_TRANSIT", agency.id, branch.transit, branch.vault).await?;
    for (seed, accounts) in [(&head_office, &ho), (&agency, &branch)] {
        let BranchAccounts {
            vault,
            bank,
            customer,
            ..
        } = *accounts;
        map(&store, "DEPOSIT_NOTIFICATION", seed.id, customer, bank).await?;
        map(&store, "BANK_CASH", seed.id, vault, bank).await?;
    }

    info!("Seeding complete");
    Ok(())
}

/// Seeds the cash accounts of one branch and registers its liaison account.
async fn seed_branch(
    store: &SeaLedgerStore,
    seed: &SeedBranch,
    currency: &str,
) -> anyhow::Result<BranchAccounts> {
    info!(branch_code = seed.code, "Seeding branch accounts");

    let open = |kind, category_code, opening_balance| {
        seed_account(store, seed, kind, category_code, opening_balance, currency)
    };
    let vault = open(AccountKind::Vault, "5711", seed.opening_vault).await?;
    open(AccountKind::Teller, "5712", Decimal::ZERO).await?;
    let transit = open(AccountKind::Transit, "5851", Decimal::ZERO).await?;
    let bank = open(AccountKind::Bank, "5211", Decimal::ZERO).await?;
    let customer = open(AccountKind::Customer, "3711", Decimal::ZERO).await?;
    let liaison = open(AccountKind::Liaison, "4511", Decimal::ZERO).await?;

    store
        .set_liaison_account(seed.id, liaison)
        .await
        .with_context(|| format!("Failed to register liaison account for branch {}", seed.code))?;

    Ok(BranchAccounts {
        vault,
        transit,
        bank,
        customer,
    })
}

/// Inserts an account unless one with the same deterministic id exists.
async fn seed_account(
    store: &SeaLedgerStore,
    seed: &SeedBranch,
    kind: AccountKind,
    category_code: &str,
    opening_balance: Decimal,
    currency: &str,
) -> anyhow::Result<AccountId> {
    let account_number = format!(
        "{}-{}-{}",
        seed.code,
        category_code,
        kind.as_str().to_uppercase()
    );
    let id = AccountId::from_uuid(Uuid::new_v5(&Uuid::NAMESPACE_OID, account_number.as_bytes()));

    if store.account(id).await?.is_some() {
        info!(%account_number, "Account already exists, skipping");
        return Ok(id);
    }

    let account = Account::open(NewAccount {
        name: format!("Branch {} {}", seed.code, kind.as_str()),
        account_number: account_number.clone(),
        kind,
        booking_direction: BookingDirection::for_kind(kind),
        currency: currency.to_string(),
        bank_id: BankId::from_uuid(BANK_ID),
        branch_id: seed.id,
        category_code: category_code.to_string(),
    })
    .with_id(id)
    .with_opening_balance(opening_balance);

    store
        .insert_account(&account)
        .await
        .with_context(|| format!("Failed to insert account {account_number}"))?;
    info!(%account_number, %opening_balance, "Created account");
    Ok(id)
}

async fn map(
    store: &SeaLedgerStore,
    event_code: &str,
    branch_id: BranchId,
    source_account_id: AccountId,
    destination_account_id: AccountId,
) -> anyhow::Result<()> {
    let event_code = EventCode::new(event_code)?;
    store
        .map_cash_movement(
            &event_code,
            branch_id,
            CashMovementAccounts {
                source_account_id,
                destination_account_id,
            },
        )
        .await
        .with_context(|| format!("Failed to map {event_code} for branch {branch_id}"))
}
