//! Database migration runner for Corebank.
//!
//! Usage:
//!   migrator up      - Apply the ledger schema
//!   migrator down    - Drop the ledger schema
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! The connection string is read from `DATABASE_URL`.

use corebank_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // sea-orm-migration installs its own subscriber
    cli::run_cli(Migrator).await;
}
