//! Ledger audit for the economy store.
//!
//! `skin-economy-audit` reconciles every account and freezes the ones whose
//! balance disagrees with their ledger. `skin-economy-audit release <id>`
//! unfreezes an account once it reconciles again.

use skin_economy::{
    config::{database, economy},
    core::{account, service::parse_id},
    errors::Result,
};
use dotenvy::dotenv;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();

    // 3. Settings and store
    let settings = economy::load_default_settings()
        .inspect_err(|e| error!("Failed to load economy settings: {}", e))?;
    let db = database::create_connection(&database::get_database_url(), &settings)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [command, id] = args.as_slice() {
        if command == "release" {
            let report = account::release_account(&db, parse_id(id)?)
                .await
                .inspect_err(|e| error!("Account {} stays frozen: {}", id, e))?;
            info!(
                "Account {} released with balance {} over {} entries",
                report.account_id, report.balance, report.entry_count
            );
            return Ok(ExitCode::SUCCESS);
        }
    }

    // 4. Sweep
    let summary = account::reconcile_all(&db).await?;
    for id in &summary.newly_frozen {
        error!("Account {} frozen: balance does not match ledger", id);
    }
    for id in &summary.already_frozen {
        info!("Account {} remains frozen from an earlier audit", id);
    }

    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
