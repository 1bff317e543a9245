//! One-shot update of a single token's performance metadata.
//!
//! Usage: `update_token <TOKEN_ID> [--dry-run]`
//!
//! Prints the token's metadata document on success. `--dry-run` aggregates
//! and prints without sending the update transaction.

use std::process::ExitCode;

use alloy_primitives::U256;
use anyhow::{Context, Result};
use tracing::{error, info};

use nft_metrics_updater::config::ServiceConfig;
use nft_metrics_updater::{service, telemetry, MetadataRecord};

fn print_metadata(record: &MetadataRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(&record.to_token_metadata())?;
    println!("{json}");
    Ok(())
}

/// Token ID and dry-run flag, or `None` when no token ID was given.
fn parse_args(args: &[String]) -> Result<Option<(U256, bool)>> {
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let Some(raw) = args.iter().find(|a| !a.starts_with("--")) else {
        return Ok(None);
    };
    let token_id: U256 = raw
        .parse()
        .with_context(|| format!("invalid token ID: {raw}"))?;
    Ok(Some((token_id, dry_run)))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((token_id, dry_run)) = parse_args(&args)? else {
        eprintln!("Please provide a token ID");
        eprintln!("usage: update_token <TOKEN_ID> [--dry-run]");
        return Ok(ExitCode::from(2));
    };

    dotenv::dotenv().ok();
    let cfg = ServiceConfig::from_env()?;
    let _log_guard = telemetry::init_tracing(cfg.log_dir.as_deref());

    let updater = service::build_updater(&cfg)?;

    if dry_run {
        info!("📝 DRY-RUN: token {} is aggregated but not submitted", token_id);
        return match updater.preview_token(token_id).await {
            Ok(record) => {
                print_metadata(&record)?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                error!("Error aggregating metadata for token {}: {}", token_id, e);
                Ok(ExitCode::FAILURE)
            }
        };
    }

    match updater.update_token(token_id).await {
        Ok(update) => {
            info!("Successfully updated metadata for token {} ({:?})", token_id, update.tx);
            print_metadata(&update.record)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Error updating metadata for token {}: {}", token_id, e);
            Ok(ExitCode::FAILURE)
        }
    }
}
