//! veridraft maintenance CLI.
//!
//! Operator tooling over the locally configured draft cache: inspect a
//! cached draft, run the expiry sweep, or clear records. Logging goes to
//! stderr as JSON so stdout stays scriptable.

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use veridraft_core::{CacheConfig, CacheFacade, CachedVerificationRecord, sweeper};

#[derive(Parser)]
#[command(name = "veridraft", version, about = "Inspect and maintain the local verification draft cache")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the cached draft for an identity, image payloads elided.
    Show {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Remove drafts past their TTL and over the record cap.
    Sweep,
    /// Clear one identity's draft, or every draft with --all.
    Clear {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long, conflicts_with_all = ["email", "user_id"])]
        all: bool,
    },
}

/// Printable view of a cached draft; image payloads are reported as sizes.
#[derive(Debug, Serialize)]
struct DraftSummary {
    id: String,
    document_front_bytes: Option<usize>,
    document_back_bytes: Option<usize>,
    selfie_bytes: Option<usize>,
    timestamp: i64,
    email: Option<String>,
    user_id: Option<String>,
}

fn summarize(record: CachedVerificationRecord) -> DraftSummary {
    DraftSummary {
        id: record.id,
        document_front_bytes: record.document_image_front.map(|p| p.len()),
        document_back_bytes: record.document_image_back.map(|p| p.len()),
        selfie_bytes: record.selfie_image.map(|p| p.len()),
        timestamp: record.timestamp,
        email: record.email,
        user_id: record.user_id,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = CacheConfig::load()?;
    tracing::info!(db_path = %config.db_path.display(), "opening draft cache");
    let facade = CacheFacade::init(config).await;

    match cli.command {
        Command::Show { email, user_id } => match facade.load(email.as_deref(), user_id.as_deref()).await {
            Some(record) => println!("{}", serde_json::to_string_pretty(&summarize(record))?),
            None => println!("no cached draft"),
        },
        Command::Sweep => {
            let removed = sweeper::sweep(&facade).await;
            println!("removed {removed} drafts");
        }
        Command::Clear { email, user_id, all } => {
            if all {
                // raised first so a concurrently starting session skips restore
                facade.raise_clear_flag();
                facade.clear_all().await;
                println!("cleared all drafts");
            } else {
                facade.clear(email.as_deref(), user_id.as_deref()).await;
                println!("cleared draft");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_elides_payloads() {
        let mut record = CachedVerificationRecord::new("kyc_cache:a@b.com");
        record.document_image_front = Some("x".repeat(1024));
        record.email = Some("a@b.com".into());

        let summary = summarize(record);
        assert_eq!(summary.document_front_bytes, Some(1024));
        assert_eq!(summary.selfie_bytes, None);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains(&"x".repeat(32)));
    }

    #[test]
    fn test_cli_parses_clear_all() {
        let cli = Cli::try_parse_from(["veridraft", "clear", "--all"]).unwrap();
        assert!(matches!(cli.command, Command::Clear { all: true, .. }));
    }

    #[test]
    fn test_cli_rejects_all_with_identity() {
        let result = Cli::try_parse_from(["veridraft", "clear", "--all", "--email", "a@b.com"]);
        assert!(result.is_err());
    }
}
