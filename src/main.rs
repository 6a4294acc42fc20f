//! # Postflow — Periodic Mailing Campaign Dispatcher
//!
//! Stores campaigns, messages, and recipients in SQLite; a periodic loop
//! advances campaign statuses and sends due campaigns over SMTP, recording
//! every outcome as an attempt.
//!
//! Usage:
//!   postflow run                 # Start the dispatcher loop
//!   postflow once                # One sweep, then exit
//!   postflow add-client "a@b.c" "Ada"
//!   postflow add-message "Subject" "Body"
//!   postflow add-campaign 2026-09-01T08:00:00Z 2026-10-01T08:00:00Z daily \
//!       --message 1 --client 1 --client 2
//!   postflow attempts 1          # Attempt history, newest first

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use postflow_core::config::PostflowConfig;
use postflow_core::traits::CampaignStore;
use postflow_core::types::Periodicity;
use postflow_dispatch::Dispatcher;
use postflow_smtp::SmtpMailer;
use postflow_store::SqliteStore;

#[derive(Parser)]
#[command(
    name = "postflow",
    version,
    about = "📮 Postflow — periodic mailing campaign dispatcher"
)]
struct Cli {
    /// Config file path (default: ~/.postflow/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    db: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the dispatcher loop
    Run {
        /// Seconds between sweeps (overrides config)
        #[arg(long)]
        tick: Option<u64>,
    },
    /// Run a single sweep and exit
    Once,
    /// Add a recipient client
    AddClient {
        email: String,
        name: String,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long, default_value = "")]
        owner: String,
    },
    /// Add a mail message
    AddMessage {
        subject: String,
        body: String,
        #[arg(long, default_value = "")]
        owner: String,
    },
    /// Add a campaign over an existing message and clients
    AddCampaign {
        /// Window start (RFC3339, e.g. 2026-09-01T08:00:00Z)
        start: String,
        /// Window end (RFC3339)
        end: String,
        /// daily | weekly | monthly
        periodicity: String,
        /// Message id to send
        #[arg(long)]
        message: i64,
        /// Client id to attach as recipient (repeatable)
        #[arg(long = "client")]
        clients: Vec<i64>,
        #[arg(long, default_value = "")]
        owner: String,
    },
    /// List clients
    Clients,
    /// List campaigns
    Campaigns,
    /// Attempt history for a campaign, newest first
    Attempts { id: i64 },
    /// Disable a campaign (freezes status, suppresses dispatch)
    Disable { id: i64 },
    /// Re-enable a campaign
    Enable { id: i64 },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| anyhow!("invalid timestamp '{s}': {e} (expected RFC3339)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "postflow=debug,postflow_dispatch=debug,postflow_store=debug,postflow_smtp=debug"
    } else {
        "postflow=info,postflow_dispatch=info,postflow_store=info,postflow_smtp=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => PostflowConfig::load_from(Path::new(&expand_path(path)))?,
        None => PostflowConfig::load()?,
    };

    let db_path = expand_path(cli.db.as_deref().unwrap_or(&config.store.db_path));
    let store = Arc::new(SqliteStore::open(Path::new(&db_path))?);

    match cli.command {
        Command::Run { tick } => {
            let mailer = Arc::new(SmtpMailer::new(config.smtp.clone()));
            let dispatcher = Dispatcher::new(store, mailer);
            let tick_secs = tick.unwrap_or(config.scheduler.tick_secs);
            dispatcher.run(tick_secs).await;
        }
        Command::Once => {
            let mailer = Arc::new(SmtpMailer::new(config.smtp.clone()));
            let dispatcher = Dispatcher::new(store, mailer);
            let report = dispatcher
                .run_once(Utc::now())
                .await?
                .context("sweep skipped: dispatcher busy")?;
            println!(
                "Sweep done: {} sent, {} failed, {} not due, {} errors",
                report.sent, report.failed, report.skipped, report.errors
            );
        }
        Command::AddClient {
            email,
            name,
            comment,
            owner,
        } => {
            let id = store.add_client(&email, &name, comment.as_deref(), &owner)?;
            println!("Client {id} added: {name} <{email}>");
        }
        Command::AddMessage {
            subject,
            body,
            owner,
        } => {
            let id = store.add_message(&subject, &body, &owner)?;
            println!("Message {id} added: {subject}");
        }
        Command::AddCampaign {
            start,
            end,
            periodicity,
            message,
            clients,
            owner,
        } => {
            let periodicity: Periodicity = periodicity.parse()?;
            let id = store.add_campaign(parse_ts(&start)?, parse_ts(&end)?, periodicity, message, &owner)?;
            for client in &clients {
                store.add_recipient(id, *client)?;
            }
            println!(
                "Campaign {id} added: {periodicity}, {} recipient(s)",
                clients.len()
            );
        }
        Command::Clients => {
            for client in store.clients()? {
                println!(
                    "{:>4}  {} <{}>{}",
                    client.id,
                    client.name,
                    client.email,
                    client
                        .comment
                        .as_deref()
                        .map(|c| format!("  — {c}"))
                        .unwrap_or_default()
                );
            }
        }
        Command::Campaigns => {
            for campaign in store.campaigns()? {
                println!(
                    "{:>4}  {:<9}  {:<7}  {} → {}{}",
                    campaign.id,
                    campaign.status.to_string(),
                    campaign.periodicity.to_string(),
                    campaign.start.format("%Y-%m-%d %H:%M"),
                    campaign.end.format("%Y-%m-%d %H:%M"),
                    if campaign.disabled { "  [disabled]" } else { "" }
                );
            }
        }
        Command::Attempts { id } => {
            for attempt in store.attempts(id)? {
                println!(
                    "{}  {:<7}  {}",
                    attempt.ts.format("%Y-%m-%d %H:%M:%S"),
                    attempt.outcome.to_string(),
                    attempt.response
                );
            }
        }
        Command::Disable { id } => {
            store.set_disabled(id, true)?;
            println!("Campaign {id} disabled");
        }
        Command::Enable { id } => {
            store.set_disabled(id, false)?;
            println!("Campaign {id} enabled");
        }
    }

    Ok(())
}
