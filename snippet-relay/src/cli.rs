//! This module implements the CLI interface for snippet-relay: command parsing,
//! config and secret loading, client construction and exit-code mapping.
//!
//! All pipeline logic lives in the [`snippet-relay-core`] crate; this module
//! only wires configured clients into it and reports the outcome.
//!
//! ## Commands
//! - `export`: Notion → `snippets/<folder>/<date>.txt` plus the export map
//! - `upload`: changed snippet files → ingestion webhook
//! - `sync`: `export` followed by `upload`
//!
//! ## Exit codes
//! See [`ExitStatus`] and [`exit_code_for`].
//!
//! [`snippet-relay-core`]: ../../snippet-relay-core/

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use snippet_relay_core::contract::StatusMarker;
use snippet_relay_core::error::ConfigError;
use snippet_relay_core::notion::NotionClient;
use snippet_relay_core::synchronise::{run_export, run_upload, UploadOutcome};
use std::path::PathBuf;

use crate::load_config::{
    env_flag, load_config, notion_secrets, target_date, webhook_settings, CliConfig, NotionSecrets,
    FORCE_FULL,
};
use crate::upload::WebhookClient;

/// Exit code for missing or invalid configuration.
pub const EXIT_CONFIG: i32 = 1;
/// Exit code when no file was eligible for upload.
pub const EXIT_NO_CANDIDATES: i32 = 2;
/// Exit code when files were eligible but none uploaded.
pub const EXIT_ALL_FAILED: i32 = 3;
/// Exit code for fatal runtime failures (query, persistence).
pub const EXIT_FATAL: i32 = 4;

/// CLI for snippet-relay: export daily snippets from Notion and relay them to the ingestion webhook.
#[derive(Parser)]
#[clap(
    name = "snippet-relay",
    version,
    about = "Export daily snippets from Notion to local files and upload changed files to an ingestion webhook"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long, global = true, default_value = "snippet-relay.yaml")]
    pub config: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write one file per (identity, date) for unprocessed Notion records of a day
    Export {
        /// Day to export (YYYY-MM-DD); defaults to TARGET_DATE
        #[clap(long)]
        date: Option<NaiveDate>,
    },
    /// Upload snippet files whose content changed since their last upload
    Upload {
        /// Upload every file, ignoring recorded fingerprints (also FORCE_FULL=1)
        #[clap(long)]
        force: bool,
        /// Flag the source Notion records as processed after upload
        #[clap(long)]
        mark_processed: bool,
    },
    /// Export a day, then upload changed files
    Sync {
        #[clap(long)]
        date: Option<NaiveDate>,
        #[clap(long)]
        force: bool,
        #[clap(long)]
        mark_processed: bool,
    },
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    NoCandidates,
    AllFailed,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::NoCandidates => EXIT_NO_CANDIDATES,
            ExitStatus::AllFailed => EXIT_ALL_FAILED,
        }
    }
}

/// Exit code for a run that returned an error.
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ConfigError>().is_some() {
        EXIT_CONFIG
    } else {
        EXIT_FATAL
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<ExitStatus> {
    tracing::info!("trace_initialised");
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Export { date } => {
            let date = target_date(date)?;
            let notion = notion_client(&config, notion_secrets()?);
            export(&config, &notion, date).await?;
            Ok(ExitStatus::Success)
        }
        Commands::Upload {
            force,
            mark_processed,
        } => upload(&config, force, mark_processed, None).await,
        Commands::Sync {
            date,
            force,
            mark_processed,
        } => {
            let date = target_date(date)?;
            let notion = notion_client(&config, notion_secrets()?);
            webhook_settings()?;
            export(&config, &notion, date).await?;
            upload(&config, force, mark_processed, Some(&notion)).await
        }
    }
}

fn notion_client(config: &CliConfig, secrets: NotionSecrets) -> NotionClient {
    let client = NotionClient::new(secrets.token, secrets.database_id, config.notion.clone());
    match secrets.base_url {
        Some(url) => client.with_base_url(url),
        None => client,
    }
}

async fn export(config: &CliConfig, notion: &NotionClient, date: NaiveDate) -> Result<()> {
    let export_config = config.export_config();
    export_config.trace_loaded();
    tracing::info!(command = "export", %date, "Starting export");

    let report = match run_export(notion, &export_config, date).await {
        Ok(report) => report,
        Err(e) => {
            println!("Done. Records=0, Written=0, Existing=0, Skipped=0.");
            return Err(e.into());
        }
    };
    println!(
        "Done. Records={}, Written={}, Existing={}, Skipped={}.",
        report.records,
        report.written.len(),
        report.existing.len(),
        report.skipped.len()
    );
    Ok(())
}

/// Runs the upload pipeline. `notion` is reused for marking when the caller
/// already built a client; otherwise one is built from the environment if
/// marking is enabled and credentials exist.
async fn upload(
    config: &CliConfig,
    force: bool,
    mark_processed: bool,
    notion: Option<&NotionClient>,
) -> Result<ExitStatus> {
    let webhook = webhook_settings()?;
    let force = force || env_flag(FORCE_FULL);
    let upload_config = config.upload_config(webhook.api_id.clone(), force);
    upload_config.trace_loaded();

    let mark = mark_processed || config.upload.mark_processed;
    let owned_marker = match (mark, notion) {
        (true, None) => match notion_secrets() {
            Ok(secrets) => Some(notion_client(config, secrets)),
            Err(e) => {
                tracing::warn!(error = %e, "Marking processed requested but Notion is not configured; skipping");
                None
            }
        },
        _ => None,
    };
    let marker: Option<&dyn StatusMarker> = if mark {
        notion
            .or(owned_marker.as_ref())
            .map(|client| client as &dyn StatusMarker)
    } else {
        None
    };

    let uploader = WebhookClient::from_settings(&webhook);
    tracing::info!(command = "upload", force, mark, "Starting upload");
    let report = match run_upload(&uploader, marker, &upload_config).await {
        Ok(report) => report,
        Err(e) => {
            println!("Done. Candidates=0, Uploaded=0.");
            return Err(e.into());
        }
    };

    println!(
        "Done. Candidates={}, Uploaded={}.",
        report.candidates, report.uploaded
    );
    for failure in &report.failures {
        eprintln!("Failed {}: {}", failure.path.display(), failure.error);
    }

    Ok(match report.outcome {
        UploadOutcome::Completed => ExitStatus::Success,
        UploadOutcome::NoCandidates => {
            eprintln!("No candidate files");
            ExitStatus::NoCandidates
        }
        UploadOutcome::AllFailed => {
            eprintln!("0 uploads (check api_id / payload)");
            ExitStatus::AllFailed
        }
    })
}
