//! High-level pipelines: Notion → local snippet files, and local files → webhook.
//!
//! - [`run_export`] queries one day's unprocessed records, extracts and groups
//!   their bodies, writes one file per (identity, date) and persists the
//!   export map.
//! - [`run_upload`] fingerprints the snippet tree, uploads what changed,
//!   optionally flags the source records as processed, and persists the
//!   upload state.
//!
//! Both run strictly sequentially. Per-record and per-file failures are logged
//! and reported; only query and persistence failures abort.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::change::detect_changes;
use crate::config::{ExportConfig, UploadConfig};
use crate::contract::{RecordSource, SnippetUploader, StatusMarker};
use crate::dispatch::{dispatch_uploads, StatusHook, UploadReport};
use crate::error::PipelineError;
use crate::export::write_groups;
use crate::extract::extract_page_text;
use crate::group::{group_snippets, GroupKey};
use crate::query::fetch_unprocessed;
use crate::store::{ExportMap, UploadState};

pub use crate::dispatch::UploadOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The record has no identity or no date.
    MissingKey,
    /// Fetching the record's content failed.
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub record_id: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct ExportReport {
    pub date: NaiveDate,
    pub records: usize,
    pub skipped: Vec<SkippedRecord>,
    pub written: Vec<std::path::PathBuf>,
    pub existing: Vec<std::path::PathBuf>,
    pub unresolved: Vec<String>,
    pub empty: Vec<String>,
    pub map: ExportMap,
}

/// Exports every unprocessed record dated `date`.
pub async fn run_export<S>(
    source: &S,
    config: &ExportConfig,
    date: NaiveDate,
) -> Result<ExportReport, PipelineError>
where
    S: RecordSource + ?Sized,
{
    info!(%date, "[EXPORT] Starting export");
    let records = fetch_unprocessed(source, date)
        .await
        .map_err(PipelineError::Query)?;
    if records.is_empty() {
        info!(%date, "[EXPORT] No pages for date");
    }

    let total = records.len();
    let mut skipped = Vec::new();
    let mut pairs = Vec::with_capacity(total);

    for record in records {
        let Some(key) = GroupKey::for_record(&record) else {
            warn!(record_id = %record.id, "Skip (missing date or email)");
            skipped.push(SkippedRecord {
                record_id: record.id,
                reason: SkipReason::MissingKey,
            });
            continue;
        };

        match extract_page_text(source, &record.id, &config.title, key.date, &key.identity).await {
            Ok(body) => pairs.push((record, body)),
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Skip (failed to read page content)");
                skipped.push(SkippedRecord {
                    record_id: record.id,
                    reason: SkipReason::FetchFailed(e.to_string()),
                });
            }
        }
    }

    let groups = group_snippets(pairs);
    let summary = write_groups(config, &groups)?;

    info!(
        %date,
        records = total,
        groups = groups.len(),
        written = summary.written.len(),
        existing = summary.existing.len(),
        skipped = skipped.len(),
        "[EXPORT] Finished"
    );

    Ok(ExportReport {
        date,
        records: total,
        skipped,
        written: summary.written,
        existing: summary.existing,
        unresolved: summary.unresolved,
        empty: summary.empty,
        map: summary.map,
    })
}

/// Uploads every changed snippet file.
///
/// When `marker` is given, the export map is loaded and the records behind
/// each successfully uploaded file are flagged as processed.
pub async fn run_upload<U>(
    uploader: &U,
    marker: Option<&dyn StatusMarker>,
    config: &UploadConfig,
) -> Result<UploadReport, PipelineError>
where
    U: SnippetUploader + ?Sized,
{
    info!(force = config.force, "[UPLOAD] Starting upload");
    let mut state = UploadState::load(&config.state_file);
    let candidates = detect_changes(
        &config.snippets_dir,
        &config.identities,
        &config.allowed_extensions,
        &state,
        config.force,
    )?;
    info!(candidates = candidates.len(), "[UPLOAD] Change detection done");

    let export_map = match marker {
        Some(_) => ExportMap::load(&config.export_map)?,
        None => ExportMap::default(),
    };
    let hook = marker.map(|marker| StatusHook {
        marker,
        export_map: &export_map,
    });

    let report = dispatch_uploads(uploader, hook, config, &candidates, &mut state).await?;
    info!(
        candidates = report.candidates,
        uploaded = report.uploaded,
        failed = report.failures.len(),
        marked = report.marked,
        "[UPLOAD] Finished"
    );
    Ok(report)
}
