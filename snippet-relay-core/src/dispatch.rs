//! Uploads changed snippet files one by one and keeps the tally.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use tracing::{debug, error, info};

use crate::change::UploadCandidate;
use crate::config::UploadConfig;
use crate::contract::{SnippetPayload, SnippetUploader, StatusMarker};
use crate::error::StoreError;
use crate::status::mark_processed;
use crate::store::{ExportMap, UploadState};

/// How an upload run ended, independent of partial failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// At least one file was uploaded.
    Completed,
    /// No file needed uploading.
    NoCandidates,
    /// Files needed uploading but none succeeded.
    AllFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUpload {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub candidates: usize,
    pub uploaded: usize,
    pub failures: Vec<FailedUpload>,
    /// Source records flagged as processed after their upload.
    pub marked: usize,
    pub outcome: UploadOutcome,
}

/// Optional post-upload step that flags source records as processed.
pub struct StatusHook<'a> {
    pub marker: &'a dyn StatusMarker,
    pub export_map: &'a ExportMap,
}

fn date_in_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("static regex"))
}

/// Date a snippet file belongs to.
///
/// A `YYYY-MM-DD` in the file name wins, then the file's modification time,
/// then today (all in UTC).
pub fn snippet_date(path: &Path) -> NaiveDate {
    let from_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|name| date_in_name().captures(name))
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok());
    if let Some(date) = from_name {
        return date;
    }

    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| DateTime::<Utc>::from(t).date_naive())
        .unwrap_or_else(|_| Utc::now().date_naive())
}

pub fn build_payload(config: &UploadConfig, candidate: &UploadCandidate, date: NaiveDate) -> SnippetPayload {
    SnippetPayload {
        api_id: config.api_id.clone(),
        user_email: candidate.identity.clone(),
        snippet_date: date,
        content: candidate.content.clone(),
        team_name: config.team_name.clone(),
        metadata: config.metadata.clone(),
    }
}

/// Uploads each candidate with a single request and persists the upload state
/// once at the end.
///
/// A failing file is logged and counted; the batch always continues. After a
/// successful upload the state entry for that file is refreshed and, when a
/// [`StatusHook`] is given, its source records are marked processed.
pub async fn dispatch_uploads<U>(
    uploader: &U,
    status: Option<StatusHook<'_>>,
    config: &UploadConfig,
    candidates: &[UploadCandidate],
    state: &mut UploadState,
) -> Result<UploadReport, StoreError>
where
    U: SnippetUploader + ?Sized,
{
    let mut uploaded = 0usize;
    let mut marked = 0usize;
    let mut failures = Vec::new();

    for candidate in candidates {
        let date = snippet_date(&candidate.path);
        let payload = build_payload(config, candidate, date);
        info!(
            file = %format!("{}/{}", candidate.folder, candidate.file_name()),
            identity = %candidate.identity,
            %date,
            "Uploading snippet"
        );

        match uploader.upload(&payload).await {
            Ok(response) => {
                uploaded += 1;
                state.record(candidate.state_key(), candidate.fingerprint.clone(), Utc::now());
                info!(path = %candidate.path.display(), %response, "Uploaded");

                if let Some(hook) = &status {
                    let summary =
                        mark_processed(hook.marker, hook.export_map, &candidate.identity, date)
                            .await;
                    marked += summary.marked.len();
                }
            }
            Err(e) => {
                error!(path = %candidate.path.display(), error = %e, "Upload failed");
                failures.push(FailedUpload {
                    path: candidate.path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    state.save(&config.state_file)?;

    let outcome = if candidates.is_empty() {
        UploadOutcome::NoCandidates
    } else if uploaded == 0 {
        UploadOutcome::AllFailed
    } else {
        UploadOutcome::Completed
    };
    debug!(?outcome, uploaded, failed = failures.len(), "Dispatch finished");

    Ok(UploadReport {
        candidates: candidates.len(),
        uploaded,
        failures,
        marked,
        outcome,
    })
}
