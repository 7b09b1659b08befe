use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::extract::DEFAULT_TITLE;
use crate::identity::IdentityDirectory;

/// How the "not yet processed" condition is expressed in the record query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnprocessedFilter {
    /// processed checkbox equals false
    EqualsFalse,
    /// processed checkbox equals false OR is empty
    #[default]
    FalseOrEmpty,
}

/// Property names of the Notion snippet database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionSchema {
    pub date_property: String,
    pub email_property: String,
    /// People property consulted when the email property is empty.
    pub people_property: Option<String>,
    pub processed_property: String,
    /// Date property stamped when a record is marked processed.
    pub processed_at_property: Option<String>,
    pub unprocessed_filter: UnprocessedFilter,
    /// Title echoed at the top of snippet pages, see [`crate::extract`].
    pub title: String,
}

impl Default for NotionSchema {
    fn default() -> Self {
        Self {
            date_property: "Date".into(),
            email_property: "Email".into(),
            people_property: Some("Author".into()),
            processed_property: "Posted".into(),
            processed_at_property: None,
            unprocessed_filter: UnprocessedFilter::default(),
            title: DEFAULT_TITLE.into(),
        }
    }
}

/// Where and how the export run writes snippet files.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub snippets_dir: PathBuf,
    pub export_map: PathBuf,
    /// File extension without the dot.
    pub extension: String,
    pub identities: IdentityDirectory,
    pub title: String,
}

impl ExportConfig {
    pub fn trace_loaded(&self) {
        info!(
            snippets_dir = %self.snippets_dir.display(),
            export_map = %self.export_map.display(),
            identities = self.identities.len(),
            "Loaded export config"
        );
        debug!(?self, "Export config loaded (full debug)");
    }
}

/// Inputs of the upload run, minus the endpoint client itself.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub snippets_dir: PathBuf,
    pub state_file: PathBuf,
    pub export_map: PathBuf,
    pub identities: IdentityDirectory,
    /// Accepted file extensions, compared case-insensitively.
    pub allowed_extensions: Vec<String>,
    pub team_name: String,
    pub api_id: Option<String>,
    /// Extra top-level fields merged into every payload.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Upload every file regardless of recorded fingerprints.
    pub force: bool,
}

impl UploadConfig {
    pub fn trace_loaded(&self) {
        info!(
            snippets_dir = %self.snippets_dir.display(),
            state_file = %self.state_file.display(),
            team_name = %self.team_name,
            force = self.force,
            "Loaded upload config"
        );
        debug!(?self, "Upload config loaded (full debug)");
    }
}

pub fn default_extensions() -> Vec<String> {
    vec!["md".into(), "txt".into(), "markdown".into()]
}
