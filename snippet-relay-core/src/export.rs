//! Writes grouped snippets to `<snippets_dir>/<folder>/<date>.<ext>` and
//! records which source records produced each file.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::ExportConfig;
use crate::error::StoreError;
use crate::group::{GroupKey, SnippetGroup};
use crate::store::ExportMap;

/// Delimiter placed between bodies of records sharing one key.
pub const BODY_SEPARATOR: &str = "\n\n---\n\n";

/// What [`write_groups`] did with each key.
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub written: Vec<PathBuf>,
    /// Files that already existed and were left untouched.
    pub existing: Vec<PathBuf>,
    /// Keys whose identity has no configured folder.
    pub unresolved: Vec<String>,
    /// Keys whose merged content was empty.
    pub empty: Vec<String>,
    pub map: ExportMap,
}

/// Joins the non-empty bodies of a group into one file body.
pub fn merge_bodies(group: &SnippetGroup) -> String {
    group
        .bodies
        .iter()
        .filter(|b| !b.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(BODY_SEPARATOR)
        .trim()
        .to_string()
}

/// Writes one file per group and persists the export map.
///
/// An existing target file is never overwritten; its key is still recorded in
/// the map. Keys with no folder or with empty merged content produce no file
/// and no map entry. The map file is written even when `groups` is empty.
pub fn write_groups(
    config: &ExportConfig,
    groups: &BTreeMap<GroupKey, SnippetGroup>,
) -> Result<WriteSummary, StoreError> {
    let mut summary = WriteSummary::default();

    for (key, group) in groups {
        let Some(folder) = config.identities.folder_for_identity(&key.identity) else {
            warn!(identity = %key.identity, key = %key, "Unknown email → folder");
            summary.unresolved.push(key.to_string());
            continue;
        };

        let dir = config.snippets_dir.join(folder);
        let file = dir.join(format!("{}.{}", key.date.format("%Y-%m-%d"), config.extension));

        if file.exists() {
            info!(path = %file.display(), "Exists, skip");
            summary.map.insert(key, group.record_ids.clone());
            summary.existing.push(file);
            continue;
        }

        let merged = merge_bodies(group);
        if merged.is_empty() {
            warn!(key = %key, records = group.record_ids.len(), "Empty content, no file written");
            summary.empty.push(key.to_string());
            continue;
        }

        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        fs::write(&file, merged.as_bytes()).map_err(|e| StoreError::io(&file, e))?;
        info!(path = %file.display(), bytes = merged.len(), "Wrote");

        summary.map.insert(key, group.record_ids.clone());
        summary.written.push(file);
    }

    summary.map.save(&config.export_map)?;
    Ok(summary)
}
