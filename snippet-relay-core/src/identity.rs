use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Folder name ↔ identity table, supplied by configuration.
///
/// Folders are the per-person directories under the snippets root. Lookups
/// by identity ignore ASCII case, since Notion may return mixed-case emails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityDirectory {
    folders: BTreeMap<String, String>,
}

impl IdentityDirectory {
    pub fn new<I, F, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (F, E)>,
        F: Into<String>,
        E: Into<String>,
    {
        Self {
            folders: entries
                .into_iter()
                .map(|(f, e)| (f.into(), e.into()))
                .collect(),
        }
    }

    pub fn identity_for_folder(&self, folder: &str) -> Option<&str> {
        self.folders.get(folder).map(String::as_str)
    }

    pub fn folder_for_identity(&self, identity: &str) -> Option<&str> {
        self.folders
            .iter()
            .find(|(_, email)| email.eq_ignore_ascii_case(identity))
            .map(|(folder, _)| folder.as_str())
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}
