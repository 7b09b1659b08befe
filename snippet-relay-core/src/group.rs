//! Groups extracted bodies by (identity, date).

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use tracing::warn;

use crate::contract::SourceRecord;

/// Composite key under which records merge into one output file.
///
/// The identity is stored trimmed and ASCII-lowercased, so every key built for
/// the same person matches regardless of how Notion cased the email.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub identity: String,
    pub date: NaiveDate,
}

impl GroupKey {
    pub fn new(identity: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            identity: identity.into().trim().to_ascii_lowercase(),
            date,
        }
    }

    /// Key of a record, or `None` when identity or date is missing.
    pub fn for_record(record: &SourceRecord) -> Option<Self> {
        let identity = record.identity.as_deref()?.trim();
        if identity.is_empty() {
            return None;
        }
        Some(Self::new(identity, record.date?))
    }
}

/// Serialized as `identity|YYYY-MM-DD`, the format used in the export map.
impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.identity, self.date.format("%Y-%m-%d"))
    }
}

/// Everything collected for one key.
///
/// `record_ids` lists every contributing record; `bodies` only the non-empty
/// ones, so the two may differ in length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetGroup {
    pub bodies: Vec<String>,
    pub record_ids: Vec<String>,
}

/// Groups `(record, body)` pairs by [`GroupKey`].
///
/// Records without an identity or date are skipped with a warning.
pub fn group_snippets<I>(pairs: I) -> BTreeMap<GroupKey, SnippetGroup>
where
    I: IntoIterator<Item = (SourceRecord, String)>,
{
    let mut groups: BTreeMap<GroupKey, SnippetGroup> = BTreeMap::new();

    for (record, body) in pairs {
        let Some(key) = GroupKey::for_record(&record) else {
            warn!(record_id = %record.id, "Skip (missing date or email)");
            continue;
        };
        let group = groups.entry(key).or_default();
        if !body.is_empty() {
            group.bodies.push(body);
        }
        group.record_ids.push(record.id);
    }

    groups
}
