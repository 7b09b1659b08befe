//! Flags source records as processed once their snippet was delivered.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::contract::StatusMarker;
use crate::store::ExportMap;

/// Result of marking one `identity|date` key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarkSummary {
    pub marked: Vec<String>,
    pub failed: Vec<String>,
}

/// Marks every record that contributed to `identity` on `date`.
///
/// Unknown keys are a no-op. A failing record is logged and the remaining
/// ones are still attempted.
pub async fn mark_processed<M>(
    marker: &M,
    export_map: &ExportMap,
    identity: &str,
    date: NaiveDate,
) -> MarkSummary
where
    M: StatusMarker + ?Sized,
{
    let mut summary = MarkSummary::default();
    let ids = export_map.record_ids(identity, date);
    if ids.is_empty() {
        return summary;
    }

    for id in ids {
        match marker.mark_processed(id, Utc::now()).await {
            Ok(()) => {
                info!(record_id = %id, identity, %date, "Marked processed");
                summary.marked.push(id.clone());
            }
            Err(e) => {
                warn!(record_id = %id, identity, %date, error = %e, "Failed to mark processed");
                summary.failed.push(id.clone());
            }
        }
    }

    summary
}
