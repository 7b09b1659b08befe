//! Collects every unprocessed record for one day.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::contract::{RecordSource, SourceRecord};
use crate::error::SourceError;

/// Pages through the record query for `date` and returns all matches in the
/// order the store produced them.
///
/// Any page failing fails the whole query; a partial list is never returned.
pub async fn fetch_unprocessed<S>(source: &S, date: NaiveDate) -> Result<Vec<SourceRecord>, SourceError>
where
    S: RecordSource + ?Sized,
{
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = source.query_records(date, cursor.take()).await?;
        debug!(%date, batch = page.results.len(), "Fetched record page");
        records.extend(page.results);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(%date, count = records.len(), "Queried unprocessed records");
    Ok(records)
}
