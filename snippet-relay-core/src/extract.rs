//! Page body extraction: pull every content unit of a record, render, and
//! strip header lines that merely echo the snippet's own title.

use chrono::NaiveDate;
use tracing::debug;

use crate::contract::RecordSource;
use crate::error::SourceError;
use crate::render::render_unit;

/// Title used by default in `"{title} - {date} - {identity}"` echoes.
pub const DEFAULT_TITLE: &str = "Daily Snippet";

/// Fetches all content units under `record_id` and returns the rendered body.
///
/// Empty rendered lines are dropped. Header echoes for `date` and `identity`
/// are removed with [`strip_title_echo`].
pub async fn extract_page_text<S>(
    source: &S,
    record_id: &str,
    title: &str,
    date: NaiveDate,
    identity: &str,
) -> Result<String, SourceError>
where
    S: RecordSource + ?Sized,
{
    let mut lines: Vec<String> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source.list_units(record_id, cursor.take()).await?;
        pages += 1;
        lines.extend(
            page.results
                .iter()
                .map(render_unit)
                .filter(|line| !line.is_empty()),
        );
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    debug!(record_id, pages, lines = lines.len(), "Extracted page body");
    let body = lines.join("\n");
    Ok(strip_title_echo(&body, title, date, identity))
}

/// Removes leading lines that repeat the snippet title, identity or date.
///
/// A line is an echo when, ignoring case, a leading markdown `#` prefix, runs
/// of whitespace, and the dash flavour (`-`, `–`, `—`), it equals one of:
/// `"{title} - {date} - {identity}"`, `"{identity}"`, or `"{date}"`.
/// Blank lines after an echo are consumed too. The result is trimmed.
/// Applying the function twice gives the same result as applying it once.
pub fn strip_title_echo(body: &str, title: &str, date: NaiveDate, identity: &str) -> String {
    let ymd = date.format("%Y-%m-%d").to_string();
    let patterns = [
        normalize_line(&format!("{title} - {ymd} - {identity}")),
        normalize_line(identity),
        normalize_line(&ymd),
    ];

    let lines: Vec<&str> = body.lines().collect();
    let mut start = 0;
    while start < lines.len() {
        let line = lines[start];
        if line.trim().is_empty() {
            start += 1;
            continue;
        }
        let candidate = normalize_line(line);
        if candidate.is_empty() || !patterns.contains(&candidate) {
            break;
        }
        start += 1;
    }

    lines[start..].join("\n").trim().to_string()
}

fn normalize_line(line: &str) -> String {
    let unheaded = line.trim().trim_start_matches('#');
    unheaded
        .replace(['\u{2013}', '\u{2014}'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
