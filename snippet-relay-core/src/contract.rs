//! # contract: data model and collaborator traits for the relay pipelines
//!
//! The pipelines never talk to Notion or to the ingestion webhook directly.
//! They go through the traits below, which are implemented by the real HTTP
//! clients ([`crate::notion::NotionClient`], the CLI's webhook client) and by
//! `mockall` mocks in tests.
//!
//! Pagination is cursor-driven: a source returns one [`Paged`] batch per call
//! and the caller loops until `next_cursor` is `None`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{SourceError, UploadError};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// One inline run of text inside a content unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRun {
    pub plain_text: String,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
        }
    }
}

/// Embedded media flavours. All render the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    File,
    Pdf,
    Audio,
}

impl MediaKind {
    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::File => "file",
            MediaKind::Pdf => "pdf",
            MediaKind::Audio => "audio",
        }
    }
}

/// Type tag of a content unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    NumberedListItem,
    ToDo,
    Quote,
    Divider,
    Callout,
    Code,
    Media(MediaKind),
    Bookmark,
    LinkPreview,
    Unsupported,
    Paragraph,
    /// A tag outside the known enumeration, kept verbatim.
    Other(String),
}

impl BlockKind {
    /// Maps a Notion block `type` string to a kind.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "heading_1" => BlockKind::Heading1,
            "heading_2" => BlockKind::Heading2,
            "heading_3" => BlockKind::Heading3,
            "bulleted_list_item" => BlockKind::BulletedListItem,
            "numbered_list_item" => BlockKind::NumberedListItem,
            "to_do" => BlockKind::ToDo,
            "quote" => BlockKind::Quote,
            "divider" => BlockKind::Divider,
            "callout" => BlockKind::Callout,
            "code" => BlockKind::Code,
            "image" => BlockKind::Media(MediaKind::Image),
            "video" => BlockKind::Media(MediaKind::Video),
            "file" => BlockKind::Media(MediaKind::File),
            "pdf" => BlockKind::Media(MediaKind::Pdf),
            "audio" => BlockKind::Media(MediaKind::Audio),
            "bookmark" => BlockKind::Bookmark,
            "link_preview" => BlockKind::LinkPreview,
            "unsupported" => BlockKind::Unsupported,
            "paragraph" => BlockKind::Paragraph,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

/// One structured block of page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    pub kind: BlockKind,
    pub runs: Vec<TextRun>,
    pub checked: bool,
    pub language: Option<String>,
    pub url: Option<String>,
    pub caption: Option<String>,
    pub icon: Option<String>,
}

impl ContentUnit {
    /// A unit with the given kind and runs and no type-specific fields.
    pub fn new(kind: BlockKind, runs: Vec<TextRun>) -> Self {
        Self {
            kind,
            runs,
            checked: false,
            language: None,
            url: None,
            caption: None,
            icon: None,
        }
    }

    /// Concatenated plain text of all inline runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.plain_text.as_str()).collect()
    }
}

/// A database row describing one snippet page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub id: String,
    pub identity: Option<String>,
    pub date: Option<NaiveDate>,
    pub processed: bool,
}

/// One page of a cursor-driven listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    pub results: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Paged<T> {
    pub fn last(results: Vec<T>) -> Self {
        Self {
            results,
            next_cursor: None,
        }
    }
}

/// Body posted to the ingestion endpoint for one local snippet file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnippetPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
    pub user_email: String,
    pub snippet_date: NaiveDate,
    pub content: String,
    pub team_name: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Read access to the snippet database.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// One page of unprocessed records whose date falls on `date`.
    async fn query_records(
        &self,
        date: NaiveDate,
        cursor: Option<String>,
    ) -> Result<Paged<SourceRecord>, SourceError>;

    /// One page of the content units under a record.
    async fn list_units(
        &self,
        record_id: &str,
        cursor: Option<String>,
    ) -> Result<Paged<ContentUnit>, SourceError>;
}

/// Write access used to flag records as processed after upload.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StatusMarker: Send + Sync {
    async fn mark_processed(&self, record_id: &str, at: DateTime<Utc>)
        -> Result<(), SourceError>;
}

/// Sends one snippet to the ingestion endpoint.
///
/// Implementations perform exactly one request and never retry. The returned
/// value is the response body as JSON, or `{"ok": true, "text": ..}` when the
/// body is not JSON.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SnippetUploader: Send + Sync {
    async fn upload(&self, payload: &SnippetPayload) -> Result<serde_json::Value, UploadError>;
}
