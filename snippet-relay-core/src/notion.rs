//! Notion REST client backing [`RecordSource`] and [`StatusMarker`].
//!
//! Responses are navigated as `serde_json::Value` rather than fully typed:
//! only a handful of fields matter and Notion adds block types regularly.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::config::{NotionSchema, UnprocessedFilter};
use crate::contract::{
    BlockKind, ContentUnit, Paged, RecordSource, SourceRecord, StatusMarker, TextRun,
};
use crate::error::SourceError;

pub const NOTION_API_URL: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";
pub const PAGE_SIZE: u32 = 100;

pub struct NotionClient {
    http: Client,
    base_url: String,
    token: String,
    database_id: String,
    schema: NotionSchema,
}

impl NotionClient {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>, schema: NotionSchema) -> Self {
        Self {
            http: Client::new(),
            base_url: NOTION_API_URL.to_string(),
            token: token.into(),
            database_id: database_id.into(),
            schema,
        }
    }

    /// Points the client at another host, e.g. a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn schema(&self) -> &NotionSchema {
        &self.schema
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, SourceError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Notion API returned error. Response body: {text}");
            return Err(SourceError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| SourceError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl RecordSource for NotionClient {
    async fn query_records(
        &self,
        date: NaiveDate,
        cursor: Option<String>,
    ) -> Result<Paged<SourceRecord>, SourceError> {
        let url = format!("{}/v1/databases/{}/query", self.base_url, self.database_id);
        let mut body = json!({
            "filter": query_filter(&self.schema, date),
            "page_size": PAGE_SIZE,
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = Value::String(cursor);
        }
        debug!(url = %url, body = %body, "Querying Notion database");

        let value = self.send(self.http.post(&url).json(&body)).await?;
        let (results, next_cursor) = split_page(&value)?;
        let records = results
            .iter()
            .map(|page| parse_record(page, &self.schema))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paged {
            results: records,
            next_cursor,
        })
    }

    async fn list_units(
        &self,
        record_id: &str,
        cursor: Option<String>,
    ) -> Result<Paged<ContentUnit>, SourceError> {
        let url = format!("{}/v1/blocks/{}/children", self.base_url, record_id);
        let mut query = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor));
        }

        let value = self.send(self.http.get(&url).query(&query)).await?;
        let (results, next_cursor) = split_page(&value)?;
        Ok(Paged {
            results: results.iter().map(parse_block).collect(),
            next_cursor,
        })
    }
}

#[async_trait]
impl StatusMarker for NotionClient {
    async fn mark_processed(&self, record_id: &str, at: DateTime<Utc>) -> Result<(), SourceError> {
        let url = format!("{}/v1/pages/{}", self.base_url, record_id);
        let body = json!({ "properties": processed_properties(&self.schema, at) });
        self.send(self.http.patch(&url).json(&body)).await?;
        info!(record_id, "Notion page flagged as processed");
        Ok(())
    }
}

/// Filter matching records dated on `date` that are not yet processed.
pub fn query_filter(schema: &NotionSchema, date: NaiveDate) -> Value {
    let ymd = date.format("%Y-%m-%d").to_string();
    let processed = &schema.processed_property;
    let unprocessed = match schema.unprocessed_filter {
        UnprocessedFilter::EqualsFalse => {
            json!({ "property": processed, "checkbox": { "equals": false } })
        }
        UnprocessedFilter::FalseOrEmpty => json!({
            "or": [
                { "property": processed, "checkbox": { "equals": false } },
                { "property": processed, "checkbox": { "is_empty": true } },
            ]
        }),
    };

    json!({
        "and": [
            { "property": schema.date_property, "date": { "on_or_after": ymd } },
            { "property": schema.date_property, "date": { "on_or_before": ymd } },
            unprocessed,
        ]
    })
}

/// Property update flagging a page as processed at `at`.
pub fn processed_properties(schema: &NotionSchema, at: DateTime<Utc>) -> Value {
    let mut props = serde_json::Map::new();
    props.insert(
        schema.processed_property.clone(),
        json!({ "checkbox": true }),
    );
    if let Some(stamp) = &schema.processed_at_property {
        props.insert(
            stamp.clone(),
            json!({ "date": { "start": at.to_rfc3339_opts(SecondsFormat::Secs, true) } }),
        );
    }
    Value::Object(props)
}

fn split_page(value: &Value) -> Result<(&Vec<Value>, Option<String>), SourceError> {
    let results = value
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Malformed("missing results array".into()))?;
    let has_more = value.get("has_more").and_then(Value::as_bool).unwrap_or(false);
    let next_cursor = if has_more {
        value
            .get("next_cursor")
            .and_then(Value::as_str)
            .map(str::to_string)
    } else {
        None
    };
    Ok((results, next_cursor))
}

/// Maps a database page to a [`SourceRecord`].
///
/// The identity comes from the email property, or from the first person of the
/// people property when the email is empty. Missing fields become `None`; the
/// grouping step decides what to do with them.
pub fn parse_record(page: &Value, schema: &NotionSchema) -> Result<SourceRecord, SourceError> {
    let id = page
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| SourceError::Malformed("page without id".into()))?
        .to_string();
    let props = page.get("properties").cloned().unwrap_or(Value::Null);

    let date = props[&schema.date_property]["date"]["start"]
        .as_str()
        .and_then(|s| s.get(..10))
        .and_then(|ymd| NaiveDate::parse_from_str(ymd, "%Y-%m-%d").ok());

    let email = props[&schema.email_property]["email"]
        .as_str()
        .map(str::trim)
        .filter(|e| !e.is_empty());
    let person = schema.people_property.as_ref().and_then(|people| {
        props[people]["people"][0]["person"]["email"]
            .as_str()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    });
    let identity = email.or(person).map(str::to_string);

    let processed = props[&schema.processed_property]["checkbox"]
        .as_bool()
        .unwrap_or(false);

    Ok(SourceRecord {
        id,
        identity,
        date,
        processed,
    })
}

/// Maps a Notion block object to a [`ContentUnit`].
pub fn parse_block(block: &Value) -> ContentUnit {
    let tag = block.get("type").and_then(Value::as_str).unwrap_or("unsupported");
    let data = &block[tag];

    let runs = rich_text(&data["rich_text"]);
    let mut unit = ContentUnit::new(BlockKind::from_tag(tag), runs);
    unit.checked = data["checked"].as_bool().unwrap_or(false);
    unit.language = data["language"].as_str().map(str::to_string);
    unit.url = data["url"]
        .as_str()
        .or_else(|| data["external"]["url"].as_str())
        .or_else(|| data["file"]["url"].as_str())
        .map(str::to_string);
    let caption: String = rich_text(&data["caption"])
        .into_iter()
        .map(|r| r.plain_text)
        .collect();
    unit.caption = Some(caption).filter(|c| !c.is_empty());
    unit.icon = data["icon"]["emoji"].as_str().map(str::to_string);
    unit
}

fn rich_text(value: &Value) -> Vec<TextRun> {
    value
        .as_array()
        .map(|runs| {
            runs.iter()
                .map(|r| TextRun::new(r["plain_text"].as_str().unwrap_or("")))
                .collect()
        })
        .unwrap_or_default()
}
