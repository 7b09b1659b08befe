#![doc = "snippet-relay-core: export and upload pipelines for daily snippets."]

//! This crate holds the data model, the collaborator traits and every stage of
//! the two pipelines run by the `snippet-relay` CLI:
//!
//! - export: Notion query → page text extraction → grouping → snippet files
//!   plus the export map
//! - upload: change detection → one webhook POST per changed file → optional
//!   "processed" flag on the source records
//!
//! # Usage
//! Construct a [`notion::NotionClient`] (or any [`contract::RecordSource`]) and
//! call [`synchronise::run_export`] / [`synchronise::run_upload`].

pub mod change;
pub mod config;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod extract;
pub mod group;
pub mod identity;
pub mod notion;
pub mod query;
pub mod render;
pub mod status;
pub mod store;
pub mod synchronise;
