// src/api/mod.rs
//! Notion API interaction: the ability to read a workspace.
//!
//! I/O lives behind [`NotionRepository`]; decoding of block payloads is a
//! pure function in [`blocks`] so the converter can be exercised against
//! canned JSON.

pub mod blocks;
pub mod client;
mod pagination;
pub mod parser;
pub mod responses;
pub mod validate;

use crate::error::AppError;
use crate::types::{DatabaseId, NotionId, PageId};
use responses::{PropertyItem, RawPage, SearchObject};
use serde_json::Value;

/// Read access to a Notion workspace.
///
/// Business logic depends on this trait, never on HTTP details. Every list
/// operation follows pagination to the end.
#[async_trait::async_trait]
pub trait NotionRepository: Send + Sync {
    /// Every page and database shared with the integration.
    async fn search(&self) -> Result<Vec<SearchObject>, AppError>;

    /// Rows of a database.
    async fn query_database(&self, database: &DatabaseId) -> Result<Vec<RawPage>, AppError>;

    /// Raw children of a page or block, decoded later by [`blocks::parse_block`].
    async fn block_children(&self, parent: &NotionId) -> Result<Vec<Value>, AppError>;

    /// Full value of a property Notion truncated in the page object.
    async fn property_items(
        &self,
        page: &PageId,
        property_id: &str,
    ) -> Result<Vec<PropertyItem>, AppError>;
}

pub use blocks::{children_of, deserialize_block, is_container, parse_block, BlockKind, NotionBlock};
pub use client::NotionHttpClient;
pub use validate::{validate_token, TokenStatus};
