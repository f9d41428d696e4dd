// src/constants.rs
//! Domain constants that define the operational boundaries of the importer.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100.
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// Notion truncates rich_text property values to this many items; a value
/// of exactly this length has to be re-read through the property endpoint.
pub const NOTION_PROPERTY_TRUNCATION: usize = 25;

/// How many times discovery re-invokes `search` on transport failures.
pub const SEARCH_RETRY_ATTEMPTS: u32 = 5;

/// Fixed pause between two search attempts.
pub const SEARCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Maximum nesting depth when following `has_children` on Notion blocks.
pub const BLOCK_CHILDREN_MAX_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

/// Lower bound of the page-task worker pool.
pub const MIN_PAGE_WORKERS: usize = 4;

/// Upper bound of the page-task worker pool.
pub const MAX_PAGE_WORKERS: usize = 8;

// ---------------------------------------------------------------------------
// Progress weights
// ---------------------------------------------------------------------------

/// Progress steps per HTML or Markdown file (read + convert).
pub const FILE_PROGRESS_STEPS: i64 = 2;

/// Progress steps per Notion database (convert + link).
pub const DATABASE_PROGRESS_STEPS: i64 = 2;

/// Progress steps per Notion page (blocks + mapping + properties).
pub const PAGE_PROGRESS_STEPS: i64 = 3;

// ---------------------------------------------------------------------------
// Produced content
// ---------------------------------------------------------------------------

/// Text of the block replacing a Notion target the integration cannot see.
pub const NOT_ACCESSIBLE_PLACEHOLDER: &str =
    "Can't access object in Notion, please provide access in API";

/// Heading introducing Markdown pages nobody links to.
pub const UNSORTED_HEADING: &str = "Unsorted";

pub const HTML_ROOT_COLLECTION_NAME: &str = "HTML Import";
pub const MARKDOWN_ROOT_COLLECTION_NAME: &str = "Markdown Import";
pub const NOTION_ROOT_COLLECTION_NAME: &str = "Notion Import";

/// Archive entries under this prefix are resource forks, not content.
pub const MACOS_ARCHIVE_METADATA_PREFIX: &str = "__MACOSX/";

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 500;
