// src/lib.rs
//! docimport library — converts HTML files, Markdown trees and Notion
//! workspaces into uniform object snapshots.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — `AppError`, `ConvertError`, `ImportError`
//! - **Configuration** — `ImportConfig`, `CommandLineInput`
//! - **Snapshot model** — `Snapshot`, `Block`, `Details`, `RelationEdge`
//! - **Converters** — `Converter`, `ConverterRegistry`, `ImportRequest`
//! - **Notion API** — `NotionRepository`, `NotionHttpClient`, `validate_token`
//! - **Reconciliation** — `RelationReconciler`, `ObjectStore`, `FileStore`
//! - **Service** — `ImportService`

pub mod api;
pub mod config;
pub mod constants;
pub mod converter;
pub mod error;
pub mod error_recovery;
pub mod model;
pub mod reconcile;
pub mod service;
pub mod source;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, ConvertError, ImportError, NotionErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, ImportConfig};

// --- Snapshot Model ---
pub use crate::model::{
    Block, BlockContent, DetailValue, Details, PendingFile, PendingSource, RelationEdge,
    RelationFormat, RelationLink, Snapshot, SnapshotKind,
};

// --- Domain Types ---
pub use crate::types::{ApiKey, BlockId, DatabaseId, NotionId, ObjectId, OptionColor, RelationKey};

// --- Converters ---
pub use crate::converter::{
    Conversion, Converter, ConverterRegistry, ImportFormat, ImportMode, ImportParams,
    ImportRequest, Progress, ProgressTracker, Response,
};

// --- Notion API ---
pub use crate::api::{validate_token, NotionHttpClient, NotionRepository, TokenStatus};

// --- Reconciliation ---
pub use crate::reconcile::{FileStore, MemoryStore, ObjectStore, ReconcileReport, RelationReconciler};

// --- Service ---
pub use crate::service::{ImportOutcome, ImportService};
