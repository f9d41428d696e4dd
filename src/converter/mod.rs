// src/converter/mod.rs
//! Converter contract, request/response types and the converter registry.

pub mod html;
pub mod markdown;
pub mod notion;
mod progress;
mod root_collection;
pub(crate) mod text;

pub use progress::{Progress, ProgressTracker};
pub use root_collection::build_root_collection;

use crate::error::ConvertError;
use crate::model::{PendingFile, RelationEdge, Snapshot};
use crate::types::{ApiKey, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// How per-item failures affect the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportMode {
    /// The first failure aborts the run and no response is produced.
    #[default]
    AllOrNothing,
    /// Failures are recorded and the remaining items are still converted.
    IgnoreErrors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportFormat {
    Html,
    Markdown,
    Notion,
    Pb,
}

impl ImportFormat {
    /// Name of the converter registered for this format.
    pub fn converter_name(&self) -> &'static str {
        match self {
            ImportFormat::Html => html::NAME,
            ImportFormat::Markdown => markdown::NAME,
            ImportFormat::Notion => notion::NAME,
            ImportFormat::Pb => "pb",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ImportParams {
    Paths(Vec<PathBuf>),
    Notion { api_key: ApiKey },
}

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub format: ImportFormat,
    pub mode: ImportMode,
    pub params: ImportParams,
}

impl ImportRequest {
    pub fn paths(format: ImportFormat, mode: ImportMode, paths: Vec<PathBuf>) -> Self {
        Self {
            format,
            mode,
            params: ImportParams::Paths(paths),
        }
    }

    pub fn notion(mode: ImportMode, api_key: ApiKey) -> Self {
        Self {
            format: ImportFormat::Notion,
            mode,
            params: ImportParams::Notion { api_key },
        }
    }

    pub fn file_paths(&self) -> &[PathBuf] {
        match &self.params {
            ImportParams::Paths(paths) => paths,
            ImportParams::Notion { .. } => &[],
        }
    }
}

/// Everything a converter produced for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub snapshots: Vec<Snapshot>,
    #[serde(default)]
    pub relations: HashMap<ObjectId, Vec<RelationEdge>>,
    #[serde(default)]
    pub files: Vec<PendingFile>,
}

impl Response {
    pub fn snapshot(&self, id: &ObjectId) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| &s.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| s.name() == Some(name))
    }
}

/// Outcome of one converter run: a possibly partial response plus failures.
#[derive(Debug, Default)]
pub struct Conversion {
    pub response: Option<Response>,
    pub errors: ConvertError,
}

impl Conversion {
    /// Nothing applicable was found; not an error by itself.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failed(errors: ConvertError) -> Self {
        Self {
            response: None,
            errors,
        }
    }

    pub fn new(response: Response, errors: ConvertError) -> Self {
        Self {
            response: Some(response),
            errors,
        }
    }
}

/// A source-format specific producer of snapshots.
#[async_trait::async_trait]
pub trait Converter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_snapshots(&self, request: &ImportRequest, progress: &dyn Progress) -> Conversion;
}

/// Converters addressable by name.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<&'static str, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTML, Markdown and Notion (over HTTP) converters.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Arc::new(html::HtmlConverter::new()))
            .register(Arc::new(markdown::MarkdownConverter::new()))
            .register(Arc::new(notion::NotionConverter::new()))
    }

    pub fn register(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.insert(converter.name(), converter);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Converter>> {
        self.converters.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.converters.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
