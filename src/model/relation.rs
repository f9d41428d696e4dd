// src/model/relation.rs
use crate::types::{BlockId, RelationKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value format of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationFormat {
    ShortText,
    LongText,
    Number,
    Date,
    Checkbox,
    Url,
    Email,
    Phone,
    File,
    Object,
    Status,
    Tag,
    Emoji,
}

impl RelationFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationFormat::ShortText => "shorttext",
            RelationFormat::LongText => "longtext",
            RelationFormat::Number => "number",
            RelationFormat::Date => "date",
            RelationFormat::Checkbox => "checkbox",
            RelationFormat::Url => "url",
            RelationFormat::Email => "email",
            RelationFormat::Phone => "phone",
            RelationFormat::File => "file",
            RelationFormat::Object => "object",
            RelationFormat::Status => "status",
            RelationFormat::Tag => "tag",
            RelationFormat::Emoji => "emoji",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "shorttext" => RelationFormat::ShortText,
            "longtext" => RelationFormat::LongText,
            "number" => RelationFormat::Number,
            "date" => RelationFormat::Date,
            "checkbox" => RelationFormat::Checkbox,
            "url" => RelationFormat::Url,
            "email" => RelationFormat::Email,
            "phone" => RelationFormat::Phone,
            "file" => RelationFormat::File,
            "object" => RelationFormat::Object,
            "status" => RelationFormat::Status,
            "tag" => RelationFormat::Tag,
            "emoji" => RelationFormat::Emoji,
            _ => return None,
        })
    }

    /// Formats whose list values may name relation options.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            RelationFormat::Tag | RelationFormat::Status | RelationFormat::Object
        )
    }

    /// Formats whose detail values are lists of identifiers.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            RelationFormat::Tag | RelationFormat::Status | RelationFormat::Object | RelationFormat::File
        )
    }
}

impl fmt::Display for RelationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attaches a relation to an object or dataview so its column is visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationLink {
    pub key: RelationKey,
    pub format: RelationFormat,
}

/// A name-based relation that still has to be reconciled with the host store.
///
/// `detail_key` is the key the value currently sits under in the object's
/// details; `block_id` points at a relation block embedded in the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationEdge {
    pub name: String,
    pub format: RelationFormat,
    pub detail_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
}

impl RelationEdge {
    pub fn new(name: impl Into<String>, format: RelationFormat, detail_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format,
            detail_key: detail_key.into(),
            block_id: None,
        }
    }

    pub fn with_block(mut self, block_id: BlockId) -> Self {
        self.block_id = Some(block_id);
        self
    }
}
