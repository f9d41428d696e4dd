// src/model/block.rs
use super::marks::Mark;
use super::relation::RelationLink;
use crate::types::{BlockId, FileContentId, ObjectId, OptionColor, RelationKey};
use serde::{Deserialize, Serialize};

/// One node of a snapshot's block tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children_ids: Vec<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<OptionColor>,
    pub content: BlockContent,
}

impl Block {
    /// A block with a fresh ID.
    pub fn new(content: BlockContent) -> Self {
        Self::with_id(BlockId::new(), content)
    }

    pub fn with_id(id: BlockId, content: BlockContent) -> Self {
        Self {
            id,
            children_ids: Vec::new(),
            background_color: None,
            content,
        }
    }

    pub fn text(&self) -> Option<&TextContent> {
        match &self.content {
            BlockContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut TextContent> {
        match &mut self.content {
            BlockContent::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockContent {
    /// Root of every snapshot's tree; shares the snapshot's ID.
    Smartblock,
    Text(TextContent),
    Div { style: DivStyle },
    TableOfContents,
    #[serde(rename_all = "camelCase")]
    Link { target_block_id: ObjectId },
    Bookmark(BookmarkContent),
    File(FileContent),
    Embed { url: String },
    Latex { text: String },
    Table,
    #[serde(rename_all = "camelCase")]
    TableRow { is_header: bool },
    Layout { style: LayoutStyle },
    Relation { key: RelationKey },
    Dataview(DataviewContent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextStyle {
    Paragraph,
    Header1,
    Header2,
    Header3,
    Header4,
    Quote,
    Code,
    Checkbox,
    Marked,
    Numbered,
    Toggle,
    Callout,
}

impl TextStyle {
    pub fn header(level: u8) -> Self {
        match level {
            1 => TextStyle::Header1,
            2 => TextStyle::Header2,
            3 => TextStyle::Header3,
            _ => TextStyle::Header4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub text: String,
    pub style: TextStyle,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<OptionColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TextContent {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
            marks: Vec::new(),
            checked: false,
            color: None,
            icon_emoji: None,
            language: None,
        }
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = marks;
        self
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::Paragraph)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DivStyle {
    Line,
    Dots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutStyle {
    Row,
    Column,
    /// Plain wrapper around content of a block kind with no local counterpart.
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkContent {
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    File,
    Image,
    Video,
    Audio,
    Pdf,
}

impl FileKind {
    /// Picks the block kind from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => FileKind::Image,
            "mp4" | "m4v" => FileKind::Video,
            "mp3" | "ogg" | "wav" | "m4a" | "flac" => FileKind::Audio,
            "pdf" => FileKind::Pdf,
            _ => FileKind::File,
        }
    }

    pub fn from_path(path: &str) -> Self {
        let file = path.rsplit('/').next().unwrap_or(path);
        let ext = file
            .split(['?', '#'])
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
            .unwrap_or("");
        Self::from_extension(ext)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileState {
    /// Waiting for the binary registered under `content_id`.
    Pending,
    Done,
    Error,
}

/// A file block; exactly one of `url`, `content_id` or `hash` locates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub kind: FileKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<FileContentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    pub state: FileState,
}

impl FileContent {
    /// A file that stays at its external URL.
    pub fn external(kind: FileKind, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            url: Some(url.into()),
            content_id: None,
            hash: None,
            state: FileState::Done,
        }
    }

    /// A file whose binary is registered for upload under `content_id`.
    pub fn pending(kind: FileKind, name: impl Into<String>, content_id: FileContentId) -> Self {
        Self {
            kind,
            name: name.into(),
            url: None,
            content_id: Some(content_id),
            hash: None,
            state: FileState::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataviewContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_object_id: Option<ObjectId>,
    #[serde(default)]
    pub relation_links: Vec<RelationLink>,
}
