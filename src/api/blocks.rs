// src/api/blocks.rs
//! Notion block payloads as a tagged union.
//!
//! `GET /blocks/{id}/children` returns heterogeneous JSON; each entry is
//! decoded by its `type` into a [`BlockKind`]. Kinds this importer does not
//! know become [`BlockKind::Unsupported`].

use super::responses::{FileObject, RichText};
use crate::error::AppError;
use crate::types::Color;
use serde::Deserialize;
use serde_json::Value;

/// A decoded block with its (already fetched) children.
#[derive(Debug, Clone, PartialEq)]
pub struct NotionBlock {
    pub id: String,
    pub has_children: bool,
    pub kind: BlockKind,
    pub children: Vec<NotionBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph(TextBlock),
    Heading1(TextBlock),
    Heading2(TextBlock),
    Heading3(TextBlock),
    BulletedListItem(TextBlock),
    NumberedListItem(TextBlock),
    Toggle(TextBlock),
    Quote(TextBlock),
    ToDo(ToDoBlock),
    Callout(CalloutBlock),
    Code(CodeBlock),
    Divider,
    TableOfContents,
    Embed(UrlBlock),
    Bookmark(UrlBlock),
    LinkPreview(UrlBlock),
    Equation(EquationBlock),
    File(FileBlock),
    Image(FileBlock),
    Video(FileBlock),
    Audio(FileBlock),
    Pdf(FileBlock),
    ColumnList,
    Column,
    Table(TableBlock),
    TableRow(TableRowBlock),
    ChildPage(TitleBlock),
    ChildDatabase(TitleBlock),
    LinkToPage(LinkTarget),
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToDoBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalloutBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub icon: Option<FileObject>,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub rich_text: Vec<RichText>,
    #[serde(default)]
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UrlBlock {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub caption: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EquationBlock {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileBlock {
    #[serde(default)]
    pub caption: Vec<RichText>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub source: FileObject,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub table_width: usize,
    #[serde(default)]
    pub has_column_header: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableRowBlock {
    #[serde(default)]
    pub cells: Vec<Vec<RichText>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TitleBlock {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkTarget {
    PageId { page_id: String },
    DatabaseId { database_id: String },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
struct BlockHeader {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    has_children: bool,
}

/// Decodes the payload stored under a block's `type` key.
pub fn deserialize_block(kind: &str, payload: Value) -> Result<BlockKind, serde_json::Error> {
    fn de<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, serde_json::Error> {
        serde_json::from_value(payload)
    }

    Ok(match kind {
        "paragraph" => BlockKind::Paragraph(de(payload)?),
        "heading_1" => BlockKind::Heading1(de(payload)?),
        "heading_2" => BlockKind::Heading2(de(payload)?),
        "heading_3" => BlockKind::Heading3(de(payload)?),
        "bulleted_list_item" => BlockKind::BulletedListItem(de(payload)?),
        "numbered_list_item" => BlockKind::NumberedListItem(de(payload)?),
        "toggle" => BlockKind::Toggle(de(payload)?),
        "quote" => BlockKind::Quote(de(payload)?),
        "to_do" => BlockKind::ToDo(de(payload)?),
        "callout" => BlockKind::Callout(de(payload)?),
        "code" => BlockKind::Code(de(payload)?),
        "divider" => BlockKind::Divider,
        "table_of_contents" => BlockKind::TableOfContents,
        "embed" => BlockKind::Embed(de(payload)?),
        "bookmark" => BlockKind::Bookmark(de(payload)?),
        "link_preview" => BlockKind::LinkPreview(de(payload)?),
        "equation" => BlockKind::Equation(de(payload)?),
        "file" => BlockKind::File(de(payload)?),
        "image" => BlockKind::Image(de(payload)?),
        "video" => BlockKind::Video(de(payload)?),
        "audio" => BlockKind::Audio(de(payload)?),
        "pdf" => BlockKind::Pdf(de(payload)?),
        "column_list" => BlockKind::ColumnList,
        "column" => BlockKind::Column,
        "table" => BlockKind::Table(de(payload)?),
        "table_row" => BlockKind::TableRow(de(payload)?),
        "child_page" => BlockKind::ChildPage(de(payload)?),
        "child_database" => BlockKind::ChildDatabase(de(payload)?),
        "link_to_page" => BlockKind::LinkToPage(de(payload)?),
        other => BlockKind::Unsupported(other.to_string()),
    })
}

/// Decodes one entry of a children listing.
pub fn parse_block(raw: &Value) -> Result<NotionBlock, AppError> {
    let header = BlockHeader::deserialize(raw)?;
    let payload = raw.get(&header.kind).cloned().unwrap_or(Value::Null);
    let kind = deserialize_block(&header.kind, payload).map_err(|e| AppError::Parse {
        path: format!("block {}", header.id),
        message: e.to_string(),
    })?;
    Ok(NotionBlock {
        id: header.id,
        has_children: header.has_children,
        kind,
        children: Vec::new(),
    })
}

/// Kinds whose `has_children` content belongs inside the current page.
///
/// Child pages and databases report children too, but those are separate
/// objects and are never inlined. Unsupported kinds keep their children.
pub fn is_container(kind: &BlockKind) -> bool {
    !matches!(
        kind,
        BlockKind::ChildPage(_) | BlockKind::ChildDatabase(_) | BlockKind::LinkToPage(_)
    )
}

pub fn children_of(block: &NotionBlock) -> &[NotionBlock] {
    &block.children
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn known_kinds_decode() {
        let block = parse_block(&json!({
            "object": "block", "id": "b1", "type": "to_do", "has_children": true,
            "to_do": {"rich_text": [{"plain_text": "ship"}], "checked": true, "color": "red"}
        }))
        .unwrap();
        assert!(block.has_children);
        match block.kind {
            BlockKind::ToDo(todo) => {
                assert!(todo.checked);
                assert_eq!(todo.color, Color::Red);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_kinds_become_unsupported() {
        let block = parse_block(&json!({
            "id": "b2", "type": "synced_block", "synced_block": {"synced_from": null}
        }))
        .unwrap();
        assert_eq!(block.kind, BlockKind::Unsupported("synced_block".into()));
        assert!(is_container(&block.kind));
    }

    #[test]
    fn broken_payloads_fail_alone() {
        let err = parse_block(&json!({"id": "b3", "type": "equation", "equation": {}}));
        assert!(matches!(err, Err(AppError::Parse { .. })));
    }

    #[test]
    fn child_pages_are_not_containers() {
        let block = parse_block(&json!({
            "id": "b4", "type": "child_page", "has_children": true, "child_page": {"title": "Work"}
        }))
        .unwrap();
        assert_eq!(block.kind, BlockKind::ChildPage(TitleBlock { title: "Work".into() }));
        assert!(!is_container(&block.kind));
        assert!(children_of(&block).is_empty());
    }

    #[test]
    fn file_blocks_keep_their_source() {
        let block = parse_block(&json!({
            "id": "b5", "type": "image",
            "image": {"type": "external", "external": {"url": "https://x/y.png"}, "caption": []}
        }))
        .unwrap();
        let BlockKind::Image(file) = block.kind else {
            panic!("expected image");
        };
        assert_eq!(file.source.url(), Some("https://x/y.png"));
    }
}
