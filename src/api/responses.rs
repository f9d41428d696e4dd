// src/api/responses.rs
//! Raw Notion API payloads.
//!
//! These mirror the JSON the REST API returns closely enough to be decoded
//! with serde; the converter maps them onto the local object model. Unknown
//! variants decode into `Unsupported` instead of failing the whole response.

use crate::types::Color;
use indexmap::IndexMap;
use serde::Deserialize;

/// Error body the API returns with non-2xx statuses.
pub use notion_client::objects::error::Error as NotionErrorBody;

/// One page of a cursor-paginated list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(default)]
    pub object: String,
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A `search` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "object", rename_all = "snake_case")]
pub enum SearchObject {
    Page(RawPage),
    Database(RawDatabase),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPage {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub icon: Option<FileObject>,
    #[serde(default)]
    pub cover: Option<FileObject>,
    pub parent: Parent,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
}

impl RawPage {
    /// Plain text of the title property; empty when the page has none.
    pub fn title(&self) -> String {
        self.properties
            .values()
            .find_map(|p| match &p.kind {
                PropertyKind::Title { title } => Some(plain_text(title)),
                _ => None,
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDatabase {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Vec<RichText>,
    #[serde(default)]
    pub description: Vec<RichText>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub icon: Option<FileObject>,
    #[serde(default)]
    pub cover: Option<FileObject>,
    pub parent: Parent,
    #[serde(default)]
    pub properties: IndexMap<String, PropertySchema>,
}

impl RawDatabase {
    /// Name taken from the first title fragment.
    pub fn name(&self) -> String {
        self.title
            .first()
            .map(|t| t.plain_text.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parent {
    DatabaseId { database_id: String },
    PageId { page_id: String },
    BlockId { block_id: String },
    Workspace,
    #[serde(other)]
    Unknown,
}

/// Icons, covers and file attachments share one shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileObject {
    Emoji { emoji: String },
    External { external: FileUrl },
    File { file: FileUrl },
    #[serde(other)]
    Unsupported,
}

impl FileObject {
    pub fn url(&self) -> Option<&str> {
        match self {
            FileObject::External { external } => Some(&external.url),
            FileObject::File { file } => Some(&file.url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileUrl {
    pub url: String,
}

/// An entry of a `files` property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedFile {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub file: FileObject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub mention: Option<Mention>,
}

impl RichText {
    #[cfg(test)]
    pub fn plain(text: &str) -> Self {
        Self {
            plain_text: text.to_string(),
            href: None,
            annotations: Annotations::default(),
            mention: None,
        }
    }
}

/// Concatenated plain text of a rich text array.
pub fn plain_text(parts: &[RichText]) -> String {
    parts.iter().map(|p| p.plain_text.as_str()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mention {
    Page { page: IdRef },
    Database { database: IdRef },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

/// Column definition of a database.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PropertySchema {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A property value on a page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyValue {
    pub id: String,
    #[serde(flatten)]
    pub kind: PropertyKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyKind {
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    Number {
        number: Option<f64>,
    },
    Select {
        select: Option<SelectOption>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    Date {
        date: Option<DateValue>,
    },
    People {
        people: Vec<User>,
    },
    Files {
        files: Vec<NamedFile>,
    },
    Checkbox {
        checkbox: bool,
    },
    Url {
        url: Option<String>,
    },
    Email {
        email: Option<String>,
    },
    PhoneNumber {
        phone_number: Option<String>,
    },
    Formula {
        formula: FormulaValue,
    },
    Relation {
        relation: Vec<IdRef>,
        #[serde(default)]
        has_more: bool,
    },
    Rollup {
        rollup: RollupValue,
    },
    CreatedTime {
        created_time: String,
    },
    LastEditedTime {
        last_edited_time: String,
    },
    CreatedBy {
        created_by: User,
    },
    LastEditedBy {
        last_edited_by: User,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaValue {
    String { string: Option<String> },
    Number { number: Option<f64> },
    Boolean { boolean: Option<bool> },
    Date { date: Option<DateValue> },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollupValue {
    Number { number: Option<f64> },
    Date { date: Option<DateValue> },
    Array { array: Vec<PropertyKind> },
    #[serde(other)]
    Unsupported,
}

/// One item of `GET /pages/{id}/properties/{prop}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyItem {
    #[serde(default)]
    pub rich_text: Option<RichText>,
    #[serde(default)]
    pub title: Option<RichText>,
    #[serde(default)]
    pub relation: Option<IdRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn search_results_split_by_object() {
        let body = json!({
            "object": "list",
            "results": [
                {"object": "page", "id": "p1", "parent": {"type": "workspace", "workspace": true},
                 "properties": {"Name": {"id": "title", "type": "title",
                    "title": [{"plain_text": "Home", "type": "text"}]}}},
                {"object": "database", "id": "d1", "parent": {"type": "page_id", "page_id": "p1"},
                 "title": [{"plain_text": "Tasks"}],
                 "properties": {"Due": {"id": "a%3Ab", "name": "Due", "type": "date", "date": {}}}},
                {"object": "comment", "id": "c1"}
            ],
            "next_cursor": null,
            "has_more": false
        });
        let page: PaginatedResponse<SearchObject> = serde_json::from_value(body).unwrap();
        assert!(matches!(&page.results[0], SearchObject::Page(p) if p.title() == "Home"));
        match &page.results[1] {
            SearchObject::Database(db) => {
                assert_eq!(db.name(), "Tasks");
                assert_eq!(db.parent, Parent::PageId { page_id: "p1".into() });
                assert_eq!(db.properties["Due"].kind, "date");
            }
            other => panic!("expected database, got {:?}", other),
        }
        assert!(matches!(page.results[2], SearchObject::Unsupported));
    }

    #[test]
    fn property_values_keep_ids_and_unknown_kinds() {
        let value: PropertyValue = serde_json::from_value(json!({
            "id": "abc", "type": "select",
            "select": {"id": "o1", "name": "Name", "color": "blue"}
        }))
        .unwrap();
        assert_eq!(value.id, "abc");
        assert!(matches!(
            value.kind,
            PropertyKind::Select { select: Some(SelectOption { color: Color::Blue, .. }) }
        ));

        let unknown: PropertyValue =
            serde_json::from_value(json!({"id": "u", "type": "unique_id", "unique_id": {}})).unwrap();
        assert_eq!(unknown.kind, PropertyKind::Unsupported);
    }

    #[test]
    fn rollup_arrays_nest_property_kinds() {
        let value: PropertyValue = serde_json::from_value(json!({
            "id": "r", "type": "rollup",
            "rollup": {"type": "array", "function": "show_original",
                "array": [{"type": "title", "title": [{"plain_text": "Title"}]}]}
        }))
        .unwrap();
        let PropertyKind::Rollup { rollup: RollupValue::Array { array } } = value.kind else {
            panic!("expected array rollup");
        };
        assert_eq!(
            array,
            vec![PropertyKind::Title { title: vec![RichText::plain("Title")] }]
        );
    }

    #[test]
    fn file_objects_expose_urls() {
        let file: NamedFile = serde_json::from_value(json!({
            "name": "a.pdf", "type": "file", "file": {"url": "https://s3/a.pdf", "expiry_time": "x"}
        }))
        .unwrap();
        assert_eq!(file.name, "a.pdf");
        assert_eq!(file.file.url(), Some("https://s3/a.pdf"));
        let icon: FileObject = serde_json::from_value(json!({"type": "emoji", "emoji": "🚀"})).unwrap();
        assert_eq!(icon.url(), None);
    }
}
