// src/converter/notion/database.rs
//! Notion databases to collection snapshots.

use super::apply_common_details;
use super::context::normalize_id;
use super::properties::{schema_format, value_format, PropertyService};
use crate::api::responses::{plain_text, PropertySchema, RawDatabase, RawPage};
use crate::model::{
    keys, Block, BlockContent, DataviewContent, RelationFormat, RelationLink, Snapshot,
};
use crate::types::{ObjectId, RelationKey};

/// A converted database and the relation snapshots its schema introduced.
#[derive(Debug)]
pub struct DatabaseOutput {
    pub snapshot: Snapshot,
    pub relations: Vec<Snapshot>,
}

/// The built-in relation the title column folds into.
pub fn name_link() -> RelationLink {
    RelationLink {
        key: RelationKey::from(keys::NAME),
        format: RelationFormat::ShortText,
    }
}

/// Builds the collection snapshot of `database`. `rows` are consulted for
/// formula and rollup columns, whose format depends on their result type.
pub fn convert_database(
    database: &RawDatabase,
    id: ObjectId,
    rows: &[RawPage],
    properties: &PropertyService,
) -> DatabaseOutput {
    let scope = normalize_id(&database.id);
    let mut snapshot = Snapshot::collection(id.clone(), scope.as_str());
    snapshot.set_name(database.name());
    let description = plain_text(&database.description);
    if !description.is_empty() {
        snapshot.set_detail(keys::DESCRIPTION, description);
    }
    apply_common_details(
        &mut snapshot,
        database.url.as_deref(),
        database.icon.as_ref(),
        database.cover.as_ref(),
        database.archived,
        database.created_time.as_deref(),
        database.last_edited_time.as_deref(),
    );
    snapshot.set_detail(keys::LAYOUT, "collection");

    let mut links = vec![name_link()];
    let mut relations = Vec::new();
    for (name, schema) in &database.properties {
        let Some(format) = column_format(schema, rows) else {
            continue;
        };
        let (def, created) = properties.relation(&scope, &schema.id, name, format);
        relations.extend(created);
        links.push(def.link());
    }

    snapshot.push_block(Block::new(BlockContent::Dataview(DataviewContent {
        target_object_id: Some(id),
        relation_links: links.clone(),
    })));
    snapshot.relation_links = links;
    DatabaseOutput {
        snapshot,
        relations,
    }
}

/// Format of a column; formulas and rollups take the type of the first row
/// value that has one.
fn column_format(schema: &PropertySchema, rows: &[RawPage]) -> Option<RelationFormat> {
    let declared = schema_format(&schema.kind)?;
    if !matches!(schema.kind.as_str(), "formula" | "rollup") {
        return Some(declared);
    }
    let observed = rows.iter().find_map(|row| {
        row.properties
            .values()
            .find(|p| p.id == schema.id)
            .and_then(|p| value_format(&p.kind))
    });
    Some(observed.unwrap_or(declared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn database() -> RawDatabase {
        serde_json::from_value(json!({
            "object": "database",
            "id": "dddddddd-dddd-dddd-dddd-dddddddddddd",
            "url": "https://www.notion.so/dddd",
            "title": [{"plain_text": "Tasks"}],
            "description": [{"plain_text": "All tasks"}],
            "icon": {"type": "emoji", "emoji": "✅"},
            "parent": {"type": "workspace", "workspace": true},
            "properties": {
                "Name": {"id": "title", "name": "Name", "type": "title"},
                "Tag": {"id": "t1", "name": "Tag", "type": "select"},
                "Score": {"id": "f1", "name": "Score", "type": "formula"}
            }
        }))
        .unwrap()
    }

    fn row() -> RawPage {
        serde_json::from_value(json!({
            "object": "page",
            "id": "eeeeeeee-eeee-eeee-eeee-eeeeeeeeeeee",
            "parent": {"type": "database_id", "database_id": "dddddddd-dddd-dddd-dddd-dddddddddddd"},
            "properties": {
                "Score": {"id": "f1", "type": "formula", "formula": {"type": "number", "number": 3}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn schema_becomes_relations_and_dataview_columns() {
        let service = PropertyService::new();
        let id = ObjectId::new();
        let out = convert_database(&database(), id.clone(), &[row()], &service);

        assert_eq!(out.snapshot.name(), Some("Tasks"));
        assert_eq!(out.snapshot.details.get_str(keys::DESCRIPTION), Some("All tasks"));
        assert_eq!(out.snapshot.details.get_str(keys::ICON_EMOJI), Some("✅"));
        assert_eq!(out.relations.len(), 2);

        let mut formats: Vec<(Option<&str>, Option<&str>)> = out
            .relations
            .iter()
            .map(|r| (r.name(), r.details.get_str(keys::RELATION_FORMAT)))
            .collect();
        formats.sort();
        assert_eq!(
            formats,
            vec![(Some("Score"), Some("number")), (Some("Tag"), Some("tag"))]
        );

        let dataview = out
            .snapshot
            .walk()
            .into_iter()
            .find_map(|b| match &b.content {
                BlockContent::Dataview(view) => Some(view.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(dataview.target_object_id, Some(id));
        assert_eq!(dataview.relation_links.len(), 3);
        assert_eq!(dataview.relation_links[0], name_link());
    }

    #[test]
    fn formula_without_rows_is_short_text() {
        let service = PropertyService::new();
        let out = convert_database(&database(), ObjectId::new(), &[], &service);
        let formula = out
            .relations
            .iter()
            .find(|r| r.name() == Some("Score"))
            .unwrap();
        assert_eq!(formula.details.get_str(keys::RELATION_FORMAT), Some("shorttext"));
    }
}
