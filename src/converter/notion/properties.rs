// src/converter/notion/properties.rs
//! Notion properties to relations, options and detail values.
//!
//! [`PropertyService`] is shared by every page task. Relation creation and
//! option creation are guarded by two separate locks, so tasks touching the
//! same property produce exactly one relation snapshot and exactly one
//! option per distinct name.

use super::context::ImportContext;
use crate::api::responses::{
    plain_text, FormulaValue, PropertyItem, PropertyKind, PropertyValue, RawPage, RollupValue,
    SelectOption, User,
};
use crate::api::NotionRepository;
use crate::constants::NOTION_PROPERTY_TRUNCATION;
use crate::converter::markdown::parse_date;
use crate::model::{
    keys, DetailValue, ObjectType, RelationFormat, RelationLink, Snapshot, SnapshotKind,
};
use crate::types::{ObjectId, OptionColor, PageId, RelationKey};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A relation definition allocated during this import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    pub key: RelationKey,
    pub name: String,
    pub format: RelationFormat,
}

impl RelationDef {
    pub fn link(&self) -> RelationLink {
        RelationLink {
            key: self.key.clone(),
            format: self.format,
        }
    }
}

#[derive(Debug, Default)]
pub struct PropertyService {
    /// (database or page scope, property ID) to its relation.
    relations: Mutex<HashMap<(String, String), RelationDef>>,
    /// Relation key to option name to option object.
    options: Mutex<HashMap<RelationKey, HashMap<String, ObjectId>>>,
}

impl PropertyService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The relation for `property_id` within `scope`, creating it (and its
    /// snapshot) on first sight.
    pub fn relation(
        &self,
        scope: &str,
        property_id: &str,
        name: &str,
        format: RelationFormat,
    ) -> (RelationDef, Option<Snapshot>) {
        let mut relations = self.relations.lock();
        let entry = (scope.to_string(), property_id.to_string());
        if let Some(def) = relations.get(&entry) {
            return (def.clone(), None);
        }
        let def = RelationDef {
            key: RelationKey::new(),
            name: name.to_string(),
            format,
        };
        relations.insert(entry, def.clone());
        let snapshot = relation_snapshot(&def);
        (def, Some(snapshot))
    }

    /// The option named `name` of relation `key`, creating it on first sight.
    pub fn option(
        &self,
        key: &RelationKey,
        name: &str,
        color: OptionColor,
    ) -> (ObjectId, Option<Snapshot>) {
        let mut options = self.options.lock();
        let by_name = options.entry(key.clone()).or_default();
        if let Some(id) = by_name.get(name) {
            return (id.clone(), None);
        }
        let id = ObjectId::new();
        by_name.insert(name.to_string(), id.clone());
        (id.clone(), Some(option_snapshot(id, key, name, color)))
    }

    pub fn relation_count(&self) -> usize {
        self.relations.lock().len()
    }
}

pub fn relation_snapshot(def: &RelationDef) -> Snapshot {
    let mut snapshot = Snapshot::new(
        ObjectId::new(),
        def.key.as_str(),
        SnapshotKind::SubObject,
        ObjectType::Relation,
    );
    snapshot.set_name(def.name.clone());
    snapshot.set_detail(keys::RELATION_KEY, def.key.as_str());
    snapshot.set_detail(keys::RELATION_FORMAT, def.format.as_str());
    snapshot
}

pub fn option_snapshot(id: ObjectId, key: &RelationKey, name: &str, color: OptionColor) -> Snapshot {
    let mut snapshot = Snapshot::new(
        id.clone(),
        id.as_str(),
        SnapshotKind::SubObject,
        ObjectType::RelationOption,
    );
    snapshot.set_name(name);
    snapshot.set_detail(keys::RELATION_KEY, key.as_str());
    snapshot.set_detail(keys::RELATION_OPTION_COLOR, color.as_str());
    snapshot
}

/// Relation format for a database column type; `None` for the title column
/// and for types this importer skips.
pub fn schema_format(kind: &str) -> Option<RelationFormat> {
    Some(match kind {
        "rich_text" => RelationFormat::LongText,
        "number" => RelationFormat::Number,
        "select" | "multi_select" => RelationFormat::Tag,
        "status" => RelationFormat::Status,
        "date" | "created_time" | "last_edited_time" => RelationFormat::Date,
        "people" | "relation" | "created_by" | "last_edited_by" => RelationFormat::Object,
        "files" => RelationFormat::File,
        "checkbox" => RelationFormat::Checkbox,
        "url" => RelationFormat::Url,
        "email" => RelationFormat::Email,
        "phone_number" => RelationFormat::Phone,
        "formula" | "rollup" => RelationFormat::ShortText,
        _ => return None,
    })
}

/// Relation format for a concrete value; formulas and rollups follow the
/// type of their result.
pub fn value_format(kind: &PropertyKind) -> Option<RelationFormat> {
    Some(match kind {
        PropertyKind::Title { .. } | PropertyKind::Unsupported => return None,
        PropertyKind::RichText { .. } => RelationFormat::LongText,
        PropertyKind::Number { .. } => RelationFormat::Number,
        PropertyKind::Select { .. } | PropertyKind::MultiSelect { .. } => RelationFormat::Tag,
        PropertyKind::Status { .. } => RelationFormat::Status,
        PropertyKind::Date { .. }
        | PropertyKind::CreatedTime { .. }
        | PropertyKind::LastEditedTime { .. } => RelationFormat::Date,
        PropertyKind::People { .. }
        | PropertyKind::Relation { .. }
        | PropertyKind::CreatedBy { .. }
        | PropertyKind::LastEditedBy { .. } => RelationFormat::Object,
        PropertyKind::Files { .. } => RelationFormat::File,
        PropertyKind::Checkbox { .. } => RelationFormat::Checkbox,
        PropertyKind::Url { .. } => RelationFormat::Url,
        PropertyKind::Email { .. } => RelationFormat::Email,
        PropertyKind::PhoneNumber { .. } => RelationFormat::Phone,
        PropertyKind::Formula { formula } => match formula {
            FormulaValue::Number { .. } => RelationFormat::Number,
            FormulaValue::Boolean { .. } => RelationFormat::Checkbox,
            FormulaValue::Date { .. } => RelationFormat::Date,
            FormulaValue::String { .. } | FormulaValue::Unsupported => RelationFormat::ShortText,
        },
        PropertyKind::Rollup { rollup } => match rollup {
            RollupValue::Number { .. } => RelationFormat::Number,
            RollupValue::Date { .. } => RelationFormat::Date,
            RollupValue::Array { .. } | RollupValue::Unsupported => RelationFormat::ShortText,
        },
    })
}

/// Details, relation links and new sub-objects produced by one page.
#[derive(Debug, Default)]
pub struct MappedProperties {
    pub details: Vec<(RelationKey, DetailValue)>,
    pub links: Vec<RelationLink>,
    pub sub_objects: Vec<Snapshot>,
}

/// Shared collaborators of property mapping.
pub struct PropertyMapper<'a> {
    pub service: &'a PropertyService,
    pub ctx: &'a ImportContext,
    pub repository: &'a dyn NotionRepository,
}

impl PropertyMapper<'_> {
    /// Maps every non-title property of `page`; `scope` is the Notion ID of
    /// the database the page belongs to (or the page itself).
    pub async fn map_page(&self, page: &RawPage, scope: &str) -> MappedProperties {
        let mut mapped = MappedProperties::default();
        for (name, property) in &page.properties {
            let Some(format) = value_format(&property.kind) else {
                continue;
            };
            let kind = self.complete(page, property).await;
            let (def, created) = self.service.relation(scope, &property.id, name, format);
            mapped.sub_objects.extend(created);
            let value = self.detail_value(&kind, &def.key, &mut mapped.sub_objects);
            mapped.links.push(def.link());
            mapped.details.push((def.key, value));
        }
        mapped
    }

    /// Re-reads values Notion truncated in the page object.
    async fn complete(&self, page: &RawPage, property: &PropertyValue) -> PropertyKind {
        let truncated = match &property.kind {
            PropertyKind::RichText { rich_text } => rich_text.len() >= NOTION_PROPERTY_TRUNCATION,
            PropertyKind::Relation { has_more, .. } => *has_more,
            _ => false,
        };
        if !truncated {
            return property.kind.clone();
        }

        let items = match PageId::parse(&page.id) {
            Ok(page_id) => self.repository.property_items(&page_id, &property.id).await,
            Err(e) => Err(e.into()),
        };
        match (items, &property.kind) {
            (Ok(items), PropertyKind::RichText { .. }) => PropertyKind::RichText {
                rich_text: items
                    .into_iter()
                    .filter_map(|item: PropertyItem| item.rich_text.or(item.title))
                    .collect(),
            },
            (Ok(items), PropertyKind::Relation { .. }) => PropertyKind::Relation {
                relation: items.into_iter().filter_map(|item| item.relation).collect(),
                has_more: false,
            },
            (Err(e), kind) => {
                log::warn!(
                    "cannot read full value of property {} on page {}: {}",
                    property.id,
                    page.id,
                    e
                );
                kind.clone()
            }
            (Ok(_), kind) => kind.clone(),
        }
    }

    fn detail_value(
        &self,
        kind: &PropertyKind,
        key: &RelationKey,
        created: &mut Vec<Snapshot>,
    ) -> DetailValue {
        let mut option = |option: &SelectOption| {
            let (id, snapshot) =
                self.service
                    .option(key, &option.name, OptionColor::from_notion(option.color));
            created.extend(snapshot);
            id.to_string()
        };

        match kind {
            PropertyKind::Title { title } => DetailValue::Text(plain_text(title)),
            PropertyKind::RichText { rich_text } => DetailValue::Text(plain_text(rich_text)),
            PropertyKind::Number { number } => number.map(DetailValue::Number).unwrap_or(DetailValue::Null),
            PropertyKind::Select { select } | PropertyKind::Status { status: select } => {
                DetailValue::List(select.iter().map(&mut option).collect())
            }
            PropertyKind::MultiSelect { multi_select } => {
                DetailValue::List(multi_select.iter().map(&mut option).collect())
            }
            PropertyKind::Date { date } => date
                .as_ref()
                .map(|d| date_value(&d.start))
                .unwrap_or(DetailValue::Null),
            PropertyKind::People { people } => DetailValue::List(
                people
                    .iter()
                    .map(|user| {
                        let name = user_name(user);
                        let (id, snapshot) =
                            self.service.option(key, &name, OptionColor::for_name(&name));
                        created.extend(snapshot);
                        id.to_string()
                    })
                    .collect(),
            ),
            PropertyKind::Files { files } => DetailValue::List(
                files
                    .iter()
                    .filter_map(|f| f.file.url().map(str::to_string))
                    .collect(),
            ),
            PropertyKind::Checkbox { checkbox } => DetailValue::Bool(*checkbox),
            PropertyKind::Url { url: value }
            | PropertyKind::Email { email: value }
            | PropertyKind::PhoneNumber {
                phone_number: value,
            } => value.clone().map(DetailValue::Text).unwrap_or(DetailValue::Null),
            PropertyKind::Formula { formula } => match formula {
                FormulaValue::String { string } => {
                    string.clone().map(DetailValue::Text).unwrap_or(DetailValue::Null)
                }
                FormulaValue::Number { number } => {
                    number.map(DetailValue::Number).unwrap_or(DetailValue::Null)
                }
                FormulaValue::Boolean { boolean } => {
                    boolean.map(DetailValue::Bool).unwrap_or(DetailValue::Null)
                }
                FormulaValue::Date { date } => date
                    .as_ref()
                    .map(|d| date_value(&d.start))
                    .unwrap_or(DetailValue::Null),
                FormulaValue::Unsupported => DetailValue::Null,
            },
            PropertyKind::Relation { relation, .. } => DetailValue::List(
                relation
                    .iter()
                    .filter_map(|r| self.ctx.object_id(&r.id))
                    .map(|id| id.to_string())
                    .collect(),
            ),
            PropertyKind::Rollup { rollup } => match rollup {
                RollupValue::Number { number } => {
                    number.map(DetailValue::Number).unwrap_or(DetailValue::Null)
                }
                RollupValue::Date { date } => date
                    .as_ref()
                    .map(|d| date_value(&d.start))
                    .unwrap_or(DetailValue::Null),
                RollupValue::Array { array } => {
                    DetailValue::List(array.iter().flat_map(flatten_plain).collect())
                }
                RollupValue::Unsupported => DetailValue::Null,
            },
            PropertyKind::CreatedTime { created_time: time }
            | PropertyKind::LastEditedTime {
                last_edited_time: time,
            } => date_value(time),
            PropertyKind::CreatedBy { created_by: user }
            | PropertyKind::LastEditedBy {
                last_edited_by: user,
            } => DetailValue::List(vec![user_name(user)]),
            PropertyKind::Unsupported => DetailValue::Null,
        }
    }
}

fn user_name(user: &User) -> String {
    user.name.clone().unwrap_or_else(|| user.id.clone())
}

fn date_value(start: &str) -> DetailValue {
    match parse_date(start) {
        Some(seconds) => DetailValue::Number(seconds as f64),
        None => DetailValue::Text(start.to_string()),
    }
}

/// Plain-text rendering of one rollup array element.
fn flatten_plain(kind: &PropertyKind) -> Vec<String> {
    match kind {
        PropertyKind::Title { title } => vec![plain_text(title)],
        PropertyKind::RichText { rich_text } => vec![plain_text(rich_text)],
        PropertyKind::Number { number } => number.iter().map(|n| n.to_string()).collect(),
        PropertyKind::Select { select } | PropertyKind::Status { status: select } => {
            select.iter().map(|o| o.name.clone()).collect()
        }
        PropertyKind::MultiSelect { multi_select } => {
            multi_select.iter().map(|o| o.name.clone()).collect()
        }
        PropertyKind::Date { date } => date.iter().map(|d| d.start.clone()).collect(),
        PropertyKind::People { people } => people.iter().map(user_name).collect(),
        PropertyKind::Checkbox { checkbox } => vec![checkbox.to_string()],
        PropertyKind::Url { url: value }
        | PropertyKind::Email { email: value }
        | PropertyKind::PhoneNumber {
            phone_number: value,
        } => value.iter().cloned().collect(),
        PropertyKind::Relation { relation, .. } => relation.iter().map(|r| r.id.clone()).collect(),
        PropertyKind::Formula {
            formula: FormulaValue::String { string },
        } => string.iter().cloned().collect(),
        _ => Vec::new(),
    }
}
