// src/converter/notion/context.rs
//! Per-import scratch space: Notion IDs and names mapped to local IDs.
//!
//! The database phase fills the database maps, the page phase registers
//! pages before any task runs, so every lookup made while mapping blocks
//! sees the complete set of targets.

use crate::api::responses::Parent;
use crate::types::{NotionId, ObjectId};
use dashmap::{DashMap, DashSet};

/// Normalises a Notion ID to its undashed lowercase form.
pub fn normalize_id(id: &str) -> String {
    NotionId::parse(id)
        .map(|n| n.as_str().to_string())
        .unwrap_or_else(|_| id.replace('-', "").to_ascii_lowercase())
}

/// Notion ID of the object `parent` points at, if any.
pub fn parent_id(parent: &Parent) -> Option<String> {
    match parent {
        Parent::DatabaseId { database_id } => Some(normalize_id(database_id)),
        Parent::PageId { page_id } => Some(normalize_id(page_id)),
        Parent::BlockId { block_id } => Some(normalize_id(block_id)),
        Parent::Workspace | Parent::Unknown => None,
    }
}

#[derive(Debug, Default)]
pub struct ImportContext {
    database_ids: DashMap<String, ObjectId>,
    database_names: DashMap<String, ObjectId>,
    page_ids: DashMap<String, ObjectId>,
    page_names: DashMap<String, ObjectId>,
    /// Recorded name of every local object.
    names: DashMap<ObjectId, String>,
    databases: DashSet<ObjectId>,
    /// Notion parent ID to the ordered local IDs of its children. Entries are
    /// consumed as child blocks resolve against them.
    children: DashMap<String, Vec<ObjectId>>,
}

impl ImportContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_database(&self, notion_id: &str, name: &str, parent: &Parent) -> ObjectId {
        let id = self
            .database_ids
            .entry(normalize_id(notion_id))
            .or_default()
            .clone();
        self.database_names
            .entry(name.to_string())
            .or_insert_with(|| id.clone());
        self.databases.insert(id.clone());
        self.record_child(&id, name, parent);
        id
    }

    pub fn register_page(&self, notion_id: &str, name: &str, parent: &Parent) -> ObjectId {
        let id = self.page_ids.entry(normalize_id(notion_id)).or_default().clone();
        self.page_names
            .entry(name.to_string())
            .or_insert_with(|| id.clone());
        self.record_child(&id, name, parent);
        id
    }

    fn record_child(&self, id: &ObjectId, name: &str, parent: &Parent) {
        self.names.insert(id.clone(), name.to_string());
        if let Some(parent) = parent_id(parent) {
            self.children.entry(parent).or_default().push(id.clone());
        }
    }

    pub fn database_id(&self, notion_id: &str) -> Option<ObjectId> {
        self.database_ids
            .get(&normalize_id(notion_id))
            .map(|id| id.clone())
    }

    pub fn page_id(&self, notion_id: &str) -> Option<ObjectId> {
        self.page_ids.get(&normalize_id(notion_id)).map(|id| id.clone())
    }

    /// A page or database with this Notion ID.
    pub fn object_id(&self, notion_id: &str) -> Option<ObjectId> {
        self.page_id(notion_id).or_else(|| self.database_id(notion_id))
    }

    pub fn database_by_name(&self, name: &str) -> Option<ObjectId> {
        self.database_names.get(name).map(|id| id.clone())
    }

    pub fn page_by_name(&self, name: &str) -> Option<ObjectId> {
        self.page_names.get(name).map(|id| id.clone())
    }

    pub fn name_of(&self, id: &ObjectId) -> Option<String> {
        self.names.get(id).map(|n| n.clone())
    }

    /// Takes the first not-yet-claimed child page of `parent` named `title`.
    ///
    /// Each call removes the match, so siblings sharing a title resolve to
    /// distinct objects in enumeration order.
    pub fn claim_child(&self, parent: &str, title: &str) -> Option<ObjectId> {
        self.claim(parent, title, false)
    }

    /// Like [`claim_child`](Self::claim_child) for inline databases.
    pub fn claim_database(&self, parent: &str, title: &str) -> Option<ObjectId> {
        self.claim(parent, title, true)
    }

    fn claim(&self, parent: &str, title: &str, database: bool) -> Option<ObjectId> {
        let mut children = self.children.get_mut(&normalize_id(parent))?;
        let pos = children.iter().position(|id| {
            self.databases.contains(id) == database
                && self.names.get(id).map(|n| n.as_str() == title).unwrap_or(false)
        })?;
        Some(children.remove(pos))
    }

    pub fn is_database(&self, id: &ObjectId) -> bool {
        self.databases.contains(id)
    }

    /// Children of `parent` nobody has claimed yet.
    pub fn children_of(&self, parent: &str) -> Vec<ObjectId> {
        self.children
            .get(&normalize_id(parent))
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}
