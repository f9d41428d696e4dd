// src/model/snapshot.rs
use super::block::{Block, BlockContent};
use super::details::{keys, DetailValue, Details};
use super::relation::RelationLink;
use crate::types::{BlockId, FileContentId, ObjectId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotKind {
    Page,
    Collection,
    SubObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Page,
    Collection,
    Relation,
    RelationOption,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Page => "page",
            ObjectType::Collection => "collection",
            ObjectType::Relation => "relation",
            ObjectType::RelationOption => "relationOption",
        }
    }
}

/// In-memory description of one object, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: ObjectId,
    pub file_name: String,
    pub kind: SnapshotKind,
    pub object_type: ObjectType,
    pub details: Details,
    /// Flat block list; the first block is the root and shares the snapshot ID.
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relation_links: Vec<RelationLink>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<ObjectId>,
}

impl Snapshot {
    /// A snapshot with only its root block.
    pub fn new(
        id: ObjectId,
        file_name: impl Into<String>,
        kind: SnapshotKind,
        object_type: ObjectType,
    ) -> Self {
        let root = Block::with_id(BlockId::from(&id), BlockContent::Smartblock);
        Self {
            id,
            file_name: file_name.into(),
            kind,
            object_type,
            details: Details::new(),
            blocks: vec![root],
            relation_links: Vec::new(),
            collections: Vec::new(),
        }
    }

    pub fn page(id: ObjectId, file_name: impl Into<String>) -> Self {
        Self::new(id, file_name, SnapshotKind::Page, ObjectType::Page)
    }

    pub fn collection(id: ObjectId, file_name: impl Into<String>) -> Self {
        Self::new(id, file_name, SnapshotKind::Collection, ObjectType::Collection)
    }

    pub fn name(&self) -> Option<&str> {
        self.details.name()
    }

    pub fn root_id(&self) -> BlockId {
        BlockId::from(&self.id)
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    /// IDs of the root block's direct children, in order.
    pub fn top_level_ids(&self) -> Vec<BlockId> {
        let root = self.root_id();
        self.block(&root)
            .map(|b| b.children_ids.clone())
            .unwrap_or_default()
    }

    /// Appends `block` as the last child of the root.
    pub fn push_block(&mut self, block: Block) -> BlockId {
        let root = self.root_id();
        self.push_child(&root, block)
    }

    /// Appends `block` as the last child of `parent`.
    pub fn push_child(&mut self, parent: &BlockId, block: Block) -> BlockId {
        let id = block.id.clone();
        if let Some(parent) = self.block_mut(parent) {
            parent.children_ids.push(id.clone());
        }
        self.blocks.push(block);
        id
    }

    /// Places `block` right after `sibling` under the same parent.
    pub fn insert_after(&mut self, sibling: &BlockId, block: Block) -> BlockId {
        let id = block.id.clone();
        let parent = self.blocks.iter_mut().find_map(|b| {
            b.children_ids
                .iter()
                .position(|c| c == sibling)
                .map(|pos| (b, pos))
        });
        match parent {
            Some((parent, pos)) => parent.children_ids.insert(pos + 1, id.clone()),
            None => return self.push_block(block),
        }
        self.blocks.push(block);
        id
    }

    /// Grafts a prepared tree under the root, keeping its order.
    pub fn append_tree(&mut self, tree: BlockTree) {
        let root = self.root_id();
        if let Some(root) = self.block_mut(&root) {
            root.children_ids.extend(tree.top_level);
        }
        self.blocks.extend(tree.blocks);
    }

    /// Every block reachable from the root, in depth-first order.
    pub fn walk(&self) -> Vec<&Block> {
        let mut out = Vec::with_capacity(self.blocks.len());
        let mut stack = vec![self.root_id()];
        while let Some(id) = stack.pop() {
            if let Some(block) = self.block(&id) {
                out.push(block);
                stack.extend(block.children_ids.iter().rev().cloned());
            }
        }
        out
    }

    pub fn set_detail(&mut self, key: impl Into<String>, value: impl Into<DetailValue>) {
        self.details.set(key, value);
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.details.set(keys::NAME, DetailValue::Text(name.into()));
    }
}

/// Builds an ordered block forest before it is grafted into a snapshot.
#[derive(Debug, Clone, Default)]
pub struct BlockTree {
    top_level: Vec<BlockId>,
    blocks: Vec<Block>,
}

impl BlockTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) -> BlockId {
        let id = block.id.clone();
        self.top_level.push(id.clone());
        self.blocks.push(block);
        id
    }

    pub fn push_child(&mut self, parent: &BlockId, block: Block) -> BlockId {
        let id = block.id.clone();
        if let Some(parent) = self.blocks.iter_mut().find(|b| &b.id == parent) {
            parent.children_ids.push(id.clone());
        }
        self.blocks.push(block);
        id
    }

    pub fn last_top_level(&self) -> Option<&BlockId> {
        self.top_level.last()
    }

    pub fn block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| &b.id == id)
    }

    pub fn top_level(&self) -> &[BlockId] {
        &self.top_level
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Where an embedded binary can be read from until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PendingSource {
    Path { path: PathBuf },
    Url { url: String },
    Bytes {
        name: String,
        #[serde(skip)]
        data: Vec<u8>,
    },
}

/// A binary registered by a converter and uploaded by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFile {
    pub content_id: FileContentId,
    pub source: PendingSource,
}

impl PendingFile {
    pub fn new(source: PendingSource) -> Self {
        Self {
            content_id: FileContentId::new(),
            source,
        }
    }
}
