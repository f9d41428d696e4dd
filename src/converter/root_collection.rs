// src/converter/root_collection.rs
use crate::model::{
    keys, Block, BlockContent, DataviewContent, RelationFormat, RelationLink, Snapshot,
};
use crate::types::{ObjectId, RelationKey};

/// Wraps one import run in a single collection listing `members`.
pub fn build_root_collection(name: &str, members: &[ObjectId]) -> Snapshot {
    let mut snapshot = Snapshot::collection(ObjectId::new(), name);
    snapshot.set_name(name);
    snapshot.set_detail(keys::IS_FAVORITE, true);
    snapshot.set_detail(keys::LAYOUT, "collection");

    let name_link = RelationLink {
        key: RelationKey::from(keys::NAME),
        format: RelationFormat::ShortText,
    };
    snapshot.relation_links.push(name_link.clone());
    snapshot.push_block(Block::new(BlockContent::Dataview(DataviewContent {
        target_object_id: Some(snapshot.id.clone()),
        relation_links: vec![name_link],
    })));
    snapshot.collections = members.to_vec();
    snapshot
}
