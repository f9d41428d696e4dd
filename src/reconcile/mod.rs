// src/reconcile/mod.rs
//! Relation reconciliation against the host store.
//!
//! Runs after a converter produced its [`Response`]: duplicate relation and
//! option snapshots of the batch are merged, those the store already holds
//! are replaced by the stored ones, name-based edges are bound to
//! relations of the store, option names become option IDs, and embedded
//! binaries are uploaded and patched into their file blocks.

mod store;

pub use store::{FileStore, MemoryStore, ObjectStore, StoredOption, StoredRelation};

use crate::converter::Response;
use crate::error::AppError;
use crate::model::{
    keys, BlockContent, DetailValue, FileState, ObjectType, PendingSource, RelationEdge,
    RelationFormat, RelationLink, Snapshot,
};
use crate::types::{FileContentId, ObjectId, OptionColor, RelationKey};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub merged_relations: usize,
    pub merged_options: usize,
    pub reused_relations: usize,
    pub reused_options: usize,
    pub bound_edges: usize,
    pub dropped_edges: usize,
    pub uploaded_files: usize,
    pub failed_files: usize,
}

pub struct RelationReconciler<'a> {
    objects: &'a dyn ObjectStore,
    files: &'a dyn FileStore,
    /// Relations bound or created during this import, by name and format.
    created: HashMap<(String, RelationFormat), RelationKey>,
}

impl<'a> RelationReconciler<'a> {
    pub fn new(objects: &'a dyn ObjectStore, files: &'a dyn FileStore) -> Self {
        Self {
            objects,
            files,
            created: HashMap::new(),
        }
    }

    pub fn reconcile(&mut self, response: &mut Response) -> ReconcileReport {
        let mut report = ReconcileReport {
            merged_relations: merge_relations(&mut response.snapshots),
            merged_options: merge_options(&mut response.snapshots),
            ..ReconcileReport::default()
        };
        report.reused_relations = self.adopt_store_relations(&mut response.snapshots);
        report.reused_options = self.adopt_store_options(&mut response.snapshots);
        self.remember_batch_relations(&response.snapshots);

        let relations = std::mem::take(&mut response.relations);
        for (object_id, edges) in relations {
            let Some(snapshot) = response.snapshots.iter_mut().find(|s| s.id == object_id) else {
                log::warn!("relations refer to unknown object {}", object_id);
                report.dropped_edges += edges.len();
                continue;
            };
            for edge in edges {
                match self.bind_edge(snapshot, &edge) {
                    Ok(()) => report.bound_edges += 1,
                    Err(e) => {
                        log::warn!(
                            "dropping relation {} of {}: {}",
                            edge.name,
                            snapshot.id,
                            e
                        );
                        snapshot.details.remove(&edge.detail_key);
                        report.dropped_edges += 1;
                    }
                }
            }
        }

        let (uploaded, failed) = self.upload_pending(response);
        report.uploaded_files = uploaded;
        report.failed_files = failed;
        self.upload_file_details(&mut response.snapshots);

        log::info!(
            "reconciled {} relations ({} dropped), {} files uploaded",
            report.bound_edges,
            report.dropped_edges,
            report.uploaded_files
        );
        report
    }

    /// Drops relation snapshots whose `(name, format)` the store already
    /// holds and points every use of their keys at the stored relation.
    fn adopt_store_relations(&mut self, snapshots: &mut Vec<Snapshot>) -> usize {
        let mut remap: HashMap<RelationKey, RelationKey> = HashMap::new();
        let mut adopted: HashSet<ObjectId> = HashSet::new();
        for snapshot in snapshots
            .iter()
            .filter(|s| s.object_type == ObjectType::Relation)
        {
            let Some((name, format, key)) = relation_identity(snapshot) else {
                continue;
            };
            let stored = match self.objects.find_relation(&name, format) {
                Ok(Some(stored)) => stored,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("relation lookup for {} failed, keeping it: {}", name, e);
                    continue;
                }
            };
            if stored.key != key {
                remap.insert(key, stored.key.clone());
            }
            self.created.insert((name, format), stored.key);
            adopted.insert(snapshot.id.clone());
        }
        if adopted.is_empty() {
            return 0;
        }

        snapshots.retain(|s| !adopted.contains(&s.id));
        if !remap.is_empty() {
            for snapshot in snapshots.iter_mut() {
                remap_keys(snapshot, &remap);
            }
        }
        adopted.len()
    }

    /// Drops option snapshots the store already holds under the same relation
    /// and name, rewriting values that carry their IDs.
    fn adopt_store_options(&self, snapshots: &mut Vec<Snapshot>) -> usize {
        let mut stored: HashMap<RelationKey, Vec<StoredOption>> = HashMap::new();
        let mut remap: HashMap<String, String> = HashMap::new();
        let mut adopted: HashSet<ObjectId> = HashSet::new();
        for snapshot in snapshots
            .iter()
            .filter(|s| s.object_type == ObjectType::RelationOption)
        {
            let (Some(key), Some(name)) = (snapshot.details.get_str(keys::RELATION_KEY), snapshot.name())
            else {
                continue;
            };
            let key = RelationKey::from(key);
            if !stored.contains_key(&key) {
                let options = self.objects.relation_options(&key).unwrap_or_else(|e| {
                    log::warn!("option lookup for {} failed: {}", key, e);
                    Vec::new()
                });
                stored.insert(key.clone(), options);
            }
            let existing = stored
                .get(&key)
                .and_then(|options| options.iter().find(|o| o.name == name));
            if let Some(existing) = existing {
                if existing.id != snapshot.id {
                    remap.insert(snapshot.id.to_string(), existing.id.to_string());
                }
                adopted.insert(snapshot.id.clone());
            }
        }
        snapshots.retain(|s| !adopted.contains(&s.id));
        remap_option_ids(snapshots, &remap);
        adopted.len()
    }

    fn remember_batch_relations(&mut self, snapshots: &[Snapshot]) {
        for snapshot in snapshots
            .iter()
            .filter(|s| s.object_type == ObjectType::Relation)
        {
            if let Some((name, format, key)) = relation_identity(snapshot) {
                self.created.entry((name, format)).or_insert(key);
            }
        }
    }

    /// Reuses a relation of this import, then one of the store, and creates
    /// it otherwise.
    fn relation_key(&mut self, name: &str, format: RelationFormat) -> Result<RelationKey, AppError> {
        let cache_key = (name.to_string(), format);
        if let Some(key) = self.created.get(&cache_key) {
            return Ok(key.clone());
        }
        let existing = match self.objects.find_relation(name, format) {
            Ok(found) => found,
            Err(e) => {
                log::warn!("relation lookup for {} failed, creating it: {}", name, e);
                None
            }
        };
        let relation = match existing {
            Some(relation) => relation,
            None => self.objects.create_relation(name, format)?,
        };
        self.created.insert(cache_key, relation.key.clone());
        Ok(relation.key)
    }

    fn bind_edge(&mut self, snapshot: &mut Snapshot, edge: &RelationEdge) -> Result<(), AppError> {
        let key = self.relation_key(&edge.name, edge.format)?;
        let value = snapshot
            .details
            .get(&edge.detail_key)
            .cloned()
            .unwrap_or(DetailValue::Null);

        let value = if edge.format.has_options() {
            DetailValue::List(self.option_ids(&key, &value.values())?)
        } else {
            value
        };

        snapshot.details.remove(&edge.detail_key);
        snapshot.details.set(key.as_str(), value);
        let link = RelationLink {
            key: key.clone(),
            format: edge.format,
        };
        if !snapshot.relation_links.contains(&link) {
            snapshot.relation_links.push(link);
        }
        if let Some(block_id) = &edge.block_id {
            if let Some(block) = snapshot.block_mut(block_id) {
                block.content = BlockContent::Relation { key };
            }
        }
        Ok(())
    }

    /// Maps option names to option IDs of relation `key`, creating missing
    /// options.
    fn option_ids(&self, key: &RelationKey, names: &[String]) -> Result<Vec<String>, AppError> {
        let mut known: HashMap<String, ObjectId> = self
            .objects
            .relation_options(key)?
            .into_iter()
            .map(|o| (o.name, o.id))
            .collect();
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = match known.get(name) {
                Some(id) => id.clone(),
                None => {
                    let option = self
                        .objects
                        .create_option(key, name, OptionColor::for_name(name))?;
                    known.insert(name.clone(), option.id.clone());
                    option.id
                }
            };
            ids.push(id.to_string());
        }
        Ok(ids)
    }

    /// Uploads every registered binary and patches the file blocks that wait
    /// for it. Returns the (uploaded, failed) counts.
    fn upload_pending(&self, response: &mut Response) -> (usize, usize) {
        let mut hashes: HashMap<FileContentId, String> = HashMap::new();
        let mut failed: HashSet<FileContentId> = HashSet::new();
        for pending in response.files.drain(..) {
            match self.files.upload(&pending.source) {
                Ok(hash) => {
                    hashes.insert(pending.content_id, hash);
                }
                Err(e) => {
                    log::warn!("upload of {:?} failed: {}", pending.source, e);
                    failed.insert(pending.content_id);
                }
            }
        }

        for block in response.snapshots.iter_mut().flat_map(|s| s.blocks.iter_mut()) {
            let BlockContent::File(file) = &mut block.content else {
                continue;
            };
            let Some(content_id) = &file.content_id else {
                continue;
            };
            if let Some(hash) = hashes.get(content_id) {
                file.hash = Some(hash.clone());
                file.state = FileState::Done;
            } else if failed.contains(content_id) {
                file.state = FileState::Error;
            }
        }
        (hashes.len(), failed.len())
    }

    /// Replaces paths and URLs held by file-format details with hashes.
    fn upload_file_details(&self, snapshots: &mut [Snapshot]) {
        for snapshot in snapshots.iter_mut() {
            let file_keys: Vec<RelationKey> = snapshot
                .relation_links
                .iter()
                .filter(|l| l.format == RelationFormat::File)
                .map(|l| l.key.clone())
                .collect();
            for key in file_keys {
                let Some(values) = snapshot.details.get(key.as_str()).map(DetailValue::values) else {
                    continue;
                };
                let hashes: Vec<String> = values
                    .into_iter()
                    .map(|value| self.file_hash(value))
                    .collect();
                snapshot.details.set(key.as_str(), hashes);
            }
        }
    }

    fn file_hash(&self, value: String) -> String {
        if self.files.exists(&value) {
            return value;
        }
        let source = if value.starts_with("http://") || value.starts_with("https://") {
            PendingSource::Url { url: value.clone() }
        } else {
            PendingSource::Path {
                path: PathBuf::from(&value),
            }
        };
        match self.files.upload(&source) {
            Ok(hash) => hash,
            Err(e) => {
                log::warn!("cannot upload {}: {}", value, e);
                value
            }
        }
    }
}

fn relation_identity(snapshot: &Snapshot) -> Option<(String, RelationFormat, RelationKey)> {
    let name = snapshot.name()?.to_string();
    let format = RelationFormat::parse(snapshot.details.get_str(keys::RELATION_FORMAT)?)?;
    let key = RelationKey::from(snapshot.details.get_str(keys::RELATION_KEY)?);
    Some((name, format, key))
}

/// Drops relation snapshots repeating an earlier `(name, format)` and points
/// every use of their keys at the survivor. Returns how many were merged.
pub fn merge_relations(snapshots: &mut Vec<Snapshot>) -> usize {
    let mut first: HashMap<(String, RelationFormat), RelationKey> = HashMap::new();
    let mut remap: HashMap<RelationKey, RelationKey> = HashMap::new();
    let mut merged: HashSet<ObjectId> = HashSet::new();

    for snapshot in snapshots
        .iter()
        .filter(|s| s.object_type == ObjectType::Relation)
    {
        let Some((name, format, key)) = relation_identity(snapshot) else {
            continue;
        };
        match first.get(&(name.clone(), format)) {
            Some(kept) => {
                remap.insert(key, kept.clone());
                merged.insert(snapshot.id.clone());
            }
            None => {
                first.insert((name, format), key);
            }
        }
    }
    if merged.is_empty() {
        return 0;
    }

    snapshots.retain(|s| !merged.contains(&s.id));
    for snapshot in snapshots.iter_mut() {
        remap_keys(snapshot, &remap);
    }
    merged.len()
}

fn remap_keys(snapshot: &mut Snapshot, remap: &HashMap<RelationKey, RelationKey>) {
    let old_keys: Vec<(String, String)> = snapshot
        .details
        .iter()
        .filter_map(|(k, _)| {
            remap
                .get(&RelationKey::from(k.as_str()))
                .map(|new| (k.clone(), new.to_string()))
        })
        .collect();
    for (old, new) in old_keys {
        snapshot.details.rename(&old, &new);
    }

    if snapshot.object_type == ObjectType::RelationOption {
        let key = snapshot
            .details
            .get_str(keys::RELATION_KEY)
            .map(RelationKey::from)
            .and_then(|k| remap.get(&k).cloned());
        if let Some(key) = key {
            snapshot.set_detail(keys::RELATION_KEY, key.as_str());
        }
    }

    remap_links(&mut snapshot.relation_links, remap);
    for block in snapshot.blocks.iter_mut() {
        match &mut block.content {
            BlockContent::Relation { key } => {
                if let Some(new) = remap.get(key) {
                    *key = new.clone();
                }
            }
            BlockContent::Dataview(view) => remap_links(&mut view.relation_links, remap),
            _ => {}
        }
    }
}

fn remap_links(links: &mut Vec<RelationLink>, remap: &HashMap<RelationKey, RelationKey>) {
    for link in links.iter_mut() {
        if let Some(new) = remap.get(&link.key) {
            link.key = new.clone();
        }
    }
    let mut seen = HashSet::new();
    links.retain(|l| seen.insert(l.key.clone()));
}

/// Drops option snapshots repeating an earlier `(relation key, name)` and
/// rewrites detail values holding their IDs. Returns how many were merged.
pub fn merge_options(snapshots: &mut Vec<Snapshot>) -> usize {
    let mut first: HashMap<(String, String), ObjectId> = HashMap::new();
    let mut remap: HashMap<String, String> = HashMap::new();

    for snapshot in snapshots
        .iter()
        .filter(|s| s.object_type == ObjectType::RelationOption)
    {
        let (Some(key), Some(name)) = (snapshot.details.get_str(keys::RELATION_KEY), snapshot.name())
        else {
            continue;
        };
        match first.get(&(key.to_string(), name.to_string())) {
            Some(kept) => {
                remap.insert(snapshot.id.to_string(), kept.to_string());
            }
            None => {
                first.insert((key.to_string(), name.to_string()), snapshot.id.clone());
            }
        }
    }
    if remap.is_empty() {
        return 0;
    }

    snapshots.retain(|s| !remap.contains_key(s.id.as_str()));
    remap_option_ids(snapshots, &remap);
    remap.len()
}

fn remap_option_ids(snapshots: &mut [Snapshot], remap: &HashMap<String, String>) {
    if remap.is_empty() {
        return;
    }
    for snapshot in snapshots.iter_mut() {
        for value in snapshot.details.values_mut() {
            if let DetailValue::List(items) = value {
                for item in items.iter_mut() {
                    if let Some(kept) = remap.get(item.as_str()) {
                        *item = kept.clone();
                    }
                }
            }
        }
    }
}
