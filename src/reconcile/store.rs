// src/reconcile/store.rs
//! Host store collaborators and an in-memory implementation.

use crate::error::AppError;
use crate::model::{keys, ObjectType, PendingSource, RelationFormat, Snapshot};
use crate::types::{ObjectId, OptionColor, RelationKey};
use indexmap::IndexMap;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A relation definition known to the host store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRelation {
    pub id: ObjectId,
    pub key: RelationKey,
    pub name: String,
    pub format: RelationFormat,
}

/// An option of a relation known to the host store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOption {
    pub id: ObjectId,
    pub key: RelationKey,
    pub name: String,
    pub color: OptionColor,
}

/// Persistence side of the host: relations, options and installed objects.
pub trait ObjectStore: Send + Sync {
    fn find_relation(
        &self,
        name: &str,
        format: RelationFormat,
    ) -> Result<Option<StoredRelation>, AppError>;

    fn create_relation(&self, name: &str, format: RelationFormat) -> Result<StoredRelation, AppError>;

    /// Every option the store holds for relation `key`.
    fn relation_options(&self, key: &RelationKey) -> Result<Vec<StoredOption>, AppError>;

    fn create_option(
        &self,
        key: &RelationKey,
        name: &str,
        color: OptionColor,
    ) -> Result<StoredOption, AppError>;

    /// Persists a reconciled snapshot.
    fn install(&self, snapshot: Snapshot) -> Result<(), AppError>;
}

/// Content-addressed binary storage.
pub trait FileStore: Send + Sync {
    fn exists(&self, hash: &str) -> bool;

    /// Stores the binary behind `source` and returns its hash.
    fn upload(&self, source: &PendingSource) -> Result<String, AppError>;
}

#[derive(Debug, Default)]
struct Inner {
    relations: Vec<StoredRelation>,
    options: Vec<StoredOption>,
    objects: IndexMap<ObjectId, Snapshot>,
    /// Hash to the name the binary was uploaded under.
    files: HashMap<String, String>,
}

/// Thread-safe in-memory [`ObjectStore`] and [`FileStore`].
///
/// URL sources are recorded by their address and never downloaded, which is
/// what a dry run needs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn objects(&self) -> Vec<Snapshot> {
        self.inner.read().objects.values().cloned().collect()
    }

    pub fn object(&self, id: &ObjectId) -> Option<Snapshot> {
        self.inner.read().objects.get(id).cloned()
    }

    pub fn relations(&self) -> Vec<StoredRelation> {
        self.inner.read().relations.clone()
    }

    pub fn options(&self) -> Vec<StoredOption> {
        self.inner.read().options.clone()
    }

    pub fn file_count(&self) -> usize {
        self.inner.read().files.len()
    }
}

impl ObjectStore for MemoryStore {
    fn find_relation(
        &self,
        name: &str,
        format: RelationFormat,
    ) -> Result<Option<StoredRelation>, AppError> {
        Ok(self
            .inner
            .read()
            .relations
            .iter()
            .find(|r| r.name == name && r.format == format)
            .cloned())
    }

    fn create_relation(&self, name: &str, format: RelationFormat) -> Result<StoredRelation, AppError> {
        let relation = StoredRelation {
            id: ObjectId::new(),
            key: RelationKey::new(),
            name: name.to_string(),
            format,
        };
        self.inner.write().relations.push(relation.clone());
        Ok(relation)
    }

    fn relation_options(&self, key: &RelationKey) -> Result<Vec<StoredOption>, AppError> {
        Ok(self
            .inner
            .read()
            .options
            .iter()
            .filter(|o| &o.key == key)
            .cloned()
            .collect())
    }

    fn create_option(
        &self,
        key: &RelationKey,
        name: &str,
        color: OptionColor,
    ) -> Result<StoredOption, AppError> {
        let option = StoredOption {
            id: ObjectId::new(),
            key: key.clone(),
            name: name.to_string(),
            color,
        };
        self.inner.write().options.push(option.clone());
        Ok(option)
    }

    fn install(&self, snapshot: Snapshot) -> Result<(), AppError> {
        let mut inner = self.inner.write();
        let key = snapshot.details.get_str(keys::RELATION_KEY).map(RelationKey::from);
        let name = snapshot.name().unwrap_or_default().to_string();
        match (snapshot.object_type, key) {
            (ObjectType::Relation, Some(key)) => {
                let format = snapshot
                    .details
                    .get_str(keys::RELATION_FORMAT)
                    .and_then(RelationFormat::parse)
                    .ok_or_else(|| {
                        AppError::Store(format!("relation {} has no valid format", snapshot.id))
                    })?;
                inner.relations.push(StoredRelation {
                    id: snapshot.id.clone(),
                    key,
                    name,
                    format,
                });
            }
            (ObjectType::RelationOption, Some(key)) => {
                let color = snapshot
                    .details
                    .get_str(keys::RELATION_OPTION_COLOR)
                    .and_then(|c| serde_json::from_value(serde_json::Value::String(c.to_string())).ok())
                    .unwrap_or_else(|| OptionColor::for_name(&name));
                inner.options.push(StoredOption {
                    id: snapshot.id.clone(),
                    key,
                    name,
                    color,
                });
            }
            (ObjectType::Relation | ObjectType::RelationOption, None) => {
                return Err(AppError::Store(format!(
                    "sub-object {} has no relation key",
                    snapshot.id
                )));
            }
            _ => {}
        }
        inner.objects.insert(snapshot.id.clone(), snapshot);
        Ok(())
    }
}

impl FileStore for MemoryStore {
    fn exists(&self, hash: &str) -> bool {
        self.inner.read().files.contains_key(hash)
    }

    fn upload(&self, source: &PendingSource) -> Result<String, AppError> {
        let (name, digest) = match source {
            PendingSource::Path { path } => {
                let data = std::fs::read(path)?;
                (path.display().to_string(), Sha256::digest(&data))
            }
            PendingSource::Url { url } => (url.clone(), Sha256::digest(url.as_bytes())),
            PendingSource::Bytes { name, data } => (name.clone(), Sha256::digest(data)),
        };
        let hash = format!("{:x}", digest);
        log::debug!("stored {} as {}", name, hash);
        self.inner.write().files.insert(hash.clone(), name);
        Ok(hash)
    }
}
