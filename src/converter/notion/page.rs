// src/converter/notion/page.rs
//! One page import task: fetch blocks, map them, map properties.

use super::blocks::BlockMapper;
use super::context::{normalize_id, ImportContext};
use super::properties::{PropertyMapper, PropertyService};
use super::{apply_common_details, scope_of};
use crate::api::{is_container, parse_block, NotionBlock, NotionRepository};
use crate::api::responses::RawPage;
use crate::constants::BLOCK_CHILDREN_MAX_DEPTH;
use crate::converter::Progress;
use crate::error::AppError;
use crate::model::{PendingFile, Snapshot};
use crate::types::{NotionId, ObjectId};
use serde_json::Value;
use std::fmt;

/// Lifecycle of a [`PageTask`]; `Failed` is terminal for the task only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    FetchingBlocks,
    FetchingChildren,
    MappingBlocks,
    MappingProperties,
    Done,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Pending => "pending",
            TaskState::FetchingBlocks => "fetching blocks",
            TaskState::FetchingChildren => "fetching children",
            TaskState::MappingBlocks => "mapping blocks",
            TaskState::MappingProperties => "mapping properties",
            TaskState::Done => "done",
            TaskState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Collaborators shared by every task of one import.
pub struct TaskEnv<'a> {
    pub repository: &'a dyn NotionRepository,
    pub ctx: &'a ImportContext,
    pub properties: &'a PropertyService,
    pub progress: &'a dyn Progress,
}

/// Result of a task; `snapshot` is present only when the task is `Done`.
#[derive(Debug)]
pub struct TaskOutput {
    pub id: ObjectId,
    pub title: String,
    pub snapshot: Option<Snapshot>,
    pub sub_objects: Vec<Snapshot>,
    pub files: Vec<PendingFile>,
    pub state: TaskState,
    pub error: Option<AppError>,
}

#[derive(Debug)]
pub struct PageTask {
    page: RawPage,
    id: ObjectId,
    state: TaskState,
}

impl PageTask {
    /// A task for a page already registered in the import context under `id`.
    pub fn new(page: RawPage, id: ObjectId) -> Self {
        Self {
            page,
            id,
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub async fn run(mut self, env: &TaskEnv<'_>) -> TaskOutput {
        let mut files = Vec::new();
        let mut sub_objects = Vec::new();
        let result = self.convert(env, &mut files, &mut sub_objects).await;
        let title = self.page.title();
        match result {
            Ok(snapshot) => {
                self.state = TaskState::Done;
                TaskOutput {
                    id: self.id,
                    title,
                    snapshot: Some(snapshot),
                    sub_objects,
                    files,
                    state: self.state,
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("page {} ({}) failed while {}: {}", self.page.id, title, self.state, e);
                self.state = TaskState::Failed;
                TaskOutput {
                    id: self.id,
                    title,
                    snapshot: None,
                    sub_objects,
                    files: Vec::new(),
                    state: self.state,
                    error: Some(e),
                }
            }
        }
    }

    async fn convert(
        &mut self,
        env: &TaskEnv<'_>,
        files: &mut Vec<PendingFile>,
        sub_objects: &mut Vec<Snapshot>,
    ) -> Result<Snapshot, AppError> {
        let notion_id = NotionId::parse(&self.page.id)?;

        self.state = TaskState::FetchingBlocks;
        let blocks = fetch_blocks(env.repository, &notion_id, &mut self.state).await?;
        env.progress.try_step(1)?;

        self.state = TaskState::MappingBlocks;
        let mut snapshot = Snapshot::page(self.id.clone(), notion_id.as_str());
        snapshot.set_name(self.page.title());
        apply_common_details(
            &mut snapshot,
            self.page.url.as_deref(),
            self.page.icon.as_ref(),
            self.page.cover.as_ref(),
            self.page.archived,
            self.page.created_time.as_deref(),
            self.page.last_edited_time.as_deref(),
        );
        let page_id = normalize_id(&self.page.id);
        let (tree, pending) = BlockMapper::new(env.ctx, &page_id).map(&blocks);
        snapshot.append_tree(tree);
        files.extend(pending);
        env.progress.try_step(1)?;

        self.state = TaskState::MappingProperties;
        let mapper = PropertyMapper {
            service: env.properties,
            ctx: env.ctx,
            repository: env.repository,
        };
        let mapped = mapper.map_page(&self.page, &scope_of(&self.page)).await;
        for (key, value) in mapped.details {
            snapshot.set_detail(key.as_str(), value);
        }
        snapshot.relation_links.extend(mapped.links);
        sub_objects.extend(mapped.sub_objects);
        env.progress.try_step(1)?;
        Ok(snapshot)
    }
}

/// Fetches the block tree of `page`, following `has_children` with an
/// explicit stack. Blocks deeper than [`BLOCK_CHILDREN_MAX_DEPTH`] keep no
/// children.
pub async fn fetch_blocks(
    repository: &dyn NotionRepository,
    page: &NotionId,
    state: &mut TaskState,
) -> Result<Vec<NotionBlock>, AppError> {
    let mut roots = decode_blocks(repository.block_children(page).await?);
    let mut stack: Vec<(Vec<usize>, usize)> = expandable(&roots, &[], 1);

    while let Some((path, depth)) = stack.pop() {
        *state = TaskState::FetchingChildren;
        let Some(block) = block_at(&mut roots, &path) else {
            continue;
        };
        if depth > BLOCK_CHILDREN_MAX_DEPTH {
            log::warn!(
                "block {}: {}",
                block.id,
                AppError::RecursionLimitExceeded(BLOCK_CHILDREN_MAX_DEPTH)
            );
            continue;
        }
        let id = NotionId::parse(&block.id)?;
        let children = decode_blocks(repository.block_children(&id).await?);
        let next = expandable(&children, &path, depth + 1);
        if let Some(block) = block_at(&mut roots, &path) {
            block.children = children;
        }
        stack.extend(next);
    }
    Ok(roots)
}

/// Decodes a children listing; undecodable blocks are skipped.
fn decode_blocks(raw: Vec<Value>) -> Vec<NotionBlock> {
    raw.iter()
        .filter_map(|value| match parse_block(value) {
            Ok(block) => Some(block),
            Err(e) => {
                log::warn!("skipping block: {}", e);
                None
            }
        })
        .collect()
}

/// Paths of the blocks in `blocks` whose children still have to be fetched,
/// reversed so the stack pops them in document order.
fn expandable(blocks: &[NotionBlock], prefix: &[usize], depth: usize) -> Vec<(Vec<usize>, usize)> {
    blocks
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, b)| b.has_children && is_container(&b.kind))
        .map(|(i, _)| {
            let mut path = prefix.to_vec();
            path.push(i);
            (path, depth)
        })
        .collect()
}

fn block_at<'a>(roots: &'a mut [NotionBlock], path: &[usize]) -> Option<&'a mut NotionBlock> {
    let (first, rest) = path.split_first()?;
    let mut block = roots.get_mut(*first)?;
    for index in rest {
        block = block.children.get_mut(*index)?;
    }
    Some(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::responses::{PropertyItem, RawPage, SearchObject};
    use crate::api::BlockKind;
    use crate::types::{DatabaseId, PageId};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a chain of nested toggles, each holding the next.
    struct DeepRepository {
        calls: AtomicUsize,
        children: HashMap<String, Vec<Value>>,
    }

    fn hex(n: usize) -> String {
        format!("{:032x}", n)
    }

    impl DeepRepository {
        fn chain(depth: usize) -> Self {
            let mut children = HashMap::new();
            for level in 0..depth {
                let child = json!({
                    "id": hex(level + 1), "type": "toggle", "has_children": true,
                    "toggle": {"rich_text": [{"plain_text": format!("level {}", level + 1)}]}
                });
                children.insert(hex(level), vec![child]);
            }
            Self {
                calls: AtomicUsize::new(0),
                children,
            }
        }
    }

    #[async_trait::async_trait]
    impl NotionRepository for DeepRepository {
        async fn search(&self) -> Result<Vec<SearchObject>, AppError> {
            Ok(Vec::new())
        }

        async fn query_database(&self, _: &DatabaseId) -> Result<Vec<RawPage>, AppError> {
            Ok(Vec::new())
        }

        async fn block_children(&self, parent: &NotionId) -> Result<Vec<Value>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.children.get(parent.as_str()).cloned().unwrap_or_default())
        }

        async fn property_items(&self, _: &PageId, _: &str) -> Result<Vec<PropertyItem>, AppError> {
            Ok(Vec::new())
        }
    }

    fn depth_of(blocks: &[NotionBlock]) -> usize {
        blocks
            .iter()
            .map(|b| 1 + depth_of(&b.children))
            .max()
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn nested_children_are_attached_in_place() {
        let repository = DeepRepository::chain(3);
        let mut state = TaskState::Pending;
        let blocks = fetch_blocks(&repository, &NotionId::parse(&hex(0)).unwrap(), &mut state)
            .await
            .unwrap();

        assert_eq!(depth_of(&blocks), 3);
        assert_eq!(state, TaskState::FetchingChildren);
        assert!(matches!(blocks[0].kind, BlockKind::Toggle(_)));
    }

    #[tokio::test]
    async fn deep_trees_stop_at_the_cap() {
        let repository = DeepRepository::chain(BLOCK_CHILDREN_MAX_DEPTH + 10);
        let mut state = TaskState::Pending;
        let blocks = fetch_blocks(&repository, &NotionId::parse(&hex(0)).unwrap(), &mut state)
            .await
            .unwrap();

        assert_eq!(depth_of(&blocks), BLOCK_CHILDREN_MAX_DEPTH + 1);
        assert_eq!(
            repository.calls.load(Ordering::SeqCst),
            BLOCK_CHILDREN_MAX_DEPTH + 1
        );
    }
}
