// src/converter/notion/mod.rs
//! Notion converter: a whole workspace read through the API.
//!
//! Discovery lists every shared page and database. Databases are converted
//! first, sequentially, so their relations and IDs exist before any page is
//! mapped; pages then run as parallel tasks against the shared
//! [`ImportContext`] and [`PropertyService`].

mod blocks;
mod context;
mod database;
mod page;
mod properties;
mod rich_text;

pub use blocks::BlockMapper;
use blocks::placeholder;
pub use context::{normalize_id, ImportContext};
pub use database::{convert_database, DatabaseOutput};
pub use page::{fetch_blocks, PageTask, TaskEnv, TaskOutput, TaskState};
pub use properties::{option_snapshot, relation_snapshot, PropertyMapper, PropertyService, RelationDef};
pub use rich_text::to_text;

use super::{build_root_collection, Conversion, Converter, ImportParams, ImportRequest, Progress, Response};
use crate::api::responses::{FileObject, Parent, RawDatabase, RawPage, SearchObject};
use crate::api::{NotionHttpClient, NotionRepository};
use crate::constants::{
    DATABASE_PROGRESS_STEPS, MAX_PAGE_WORKERS, MIN_PAGE_WORKERS, NOTION_ROOT_COLLECTION_NAME,
    PAGE_PROGRESS_STEPS, SEARCH_RETRY_ATTEMPTS, SEARCH_RETRY_DELAY,
};
use crate::converter::markdown::parse_date;
use crate::error::{AppError, ConvertError};
use crate::error_recovery::retry_on_transport;
use crate::model::{keys, BlockContent, MarkKind, Snapshot, COVER_TYPE_IMAGE};
use crate::types::{ApiKey, DatabaseId, ObjectId};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

pub const NAME: &str = "notion";

type RepositoryFactory =
    Arc<dyn Fn(&ApiKey) -> Result<Arc<dyn NotionRepository>, AppError> + Send + Sync>;

pub struct NotionConverter {
    repository: RepositoryFactory,
    workers: usize,
}

impl Default for NotionConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotionConverter {
    /// A converter talking to the Notion API with the request's key.
    pub fn new() -> Self {
        Self {
            repository: Arc::new(|key: &ApiKey| {
                let client = NotionHttpClient::new(key)?;
                Ok(Arc::new(client) as Arc<dyn NotionRepository>)
            }),
            workers: num_cpus::get().clamp(MIN_PAGE_WORKERS, MAX_PAGE_WORKERS),
        }
    }

    /// A converter reading from `repository` whatever key the request holds.
    pub fn with_repository(repository: Arc<dyn NotionRepository>) -> Self {
        Self {
            repository: Arc::new(move |_: &ApiKey| Ok(Arc::clone(&repository))),
            ..Self::new()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Pages and databases visible to the integration.
#[derive(Debug, Default)]
struct Discovered {
    databases: Vec<RawDatabase>,
    pages: Vec<RawPage>,
}

async fn discover(repository: &dyn NotionRepository) -> Result<Discovered, AppError> {
    let results = retry_on_transport(
        || repository.search(),
        SEARCH_RETRY_ATTEMPTS,
        SEARCH_RETRY_DELAY,
    )
    .await?;

    let mut found = Discovered::default();
    for object in results {
        match object {
            SearchObject::Page(page) => found.pages.push(page),
            SearchObject::Database(database) => found.databases.push(database),
            SearchObject::Unsupported => {}
        }
    }

    let mut seen: HashSet<String> = found.pages.iter().map(|p| normalize_id(&p.id)).collect();
    for database in &found.databases {
        let rows = match DatabaseId::parse(&database.id) {
            Ok(id) => repository.query_database(&id).await,
            Err(e) => Err(e.into()),
        };
        match rows {
            Ok(rows) => {
                for row in rows {
                    if seen.insert(normalize_id(&row.id)) {
                        found.pages.push(row);
                    }
                }
            }
            Err(e) => log::warn!("cannot query rows of database {}: {}", database.id, e),
        }
    }
    Ok(found)
}

/// Notion ID the relations of `page` are scoped to: its database, or the
/// page itself when it is not a row.
pub(crate) fn scope_of(page: &RawPage) -> String {
    match &page.parent {
        Parent::DatabaseId { database_id } => normalize_id(database_id),
        _ => normalize_id(&page.id),
    }
}

/// Source, icon, cover, archive flag and timestamps shared by pages and
/// databases.
pub(crate) fn apply_common_details(
    snapshot: &mut Snapshot,
    url: Option<&str>,
    icon: Option<&FileObject>,
    cover: Option<&FileObject>,
    archived: bool,
    created: Option<&str>,
    edited: Option<&str>,
) {
    if let Some(url) = url {
        snapshot.set_detail(keys::SOURCE, url);
    }
    match icon {
        Some(FileObject::Emoji { emoji }) => snapshot.set_detail(keys::ICON_EMOJI, emoji.as_str()),
        Some(other) => {
            if let Some(url) = other.url() {
                snapshot.set_detail(keys::ICON_IMAGE, url);
            }
        }
        None => {}
    }
    if let Some(url) = cover.and_then(FileObject::url) {
        snapshot.set_detail(keys::COVER_ID, url);
        snapshot.set_detail(keys::COVER_TYPE, COVER_TYPE_IMAGE);
    }
    snapshot.set_detail(keys::IS_ARCHIVED, archived);
    if let Some(seconds) = created.and_then(parse_date) {
        snapshot.set_detail(keys::CREATED_DATE, seconds as f64);
    }
    if let Some(seconds) = edited.and_then(parse_date) {
        snapshot.set_detail(keys::LAST_MODIFIED_DATE, seconds as f64);
    }
}

/// Points links at pages whose task failed to the placeholder and strips
/// mentions of them, so no block refers to an object missing from the import.
pub(crate) fn unlink_failed(page: &mut Snapshot, failed: &HashSet<ObjectId>) {
    let failed_params: HashSet<String> = failed.iter().map(ToString::to_string).collect();
    for block in &mut page.blocks {
        let dangling = match &block.content {
            BlockContent::Link { target_block_id } => failed.contains(target_block_id),
            BlockContent::Dataview(view) => view
                .target_object_id
                .as_ref()
                .is_some_and(|target| failed.contains(target)),
            _ => false,
        };
        if dangling {
            block.content = placeholder();
        } else if let Some(text) = block.text_mut() {
            text.marks
                .retain(|m| m.kind != MarkKind::Mention || !failed_params.contains(&m.param));
        }
    }
}

#[async_trait::async_trait]
impl Converter for NotionConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn get_snapshots(&self, request: &ImportRequest, progress: &dyn Progress) -> Conversion {
        let ImportParams::Notion { api_key } = &request.params else {
            return Conversion::failed(ConvertError::from_error(
                NAME,
                AppError::MissingConfiguration("Notion import needs an API key".into()),
            ));
        };
        let repository = match (self.repository)(api_key) {
            Ok(repository) => repository,
            Err(e) => return Conversion::failed(ConvertError::from_error(NAME, e)),
        };
        let repository = repository.as_ref();

        progress.set_progress_message("Searching Notion workspace");
        let found = match discover(repository).await {
            Ok(found) => found,
            Err(e) => {
                log::error!("Notion search failed: {}", e);
                return Conversion::failed(ConvertError::from_error("search", e));
            }
        };
        log::info!(
            "found {} databases and {} pages",
            found.databases.len(),
            found.pages.len()
        );
        if found.databases.is_empty() && found.pages.is_empty() {
            return Conversion::failed(ConvertError::from_error(NAME, AppError::NoObjectsToImport));
        }
        progress.set_total(
            found.databases.len() as i64 * DATABASE_PROGRESS_STEPS
                + found.pages.len() as i64 * PAGE_PROGRESS_STEPS,
        );

        let ctx = ImportContext::new();
        let properties = PropertyService::new();
        let mut errors = ConvertError::new();
        let mut response = Response::default();
        let mut members: Vec<ObjectId> = Vec::new();

        progress.set_progress_message("Converting Notion databases");
        let database_ids: Vec<ObjectId> = found
            .databases
            .iter()
            .map(|db| ctx.register_database(&db.id, &db.name(), &db.parent))
            .collect();
        let mut databases = Vec::with_capacity(found.databases.len());
        for (database, id) in found.databases.iter().zip(database_ids) {
            if let Err(e) = progress.try_step(1) {
                errors.add(database.name(), e);
                return Conversion::failed(errors);
            }
            let rows: Vec<RawPage> = found
                .pages
                .iter()
                .filter(|p| scope_of(p) == normalize_id(&database.id))
                .cloned()
                .collect();
            let output = convert_database(database, id.clone(), &rows, &properties);
            response.snapshots.extend(output.relations);
            databases.push((normalize_id(&database.id), output.snapshot));
            if let Err(e) = progress.try_step(1) {
                errors.add(database.name(), e);
                return Conversion::failed(errors);
            }
        }

        progress.set_progress_message("Converting Notion pages");
        let tasks: Vec<PageTask> = found
            .pages
            .into_iter()
            .map(|page| {
                let id = ctx.register_page(&page.id, &page.title(), &page.parent);
                PageTask::new(page, id)
            })
            .collect();

        let env = TaskEnv {
            repository,
            ctx: &ctx,
            properties: &properties,
            progress,
        };
        let mut outputs = stream::iter(tasks.into_iter().map(|task| task.run(&env)))
            .buffered(self.workers);

        let mut converted = HashSet::new();
        let mut failed = HashSet::new();
        let mut pages = Vec::new();
        while let Some(output) = outputs.next().await {
            response.snapshots.extend(output.sub_objects);
            match (output.snapshot, output.error) {
                (Some(snapshot), _) => {
                    converted.insert(output.id.clone());
                    response.files.extend(output.files);
                    pages.push(snapshot);
                }
                (None, error) => {
                    failed.insert(output.id.clone());
                    let label = if output.title.is_empty() {
                        output.id.to_string()
                    } else {
                        output.title
                    };
                    let error = error.unwrap_or_else(|| AppError::InternalError {
                        message: format!("page task ended {}", output.state),
                    });
                    let cancelled = error.is_cancelled();
                    errors.add(label, error);
                    if cancelled || errors.should_abort(request.mode) {
                        return Conversion::failed(errors);
                    }
                }
            }
        }

        for (notion_id, mut snapshot) in databases {
            snapshot.collections = ctx
                .children_of(&notion_id)
                .into_iter()
                .filter(|id| converted.contains(id) || ctx.is_database(id))
                .collect();
            members.push(snapshot.id.clone());
            response.snapshots.push(snapshot);
        }
        for mut page in pages {
            if !failed.is_empty() {
                unlink_failed(&mut page, &failed);
            }
            members.push(page.id.clone());
            response.snapshots.push(page);
        }

        log::info!(
            "converted {} Notion objects with {} failures",
            members.len(),
            errors.len()
        );
        response
            .snapshots
            .push(build_root_collection(NOTION_ROOT_COLLECTION_NAME, &members));
        Conversion::new(response, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::responses::{FileUrl, RawPage};
    use crate::model::{Block, Mark, Range, TextContent};
    use serde_json::json;

    fn page(parent: serde_json::Value) -> RawPage {
        serde_json::from_value(json!({
            "object": "page", "id": "abababab-abab-abab-abab-abababababab", "parent": parent
        }))
        .unwrap()
    }

    #[test]
    fn rows_are_scoped_to_their_database() {
        let row = page(json!({"type": "database_id", "database_id": "12121212-1212-1212-1212-121212121212"}));
        assert_eq!(scope_of(&row), "12121212121212121212121212121212");

        let loose = page(json!({"type": "workspace", "workspace": true}));
        assert_eq!(scope_of(&loose), "abababababababababababababababab");
    }

    #[test]
    fn links_to_failed_pages_become_placeholders() {
        let failed_id = ObjectId::new();
        let kept_id = ObjectId::new();
        let mut page = Snapshot::page(ObjectId::new(), "home");
        page.push_block(Block::new(BlockContent::Link {
            target_block_id: failed_id.clone(),
        }));
        page.push_block(Block::new(BlockContent::Link {
            target_block_id: kept_id.clone(),
        }));
        let mut text = TextContent::paragraph("see it");
        text.marks.push(Mark::with_param(Range::new(4, 6), MarkKind::Mention, failed_id.to_string()));
        page.push_block(Block::new(BlockContent::Text(text)));

        unlink_failed(&mut page, &HashSet::from([failed_id]));

        let contents: Vec<&BlockContent> = page.walk().into_iter().skip(1).map(|b| &b.content).collect();
        assert_eq!(contents[0], &placeholder());
        assert_eq!(contents[1], &BlockContent::Link { target_block_id: kept_id });
        assert!(page.walk()[3].text().is_some_and(|t| t.marks.is_empty()));
    }

    #[test]
    fn icons_and_covers_become_details() {
        let mut snapshot = Snapshot::page(ObjectId::new(), "p");
        let cover = FileObject::External {
            external: FileUrl {
                url: "https://x/cover.png".into(),
            },
        };
        apply_common_details(
            &mut snapshot,
            Some("https://www.notion.so/p"),
            Some(&FileObject::Emoji { emoji: "🚀".into() }),
            Some(&cover),
            false,
            Some("2024-01-02T00:00:00.000Z"),
            None,
        );
        assert_eq!(snapshot.details.get_str(keys::ICON_EMOJI), Some("🚀"));
        assert_eq!(snapshot.details.get_str(keys::COVER_ID), Some("https://x/cover.png"));
        assert_eq!(snapshot.details.get_str(keys::SOURCE), Some("https://www.notion.so/p"));
        assert!(snapshot.details.contains_key(keys::CREATED_DATE));
        assert!(!snapshot.details.contains_key(keys::LAST_MODIFIED_DATE));
    }
}
