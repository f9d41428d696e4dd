// tests/notion_import.rs
use docimport::api::responses::{PropertyItem, RawPage, SearchObject};
use docimport::constants::NOT_ACCESSIBLE_PLACEHOLDER;
use docimport::converter::notion::NotionConverter;
use docimport::model::{keys, BlockContent, ObjectType, Snapshot};
use docimport::types::PageId;
use docimport::{
    ApiKey, AppError, Converter, ConverterRegistry, DatabaseId, DetailValue, ImportError,
    ImportMode, ImportRequest, ImportService, MemoryStore, NotionErrorCode, NotionId,
    NotionRepository, ObjectId, ProgressTracker, Response,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const DATABASE: &str = "dddddddddddddddddddddddddddddddd";
const HOME: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const ROW_DONE: &str = "11111111111111111111111111111111";
const ROW_OPEN: &str = "22222222222222222222222222222222";
const WORK: [&str; 3] = [
    "33333333333333333333333333333333",
    "44444444444444444444444444444444",
    "55555555555555555555555555555555",
];

fn title(text: &str) -> Value {
    json!({"id": "title", "type": "title", "title": [{"plain_text": text}]})
}

fn row(id: &str, name: &str, status: &str, color: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "parent": {"type": "database_id", "database_id": DATABASE},
        "properties": {
            "Name": title(name),
            "Status": {"id": "s1", "type": "status", "status": {"name": status, "color": color}},
            "Tag": {"id": "t1", "type": "select", "select": {"name": "Work", "color": "blue"}},
            "Titles": {"id": "r1", "type": "rollup", "rollup": {
                "type": "array",
                "array": [{"type": "title", "title": [{"plain_text": "Title"}]}]
            }}
        }
    })
}

fn child_page(id: &str, title: &str) -> Value {
    json!({"id": id, "type": "child_page", "has_children": true, "child_page": {"title": title}})
}

/// A workspace with one database of two rows and a home page holding three
/// child pages that share a title.
struct Workspace {
    search: Result<Vec<Value>, NotionErrorCode>,
    rows: Vec<Value>,
    blocks: HashMap<String, Vec<Value>>,
    broken: HashSet<String>,
}

impl Workspace {
    fn new() -> Self {
        let mut search = vec![
            json!({
                "object": "database",
                "id": DATABASE,
                "title": [{"plain_text": "Tasks"}],
                "parent": {"type": "workspace", "workspace": true},
                "properties": {
                    "Name": {"id": "title", "name": "Name", "type": "title"},
                    "Status": {"id": "s1", "name": "Status", "type": "status"},
                    "Tag": {"id": "t1", "name": "Tag", "type": "select"},
                    "Titles": {"id": "r1", "name": "Titles", "type": "rollup"}
                }
            }),
            json!({
                "object": "page",
                "id": HOME,
                "parent": {"type": "workspace", "workspace": true},
                "properties": {"title": title("Home")}
            }),
        ];
        for id in WORK {
            search.push(json!({
                "object": "page",
                "id": id,
                "parent": {"type": "page_id", "page_id": HOME},
                "properties": {"title": title("Work")}
            }));
        }

        let mut blocks = HashMap::new();
        let mut home = vec![json!({
            "id": "b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0", "type": "paragraph", "has_children": false,
            "paragraph": {"rich_text": [{"plain_text": "My projects"}]}
        })];
        home.extend(WORK.iter().map(|id| child_page(id, "Work")));
        blocks.insert(HOME.to_string(), home);

        Self {
            search: Ok(search),
            rows: vec![
                row(ROW_DONE, "Ship it", "Done", "pink"),
                row(ROW_OPEN, "Write docs", "In progress", "gray"),
            ],
            blocks,
            broken: HashSet::new(),
        }
    }

    fn failing_page(mut self, id: &str) -> Self {
        self.broken.insert(id.to_string());
        self
    }

    fn unauthorized(mut self) -> Self {
        self.search = Err(NotionErrorCode::Unauthorized);
        self
    }
}

fn service_error(code: NotionErrorCode, status: u16) -> AppError {
    AppError::NotionService {
        code,
        message: "mock".to_string(),
        status,
    }
}

#[async_trait::async_trait]
impl NotionRepository for Workspace {
    async fn search(&self) -> Result<Vec<SearchObject>, AppError> {
        match &self.search {
            Ok(objects) => Ok(objects
                .iter()
                .map(|o| serde_json::from_value(o.clone()).unwrap())
                .collect()),
            Err(code) => Err(service_error(code.clone(), 401)),
        }
    }

    async fn query_database(&self, _: &DatabaseId) -> Result<Vec<RawPage>, AppError> {
        Ok(self
            .rows
            .iter()
            .map(|r| serde_json::from_value(r.clone()).unwrap())
            .collect())
    }

    async fn block_children(&self, parent: &NotionId) -> Result<Vec<Value>, AppError> {
        if self.broken.contains(parent.as_str()) {
            return Err(service_error(NotionErrorCode::ObjectNotFound, 404));
        }
        Ok(self.blocks.get(parent.as_str()).cloned().unwrap_or_default())
    }

    async fn property_items(&self, _: &PageId, _: &str) -> Result<Vec<PropertyItem>, AppError> {
        Ok(Vec::new())
    }
}

fn api_key() -> ApiKey {
    ApiKey::new("secret_0123456789abcdef").unwrap()
}

fn converter(workspace: Workspace) -> NotionConverter {
    NotionConverter::with_repository(Arc::new(workspace)).with_workers(3)
}

async fn convert(workspace: Workspace, mode: ImportMode) -> (Option<Response>, usize) {
    let conversion = converter(workspace)
        .get_snapshots(&ImportRequest::notion(mode, api_key()), &ProgressTracker::new())
        .await;
    (conversion.response, conversion.errors.len())
}

fn sub_objects(response: &Response, object_type: ObjectType) -> Vec<&Snapshot> {
    response
        .snapshots
        .iter()
        .filter(|s| s.object_type == object_type)
        .collect()
}

fn relation_key(response: &Response, name: &str) -> String {
    sub_objects(response, ObjectType::Relation)
        .into_iter()
        .find(|r| r.name() == Some(name))
        .and_then(|r| r.details.get_str(keys::RELATION_KEY))
        .unwrap()
        .to_string()
}

fn page_ids_named(response: &Response, name: &str) -> Vec<ObjectId> {
    sub_objects(response, ObjectType::Page)
        .into_iter()
        .filter(|s| s.name() == Some(name))
        .map(|s| s.id.clone())
        .collect()
}

fn link_targets(page: &Snapshot) -> Vec<ObjectId> {
    page.walk()
        .into_iter()
        .filter_map(|b| match &b.content {
            BlockContent::Link { target_block_id } => Some(target_block_id.clone()),
            _ => None,
        })
        .collect()
}

fn option_color<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    sub_objects(response, ObjectType::RelationOption)
        .into_iter()
        .find(|o| o.name() == Some(name))
        .and_then(|o| o.details.get_str(keys::RELATION_OPTION_COLOR))
}

#[tokio::test]
async fn repeated_select_values_share_one_option() {
    let (response, errors) = convert(Workspace::new(), ImportMode::AllOrNothing).await;
    assert_eq!(errors, 0);
    let response = response.unwrap();

    let mut relations: Vec<&str> = sub_objects(&response, ObjectType::Relation)
        .into_iter()
        .filter_map(Snapshot::name)
        .collect();
    relations.sort();
    assert_eq!(relations, vec!["Status", "Tag", "Titles"]);

    let work_options = sub_objects(&response, ObjectType::RelationOption)
        .into_iter()
        .filter(|o| o.name() == Some("Work"))
        .count();
    assert_eq!(work_options, 1);
    assert_eq!(option_color(&response, "Work"), Some("blue"));
}

#[tokio::test]
async fn status_colours_are_mapped_to_the_palette() {
    let (response, _) = convert(Workspace::new(), ImportMode::AllOrNothing).await;
    let response = response.unwrap();
    assert_eq!(option_color(&response, "Done"), Some("pink"));
    assert_eq!(option_color(&response, "In progress"), Some("grey"));

    let status = relation_key(&response, "Status");
    let shipped = response.find_by_name("Ship it").unwrap();
    match shipped.details.get(&status) {
        Some(DetailValue::List(ids)) => assert_eq!(ids.len(), 1),
        other => panic!("unexpected status value {:?}", other),
    }
}

#[tokio::test]
async fn rollup_arrays_flatten_to_text() {
    let (response, _) = convert(Workspace::new(), ImportMode::AllOrNothing).await;
    let response = response.unwrap();
    let titles = relation_key(&response, "Titles");
    let row = response.find_by_name("Write docs").unwrap();
    assert_eq!(
        row.details.get(&titles),
        Some(&DetailValue::List(vec!["Title".to_string()]))
    );
}

#[tokio::test]
async fn same_titled_child_pages_link_to_distinct_pages() {
    let (response, _) = convert(Workspace::new(), ImportMode::AllOrNothing).await;
    let response = response.unwrap();

    let work = page_ids_named(&response, "Work");
    assert_eq!(work.len(), 3);
    assert_eq!(work.iter().collect::<HashSet<_>>().len(), 3);

    // Child blocks claim the pages in the order Notion listed them.
    let home = response.find_by_name("Home").unwrap();
    assert_eq!(link_targets(home), work);
}

#[tokio::test]
async fn database_lists_its_rows() {
    let (response, _) = convert(Workspace::new(), ImportMode::AllOrNothing).await;
    let response = response.unwrap();
    let tasks = response.find_by_name("Tasks").unwrap();
    let rows: HashSet<ObjectId> = ["Ship it", "Write docs"]
        .iter()
        .map(|name| response.find_by_name(name).unwrap().id.clone())
        .collect();
    assert_eq!(tasks.collections.iter().cloned().collect::<HashSet<_>>(), rows);

    let root = response.find_by_name("Notion Import").unwrap();
    assert_eq!(root.collections.len(), 7);
}

#[tokio::test]
async fn a_failing_page_aborts_all_or_nothing() {
    let (response, errors) =
        convert(Workspace::new().failing_page(WORK[2]), ImportMode::AllOrNothing).await;
    assert!(response.is_none());
    assert_eq!(errors, 1);
}

#[tokio::test]
async fn a_failing_page_is_skipped_when_ignoring_errors() {
    let (response, errors) =
        convert(Workspace::new().failing_page(WORK[2]), ImportMode::IgnoreErrors).await;
    assert_eq!(errors, 1);
    let response = response.unwrap();
    let work = page_ids_named(&response, "Work");
    assert_eq!(work.len(), 2);

    let home = response.find_by_name("Home").unwrap();
    assert_eq!(link_targets(home), work);
    let placeholders = home
        .walk()
        .into_iter()
        .filter_map(|b| b.text())
        .filter(|t| t.text == NOT_ACCESSIBLE_PLACEHOLDER)
        .count();
    assert_eq!(placeholders, 1);

    let present: HashSet<&ObjectId> = response.snapshots.iter().map(|s| &s.id).collect();
    for snapshot in &response.snapshots {
        for target in link_targets(snapshot) {
            assert!(present.contains(&target), "dangling link to {:?}", target);
        }
    }
}

#[tokio::test]
async fn rejected_keys_surface_as_unauthorized() {
    let store = Arc::new(MemoryStore::new());
    let registry = ConverterRegistry::new().register(Arc::new(converter(Workspace::new().unauthorized())));
    let service = ImportService::new(registry, store.clone(), store);

    let outcome = service
        .import(
            &ImportRequest::notion(ImportMode::IgnoreErrors, api_key()),
            &ProgressTracker::new(),
        )
        .await;
    assert!(outcome.response.is_none());
    assert!(matches!(outcome.error, Some(ImportError::Unauthorized)));
}

#[tokio::test]
async fn service_installs_relations_and_options() {
    let store = Arc::new(MemoryStore::new());
    let registry = ConverterRegistry::new().register(Arc::new(converter(Workspace::new())));
    let service = ImportService::new(registry, store.clone(), store.clone());

    let outcome = service
        .import(
            &ImportRequest::notion(ImportMode::AllOrNothing, api_key()),
            &ProgressTracker::new(),
        )
        .await;
    assert!(outcome.is_success());
    assert_eq!(store.relations().len(), 3);
    assert_eq!(store.options().len(), 3);
    assert!(store
        .objects()
        .iter()
        .any(|s| s.name() == Some("Tasks") && s.object_type == ObjectType::Collection));
}

#[tokio::test]
async fn importing_twice_reuses_stored_relations_and_options() {
    let store = Arc::new(MemoryStore::new());
    for _ in 0..2 {
        let registry = ConverterRegistry::new().register(Arc::new(converter(Workspace::new())));
        let service = ImportService::new(registry, store.clone(), store.clone());
        let outcome = service
            .import(
                &ImportRequest::notion(ImportMode::AllOrNothing, api_key()),
                &ProgressTracker::new(),
            )
            .await;
        assert!(outcome.is_success());
    }

    let statuses = store
        .relations()
        .into_iter()
        .filter(|r| r.name == "Status")
        .count();
    assert_eq!(statuses, 1);
    assert_eq!(store.relations().len(), 3);
    assert_eq!(store.options().len(), 3);

    let status = store
        .relations()
        .into_iter()
        .find(|r| r.name == "Status")
        .unwrap();
    let done: Vec<ObjectId> = store
        .options()
        .into_iter()
        .filter(|o| o.name == "Done")
        .map(|o| o.id)
        .collect();
    assert_eq!(done.len(), 1);
    let rows: Vec<Snapshot> = store
        .objects()
        .into_iter()
        .filter(|s| s.name() == Some("Ship it"))
        .collect();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(
            row.details.get(status.key.as_str()),
            Some(&DetailValue::List(vec![done[0].to_string()]))
        );
    }
}
