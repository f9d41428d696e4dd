// tests/html_import.rs
use docimport::converter::html::HtmlConverter;
use docimport::model::{keys, BlockContent, FileState, TextStyle};
use docimport::{
    Converter, ImportError, ImportFormat, ImportMode, ImportRequest, MemoryStore, ProgressTracker,
    ConverterRegistry, ImportService, SnapshotKind,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write_site(root: &Path) {
    fs::create_dir_all(root.join("img")).unwrap();
    fs::write(
        root.join("index.html"),
        r#"<html><body><h1>Welcome</h1><p>Hello <b>there</b></p><img src="img/cat.png"></body></html>"#,
    )
    .unwrap();
    fs::write(root.join("img/cat.png"), [137u8, 80, 78, 71]).unwrap();
    fs::write(root.join("about.html"), "<p>About us</p>").unwrap();
}

fn request(mode: ImportMode, path: &Path) -> ImportRequest {
    ImportRequest::paths(ImportFormat::Html, mode, vec![path.to_path_buf()])
}

#[tokio::test]
async fn directory_becomes_pages_and_a_root_collection() {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());

    let conversion = HtmlConverter::new()
        .get_snapshots(&request(ImportMode::AllOrNothing, dir.path()), &ProgressTracker::new())
        .await;
    assert!(conversion.errors.is_empty());
    let response = conversion.response.unwrap();

    let mut names: Vec<&str> = response
        .snapshots
        .iter()
        .filter(|s| s.kind == SnapshotKind::Page)
        .filter_map(|s| s.name())
        .collect();
    names.sort();
    assert_eq!(names, vec!["about", "index"]);

    let root = response.find_by_name("HTML Import").unwrap();
    assert_eq!(root.kind, SnapshotKind::Collection);
    assert_eq!(root.collections.len(), 2);

    let index = response.find_by_name("index").unwrap();
    assert_eq!(index.details.get(keys::IS_FAVORITE), Some(&true.into()));
    let heading = index.walk().into_iter().find_map(|b| b.text().cloned()).unwrap();
    assert_eq!(heading.style, TextStyle::Header1);
    assert_eq!(heading.text, "Welcome");

    assert_eq!(response.files.len(), 1);
    let image = index
        .walk()
        .into_iter()
        .find_map(|b| match &b.content {
            BlockContent::File(f) => Some(f.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(image.state, FileState::Pending);
    assert_eq!(image.content_id.as_ref(), Some(&response.files[0].content_id));
}

#[tokio::test]
async fn broken_files_only_fail_themselves_when_ignoring_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("good.html"), "<p>ok</p>").unwrap();
    fs::write(dir.path().join("bad.html"), [0xffu8, 0xfe, 0x00]).unwrap();

    let tolerant = HtmlConverter::new()
        .get_snapshots(&request(ImportMode::IgnoreErrors, dir.path()), &ProgressTracker::new())
        .await;
    assert_eq!(tolerant.errors.len(), 1);
    assert!(tolerant.response.unwrap().find_by_name("good").is_some());

    let strict = HtmlConverter::new()
        .get_snapshots(&request(ImportMode::AllOrNothing, dir.path()), &ProgressTracker::new())
        .await;
    assert!(strict.response.is_none());
    assert_eq!(strict.errors.len(), 1);
}

#[tokio::test]
async fn service_uploads_images_into_the_store() {
    let dir = tempfile::tempdir().unwrap();
    write_site(dir.path());
    let store = Arc::new(MemoryStore::new());
    let service = ImportService::new(ConverterRegistry::with_defaults(), store.clone(), store.clone());

    let outcome = service
        .import(&request(ImportMode::AllOrNothing, dir.path()), &ProgressTracker::new())
        .await;
    assert!(outcome.is_success());
    assert_eq!(outcome.report.unwrap().uploaded_files, 1);
    assert_eq!(store.file_count(), 1);

    let index = store
        .objects()
        .into_iter()
        .find(|s| s.name() == Some("index"))
        .unwrap();
    let uploaded = index.walk().into_iter().any(|b| {
        matches!(&b.content, BlockContent::File(f) if f.state == FileState::Done && f.hash.is_some())
    });
    assert!(uploaded);
}

#[tokio::test]
async fn empty_directories_have_nothing_to_import() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), "plain").unwrap();
    let store = Arc::new(MemoryStore::new());
    let service = ImportService::new(ConverterRegistry::with_defaults(), store.clone(), store);

    let outcome = service
        .import(&request(ImportMode::AllOrNothing, dir.path()), &ProgressTracker::new())
        .await;
    assert!(outcome.response.is_none());
    assert!(matches!(outcome.error, Some(ImportError::NoObjectsToImport)));
}

#[tokio::test]
async fn files_with_other_extensions_count_as_nothing_to_import() {
    let dir = tempfile::tempdir().unwrap();
    let html = dir.path().join("test.html");
    let bare = dir.path().join("test");
    fs::write(&html, "<html><body><h1>hi</h1></body></html>").unwrap();
    fs::write(&bare, "<html><body><h1>hi</h1></body></html>").unwrap();

    let request = ImportRequest::paths(ImportFormat::Html, ImportMode::AllOrNothing, vec![html, bare]);
    let conversion = HtmlConverter::new()
        .get_snapshots(&request, &ProgressTracker::new())
        .await;
    let response = conversion.response.unwrap();
    assert_eq!(response.snapshots.len(), 2);
    assert!(response.find_by_name("test").is_some());
    assert_eq!(
        response.find_by_name("HTML Import").map(|s| s.object_type.as_str()),
        Some("collection")
    );
    assert!(matches!(
        conversion.errors.result_error(),
        Some(ImportError::NoObjectsToImport)
    ));
}
