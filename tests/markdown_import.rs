// tests/markdown_import.rs
use docimport::converter::markdown::MarkdownConverter;
use docimport::model::{keys, BlockContent, FileKind, FileState};
use docimport::{
    Converter, ConverterRegistry, DetailValue, ImportFormat, ImportMode, ImportRequest,
    ImportService, MemoryStore, ProgressTracker, RelationFormat,
};
use pretty_assertions::assert_eq;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

const INDEX: &str = "---
title: Home
tags: [work, travel]
---
[Child](notes/child.md)

See [report](files/report.pdf) now
";

fn write_vault(root: &Path) {
    fs::create_dir_all(root.join("notes")).unwrap();
    fs::create_dir_all(root.join("files")).unwrap();
    fs::write(root.join("index.md"), INDEX).unwrap();
    fs::write(root.join("notes/child.md"), "# Child\n\nNested page\n").unwrap();
    fs::write(root.join("files/report.pdf"), b"%PDF-1.4").unwrap();
}

fn request(path: &Path) -> ImportRequest {
    ImportRequest::paths(ImportFormat::Markdown, ImportMode::AllOrNothing, vec![path.to_path_buf()])
}

#[tokio::test]
async fn links_become_page_links_and_file_blocks() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());

    let conversion = MarkdownConverter::new()
        .get_snapshots(&request(dir.path()), &ProgressTracker::new())
        .await;
    assert!(conversion.errors.is_empty());
    let response = conversion.response.unwrap();

    let home = response.find_by_name("Home").unwrap();
    let child = response.find_by_name("child").unwrap();
    assert_eq!(home.details.get(keys::IS_FAVORITE), Some(&true.into()));
    assert!(!child.details.contains_key(keys::IS_FAVORITE));

    let blocks = home.walk();
    let linked = blocks.iter().any(|b| {
        matches!(&b.content, BlockContent::Link { target_block_id } if *target_block_id == child.id)
    });
    assert!(linked);

    let report = blocks
        .iter()
        .find_map(|b| match &b.content {
            BlockContent::File(f) => Some(f.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(report.kind, FileKind::Pdf);
    assert_eq!(report.name, "report");
    assert_eq!(report.state, FileState::Pending);
    assert_eq!(response.files.len(), 1);

    let edges = &response.relations[&home.id];
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].name, "tags");
    assert_eq!(edges[0].format, RelationFormat::Tag);

    let root = response.find_by_name("Markdown Import").unwrap();
    assert_eq!(root.collections.len(), 2);
}

#[tokio::test]
async fn front_matter_tags_bind_to_store_options() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());
    let store = Arc::new(MemoryStore::new());
    let service = ImportService::new(ConverterRegistry::with_defaults(), store.clone(), store.clone());

    let outcome = service.import(&request(dir.path()), &ProgressTracker::new()).await;
    assert!(outcome.is_success());
    let report = outcome.report.unwrap();
    assert_eq!(report.bound_edges, 1);
    assert_eq!(report.uploaded_files, 1);

    let relations = store.relations();
    let tags = relations.iter().find(|r| r.name == "tags").unwrap();
    assert_eq!(tags.format, RelationFormat::Tag);
    let mut options: Vec<String> = store.options().into_iter().map(|o| o.name).collect();
    options.sort();
    assert_eq!(options, vec!["travel", "work"]);

    let home = store
        .objects()
        .into_iter()
        .find(|s| s.name() == Some("Home"))
        .unwrap();
    assert!(!home.details.contains_key("tags"));
    match home.details.get(tags.key.as_str()) {
        Some(DetailValue::List(ids)) => assert_eq!(ids.len(), 2),
        other => panic!("unexpected tag value {:?}", other),
    }
    assert!(home.walk().iter().any(|b| {
        matches!(&b.content, BlockContent::Relation { key } if key == &tags.key)
    }));
}

#[tokio::test]
async fn zip_archives_are_read_without_their_top_folder() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("vault.zip");
    let mut zip = zip::ZipWriter::new(File::create(&archive).unwrap());
    let options = zip::write::FileOptions::default();
    zip.start_file("vault/a.md", options).unwrap();
    zip.write_all(b"[B](b.md)\n").unwrap();
    zip.start_file("vault/b.md", options).unwrap();
    zip.write_all(b"# B\n").unwrap();
    zip.finish().unwrap();

    let conversion = MarkdownConverter::new()
        .get_snapshots(&request(&archive), &ProgressTracker::new())
        .await;
    let response = conversion.response.unwrap();
    let a = response.find_by_name("a").unwrap();
    let b = response.find_by_name("b").unwrap();
    assert!(a.walk().iter().any(|block| {
        matches!(&block.content, BlockContent::Link { target_block_id } if *target_block_id == b.id)
    }));
    assert!(b.details.contains_key(keys::IS_FAVORITE));
}

#[tokio::test]
async fn cancelled_imports_stop_before_converting() {
    let dir = tempfile::tempdir().unwrap();
    write_vault(dir.path());
    let progress = ProgressTracker::new();
    progress.cancel();

    let conversion = MarkdownConverter::new()
        .get_snapshots(&request(dir.path()), &progress)
        .await;
    assert!(conversion.response.is_none());
    assert!(conversion.errors.is_cancelled());
}

mod links {
    use docimport::converter::markdown::{import_source, MarkdownImport};
    use docimport::model::{BlockContent, MarkKind, TextStyle};
    use docimport::source::Source;
    use docimport::{ConvertError, ImportMode, ProgressTracker};
    use std::fs;

    fn import(files: &[(&str, &str)]) -> MarkdownImport {
        let dir = tempfile::tempdir().unwrap();
        for (path, text) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        let source = Source::open(dir.path()).unwrap();
        let mut errors = ConvertError::new();
        let imported =
            import_source(&source, ImportMode::AllOrNothing, &ProgressTracker::new(), &mut errors)
                .unwrap();
        assert!(errors.is_empty());
        imported
    }

    #[test]
    fn whole_line_links_become_page_links() {
        let imported = import(&[("a.md", "[x](b.md)\n"), ("b.md", "B\n")]);
        let (a, b) = (&imported.pages[0], &imported.pages[1]);

        let contents: Vec<&BlockContent> =
            a.snapshot.walk().into_iter().skip(1).map(|b| &b.content).collect();
        assert_eq!(contents.len(), 1);
        assert!(matches!(
            contents[0],
            BlockContent::Link { target_block_id } if *target_block_id == b.snapshot.id
        ));
        assert!(b.has_inbound_links);
    }

    #[test]
    fn inline_links_become_mentions() {
        let imported = import(&[("a.md", "see [x](b.md) later\n"), ("b.md", "B\n")]);
        let (a, b) = (&imported.pages[0], &imported.pages[1]);

        let text = a
            .snapshot
            .walk()
            .into_iter()
            .find_map(|block| block.text().cloned())
            .unwrap();
        assert_eq!(text.text, "see x later");
        assert_eq!(text.marks.len(), 1);
        assert_eq!(text.marks[0].kind, MarkKind::Mention);
        assert_eq!(text.marks[0].param, b.snapshot.id.to_string());
    }

    #[test]
    fn unlinked_pages_are_grouped_under_their_parent() {
        let imported = import(&[("index.md", "Top\n"), ("index/sub.md", "Sub\n")]);
        let index = imported.pages.iter().find(|p| p.path == "index.md").unwrap();
        let sub = imported.pages.iter().find(|p| p.path == "index/sub.md").unwrap();

        let blocks = index.snapshot.walk();
        let tail = &blocks[blocks.len() - 2..];
        let heading = tail[0].text().unwrap();
        assert_eq!(heading.style, TextStyle::Header3);
        assert_eq!(heading.text, "Unsorted");
        assert!(matches!(
            &tail[1].content,
            BlockContent::Link { target_block_id } if *target_block_id == sub.snapshot.id
        ));
    }
}
