// src/converter/markdown/mod.rs
//! Markdown converter: a `.md` file, a directory tree or a zip archive.
//!
//! Pages are parsed first so every path has an ID; links are rewritten in a
//! second pass against the completed index, then pages nobody links to are
//! grouped under their parent page.

mod front_matter;
mod links;
mod parser;

pub use front_matter::{parse_date, parse_front_matter, split_front_matter, Field, FrontMatter};
pub use parser::parse_markdown;

use self::links::{rewrite_links, FileRegistry};
use super::html::page_name;
use super::{build_root_collection, Conversion, Converter, ImportMode, ImportRequest, Progress, Response};
use crate::constants::{FILE_PROGRESS_STEPS, MARKDOWN_ROOT_COLLECTION_NAME, UNSORTED_HEADING};
use crate::error::{AppError, CancelError, ConvertError};
use crate::model::{
    keys, Block, BlockContent, PendingFile, RelationEdge, Snapshot, TextContent, TextStyle,
};
use crate::source::{Source, SourceEntry};
use crate::types::{ObjectId, RelationKey};
use std::collections::HashMap;

pub const NAME: &str = "markdown";

const EXTENSION: &str = "md";

/// A converted Markdown file and whether any other page links to it.
#[derive(Debug, Clone)]
pub struct MarkdownPage {
    pub path: String,
    pub snapshot: Snapshot,
    pub edges: Vec<RelationEdge>,
    pub has_inbound_links: bool,
}

/// Pages and binaries produced from one source.
#[derive(Debug, Default)]
pub struct MarkdownImport {
    pub pages: Vec<MarkdownPage>,
    pub files: Vec<PendingFile>,
}

#[derive(Debug, Default)]
pub struct MarkdownConverter;

impl MarkdownConverter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Converter for MarkdownConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn get_snapshots(&self, request: &ImportRequest, progress: &dyn Progress) -> Conversion {
        let mut errors = ConvertError::new();
        let mut sources = Vec::new();

        for path in request.file_paths() {
            let label = path.display().to_string();
            let counted = Source::open(path).and_then(|source| {
                let count = source.count_files(&[EXTENSION])?;
                Ok((source, count))
            });
            match counted {
                Ok((_, 0)) => {
                    log::info!("{} holds no Markdown files, skipping", label);
                    errors.add(label, AppError::NoObjectsToImport);
                }
                Ok(counted) => sources.push(counted),
                Err(e) => {
                    log::warn!("cannot open {}: {}", label, e);
                    errors.add(label, e);
                    if errors.should_abort(request.mode) {
                        return Conversion::failed(errors);
                    }
                }
            }
        }

        let total: usize = sources.iter().map(|(_, count)| count).sum();
        if total == 0 {
            return Conversion {
                response: None,
                errors,
            };
        }
        progress.set_total(total as i64 * FILE_PROGRESS_STEPS);
        progress.set_progress_message("Converting Markdown files");

        let mut response = Response::default();
        let mut members = Vec::new();
        for (source, _) in &sources {
            let imported = match import_source(source, request.mode, progress, &mut errors) {
                Ok(imported) => imported,
                Err(cancelled) => {
                    errors.add(source.root().display().to_string(), cancelled);
                    return Conversion::failed(errors);
                }
            };
            if errors.should_abort(request.mode) {
                return Conversion::failed(errors);
            }
            for page in imported.pages {
                members.push(page.snapshot.id.clone());
                if !page.edges.is_empty() {
                    response.relations.insert(page.snapshot.id.clone(), page.edges);
                }
                response.snapshots.push(page.snapshot);
            }
            response.files.extend(imported.files);
        }

        log::info!("converted {} Markdown pages", members.len());
        response
            .snapshots
            .push(build_root_collection(MARKDOWN_ROOT_COLLECTION_NAME, &members));
        Conversion::new(response, errors)
    }
}

/// Converts every Markdown file of `source`, stepping `progress` twice per
/// file. Per-file failures land in `errors`; under
/// [`ImportMode::AllOrNothing`] the first one stops the run.
pub fn import_source(
    source: &Source,
    mode: ImportMode,
    progress: &dyn Progress,
    errors: &mut ConvertError,
) -> Result<MarkdownImport, CancelError> {
    let entries = match source.list() {
        Ok(entries) => entries,
        Err(e) => {
            errors.add(source.root().display().to_string(), e);
            return Ok(MarkdownImport::default());
        }
    };
    let (markdown, others): (Vec<SourceEntry>, Vec<SourceEntry>) =
        entries.into_iter().partition(|e| e.has_extension(EXTENSION));

    let mut pages = Vec::with_capacity(markdown.len());
    for entry in &markdown {
        progress.try_step(1)?;
        match parse_page(source, entry) {
            Ok(page) => pages.push(page),
            Err(e) => {
                log::warn!("failed to convert {}: {}", entry.path, e);
                errors.add(source.origin_of(entry), e);
                if errors.should_abort(mode) {
                    return Ok(MarkdownImport::default());
                }
            }
        }
    }

    let index: HashMap<String, ObjectId> = pages
        .iter()
        .map(|p| (p.path.clone(), p.snapshot.id.clone()))
        .collect();
    let mut files = FileRegistry::new(source, others);
    let mut linked = std::collections::HashSet::new();

    for page in pages.iter_mut() {
        progress.try_step(1)?;
        match rewrite_links(&page.path, &mut page.snapshot, &index, &mut files) {
            Ok(inbound) => linked.extend(inbound),
            Err(e) => {
                log::warn!("failed to resolve links of {}: {}", page.path, e);
                errors.add(page.path.clone(), e);
                if errors.should_abort(mode) {
                    return Ok(MarkdownImport::default());
                }
            }
        }
    }
    for page in pages.iter_mut() {
        if linked.contains(&page.path) {
            page.has_inbound_links = true;
        }
    }

    group_orphans(&mut pages);
    Ok(MarkdownImport {
        pages,
        files: files.pending,
    })
}

fn parse_page(source: &Source, entry: &SourceEntry) -> Result<MarkdownPage, AppError> {
    let text = source.read_to_string(entry)?;
    let (raw_front, body) = split_front_matter(&text);
    let front = match raw_front {
        Some(raw) => parse_front_matter(raw).map_err(|e| AppError::Parse {
            path: entry.path.clone(),
            message: e.to_string(),
        })?,
        None => FrontMatter::default(),
    };

    let mut snapshot = Snapshot::page(ObjectId::new(), entry.path.clone());
    snapshot.set_name(front.title.unwrap_or_else(|| page_name(&entry.path)));
    snapshot.set_detail(keys::SOURCE, source.origin_of(entry));
    if entry.is_root() {
        snapshot.set_detail(keys::IS_FAVORITE, true);
    }

    let mut edges = Vec::with_capacity(front.fields.len());
    for field in front.fields {
        let block = Block::new(BlockContent::Relation {
            key: RelationKey::from(field.name.as_str()),
        });
        let block_id = snapshot.push_block(block);
        snapshot.set_detail(field.name.clone(), field.value);
        edges.push(RelationEdge::new(field.name.clone(), field.format, field.name).with_block(block_id));
    }

    snapshot.append_tree(parse_markdown(body));
    Ok(MarkdownPage {
        path: entry.path.clone(),
        snapshot,
        edges,
        has_inbound_links: false,
    })
}

/// Appends an "Unsorted" section to each page listing the pages under its
/// own directory that nothing links to. Deeper pages claim first.
fn group_orphans(pages: &mut [MarkdownPage]) {
    let mut order: Vec<usize> = (0..pages.len()).collect();
    order.sort_by(|&a, &b| {
        let depth = |i: usize| pages[i].path.matches('/').count();
        depth(b)
            .cmp(&depth(a))
            .then_with(|| pages[a].path.cmp(&pages[b].path))
    });

    for i in order {
        let prefix = format!(
            "{}/",
            pages[i]
                .path
                .strip_suffix(".md")
                .unwrap_or(&pages[i].path)
        );
        let mut orphans: Vec<usize> = (0..pages.len())
            .filter(|&j| j != i && !pages[j].has_inbound_links && pages[j].path.starts_with(&prefix))
            .collect();
        if orphans.is_empty() {
            continue;
        }
        orphans.sort_by(|&a, &b| pages[a].path.cmp(&pages[b].path));

        let targets: Vec<ObjectId> = orphans.iter().map(|&j| pages[j].snapshot.id.clone()).collect();
        let snapshot = &mut pages[i].snapshot;
        snapshot.push_block(Block::new(BlockContent::Text(TextContent::new(
            UNSORTED_HEADING,
            TextStyle::Header3,
        ))));
        for target in targets {
            snapshot.push_block(Block::new(BlockContent::Link {
                target_block_id: target,
            }));
        }
        for j in orphans {
            pages[j].has_inbound_links = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str) -> MarkdownPage {
        MarkdownPage {
            path: path.to_string(),
            snapshot: Snapshot::page(ObjectId::new(), path),
            edges: Vec::new(),
            has_inbound_links: false,
        }
    }

    #[test]
    fn deeper_pages_claim_their_orphans_first() {
        let mut pages = vec![page("a.md"), page("a/b.md"), page("a/b/c.md"), page("a/d.md")];
        group_orphans(&mut pages);

        let links = |p: &MarkdownPage| -> Vec<ObjectId> {
            p.snapshot
                .walk()
                .iter()
                .filter_map(|b| match &b.content {
                    BlockContent::Link { target_block_id } => Some(target_block_id.clone()),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(links(&pages[1]), vec![pages[2].snapshot.id.clone()]);
        assert_eq!(
            links(&pages[0]),
            vec![pages[1].snapshot.id.clone(), pages[3].snapshot.id.clone()]
        );
        assert!(!pages[0].has_inbound_links);
        assert!(pages[1..].iter().all(|p| p.has_inbound_links));
    }

    #[test]
    fn front_matter_becomes_relation_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.md");
        std::fs::write(&path, "---\ntitle: Trip\ntags: [x]\n---\nBody\n").unwrap();
        let source = Source::open(&path).unwrap();
        let entry = source.list().unwrap().remove(0);

        let page = parse_page(&source, &entry).unwrap();
        assert_eq!(page.snapshot.name(), Some("Trip"));
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].name, "tags");
        let first = &page.snapshot.top_level_ids()[0];
        assert_eq!(page.edges[0].block_id.as_ref(), Some(first));
        assert!(page.snapshot.details.contains_key("tags"));
    }
}
