// src/converter/markdown/links.rs
//! Second pass over parsed pages: resolves links against the file index.

use crate::error::AppError;
use crate::model::{
    covers_whole_line, Block, BlockContent, BookmarkContent, FileContent, FileKind, FileState,
    MarkKind, PendingFile, Snapshot, TextStyle,
};
use crate::source::{extension_of, resolve_relative, Source, SourceEntry};
use crate::types::{BlockId, FileContentId, ObjectId, ValidatedUrl};
use std::collections::{HashMap, HashSet};

/// Non-Markdown entries of one source, registered for upload on first use.
pub(super) struct FileRegistry<'a> {
    source: &'a Source,
    entries: HashMap<String, SourceEntry>,
    registered: HashMap<String, FileContentId>,
    pub(super) pending: Vec<PendingFile>,
}

impl<'a> FileRegistry<'a> {
    pub(super) fn new(source: &'a Source, entries: Vec<SourceEntry>) -> Self {
        Self {
            source,
            entries: entries.into_iter().map(|e| (e.path.clone(), e)).collect(),
            registered: HashMap::new(),
            pending: Vec::new(),
        }
    }

    pub(super) fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Content ID for `path`, registering the binary the first time.
    pub(super) fn register(&mut self, path: &str) -> Result<Option<FileContentId>, AppError> {
        if let Some(id) = self.registered.get(path) {
            return Ok(Some(id.clone()));
        }
        let Some(entry) = self.entries.get(path) else {
            return Ok(None);
        };
        let pending = self.source.pending_file(entry)?;
        let id = pending.content_id.clone();
        self.registered.insert(path.to_string(), id.clone());
        self.pending.push(pending);
        Ok(Some(id))
    }
}

enum Rewrite {
    PageLink(ObjectId),
    File(FileContent),
    Bookmark(BookmarkContent),
}

/// Rewrites every link of `snapshot` (the page at `page_path`).
///
/// Returns the Markdown paths that received an inbound link.
pub(super) fn rewrite_links(
    page_path: &str,
    snapshot: &mut Snapshot,
    pages: &HashMap<String, ObjectId>,
    files: &mut FileRegistry<'_>,
) -> Result<HashSet<String>, AppError> {
    let mut inbound = HashSet::new();
    let ids: Vec<BlockId> = snapshot.walk().iter().map(|b| b.id.clone()).collect();

    for id in ids {
        let mut siblings = Vec::new();
        let mut rewrite = None;

        let Some(block) = snapshot.block_mut(&id) else {
            continue;
        };
        match &mut block.content {
            BlockContent::Text(text) if text.style != TextStyle::Code => {
                let snapshot_text = text.text.clone();
                for mark in text.marks.iter_mut() {
                    if mark.kind != MarkKind::Link {
                        continue;
                    }
                    let whole_line = covers_whole_line(&snapshot_text, mark.range);
                    let url = mark.param.clone();
                    let target = if ValidatedUrl::parse(&url).is_ok() {
                        None
                    } else {
                        resolve_relative(page_path, &url)
                    };

                    if let Some(target) = target.as_deref() {
                        if extension_of(target).as_deref() == Some("csv") {
                            inbound.extend(pages_under(pages, target));
                        }
                        if let Some(target_id) = pages.get(target) {
                            inbound.insert(target.to_string());
                            if whole_line {
                                rewrite = Some(Rewrite::PageLink(target_id.clone()));
                                break;
                            }
                            mark.kind = MarkKind::Mention;
                            mark.param = target_id.to_string();
                            continue;
                        }
                        if files.contains(target) {
                            let name = mark_text(&snapshot_text, mark.range.from, mark.range.to);
                            let file = file_block(files, target, name)?;
                            if whole_line {
                                rewrite = Some(Rewrite::File(file));
                                break;
                            }
                            siblings.push(Block::new(BlockContent::File(file)));
                            continue;
                        }
                    }

                    if whole_line && ValidatedUrl::parse(&url).is_ok() {
                        rewrite = Some(Rewrite::Bookmark(BookmarkContent {
                            url,
                            title: snapshot_text.trim().to_string(),
                        }));
                        break;
                    } else if target.is_some() {
                        log::debug!("{}: link {} does not resolve", page_path, url);
                    }
                }
            }
            BlockContent::File(file) if file.state != FileState::Pending => {
                attach_image(page_path, file, files)?;
            }
            _ => {}
        }

        match rewrite {
            Some(Rewrite::PageLink(target)) => {
                block.content = BlockContent::Link {
                    target_block_id: target,
                }
            }
            Some(Rewrite::File(file)) => block.content = BlockContent::File(file),
            Some(Rewrite::Bookmark(bookmark)) => block.content = BlockContent::Bookmark(bookmark),
            None => {}
        }

        let mut after = id.clone();
        for sibling in siblings {
            after = snapshot.insert_after(&after, sibling);
        }
    }
    Ok(inbound)
}

/// Every Markdown page under the directory named after the CSV file's stem.
fn pages_under<'p>(
    pages: &'p HashMap<String, ObjectId>,
    csv: &str,
) -> impl Iterator<Item = String> + 'p {
    let prefix = format!("{}/", csv.strip_suffix(".csv").unwrap_or(csv));
    pages
        .keys()
        .filter(move |path| path.starts_with(&prefix))
        .cloned()
}

fn mark_text(text: &str, from: usize, to: usize) -> String {
    let from = crate::model::utf16_to_byte(text, from);
    let to = crate::model::utf16_to_byte(text, to);
    text[from..to].trim().to_string()
}

fn file_block(
    files: &mut FileRegistry<'_>,
    target: &str,
    name: String,
) -> Result<FileContent, AppError> {
    let kind = FileKind::from_path(target);
    let name = if name.is_empty() {
        target.rsplit('/').next().unwrap_or(target).to_string()
    } else {
        name
    };
    match files.register(target)? {
        Some(content_id) => Ok(FileContent::pending(kind, name, content_id)),
        None => Ok(FileContent::external(kind, name, target)),
    }
}

/// Relative image sources become pending uploads; URLs stay external.
fn attach_image(
    page_path: &str,
    file: &mut FileContent,
    files: &mut FileRegistry<'_>,
) -> Result<(), AppError> {
    let Some(url) = file.url.clone() else {
        return Ok(());
    };
    if ValidatedUrl::parse(&url).is_ok() {
        return Ok(());
    }
    let registered = match resolve_relative(page_path, &url) {
        Some(target) => files.register(&target)?,
        None => None,
    };
    match registered {
        Some(content_id) => {
            file.url = None;
            file.content_id = Some(content_id);
            file.state = FileState::Pending;
        }
        None => log::warn!("{}: image {} not found in source", page_path, url),
    }
    Ok(())
}
