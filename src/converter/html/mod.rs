// src/converter/html/mod.rs
//! HTML converter: one page per `.html` file plus a root collection.

mod parser;

pub use parser::parse_html;

use super::{build_root_collection, Conversion, Converter, ImportRequest, Progress, Response};
use crate::constants::{FILE_PROGRESS_STEPS, HTML_ROOT_COLLECTION_NAME};
use crate::error::{AppError, ConvertError};
use crate::model::{keys, BlockContent, FileState, PendingFile, PendingSource, Snapshot};
use crate::source::{resolve_relative, Source, SourceEntry};
use crate::types::{ObjectId, ValidatedUrl};

pub const NAME: &str = "html";

const EXTENSIONS: &[&str] = &["html"];

#[derive(Debug, Default)]
pub struct HtmlConverter;

impl HtmlConverter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Converter for HtmlConverter {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn get_snapshots(&self, request: &ImportRequest, progress: &dyn Progress) -> Conversion {
        let mut errors = ConvertError::new();
        let mut inputs = Vec::new();

        for path in request.file_paths() {
            let label = path.display().to_string();
            let listed = Source::open(path).and_then(|source| {
                let entries = source.list_with_extensions(EXTENSIONS)?;
                Ok((source, entries))
            });
            match listed {
                Ok((_, entries)) if entries.is_empty() => {
                    log::info!("{} holds no HTML files, skipping", label);
                    errors.add(label, AppError::NoObjectsToImport);
                }
                Ok(input) => inputs.push(input),
                Err(e) => {
                    log::warn!("cannot open {}: {}", label, e);
                    errors.add(label, e);
                    if errors.should_abort(request.mode) {
                        return Conversion::failed(errors);
                    }
                }
            }
        }

        let total: usize = inputs.iter().map(|(_, entries)| entries.len()).sum();
        if total == 0 {
            return Conversion {
                response: None,
                errors,
            };
        }
        progress.set_total(total as i64 * FILE_PROGRESS_STEPS);
        progress.set_progress_message("Converting HTML files");

        let mut response = Response::default();
        let mut pages = Vec::new();
        for (source, entries) in &inputs {
            for entry in entries {
                let origin = source.origin_of(entry);
                if let Err(e) = progress.try_step(1) {
                    errors.add(origin, e);
                    return Conversion::failed(errors);
                }
                match convert_file(source, entry, &mut response.files) {
                    Ok(snapshot) => {
                        pages.push(snapshot.id.clone());
                        response.snapshots.push(snapshot);
                    }
                    Err(e) => {
                        log::warn!("failed to convert {}: {}", origin, e);
                        errors.add(origin.clone(), e);
                        if errors.should_abort(request.mode) {
                            return Conversion::failed(errors);
                        }
                    }
                }
                if let Err(e) = progress.try_step(1) {
                    errors.add(origin, e);
                    return Conversion::failed(errors);
                }
            }
        }

        log::info!("converted {} HTML pages", pages.len());
        response
            .snapshots
            .push(build_root_collection(HTML_ROOT_COLLECTION_NAME, &pages));
        Conversion::new(response, errors)
    }
}

fn convert_file(
    source: &Source,
    entry: &SourceEntry,
    files: &mut Vec<PendingFile>,
) -> Result<Snapshot, AppError> {
    let html = source.read_to_string(entry)?;
    let tree = parse_html(&html);

    let mut snapshot = Snapshot::page(ObjectId::new(), entry.path.clone());
    snapshot.set_name(page_name(&entry.path));
    snapshot.set_detail(keys::SOURCE, source.origin_of(entry));
    snapshot.set_detail(keys::IS_FAVORITE, true);
    snapshot.append_tree(tree);
    attach_local_images(source, entry, &mut snapshot, files)?;
    Ok(snapshot)
}

/// File basename without its extension.
pub(crate) fn page_name(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

/// Turns relative image sources into pending uploads.
fn attach_local_images(
    source: &Source,
    entry: &SourceEntry,
    snapshot: &mut Snapshot,
    files: &mut Vec<PendingFile>,
) -> Result<(), AppError> {
    let mut listing: Option<Vec<SourceEntry>> = None;
    for block in snapshot.blocks.iter_mut() {
        let BlockContent::File(file) = &mut block.content else {
            continue;
        };
        let Some(url) = file.url.clone() else {
            continue;
        };
        if ValidatedUrl::parse(&url).is_ok() {
            continue;
        }
        let Some(target) = resolve_relative(&entry.path, &url) else {
            continue;
        };
        if listing.is_none() {
            listing = Some(source.list()?);
        }
        let found = listing
            .as_ref()
            .and_then(|all| all.iter().find(|e| e.path == target));
        let pending = match (found, source) {
            (Some(image), _) => Some(source.pending_file(image)?),
            (None, Source::File(path)) => path
                .parent()
                .map(|dir| dir.join(&target))
                .filter(|candidate| candidate.is_file())
                .map(|path| PendingFile::new(PendingSource::Path { path })),
            (None, _) => None,
        };
        match pending {
            Some(pending) => {
                file.url = None;
                file.content_id = Some(pending.content_id.clone());
                file.state = FileState::Pending;
                files.push(pending);
            }
            None => log::warn!("image {} referenced by {} not found", url, entry.path),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names_drop_extensions() {
        assert_eq!(page_name("dir/test.html"), "test");
        assert_eq!(page_name("archive.tar.html"), "archive.tar");
        assert_eq!(page_name("noext"), "noext");
    }
}
