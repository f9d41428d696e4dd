// src/source/mod.rs
//! Source reader: yields `(relative path, bytes)` pairs from a single file,
//! a directory tree or a zip archive.

use crate::constants::MACOS_ARCHIVE_METADATA_PREFIX;
use crate::error::AppError;
use crate::model::{PendingFile, PendingSource};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// One file inside a source, addressed by its `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: String,
    /// Location on disk when the source is not an archive.
    pub disk_path: Option<PathBuf>,
    archive_name: Option<String>,
}

impl SourceEntry {
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.path)
    }

    pub fn has_extension(&self, ext: &str) -> bool {
        self.extension().as_deref() == Some(ext)
    }

    /// Whether the entry sits at the top of the source.
    pub fn is_root(&self) -> bool {
        !self.path.contains('/')
    }
}

/// Lower-cased extension of a `/`-separated path.
pub fn extension_of(path: &str) -> Option<String> {
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Directory(PathBuf),
    Zip(PathBuf),
}

impl Source {
    /// Picks the reader from what `path` points at.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let meta = std::fs::metadata(path)?;
        if meta.is_dir() {
            return Ok(Source::Directory(path.to_path_buf()));
        }
        let is_zip = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false);
        if is_zip {
            Ok(Source::Zip(path.to_path_buf()))
        } else {
            Ok(Source::File(path.to_path_buf()))
        }
    }

    pub fn root(&self) -> &Path {
        match self {
            Source::File(p) | Source::Directory(p) | Source::Zip(p) => p,
        }
    }

    /// All files of the source, sorted by relative path.
    pub fn list(&self) -> Result<Vec<SourceEntry>, AppError> {
        let mut entries = match self {
            Source::File(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                vec![SourceEntry {
                    path: name,
                    disk_path: Some(path.clone()),
                    archive_name: None,
                }]
            }
            Source::Directory(root) => list_directory(root)?,
            Source::Zip(archive) => list_archive(archive)?,
        };
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Files whose extension is one of `extensions`.
    pub fn list_with_extensions(&self, extensions: &[&str]) -> Result<Vec<SourceEntry>, AppError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| {
                e.extension()
                    .map(|ext| extensions.contains(&ext.as_str()))
                    .unwrap_or(false)
            })
            .collect())
    }

    pub fn count_files(&self, extensions: &[&str]) -> Result<usize, AppError> {
        Ok(self.list_with_extensions(extensions)?.len())
    }

    pub fn read(&self, entry: &SourceEntry) -> Result<Vec<u8>, AppError> {
        if let Some(path) = &entry.disk_path {
            return Ok(std::fs::read(path)?);
        }
        let (Source::Zip(archive), Some(name)) = (self, &entry.archive_name) else {
            return Err(AppError::InternalError {
                message: format!("entry {} has no readable location", entry.path),
            });
        };
        let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
        let mut file = zip.by_name(name)?;
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Registers `entry` for upload; archive members are read eagerly.
    pub fn pending_file(&self, entry: &SourceEntry) -> Result<PendingFile, AppError> {
        let source = match &entry.disk_path {
            Some(path) => PendingSource::Path { path: path.clone() },
            None => PendingSource::Bytes {
                name: entry.path.clone(),
                data: self.read(entry)?,
            },
        };
        Ok(PendingFile::new(source))
    }

    /// Human-readable origin of an entry, recorded as the `source` detail.
    pub fn origin_of(&self, entry: &SourceEntry) -> String {
        match (&entry.disk_path, self) {
            (Some(path), _) => path.display().to_string(),
            (None, source) => format!("{}/{}", source.root().display(), entry.path),
        }
    }

    pub fn read_to_string(&self, entry: &SourceEntry) -> Result<String, AppError> {
        let bytes = self.read(entry)?;
        String::from_utf8(bytes).map_err(|e| AppError::Parse {
            path: entry.path.clone(),
            message: e.to_string(),
        })
    }
}

fn list_directory(root: &Path) -> Result<Vec<SourceEntry>, AppError> {
    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(|e| AppError::Io(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = pathdiff::diff_paths(entry.path(), root) else {
            continue;
        };
        entries.push(SourceEntry {
            path: to_slash_path(&relative),
            disk_path: Some(entry.path().to_path_buf()),
            archive_name: None,
        });
    }
    Ok(entries)
}

fn list_archive(archive: &Path) -> Result<Vec<SourceEntry>, AppError> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let stem = archive
        .file_stem()
        .map(|s| format!("{}/", s.to_string_lossy()))
        .unwrap_or_default();

    let mut entries = Vec::new();
    for i in 0..zip.len() {
        let file = zip.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        if name.starts_with(MACOS_ARCHIVE_METADATA_PREFIX) {
            continue;
        }
        let path = name.strip_prefix(stem.as_str()).unwrap_or(&name).to_string();
        entries.push(SourceEntry {
            path,
            disk_path: None,
            archive_name: Some(name),
        });
    }
    Ok(entries)
}

/// Resolves a link found in `from` (a relative source path) to another
/// relative source path. Percent-escapes are decoded; `None` when the link
/// climbs above the source root.
pub fn resolve_relative(from: &str, target: &str) -> Option<String> {
    let target = target.split(['#', '?']).next().unwrap_or(target);
    let decoded = urlencoding::decode(target)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| target.to_string());
    if decoded.is_empty() {
        return None;
    }

    let mut parts: Vec<&str> = match from.rsplit_once('/') {
        Some((dir, _)) if !decoded.starts_with('/') => dir.split('/').collect(),
        _ => Vec::new(),
    };
    for segment in decoded.trim_start_matches('/').split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
