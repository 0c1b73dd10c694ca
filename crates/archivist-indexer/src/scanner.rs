//! C1: walks a repository root, applies ignore rules, and classifies each
//! candidate file as `fresh`, `stale`, or `unchanged` against a prior
//! fingerprint.

use archivist_core::ids::content_hash;
use archivist_core::languages;
use archivist_core::types::ChangeStatus;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

const IGNORE_FILE: &str = ".archivistignore";

const BUILTIN_IGNORE_EXTENSIONS: &[&str] = &[
    ".exe", ".dll", ".so", ".dylib", ".o", ".a", ".wasm", ".pyc", ".class", ".jar", ".min.js",
    ".min.css",
];

const BUILTIN_IGNORE_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".tox",
    "target",
    "build",
    "dist",
    ".next",
    ".nuxt",
    "vendor",
    ".venv",
    "venv",
    "var",
];

const BUILTIN_IGNORE_PATTERNS: &[&str] = &["*.generated.*", "*.pb.go", "*_generated.rs"];

/// A discovered source/documentation file, scanned but not yet read.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub language: String,
}

/// A scanned file paired with its computed content hash and status relative
/// to a prior run's fingerprint map.
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    pub file: ScannedFile,
    pub content_hash: String,
    pub size: u64,
    pub status: ChangeStatus,
}

/// `(total, fresh, stale, unchanged)` counts from a dry-run walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub unchanged: usize,
}

pub fn scan_directory(repo_root: &Path, max_file_size: u64) -> Vec<ScannedFile> {
    scan_directory_filtered(repo_root, max_file_size, &[])
}

pub fn scan_directory_filtered(
    repo_root: &Path,
    max_file_size: u64,
    languages_filter: &[String],
) -> Vec<ScannedFile> {
    let mut walker = WalkBuilder::new(repo_root);
    walker
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false);

    let ignore_file = repo_root.join(IGNORE_FILE);
    if ignore_file.exists() {
        walker.add_custom_ignore_filename(IGNORE_FILE);
    }

    let mut files = Vec::new();

    for entry in walker.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("walk error: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let path_str = path.to_string_lossy();
        if should_ignore_builtin(&path_str) {
            debug!(?path, "skipped by built-in ignore");
            continue;
        }

        if let Ok(metadata) = std::fs::metadata(path)
            && metadata.len() > max_file_size
        {
            warn!(?path, size = metadata.len(), "skipped: file too large");
            continue;
        }

        if let Some(language) = detect_language(path) {
            if !languages_filter.is_empty() && !languages_filter.iter().any(|l| l == language) {
                continue;
            }

            let relative = path
                .strip_prefix(repo_root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");

            files.push(ScannedFile {
                path: path.to_path_buf(),
                relative_path: relative,
                language: language.to_string(),
            });
        }
    }

    files
}

fn should_ignore_builtin(path: &str) -> bool {
    let normalized = path.replace('\\', "/");

    for dir in BUILTIN_IGNORE_DIRS {
        if normalized.contains(&format!("/{dir}/")) {
            return true;
        }
    }
    for ext in BUILTIN_IGNORE_EXTENSIONS {
        if normalized.ends_with(ext) {
            return true;
        }
    }
    builtin_ignore_globset().is_match(&normalized)
}

fn builtin_ignore_globset() -> &'static GlobSet {
    static SET: OnceLock<GlobSet> = OnceLock::new();
    SET.get_or_init(|| {
        let mut builder = GlobSetBuilder::new();
        for pattern in BUILTIN_IGNORE_PATTERNS {
            builder.add(Glob::new(pattern).expect("builtin ignore glob pattern must be valid"));
        }
        builder.build().expect("builtin ignore glob set must build")
    })
}

/// Detect a language from an extension, counting both source and
/// documentation extensions as walkable.
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    languages::detect_language_from_extension(ext)
}

/// Read each scanned file, compute its content hash, and classify it against
/// `known_hashes` (repo-relative path → last-seen content hash). Files that
/// fail to read are skipped with a warning rather than aborting the walk.
pub fn classify_files(
    repo_root: &Path,
    files: Vec<ScannedFile>,
    known_hashes: &HashMap<String, String>,
) -> Vec<ClassifiedFile> {
    files
        .into_iter()
        .filter_map(|file| {
            let absolute = repo_root.join(&file.relative_path);
            let bytes = match std::fs::read(&absolute) {
                Ok(b) => b,
                Err(e) => {
                    warn!(path = ?absolute, error = %e, "skipped: read failed");
                    return None;
                }
            };
            let hash = content_hash(&bytes);
            let status = match known_hashes.get(&file.relative_path) {
                None => ChangeStatus::Fresh,
                Some(prior) if prior == &hash => ChangeStatus::Unchanged,
                Some(_) => ChangeStatus::Stale,
            };
            Some(ClassifiedFile {
                size: bytes.len() as u64,
                content_hash: hash,
                status,
                file,
            })
        })
        .collect()
}

pub fn summarize(classified: &[ClassifiedFile]) -> WalkSummary {
    let mut summary = WalkSummary {
        total: classified.len(),
        ..Default::default()
    };
    for c in classified {
        match c.status {
            ChangeStatus::Fresh => summary.fresh += 1,
            ChangeStatus::Stale => summary.stale += 1,
            ChangeStatus::Unchanged => summary.unchanged += 1,
        }
    }
    summary
}
