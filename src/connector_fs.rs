//! Filesystem source adapter.
//!
//! Resolves command-line paths into files (walking directories), then reads
//! and extracts each file into a [`RawDocument`] whose `source_id` is the
//! file name, matching what an upload endpoint would see.

use anyhow::{bail, Context, Result};
use pagewise_core::models::RawDocument;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::extract::{content_type_for_extension, extract_pages};

/// Expand `paths` into the list of files to ingest.
///
/// Files named explicitly are kept when their extension is supported.
/// Directories are walked recursively and filtered by `extensions`.
/// Output is sorted and free of duplicates.
pub fn collect_files(paths: &[PathBuf], extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if extension_of(path).and_then(content_type_for_extension).is_none() {
                bail!("Unsupported file type: {}", path.display());
            }
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let matches = extension_of(entry.path())
                    .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
                    .unwrap_or(false);
                if matches {
                    files.push(entry.into_path());
                }
            }
        } else {
            bail!("Path does not exist: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Read and extract one file into page segments.
pub fn load_document(path: &Path) -> Result<RawDocument> {
    let content_type = extension_of(path)
        .and_then(content_type_for_extension)
        .ok_or_else(|| anyhow::anyhow!("Unsupported file type: {}", path.display()))?;

    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let pages = extract_pages(&bytes, content_type)
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;

    Ok(RawDocument::new(source_id_for(path), pages))
}

/// The stable document identifier for a file: its file name.
pub fn source_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}
