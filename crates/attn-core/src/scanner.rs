//! Directory scanner for discovering attendance exports

use crate::error::Result;
use crate::workbook::SPREADSHEET_EXTENSIONS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions treated as delimited-text exports; spreadsheets are
/// picked up through [`SPREADSHEET_EXTENSIONS`]
pub const SOURCE_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered source files, in merge order
    pub sources: Vec<PathBuf>,
}

impl ScanResult {
    /// Get the number of discovered files
    pub fn total_files(&self) -> usize {
        self.sources.len()
    }
}

/// Scan one or more directories for export files.
///
/// Files are ordered by path within each root; roots keep the order given.
pub fn scan_directory<P: AsRef<Path>>(roots: &[P]) -> Result<ScanResult> {
    let mut sources = Vec::new();

    for root in roots {
        let root = root.as_ref();
        let mut found = Vec::new();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if entry.file_type().is_file() && is_source_file(entry.path()) {
                found.push(entry.into_path());
            }
        }

        found.sort();
        tracing::debug!(root = %root.display(), files = found.len(), "scanned root");
        sources.extend(found);
    }

    Ok(ScanResult {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        sources,
    })
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SOURCE_EXTENSIONS
                .iter()
                .chain(SPREADSHEET_EXTENSIONS)
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
