//! File listings on disk
//!
//! Turns resolved file records into filesystem paths, either to print them
//! (`dumplist`) or to check which ones are missing (`checkfiles`).

use std::io::Write;
use std::path::PathBuf;
use crate::model::File;
use crate::Result;

/// How stored paths map onto the filesystem
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathLayout {
    /// Prepended to every stored path
    pub directory: Option<PathBuf>,
    /// Appended to every stored path, normally with its leading `.`
    pub extension: Option<String>,
}

impl PathLayout {
    pub fn new(directory: Option<PathBuf>, extension: Option<String>) -> Self {
        Self { directory, extension }
    }

    pub fn path_of(&self, file: &File) -> PathBuf {
        file.make_path(self.directory.as_deref(), self.extension.as_deref())
    }

    /// Directory as shown in reports (empty when unset)
    pub fn directory_display(&self) -> String {
        self.directory
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_default()
    }
}

/// Write one path per line
pub fn dump_list<W: Write>(files: &[File], layout: &PathLayout, out: &mut W) -> Result<()> {
    for file in files {
        writeln!(out, "{}", layout.path_of(file).display())?;
    }
    Ok(())
}

/// Outcome of checking resolved files against the filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheck {
    pub total: usize,
    pub missing: Vec<PathBuf>,
}

impl FileCheck {
    pub fn found(&self) -> usize {
        self.total - self.missing.len()
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Write the missing-file report; writes nothing when every file exists
    pub fn write_report<W: Write>(&self, layout: &PathLayout, out: &mut W) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        for path in &self.missing {
            writeln!(out, "Cannot find file \"{}\"", path.display())?;
        }
        writeln!(
            out,
            "{} files (out of {}) were not found at \"{}\"",
            self.missing.len(),
            self.total,
            layout.directory_display()
        )?;
        Ok(())
    }
}

/// Check which of `files` exist under `layout`
pub fn check_files(files: &[File], layout: &PathLayout) -> FileCheck {
    let missing: Vec<PathBuf> = files
        .iter()
        .map(|f| layout.path_of(f))
        .filter(|p| !p.exists())
        .collect();
    tracing::debug!(total = files.len(), missing = missing.len(), "Checked files");
    FileCheck {
        total: files.len(),
        missing,
    }
}
