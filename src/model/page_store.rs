//! Disk-spilled storage for the page list of a single page sitemap.
//!
//! Page lists can be large (news sites routinely publish sitemaps with tens
//! of thousands of URLs), so each page sitemap serialises its list to a
//! scratch file right after parsing and reloads it on demand. Peak memory
//! then stays bounded by the largest single sitemap rather than the whole
//! tree.

use crate::model::page::SitemapPage;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Owns the scratch file holding one sitemap's page list.
///
/// The file is created in the OS temporary directory at construction time
/// and removed when the store is dropped. A missing file at drop time is
/// logged as a warning and otherwise ignored.
#[derive(Debug)]
pub(crate) struct PageStore {
    path: PathBuf,
}

impl PageStore {
    /// Serialises `pages` to a fresh uniquely-named scratch file.
    pub fn new(pages: &[SitemapPage]) -> io::Result<Self> {
        let temp_file = tempfile::Builder::new()
            .prefix("usp-pages-")
            .suffix(".json")
            .tempfile()?;

        // Disable tempfile's silent auto-delete; the store removes the file
        // itself on drop so that a missing file can be reported.
        let (file, path) = temp_file.keep().map_err(|e| e.error)?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, pages)?;
        writer.flush()?;

        tracing::debug!("Spilled {} pages to {}", pages.len(), path.display());
        Ok(Self { path })
    }

    /// Reloads the page list from disk.
    pub fn load(&self) -> io::Result<Vec<SitemapPage>> {
        let file = File::open(&self.path)?;
        let pages = serde_json::from_reader(BufReader::new(file))?;
        Ok(pages)
    }

    /// Path of the scratch file, for diagnostics.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PageStore {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(
                "Failed to remove page store file {}: {}",
                self.path.display(),
                e
            );
        }
    }
}
