//! Line-delimited URL catalog
//!
//! The catalog is append-only for discovery and mutated in place only to flip
//! `is_processed`. It is rewritten in full on every persist through a
//! temporary file, so the file on disk is always a complete catalog.

use crate::storage::CatalogEntry;
use crate::{HarvestError, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Durable registry of discovered URLs and their processing status
#[derive(Debug)]
pub struct UrlCatalog {
    path: PathBuf,
    entries: Vec<CatalogEntry>,
    by_url: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl UrlCatalog {
    /// Creates an empty catalog that will persist to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
            by_url: HashMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Loads a catalog file
    ///
    /// Blank lines are ignored. A malformed line, an invalid entry, or a
    /// duplicate url/id is a `Catalog` error: the file is the checkpoint and a
    /// damaged checkpoint must not be silently repaired.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut catalog = Self::new(path);
        let file = File::open(&catalog.path)?;

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entry: CatalogEntry = serde_json::from_str(&line).map_err(|e| {
                HarvestError::Catalog(format!(
                    "{} line {}: {}",
                    catalog.path.display(),
                    index + 1,
                    e
                ))
            })?;
            entry.validate()?;

            if catalog.by_url.contains_key(&entry.url) {
                return Err(HarvestError::Catalog(format!(
                    "duplicate url {} at line {}",
                    entry.url,
                    index + 1
                )));
            }
            if catalog.by_id.contains_key(&entry.id) {
                return Err(HarvestError::Catalog(format!(
                    "duplicate id {} at line {}",
                    entry.id,
                    index + 1
                )));
            }
            catalog.insert(entry);
        }

        tracing::debug!(
            "Loaded {} catalog entries from {}",
            catalog.entries.len(),
            catalog.path.display()
        );
        Ok(catalog)
    }

    /// Writes the full catalog, replacing the previous file atomically
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for entry in &self.entries {
                serde_json::to_writer(&mut writer, entry)?;
                writer.write_all(b"\n")?;
            }
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        tracing::trace!("Persisted {} catalog entries", self.entries.len());
        Ok(())
    }

    /// Registers a discovered URL
    ///
    /// Returns the existing entry untouched when the URL is already known,
    /// so discovery can be repeated safely across runs.
    pub fn record_discovery(
        &mut self,
        lang: &str,
        category: &str,
        page: usize,
        url: &str,
    ) -> Result<&CatalogEntry> {
        if let Some(&index) = self.by_url.get(url) {
            return Ok(&self.entries[index]);
        }

        let entry = CatalogEntry::new(lang, category, page, url)?;
        let index = self.insert(entry);
        Ok(&self.entries[index])
    }

    /// Unprocessed entries, optionally filtered, in insertion order
    pub fn unprocessed(&self, lang: Option<&str>, category: Option<&str>) -> Vec<&CatalogEntry> {
        self.entries
            .iter()
            .filter(|e| !e.is_processed)
            .filter(|e| lang.map_or(true, |l| e.lang == l))
            .filter(|e| category.map_or(true, |c| e.category == c))
            .collect()
    }

    /// Flags an entry as processed; the flag is never cleared
    pub fn mark_processed(&mut self, id: &str) -> Result<()> {
        let index = *self
            .by_id
            .get(id)
            .ok_or_else(|| HarvestError::NotFound(id.to_string()))?;
        self.entries[index].is_processed = true;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(id).map(|&index| &self.entries[index])
    }

    pub fn find_by_url(&self, url: &str) -> Option<&CatalogEntry> {
        self.by_url.get(url).map(|&index| &self.entries[index])
    }

    /// Distinct (language, category) pairs in order of first discovery
    pub fn groups(&self) -> Vec<(String, String)> {
        let mut groups: Vec<(String, String)> = Vec::new();
        for entry in &self.entries {
            if !groups
                .iter()
                .any(|(l, c)| *l == entry.lang && *c == entry.category)
            {
                groups.push((entry.lang.clone(), entry.category.clone()));
            }
        }
        groups
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn processed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_processed).count()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn insert(&mut self, entry: CatalogEntry) -> usize {
        let index = self.entries.len();
        self.by_url.insert(entry.url.clone(), index);
        self.by_id.insert(entry.id.clone(), index);
        self.entries.push(entry);
        index
    }
}
