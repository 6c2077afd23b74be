//! Append-only shard files and failure logs

use crate::crawler::ArticleRecord;
use crate::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Prefix shared by shard and corpus file names
pub const SHARD_PREFIX: &str = "wikihow";

/// Sub-directory of the output directory holding failure logs
pub const FAILURE_DIR: &str = "unprocessed";

/// `wikihow_{lang}_{category}.jsonl`, category lowercased
pub fn shard_file_name(lang: &str, category: &str) -> String {
    format!("{}_{}_{}.jsonl", SHARD_PREFIX, lang, category.to_lowercase())
}

pub fn shard_path(dir: &Path, lang: &str, category: &str) -> PathBuf {
    dir.join(shard_file_name(lang, category))
}

/// `unprocessed/{lang}_{category}.txt`, category lowercased
pub fn failure_log_path(dir: &Path, lang: &str, category: &str) -> PathBuf {
    dir.join(FAILURE_DIR)
        .join(format!("{}_{}.txt", lang, category.to_lowercase()))
}

/// Opens `path` for appending, terminating a truncated last line first
///
/// A crash in the middle of a write can leave a partial line behind; the next
/// record must not be glued onto it.
fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    let len = file.metadata()?.len();
    if len > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))?;
        file.read_exact(&mut last)?;
        if last[0] != b'\n' {
            tracing::warn!("Terminating truncated last line of {}", path.display());
            file.write_all(b"\n")?;
        }
    }

    Ok(file)
}

/// Appends extracted articles to one (language, category) shard
#[derive(Debug)]
pub struct ShardWriter {
    path: PathBuf,
    file: File,
}

impl ShardWriter {
    pub fn open(dir: &Path, lang: &str, category: &str) -> Result<Self> {
        let path = shard_path(dir, lang, category);
        let file = open_append(&path)?;
        Ok(Self { path, file })
    }

    /// Appends one record and syncs it to disk before returning
    pub fn append(&mut self, record: &ArticleRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Appends `category<TAB>url` lines for articles that could not be processed
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    file: File,
}

impl FailureLog {
    pub fn open(dir: &Path, lang: &str, category: &str) -> Result<Self> {
        let path = failure_log_path(dir, lang, category);
        let file = open_append(&path)?;
        Ok(Self { path, file })
    }

    pub fn record(&mut self, category: &str, url: &str) -> Result<()> {
        writeln!(self.file, "{}\t{}", category, url)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Deserialize)]
struct UrlOnly {
    url: String,
}

/// URLs of every complete record already present in a shard file
///
/// A missing file yields an empty set. Unparseable lines are skipped.
pub fn read_shard_urls(path: &Path) -> Result<HashSet<String>> {
    let mut urls = HashSet::new();
    if !path.exists() {
        return Ok(urls);
    }

    let reader = BufReader::new(File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<UrlOnly>(&line) {
            Ok(row) => {
                urls.insert(row.url);
            }
            Err(e) => tracing::debug!("Skipping unreadable line in {}: {}", path.display(), e),
        }
    }

    Ok(urls)
}
