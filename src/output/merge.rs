//! Shard merger
//!
//! Consolidates every shard of one language into a single shuffled corpus
//! file. Records are not deduplicated here; the catalog already guarantees
//! each URL is written at most once.

use crate::crawler::Method;
use crate::storage::SHARD_PREFIX;
use crate::{HarvestError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Settings of one merge
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Directory holding the shard files
    pub dir: PathBuf,
    pub lang: String,
    /// Defaults to `{dir}/wikihow_{lang}.jsonl`
    pub output: Option<PathBuf>,
    /// Fixed shuffle seed, for reproducible corpora
    pub seed: Option<u64>,
    /// Replace an existing output file
    pub force: bool,
}

impl MergeOptions {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            self.dir
                .join(format!("{}_{}.jsonl", SHARD_PREFIX, self.lang))
        })
    }
}

/// One line of the consolidated corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub language: String,
    pub category: String,
    pub url: String,
    pub title: String,
    pub intro: String,
    pub methods: Vec<Method>,
    pub num_methods: usize,
    pub is_steps: bool,
    pub expert_author: bool,
    pub num_refs: u32,
}

/// Lenient view of a shard line; older shards may lack or mistype fields
#[derive(Debug, Deserialize)]
struct ShardRow {
    url: String,
    title: String,
    intro: String,
    methods: Vec<Method>,
    #[serde(default)]
    num_methods: Option<usize>,
    #[serde(default)]
    is_steps: bool,
    #[serde(default)]
    expert_author: bool,
    #[serde(default)]
    num_refs: Value,
}

/// What a merge produced
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output: PathBuf,
    pub records: usize,
    /// Records read per category, in file name order
    pub shards: Vec<(String, usize)>,
    /// Lines that could not be parsed and were left out
    pub skipped_lines: usize,
}

/// Shard files of a language as `(category, path)`, sorted by file name
pub fn find_shards(dir: &Path, lang: &str) -> Result<Vec<(String, PathBuf)>> {
    let prefix = format!("{}_{}_", SHARD_PREFIX, lang);
    let mut shards = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(category) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".jsonl"))
        {
            if !category.is_empty() {
                shards.push((category.to_string(), path.clone()));
            }
        }
    }

    shards.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(shards)
}

/// Coerces a reference count of any JSON shape to a non-negative integer
///
/// Missing, null, negative, non-numeric and non-finite values become 0;
/// fractional values are truncated.
pub fn coerce_refs(value: &Value) -> u32 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() && n > 0.0 => n.min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Merges every shard of `options.lang` into one shuffled corpus file
///
/// Fails without touching the output when no shard line could be read.
pub fn merge_shards(options: &MergeOptions) -> Result<MergeReport> {
    let output = options.output_path();
    if output.exists() && !options.force {
        return Err(HarvestError::OutputExists(output));
    }

    let shards: Vec<(String, PathBuf)> = find_shards(&options.dir, &options.lang)?
        .into_iter()
        .filter(|(_, path)| *path != output)
        .collect();
    if shards.is_empty() {
        return Err(HarvestError::NoShards {
            lang: options.lang.clone(),
            dir: options.dir.clone(),
        });
    }

    let mut records = Vec::new();
    let mut counts = Vec::new();
    let mut skipped_lines = 0;

    for (category, path) in &shards {
        let before = records.len();
        let reader = BufReader::new(File::open(path)?);
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ShardRow>(&line) {
                Ok(row) => records.push(into_corpus_record(row, &options.lang, category)),
                Err(e) => {
                    tracing::warn!(
                        "Skipping {} line {}: {}",
                        path.display(),
                        index + 1,
                        e
                    );
                    skipped_lines += 1;
                }
            }
        }
        tracing::debug!("Read {} records from {}", records.len() - before, path.display());
        counts.push((category.clone(), records.len() - before));
    }

    if records.is_empty() {
        return Err(HarvestError::NoRecords {
            lang: options.lang.clone(),
            dir: options.dir.clone(),
        });
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    records.shuffle(&mut rng);

    write_corpus(&output, &records)?;
    tracing::info!(
        "Wrote {} records from {} shards to {}",
        records.len(),
        shards.len(),
        output.display()
    );

    Ok(MergeReport {
        output,
        records: records.len(),
        shards: counts,
        skipped_lines,
    })
}

fn into_corpus_record(row: ShardRow, lang: &str, category: &str) -> CorpusRecord {
    CorpusRecord {
        language: lang.to_string(),
        category: category.to_string(),
        num_methods: row.num_methods.unwrap_or(row.methods.len()),
        url: row.url,
        title: row.title,
        intro: row.intro,
        methods: row.methods,
        is_steps: row.is_steps,
        expert_author: row.expert_author,
        num_refs: coerce_refs(&row.num_refs),
    }
}

fn write_corpus(output: &Path, records: &[CorpusRecord]) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = output.with_extension("jsonl.tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        for record in records {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, output)?;
    Ok(())
}
