//! Dataset adapter
//!
//! A read-only question/answer view over a consolidated corpus file. Every
//! call to [`Dataset::examples`] reopens the file, so the sequence can be
//! walked any number of times.

use crate::config::SiteConfig;
use crate::crawler::Method;
use crate::output::merge::CorpusRecord;
use crate::{HarvestError, Result};
use regex::Regex;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Config name that selects every category
pub const ALL_CONFIG: &str = "all";

/// Categories of the Spanish site, as published with the corpus
pub const SPANISH_CATEGORIES: &[&str] = &[
    "salud",
    "viajes",
    "deportes",
    "relaciones",
    "pasatiempos",
    "adolescentes",
    "vida-familiar",
    "en-el-trabajo",
    "comida-y-diversión",
    "finanzas-y-negocios",
    "mascotas-y-animales",
    "carreras-y-educación",
    "filosofía-y-religión",
    "arte-y-entretenimiento",
    "en-la-casa-y-el-jardín",
    "cuidado-y-estilo-personal",
    "computadoras-y-electrónica",
    "días-de-fiesta-y-tradiciones",
    "automóviles-y-otros-vehículos",
];

/// Descriptive metadata published alongside the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    pub description: String,
    pub homepage: String,
    pub license: String,
    pub version: String,
}

impl DatasetInfo {
    pub fn for_site(site: &SiteConfig) -> Self {
        let description = if site.code == "es" {
            "Spanish articles from WikiHow".to_string()
        } else {
            format!("Articles from WikiHow-{}", site.code.to_uppercase())
        };

        Self {
            description,
            homepage: "https://www.wikihow.com".to_string(),
            license: "CC BY-NC-SA 3.0".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A named subset of the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderConfig {
    pub name: String,
    pub description: String,
}

/// The `all` config followed by one config per category
pub fn builder_configs<S: AsRef<str>>(site: &SiteConfig, categories: &[S]) -> Vec<BuilderConfig> {
    let mut configs = vec![BuilderConfig {
        name: ALL_CONFIG.to_string(),
        description: format!("All articles from WikiHow-{}.", site.code.to_uppercase()),
    }];
    configs.extend(categories.iter().map(|category| BuilderConfig {
        name: category.as_ref().to_lowercase(),
        description: format!("Articles from the category {}", category.as_ref()),
    }));
    configs
}

/// One projected example
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetExample {
    pub category: String,
    pub question: String,
    pub introduction: String,
    pub answers: Vec<String>,
    pub short_answers: Vec<String>,
    pub url: String,
    pub num_answers: usize,
    pub num_refs: u32,
    pub expert_author: bool,
}

impl DatasetExample {
    pub fn from_record(record: CorpusRecord, site: &SiteConfig) -> Self {
        Self {
            question: site.format_question(&record.title),
            answers: format_methods(&record.methods, false, site),
            short_answers: format_methods(&record.methods, true, site),
            num_answers: record.num_methods,
            category: record.category,
            introduction: record.intro,
            url: record.url,
            num_refs: record.num_refs,
            expert_author: record.expert_author,
        }
    }
}

fn newline_runs() -> &'static Regex {
    static NEWLINES: OnceLock<Regex> = OnceLock::new();
    NEWLINES.get_or_init(|| Regex::new(r"\n+").expect("static regex"))
}

/// Renders each method as one answer string
///
/// A method titled with the locale's steps label gets the steps intro as its
/// header, any other method `"{method_word} {n}: {title}"`. In short form only
/// the first line of every step is kept and lines are separated by a single
/// newline; the long form separates them with a blank line.
pub fn format_methods(methods: &[Method], short: bool, site: &SiteConfig) -> Vec<String> {
    let eol = if short { "\n" } else { "\n\n" };

    methods
        .iter()
        .map(|method| {
            let mut content = if site.is_steps_label(&method.title) {
                format!("{}{}", site.steps_intro, eol)
            } else {
                format!(
                    "{} {}: {}{}",
                    site.method_word, method.number, method.title, eol
                )
            };

            for step in &method.steps {
                let collapsed = newline_runs().replace_all(step, "\n");
                let collapsed = collapsed.trim();
                let step_content = if short {
                    collapsed.lines().next().unwrap_or_default()
                } else {
                    collapsed
                };
                content.push_str(step_content);
                content.push_str(eol);
            }

            content.trim().to_string()
        })
        .collect()
}

/// A consolidated corpus viewed through one config
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    config_name: String,
    site: SiteConfig,
}

impl Dataset {
    /// Opens a corpus file; the file must exist
    ///
    /// `config_name` is either `all` or a category name, compared ignoring case.
    pub fn open(path: impl AsRef<Path>, config_name: &str, site: &SiteConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::open(&path)?;

        Ok(Self {
            path,
            config_name: config_name.trim().to_lowercase(),
            site: site.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    /// `{stem}.{config}.dataset.jsonl` next to the corpus
    ///
    /// The name never matches the `wikihow_{lang}_*.jsonl` shard pattern.
    pub fn default_export_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("corpus");
        self.path
            .with_file_name(format!("{}.{}.dataset.jsonl", stem, self.config_name))
    }

    pub fn info(&self) -> DatasetInfo {
        DatasetInfo::for_site(&self.site)
    }

    /// A fresh pass over the corpus, keyed by input line index
    pub fn examples(&self) -> Result<Examples<'_>> {
        let file = File::open(&self.path)?;
        Ok(Examples {
            lines: BufReader::new(file).lines(),
            index: 0,
            dataset: self,
        })
    }

    fn accepts(&self, category: &str) -> bool {
        self.config_name == ALL_CONFIG || self.config_name == category.to_lowercase()
    }
}

/// Lazy iterator over the examples of a [`Dataset`]
pub struct Examples<'a> {
    lines: Lines<BufReader<File>>,
    index: usize,
    dataset: &'a Dataset,
}

impl Iterator for Examples<'_> {
    type Item = Result<(usize, DatasetExample)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            let key = self.index;
            self.index += 1;

            if line.trim().is_empty() {
                continue;
            }
            let record: CorpusRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            if !self.dataset.accepts(&record.category) {
                continue;
            }

            let example = DatasetExample::from_record(record, &self.dataset.site);
            return Some(Ok((key, example)));
        }
    }
}

/// Writes every example of `dataset` to `output` as JSONL, returning the count
///
/// An existing `output` is only replaced when `force` is set. The file is
/// written through a temporary sibling and renamed into place.
pub fn export(dataset: &Dataset, output: &Path, force: bool) -> Result<usize> {
    if output.exists() && !force {
        return Err(HarvestError::OutputExists(output.to_path_buf()));
    }
    if output == dataset.path() {
        return Err(HarvestError::OutputExists(output.to_path_buf()));
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = output.with_extension("jsonl.tmp");
    let mut count = 0;
    {
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        for example in dataset.examples()? {
            let (_, example) = example?;
            serde_json::to_writer(&mut writer, &example)?;
            writer.write_all(b"\n")?;
            count += 1;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, output)?;

    tracing::info!(
        "Exported {} examples ({}) to {}",
        count,
        dataset.config_name(),
        output.display()
    );
    Ok(count)
}
