//! Typed article records produced by the extractor

use crate::HarvestError;
use serde::{Deserialize, Serialize};

/// One numbered procedure of an article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub number: u32,
    pub title: String,
    /// Each step is `"{n}. {title}\n{description}"`
    pub steps: Vec<String>,
}

impl Method {
    pub fn new(number: u32, title: &str, steps: Vec<String>) -> Self {
        Self {
            number,
            title: title.to_string(),
            steps,
        }
    }
}

/// A fully extracted article, immutable once built
///
/// `num_methods` and `is_steps` are derived from `methods` at construction,
/// so they can never disagree with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    url: String,
    title: String,
    intro: String,
    methods: Vec<Method>,
    num_methods: usize,
    is_steps: bool,
    expert_author: bool,
    num_refs: u32,
}

impl ArticleRecord {
    /// Builds a record, rejecting anything partial
    ///
    /// `steps_label` is the locale's generic title for a steps-only article
    /// ("Pasos", "Steps", ...). Methods are ordered by their number.
    pub fn new(
        url: &str,
        title: &str,
        intro: &str,
        mut methods: Vec<Method>,
        expert_author: bool,
        num_refs: u32,
        steps_label: &str,
    ) -> Result<Self, HarvestError> {
        if title.trim().is_empty() {
            return Err(HarvestError::extraction(url, "empty title"));
        }
        if methods.is_empty() {
            return Err(HarvestError::extraction(url, "no methods"));
        }
        if let Some(method) = methods.iter().find(|m| m.steps.is_empty()) {
            return Err(HarvestError::extraction(
                url,
                format!("method {} '{}' has no steps", method.number, method.title),
            ));
        }

        methods.sort_by_key(|m| m.number);
        let is_steps = methods.len() == 1 && methods[0].title == steps_label;

        Ok(Self {
            url: url.to_string(),
            title: title.trim().to_string(),
            intro: intro.trim().to_string(),
            num_methods: methods.len(),
            methods,
            is_steps,
            expert_author,
            num_refs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn intro(&self) -> &str {
        &self.intro
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn num_methods(&self) -> usize {
        self.num_methods
    }

    pub fn is_steps(&self) -> bool {
        self.is_steps
    }

    pub fn expert_author(&self) -> bool {
        self.expert_author
    }

    pub fn num_refs(&self) -> u32 {
        self.num_refs
    }
}
