//! Page extractor for category listings and article pages
//!
//! Every function here is a pure function of the page HTML. Each one accepts
//! only the page shape it targets: a missing element is an
//! `HarvestError::Extraction`, never a partially filled result.

use crate::config::SiteConfig;
use crate::crawler::article::{ArticleRecord, Method};
use crate::HarvestError;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::OnceLock;
use url::Url;

/// Compiled selectors for the WikiHow page layout
struct Selectors {
    category_link: Selector,
    pagination: Selector,
    list_item: Selector,
    thumb: Selector,
    link: Selector,
    titles: [Selector; 3],
    intros: [Selector; 2],
    paragraph: Selector,
    method: Selector,
    method_title: Selector,
    method_label: Selector,
    step: Selector,
    step_title: Selector,
    bold: Selector,
    step_num: Selector,
    expert: Selector,
    reference: Selector,
}

fn compile(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {}: {:?}", css, e))
}

impl Selectors {
    fn new() -> Self {
        Self {
            category_link: compile(r#"a[id^="cat_list_"]"#),
            pagination: compile("ul.pagination"),
            list_item: compile("li"),
            thumb: compile("div.responsive_thumb"),
            link: compile("a[href]"),
            titles: [compile("h1#section_0"), compile("h1.title_lg"), compile("h1")],
            intros: [compile("#mf-section-0"), compile("#intro")],
            paragraph: compile("p"),
            method: compile("div.section.steps"),
            method_title: compile(".mw-headline"),
            method_label: compile(".method_label, .altblock"),
            step: compile("div.step"),
            step_title: compile("b.whb"),
            bold: compile("b"),
            step_num: compile(".step_num"),
            expert: compile("#expert_coauthor, .expert_coauthor, .sp_expert_icon"),
            reference: compile("ol.references > li"),
        }
    }
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(Selectors::new)
}

/// Elements whose text never belongs to an article's prose
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "sup"];

/// Elements that start a new line in extracted text
const BLOCK_ELEMENTS: &[&str] = &["p", "div", "li", "ul", "ol", "br", "table", "tr"];

/// Lists the category names of a category-listing page
///
/// Labels have their whitespace collapsed into `-`, the form the site uses in
/// category addresses.
pub fn list_categories(html: &str, page_url: &str) -> Result<Vec<String>, HarvestError> {
    let document = Html::parse_document(html);
    let s = selectors();

    let mut found = false;
    let mut categories = Vec::new();
    for anchor in document.select(&s.category_link) {
        found = true;
        let label = anchor
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        if !label.is_empty() {
            categories.push(label);
        }
    }

    if !found {
        return Err(HarvestError::extraction(page_url, "no category links"));
    }
    Ok(categories)
}

/// Number of result pages of a category; 1 when there is no pagination control
pub fn count_pages(html: &str) -> usize {
    let document = Html::parse_document(html);
    let s = selectors();

    document
        .select(&s.pagination)
        .next()
        .map(|pagination| pagination.select(&s.list_item).count())
        .unwrap_or(1)
        .max(1)
}

/// Article addresses of one category page, in layout order
pub fn list_article_urls(html: &str, base_url: &Url) -> Result<Vec<String>, HarvestError> {
    let document = Html::parse_document(html);
    let s = selectors();

    document
        .select(&s.thumb)
        .map(|thumb| {
            thumb
                .select(&s.link)
                .find_map(|a| a.value().attr("href"))
                .and_then(|href| resolve_link(href, base_url))
                .ok_or_else(|| {
                    HarvestError::extraction(base_url.as_str(), "thumbnail without article link")
                })
        })
        .collect()
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, fragments, `javascript:`, `mailto:`, `tel:`
/// and `data:` links.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}

/// Extracts the structured record of an article page
///
/// `url` is the address the page was fetched from and becomes the record's
/// url. `site` supplies the locale's steps label.
pub fn extract_article(
    html: &str,
    url: &str,
    site: &SiteConfig,
) -> Result<ArticleRecord, HarvestError> {
    let document = Html::parse_document(html);
    let s = selectors();

    let title = s
        .titles
        .iter()
        .filter_map(|sel| document.select(sel).next())
        .map(|h1| collapse_whitespace(&h1.text().collect::<String>()))
        .find(|t| !t.is_empty())
        .ok_or_else(|| HarvestError::extraction(url, "missing title"))?;

    let intro = extract_intro(&document)
        .ok_or_else(|| HarvestError::extraction(url, "missing introduction"))?;

    let mut methods = Vec::new();
    for (index, section) in document.select(&s.method).enumerate() {
        methods.push(extract_method(section, index + 1, url)?);
    }
    if methods.is_empty() {
        return Err(HarvestError::extraction(url, "no method sections"));
    }

    let expert_author = document.select(&s.expert).next().is_some();
    let num_refs = document.select(&s.reference).count() as u32;

    ArticleRecord::new(
        url,
        &title,
        &intro,
        methods,
        expert_author,
        num_refs,
        &site.steps_label,
    )
}

fn extract_intro(document: &Html) -> Option<String> {
    let s = selectors();
    let container = s
        .intros
        .iter()
        .find_map(|sel| document.select(sel).next())?;

    let paragraphs: Vec<String> = container
        .select(&s.paragraph)
        .map(|p| normalize_block(&element_text(p, None)))
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        Some(normalize_block(&element_text(container, None)))
    } else {
        Some(paragraphs.join("\n"))
    }
}

fn extract_method(
    section: ElementRef<'_>,
    position: usize,
    url: &str,
) -> Result<Method, HarvestError> {
    let s = selectors();

    let title = section
        .select(&s.method_title)
        .next()
        .map(|h| collapse_whitespace(&h.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            HarvestError::extraction(url, format!("method {} has no title", position))
        })?;

    let number = section
        .select(&s.method_label)
        .next()
        .and_then(|label| first_number(&label.text().collect::<String>()))
        .unwrap_or(position as u32);

    let mut steps = Vec::new();
    for (index, step) in section.select(&s.step).enumerate() {
        steps.push(extract_step(step, index + 1));
    }
    if steps.is_empty() {
        return Err(HarvestError::extraction(
            url,
            format!("method '{}' has no steps", title),
        ));
    }

    Ok(Method {
        number,
        title,
        steps,
    })
}

/// Builds `"{n}. {title}\n{description}"` for one step
fn extract_step(step: ElementRef<'_>, position: usize) -> String {
    let s = selectors();

    let number = step
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|li| li.select(&s.step_num).next())
        .and_then(|num| first_number(&num.text().collect::<String>()))
        .unwrap_or(position as u32);

    let bold = step
        .select(&s.step_title)
        .next()
        .or_else(|| step.select(&s.bold).next());

    let title = bold
        .map(|b| collapse_whitespace(&b.text().collect::<String>()))
        .unwrap_or_default();
    let description = normalize_block(&element_text(step, bold));

    match (title.is_empty(), description.is_empty()) {
        (false, false) => format!("{}. {}\n{}", number, title, description),
        (false, true) => format!("{}. {}", number, title),
        (true, _) => format!("{}. {}", number, description),
    }
}

/// Text of an element, skipping non-prose elements and the `exclude` subtree
fn element_text(element: ElementRef<'_>, exclude: Option<ElementRef<'_>>) -> String {
    let root = element.id();
    let exclude = exclude.map(|e| e.id());
    let mut text = String::new();

    for node in element.descendants().skip(1) {
        let skipped = node.ancestors().take_while(|a| a.id() != root).any(|a| {
            Some(a.id()) == exclude
                || a
                    .value()
                    .as_element()
                    .map_or(false, |e| SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if skipped || Some(node.id()) == exclude {
            continue;
        }

        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if BLOCK_ELEMENTS.contains(&e.name()) => text.push('\n'),
            _ => {}
        }
    }

    text
}

/// Collapses all whitespace runs into single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapses whitespace within lines and drops empty lines
fn normalize_block(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First run of ASCII digits in `text`
fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Reads the page id out of a MediaWiki `action=query&prop=info` response
pub fn article_id_from_api(json: &str, url: &str) -> Result<u64, HarvestError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| HarvestError::extraction(url, format!("invalid API response: {}", e)))?;

    value
        .get("query")
        .and_then(|q| q.get("pages"))
        .and_then(|pages| pages.as_object())
        .and_then(|pages| pages.values().find_map(|page| page.get("pageid")))
        .and_then(|id| id.as_u64())
        .ok_or_else(|| HarvestError::extraction(url, "API response has no page id"))
}
