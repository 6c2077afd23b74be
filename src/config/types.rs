use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Address scheme and locale vocabulary of one WikiHow site
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Short locale code (e.g., "es")
    pub code: String,

    /// Home page without trailing slash (e.g., "https://es.wikihow.com")
    pub home_page: String,

    /// Namespace of special pages ("Especial" in `Especial:CategoryListing`)
    pub special_keyword: String,

    /// Namespace of category pages ("Categoría" in `Categoría:Salud`)
    pub category_keyword: String,

    /// Title the site gives to the single method of a steps-only article
    pub steps_label: String,

    /// Word used when labelling a method ("Método 2: ...")
    pub method_word: String,

    /// Header that replaces the steps label in formatted answers
    pub steps_intro: String,

    /// Opening question mark, empty for most locales
    #[serde(default)]
    pub question_prefix: String,

    /// Closing question mark
    pub question_suffix: String,
}

impl SiteConfig {
    /// Returns a copy of this site pointing at another home page.
    ///
    /// Used to aim the crawler at a mirror or a local test server.
    pub fn with_home_page(mut self, home_page: &str) -> Self {
        self.home_page = home_page.trim_end_matches('/').to_string();
        self
    }

    fn home(&self) -> &str {
        self.home_page.trim_end_matches('/')
    }

    /// The home page as a base URL for resolving relative links
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}/", self.home()))
    }

    /// `{home}/{special}:CategoryListing`
    pub fn category_listing_url(&self) -> String {
        format!("{}/{}:CategoryListing", self.home(), self.special_keyword)
    }

    /// `{home}/{category_kw}:{category}`, with `?pg=n` when a page is given
    pub fn category_url(&self, category: &str, page: Option<usize>) -> String {
        let base = format!("{}/{}:{}", self.home(), self.category_keyword, category);
        match page {
            Some(n) => format!("{}?pg={}", base, n),
            None => base,
        }
    }

    /// MediaWiki page-info query for an article address on this site
    pub fn page_info_url(&self, article_url: &str) -> Result<Url, url::ParseError> {
        let article = Url::parse(article_url)?;
        let title = article.path().trim_start_matches('/');

        let mut api = Url::parse(&format!("{}/api.php", self.home()))?;
        api.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("action", "query")
            .append_pair("prop", "info")
            .append_pair("titles", title);
        Ok(api)
    }

    /// Wraps an article title in the locale's question punctuation
    pub fn format_question(&self, title: &str) -> String {
        format!("{}{}{}", self.question_prefix, title, self.question_suffix)
    }

    /// True when a method title is this locale's generic steps label
    pub fn is_steps_label(&self, title: &str) -> bool {
        title.trim().to_lowercase() == self.steps_label.to_lowercase()
    }
}

/// Immutable table of every supported site, in declaration order
#[derive(Debug, Clone, Deserialize)]
pub struct SiteTable {
    #[serde(rename = "site")]
    pub(crate) sites: Vec<SiteConfig>,
}

/// HTTP client settings
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("howto-harvest/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Settings of a single crawl run, built from the command line
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Sites to discover and process, in the order given
    pub sites: Vec<SiteConfig>,

    /// Directory holding the catalog, shards and failure logs
    pub out_dir: PathBuf,

    /// Successful articles per category in this run; negative means unlimited
    pub max_per_category: i64,

    /// Politeness delay before every article fetch
    pub delay: Duration,

    /// Walk the category listings even when a catalog already exists
    pub rediscover: bool,

    pub http: HttpConfig,
}

impl CrawlConfig {
    /// The per-category cap, or None when unlimited
    pub fn category_cap(&self) -> Option<usize> {
        usize::try_from(self.max_per_category)
            .ok()
            .filter(|&cap| cap > 0)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.out_dir.join(crate::storage::CATALOG_FILE)
    }

    pub fn site(&self, code: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.code == code)
    }
}
