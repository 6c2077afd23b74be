use crate::config::types::{SiteConfig, SiteTable};
use crate::config::validation::validate_site_table;
use crate::ConfigError;

const BUILTIN_SITES: &str = include_str!("sites.toml");

impl SiteTable {
    /// Parses and validates a site table from TOML text
    ///
    /// # Example
    ///
    /// ```
    /// use howto_harvest::config::SiteTable;
    ///
    /// let table = SiteTable::from_toml_str(r#"
    /// [[site]]
    /// code = "en"
    /// home-page = "https://www.wikihow.com"
    /// special-keyword = "Special"
    /// category-keyword = "Category"
    /// steps-label = "Steps"
    /// method-word = "Method"
    /// steps-intro = "Follow these steps:"
    /// question-suffix = "?"
    /// "#).unwrap();
    /// assert_eq!(table.codes(), vec!["en"]);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let table: SiteTable = toml::from_str(content)?;
        validate_site_table(&table)?;
        Ok(table)
    }

    /// The table compiled into the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_SITES)
    }

    pub fn get(&self, code: &str) -> Result<&SiteConfig, ConfigError> {
        self.sites
            .iter()
            .find(|s| s.code == code)
            .ok_or_else(|| ConfigError::UnknownLanguage(code.to_string()))
    }

    /// Supported locale codes in table order
    pub fn codes(&self) -> Vec<&str> {
        self.sites.iter().map(|s| s.code.as_str()).collect()
    }

    /// Resolves a list of requested codes, keeping the requested order
    pub fn select<S: AsRef<str>>(&self, codes: &[S]) -> Result<Vec<SiteConfig>, ConfigError> {
        codes
            .iter()
            .map(|code| self.get(code.as_ref()).cloned())
            .collect()
    }

    pub fn sites(&self) -> &[SiteConfig] {
        &self.sites
    }
}
