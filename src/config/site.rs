//! Site configuration (config.toml / config.yaml)

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names tried in the site root, in order
pub const CONFIG_FILES: &[&str] = &["config.toml", "hugo.toml", "config.yaml", "config.yml"];

/// Main site configuration
///
/// Keys are snake_case; the camelCase spellings used by Hugo sites are
/// accepted as aliases so existing config files load unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    #[serde(alias = "baseURL", alias = "baseurl", alias = "baseUrl")]
    pub base_url: String,
    pub title: String,
    #[serde(alias = "languageCode")]
    pub language_code: String,
    pub author: String,
    pub description: String,
    pub copyright: String,
    #[serde(alias = "timeZone")]
    pub time_zone: String,

    // Directories
    #[serde(alias = "contentDir")]
    pub content_dir: String,
    #[serde(alias = "staticDir")]
    pub static_dir: String,
    #[serde(alias = "layoutDir")]
    pub layout_dir: String,
    #[serde(alias = "themesDir")]
    pub themes_dir: String,
    #[serde(alias = "archetypeDir")]
    pub archetype_dir: String,
    #[serde(alias = "publishDir")]
    pub publish_dir: String,
    #[serde(alias = "ignoreFiles")]
    pub ignore_files: Vec<String>,

    // Theme
    pub theme: String,

    // Listing
    #[serde(alias = "paginate", alias = "pagerSize")]
    pub per_page: usize,
    #[serde(alias = "rssLimit")]
    pub rss_limit: usize,
    #[serde(alias = "summaryLength")]
    pub summary_length: usize,
    #[serde(alias = "mainSections")]
    pub main_sections: Vec<String>,

    // Build
    #[serde(alias = "buildDrafts")]
    pub build_drafts: bool,
    #[serde(alias = "buildFuture")]
    pub build_future: bool,
    #[serde(alias = "cleanDestinationDir")]
    pub clean_destination: bool,

    /// Singular -> plural, e.g. `tag = "tags"`
    pub taxonomies: IndexMap<String, String>,
    /// Section -> permalink pattern, e.g. `posts = "/:year/:month/:slug/"`
    pub permalinks: IndexMap<String, String>,

    pub markup: MarkupConfig,
    pub menu: MenuConfig,

    /// Free-form parameters exposed to templates as `site.params`
    pub params: IndexMap<String, serde_json::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let mut taxonomies = IndexMap::new();
        taxonomies.insert("tag".to_string(), "tags".to_string());
        taxonomies.insert("category".to_string(), "categories".to_string());

        Self {
            base_url: "http://localhost:1313/".to_string(),
            title: "My New Site".to_string(),
            language_code: "en-us".to_string(),
            author: String::new(),
            description: String::new(),
            copyright: String::new(),
            time_zone: String::new(),

            content_dir: "content".to_string(),
            static_dir: "static".to_string(),
            layout_dir: "layouts".to_string(),
            themes_dir: "themes".to_string(),
            archetype_dir: "archetypes".to_string(),
            publish_dir: "public".to_string(),
            ignore_files: Vec::new(),

            theme: String::new(),

            per_page: 10,
            rss_limit: 20,
            summary_length: 70,
            main_sections: Vec::new(),

            build_drafts: false,
            build_future: false,
            clean_destination: true,

            taxonomies,
            permalinks: IndexMap::new(),

            markup: MarkupConfig::default(),
            menu: MenuConfig::default(),
            params: IndexMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file, choosing the format by extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;

        let config: SiteConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {:?}", path))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in {:?}", path))?,
            _ => return Err(anyhow!("Unsupported config format: {:?}", path)),
        };

        config.validate()?;
        Ok(config)
    }

    /// Find the config file in a site root, if any
    pub fn discover<P: AsRef<Path>>(base_dir: P) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| base_dir.as_ref().join(name))
            .find(|p| p.is_file())
    }

    /// Reject settings that would make every build fail later on
    pub fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(anyhow!("per_page (paginate) must be at least 1"));
        }
        self.tz()?;
        Ok(())
    }

    /// Time zone used for frontmatter dates without an explicit offset
    pub fn tz(&self) -> Result<Tz> {
        if self.time_zone.trim().is_empty() {
            return Ok(Tz::UTC);
        }
        self.time_zone
            .trim()
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid time_zone {:?}: {}", self.time_zone, e))
    }

    /// Plural taxonomy names, in configuration order
    pub fn taxonomy_names(&self) -> Vec<String> {
        self.taxonomies.values().cloned().collect()
    }

    /// Main menu entries ordered by weight, then name
    pub fn main_menu(&self) -> Vec<MenuEntry> {
        let mut entries = self.menu.main.clone();
        entries.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));
        entries
    }
}

/// Markdown rendering options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// Pass raw HTML in Markdown through to the output
    #[serde(rename = "unsafe")]
    pub unsafe_html: bool,
    pub highlight: HighlightConfig,
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub style: String,
    #[serde(alias = "lineNos")]
    pub line_numbers: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            style: "InspiredGitHub".to_string(),
            line_numbers: false,
        }
    }
}

/// Menus defined in the site config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub main: Vec<MenuEntry>,
}

/// A single menu entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuEntry {
    pub name: String,
    pub url: String,
    pub weight: i64,
}
