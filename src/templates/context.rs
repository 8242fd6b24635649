//! Data structures exposed to templates

use indexmap::IndexMap;
use serde::Serialize;

use crate::config::SiteConfig;
use crate::content::Metadata;
use crate::helpers;

/// `site` in every template
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub base_url: String,
    /// Site-relative URL of the home page
    pub home_url: String,
    pub language_code: String,
    pub author: String,
    pub description: String,
    pub copyright: String,
    pub main_sections: Vec<String>,
    pub menu: Vec<MenuItem>,
    pub taxonomies: Vec<TaxonomyData>,
    pub params: IndexMap<String, serde_json::Value>,
}

impl SiteData {
    pub fn new(config: &SiteConfig, main_sections: Vec<String>, taxonomies: Vec<TaxonomyData>) -> Self {
        let menu = config
            .main_menu()
            .into_iter()
            .map(|entry| MenuItem {
                url: helpers::rel_url(config, &entry.url),
                name: entry.name,
            })
            .collect();

        Self {
            title: config.title.clone(),
            base_url: config.base_url.clone(),
            home_url: helpers::rel_url(config, "/"),
            language_code: config.language_code.clone(),
            author: config.author.clone(),
            description: config.description.clone(),
            copyright: config.copyright.clone(),
            main_sections,
            menu,
            taxonomies,
            params: config.params.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub url: String,
}

/// `page` in every template. Lists, term pages and the 404 page fill in
/// what applies to them and leave the rest empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageData {
    /// "page", "section", "home", "terms", "term" or "404"
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    /// RFC 3339
    pub date: String,
    /// RFC 3339
    pub lastmod: String,
    pub draft: bool,
    pub section: String,
    /// Source path relative to the content directory
    pub path: String,
    pub permalink: String,
    pub rel_permalink: String,
    /// Feed for this listing, if it has one
    pub rss_url: Option<String>,

    pub content: String,
    pub summary: String,
    /// Whether `summary` is shorter than `content`
    pub truncated: bool,
    pub toc: String,
    pub word_count: usize,
    pub reading_time: usize,
    /// Frontmatter `weight`, for templates that order by hand
    pub weight: i64,

    pub tags: Vec<TermLink>,
    pub categories: Vec<TermLink>,
    /// Terms per taxonomy (plural name)
    pub taxonomies: IndexMap<String, Vec<TermLink>>,
    pub params: Metadata,

    /// Older page in the same section
    pub prev: Option<PageLink>,
    /// Newer page in the same section
    pub next: Option<PageLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLink {
    pub title: String,
    pub permalink: String,
    pub rel_permalink: String,
}

/// A taxonomy term as seen from a template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermLink {
    pub name: String,
    pub slug: String,
    pub permalink: String,
    pub rel_permalink: String,
    /// Published documents carrying the term
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyData {
    pub singular: String,
    pub plural: String,
    pub rel_permalink: String,
    pub terms: Vec<TermLink>,
}

/// `paginator` on list pages
#[derive(Debug, Clone, Serialize)]
pub struct PaginatorData {
    /// 1-based
    pub page_number: usize,
    pub total_pages: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    pub first_url: String,
    pub last_url: String,
    pub pages: Vec<PageData>,
}
