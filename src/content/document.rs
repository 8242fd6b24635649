//! Document model

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::path::PathBuf;

use super::frontmatter::{FrontMatter, ParseError};
use super::metadata::Metadata;

/// What a content file represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A regular page: a post, the résumé, an about page
    Page,
    /// `content/<section>/_index.md`: metadata for a section listing
    Section,
    /// `content/_index.md`: metadata for the home page
    Home,
}

/// A source document from the content directory
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the content directory, `/`-separated. Unique.
    pub path: String,
    /// Full path on disk
    pub source: PathBuf,
    pub kind: DocumentKind,
    /// First directory component, empty for root-level pages
    pub section: String,
    /// Directory part of the output path, `/`-separated, no slashes at ends
    pub dir: String,
    /// URL-safe name used for the output path
    pub slug: String,

    pub title: String,
    pub date: DateTime<FixedOffset>,
    pub lastmod: Option<DateTime<FixedOffset>>,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub draft: bool,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub summary: Option<String>,
    pub layout: Option<String>,
    pub weight: i64,
    pub params: Metadata,
    /// Terms per taxonomy (plural name), for every configured taxonomy
    pub taxonomies: IndexMap<String, Vec<String>>,

    /// Raw Markdown body
    pub body: String,
}

impl Document {
    /// Build a document from its raw text.
    ///
    /// `path` is relative to the content directory. `taxonomies` lists the
    /// plural names of the configured taxonomies.
    pub fn parse(
        path: &str,
        source: PathBuf,
        raw: &str,
        tz: Tz,
        taxonomies: &[String],
    ) -> Result<Self, ParseError> {
        let (fm, body) = FrontMatter::parse(raw, tz)?;

        let mut terms = IndexMap::new();
        for name in taxonomies {
            terms.insert(name.clone(), fm.terms(name)?);
        }

        let location = Location::from_path(path);

        let title = fm
            .title
            .clone()
            .unwrap_or_else(|| location.fallback_title.clone());
        let slug = match fm.slug.as_deref() {
            Some(s) if !s.trim().is_empty() => slug::slugify(s),
            _ => location.slug.clone(),
        };
        let date = fm
            .date
            .or(fm.publish_date)
            .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.fixed_offset());

        Ok(Self {
            path: path.to_string(),
            source,
            kind: location.kind,
            section: location.section,
            dir: location.dir,
            slug,
            title,
            date,
            lastmod: fm.lastmod,
            publish_date: fm.publish_date,
            draft: fm.draft,
            tags: fm.tags,
            categories: fm.categories,
            author: fm.author,
            description: fm.description,
            url: fm.url,
            summary: fm.summary,
            layout: fm.layout,
            weight: fm.weight,
            params: fm.params,
            taxonomies: terms,
            body: body.to_string(),
        })
    }

    /// Time after which the document may be published
    pub fn publish_at(&self) -> DateTime<FixedOffset> {
        self.publish_date.unwrap_or(self.date)
    }

    /// Whether the document is dated after `now`
    pub fn is_future(&self, now: DateTime<Utc>) -> bool {
        self.publish_at() > now
    }

    /// Last modification time, falling back to the publication date
    pub fn modified(&self) -> DateTime<FixedOffset> {
        self.lastmod.unwrap_or(self.date)
    }

    /// Terms of the given taxonomy
    pub fn terms(&self, taxonomy: &str) -> &[String] {
        self.taxonomies
            .get(taxonomy)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Directory of a leaf bundle: `posts/trip` for `posts/trip/index.md`
    pub fn bundle_dir(&self) -> Option<&str> {
        let (dir, file) = self.path.rsplit_once('/')?;
        let stem = file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file);
        (stem == "index").then_some(dir)
    }
}

/// Listing order: newest first, ties broken by ascending path
pub fn newest_first(a: &Document, b: &Document) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path))
}

/// Where a document sits in the content tree
struct Location {
    kind: DocumentKind,
    section: String,
    dir: String,
    slug: String,
    fallback_title: String,
}

impl Location {
    fn from_path(path: &str) -> Self {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let (file, dirs) = match parts.split_last() {
            Some((file, dirs)) => (*file, dirs),
            None => ("", &[][..]),
        };
        let stem = file
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file);

        match stem {
            // Listing metadata for a section (or the home page at the root)
            "_index" => {
                let kind = if dirs.is_empty() {
                    DocumentKind::Home
                } else {
                    DocumentKind::Section
                };
                Self {
                    kind,
                    section: dirs.first().map(|s| s.to_string()).unwrap_or_default(),
                    dir: dirs.join("/"),
                    slug: String::new(),
                    fallback_title: dirs.last().map(|s| title_case(s)).unwrap_or_default(),
                }
            }
            // Leaf bundle: the directory names the page
            "index" if !dirs.is_empty() => {
                let name = dirs[dirs.len() - 1];
                let parents = &dirs[..dirs.len() - 1];
                Self {
                    kind: DocumentKind::Page,
                    section: if parents.is_empty() {
                        String::new()
                    } else {
                        parents[0].to_string()
                    },
                    dir: parents.join("/"),
                    slug: slug::slugify(name),
                    fallback_title: name.to_string(),
                }
            }
            _ => Self {
                kind: DocumentKind::Page,
                section: if dirs.is_empty() {
                    String::new()
                } else {
                    dirs[0].to_string()
                },
                dir: dirs.join("/"),
                slug: slug::slugify(stem),
                fallback_title: stem.to_string(),
            },
        }
    }
}

/// "my-posts" -> "My-posts", the way section titles default
pub(crate) fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
