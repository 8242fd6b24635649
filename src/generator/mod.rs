//! Generator module - composes published documents into rendered pages
//!
//! Documents are rendered in parallel; listings, taxonomy pages and feeds
//! are composed once every document is done. Nothing here touches the
//! publish directory: the result is a list of pages for the publisher.

mod feed;
mod paginate;
mod permalink;

pub use paginate::{page_path, paginate, Pager};
pub use permalink::{expand_pattern, output_file, permalink_path};

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tera::Context;

use crate::content::{newest_first, title_case, Document, DocumentKind, MarkdownRenderer, Taxonomy};
use crate::helpers::{self, normalize_path};
use crate::templates::{
    self, Lookup, PageData, PageKind, PageLink, PaginatorData, SiteData, TaxonomyData,
    TemplateError, TemplateRenderer, TermLink,
};
use crate::Site;

use feed::{Channel, FeedItem, SitemapEntry};

/// A page ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Relative to the publish directory
    pub output_path: PathBuf,
    pub html: String,
}

/// A page whose template failed to render
#[derive(Debug)]
pub struct PageFailure {
    pub output_path: PathBuf,
    /// Source document path, or the listing the page belongs to
    pub source: String,
    pub error: TemplateError,
}

/// Output of a compose run
#[derive(Debug, Default)]
pub struct Composition {
    /// Sorted by output path
    pub pages: Vec<RenderedPage>,
    pub failures: Vec<PageFailure>,
    /// Regular documents that made it into the site
    pub published: usize,
    /// Leaf bundle directory (relative to the content dir) -> output
    /// directory of its page, for published bundles
    pub bundles: BTreeMap<String, PathBuf>,
}

/// A document with its Markdown rendered and its location resolved
#[derive(Debug, Clone)]
pub struct RenderedDocument<'a> {
    pub doc: &'a Document,
    pub content: String,
    pub summary: String,
    /// Whether the summary leaves anything out
    pub truncated: bool,
    pub toc: String,
    pub word_count: usize,
    pub reading_time: usize,
    /// Permalink path without the base URL's path, e.g. "/posts/hello/"
    pub path: String,
    pub rel_permalink: String,
    pub permalink: String,
}

/// A page waiting for its template
struct PageJob {
    output_path: PathBuf,
    source: String,
    kind: PageKind,
    section: String,
    layout: Option<String>,
    context: Context,
    /// `Some` to list the page in the sitemap
    sitemap: Option<Option<DateTime<FixedOffset>>>,
    path: String,
}

/// A home, section or term listing before pagination
struct Listing<'l> {
    kind: PageKind,
    /// Section, or the taxonomy's plural name for term pages
    section: &'l str,
    source: String,
    /// Path of the first page
    path: String,
    page: PageData,
    /// Positions in the listing-ordered documents
    items: &'l [usize],
}

/// Composes the site from its documents
pub struct Generator<'a> {
    site: &'a Site,
    markdown: Arc<MarkdownRenderer>,
    renderer: TemplateRenderer,
}

impl<'a> Generator<'a> {
    /// Create a generator, compiling the site's templates
    pub fn new(site: &'a Site) -> Result<Self> {
        let config = &site.config;
        let markdown = Arc::new(MarkdownRenderer::with_options(
            &config.markup.highlight.style,
            config.markup.highlight.line_numbers,
            config.markup.unsafe_html,
        ));
        let sources = templates::sources_for(&site.layout_dir, site.theme_dir.as_deref());
        let renderer = TemplateRenderer::new(config, Arc::clone(&markdown), &sources)?;

        Ok(Self {
            site,
            markdown,
            renderer,
        })
    }

    /// Whether a document belongs in this build
    pub fn is_publishable(&self, doc: &Document) -> bool {
        if doc.draft && !self.site.include_drafts() {
            return false;
        }
        if doc.is_future(self.site.options.now) && !self.site.include_future() {
            return false;
        }
        true
    }

    /// Render every page of the site.
    ///
    /// A template failure only loses the affected page; it is reported in
    /// [`Composition::failures`].
    pub fn compose(&self, documents: &[Document]) -> Composition {
        let started = Instant::now();
        let config = &self.site.config;

        let mut published: Vec<&Document> = documents
            .iter()
            .filter(|d| d.kind == DocumentKind::Page)
            .filter(|d| {
                let keep = self.is_publishable(d);
                if !keep {
                    tracing::debug!("Not publishing {} (draft or future)", d.path);
                }
                keep
            })
            .collect();
        published.sort_by(|a, b| a.path.cmp(&b.path));

        let rendered: Vec<RenderedDocument> = published
            .par_iter()
            .map(|&doc| self.render_document(doc))
            .collect();

        // Two documents claiming one output path: the first by source path wins
        let mut claimed = HashSet::new();
        let mut docs = Vec::with_capacity(rendered.len());
        for r in rendered {
            if claimed.insert(output_file(&r.path)) {
                docs.push(r);
            } else {
                tracing::warn!(
                    "Skipping {}: {} is already produced by another document",
                    r.doc.path,
                    r.path
                );
            }
        }
        docs.sort_by(|a, b| newest_first(a.doc, b.doc));

        tracing::debug!(
            "Rendered {} documents in {:?}",
            docs.len(),
            started.elapsed()
        );

        let home_doc = documents
            .iter()
            .find(|d| d.kind == DocumentKind::Home && self.is_publishable(d));
        let section_docs: HashMap<&str, &Document> = documents
            .iter()
            .filter(|d| d.kind == DocumentKind::Section && d.dir == d.section)
            .filter(|d| self.is_publishable(d))
            .map(|d| (d.section.as_str(), d))
            .collect();

        let taxonomies: Vec<Taxonomy> = config
            .taxonomies
            .iter()
            .map(|(singular, plural)| Taxonomy::build(singular, plural, docs.iter().map(|r| r.doc)))
            .collect();
        let mut term_links: HashMap<(String, String), TermLink> = HashMap::new();
        let taxonomy_data: Vec<TaxonomyData> = taxonomies
            .iter()
            .map(|tax| {
                let terms: Vec<TermLink> = tax
                    .terms
                    .iter()
                    .map(|term| {
                        let link = self.term_link(&tax.plural, &term.name, &term.slug, term.documents.len());
                        term_links.insert((tax.plural.clone(), term.slug.clone()), link.clone());
                        link
                    })
                    .collect();
                TaxonomyData {
                    singular: tax.singular.clone(),
                    plural: tax.plural.clone(),
                    rel_permalink: helpers::rel_url(config, &normalize_path(&tax.plural)),
                    terms,
                }
            })
            .collect();

        let mut sections: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, r) in docs.iter().enumerate() {
            if !r.doc.section.is_empty() {
                sections.entry(r.doc.section.as_str()).or_default().push(i);
            }
        }

        let main_sections = self.main_sections(&sections);
        let home_items: Vec<usize> = docs
            .iter()
            .enumerate()
            .filter(|(_, r)| main_sections.is_empty() || main_sections.contains(&r.doc.section))
            .map(|(i, _)| i)
            .collect();

        let site_data = SiteData::new(config, main_sections.clone(), taxonomy_data.clone());

        let mut pages: Vec<PageData> = docs
            .iter()
            .map(|r| self.page_data(r, &term_links))
            .collect();
        for items in sections.values() {
            for (pos, &i) in items.iter().enumerate() {
                pages[i].prev = items.get(pos + 1).map(|&j| page_link(&docs[j]));
                pages[i].next = pos.checked_sub(1).map(|p| page_link(&docs[items[p]]));
            }
        }

        let mut jobs = Vec::new();

        // Single pages
        for (r, page) in docs.iter().zip(&pages) {
            let mut context = self.base_context(&site_data);
            context.insert("page", page);
            jobs.push(PageJob {
                output_path: output_file(&r.path),
                source: r.doc.path.clone(),
                kind: PageKind::Single,
                section: r.doc.section.clone(),
                layout: r.doc.layout.clone(),
                context,
                sitemap: Some(Some(r.doc.modified())),
                path: r.path.clone(),
            });
        }

        // Home
        let home_page = self.listing_page(
            "home",
            home_doc,
            &config.title,
            "/",
            &home_items,
            &docs,
        );
        jobs.extend(self.listing_jobs(
            Listing {
                kind: PageKind::Home,
                section: "",
                source: "home page".to_string(),
                path: "/".to_string(),
                page: home_page,
                items: &home_items,
            },
            self.base_context(&site_data),
            &pages,
        ));

        // Sections
        for (name, items) in &sections {
            let path = normalize_path(name);
            let page = self.listing_page(
                "section",
                section_docs.get(name).copied(),
                &title_case(name),
                &path,
                items,
                &docs,
            );
            jobs.extend(self.listing_jobs(
                Listing {
                    kind: PageKind::Section,
                    section: name,
                    source: format!("section {}", name),
                    path,
                    page,
                    items,
                },
                self.base_context(&site_data),
                &pages,
            ));
        }

        // Taxonomies
        for (tax, data) in taxonomies.iter().zip(&taxonomy_data) {
            let path = normalize_path(&tax.plural);
            let mut context = self.base_context(&site_data);
            context.insert("taxonomy", data);
            context.insert(
                "page",
                &PageData {
                    kind: "terms".to_string(),
                    title: title_case(&tax.plural),
                    permalink: helpers::abs_url(config, &path),
                    rel_permalink: helpers::rel_url(config, &path),
                    ..Default::default()
                },
            );
            jobs.push(PageJob {
                output_path: output_file(&path),
                source: format!("taxonomy {}", tax.plural),
                kind: PageKind::Terms,
                section: tax.plural.clone(),
                layout: None,
                context,
                sitemap: Some(docs.first().map(|r| r.doc.date)),
                path,
            });

            for term in &tax.terms {
                let link = &term_links[&(tax.plural.clone(), term.slug.clone())];
                let path = normalize_path(&format!("{}/{}", tax.plural, term.slug));
                let page = self.listing_page("term", None, &term.name, &path, &term.documents, &docs);
                let mut context = self.base_context(&site_data);
                context.insert("taxonomy", data);
                context.insert("term", link);
                jobs.extend(self.listing_jobs(
                    Listing {
                        kind: PageKind::Term,
                        section: &tax.plural,
                        source: format!("{} {}", tax.singular, term.name),
                        path,
                        page,
                        items: &term.documents,
                    },
                    context,
                    &pages,
                ));
            }
        }

        // 404
        let mut context = self.base_context(&site_data);
        context.insert(
            "page",
            &PageData {
                kind: "404".to_string(),
                title: "Page not found".to_string(),
                permalink: helpers::abs_url(config, "/404.html"),
                rel_permalink: helpers::rel_url(config, "/404.html"),
                ..Default::default()
            },
        );
        jobs.push(PageJob {
            output_path: PathBuf::from("404.html"),
            source: "404 page".to_string(),
            kind: PageKind::NotFound,
            section: String::new(),
            layout: None,
            context,
            sitemap: None,
            path: "/404.html".to_string(),
        });

        let results: Vec<(Result<RenderedPage, PageFailure>, Option<SitemapEntry>)> = jobs
            .into_par_iter()
            .map(|job| self.render_job(job))
            .collect();

        let mut composition = Composition {
            published: docs.len(),
            bundles: bundle_dirs(&docs),
            ..Default::default()
        };
        let mut written = HashSet::new();
        let mut sitemap_entries = Vec::new();
        for (result, entry) in results {
            match result {
                Ok(page) => {
                    if !written.insert(page.output_path.clone()) {
                        tracing::warn!(
                            "Skipping duplicate output {}",
                            page.output_path.display()
                        );
                        continue;
                    }
                    composition.pages.push(page);
                    sitemap_entries.extend(entry);
                }
                Err(failure) => {
                    tracing::error!(
                        "Failed to render {} ({}): {}",
                        failure.source,
                        failure.output_path.display(),
                        failure.error
                    );
                    composition.failures.push(failure);
                }
            }
        }

        for page in self.feeds(&docs, &home_items, &sections, &taxonomies, home_doc, &section_docs) {
            if written.insert(page.output_path.clone()) {
                composition.pages.push(page);
            }
        }
        composition.pages.push(RenderedPage {
            output_path: PathBuf::from("sitemap.xml"),
            html: feed::sitemap(&sitemap_entries),
        });

        composition
            .pages
            .sort_by(|a, b| a.output_path.cmp(&b.output_path));

        tracing::info!(
            "Composed {} pages from {} documents in {:?}",
            composition.pages.len(),
            composition.published,
            started.elapsed()
        );

        composition
    }

    /// Render a document's Markdown and resolve its permalink
    pub fn render_document<'d>(&self, doc: &'d Document) -> RenderedDocument<'d> {
        let config = &self.site.config;

        let (excerpt, body) = match MarkdownRenderer::split_excerpt(&doc.body) {
            Some((excerpt, full)) => (Some(excerpt), full),
            None => (None, doc.body.clone()),
        };
        let rendered = self.markdown.render(&body);
        let word_count = helpers::count_words(&rendered.html);

        let explicit = doc.summary.as_deref().filter(|s| !s.trim().is_empty());
        let (summary, truncated) = match (excerpt, explicit) {
            (Some(excerpt), _) => (self.markdown.render(&excerpt).html, true),
            (None, Some(summary)) => (self.markdown.render(summary).html, true),
            (None, None) => {
                // Text from rendered HTML is already escaped
                let text = helpers::strip_html(&rendered.html);
                helpers::truncate_words(&text, config.summary_length)
            }
        };

        let path = permalink_path(doc, &config.permalinks);

        RenderedDocument {
            doc,
            toc: rendered.table_of_contents(),
            content: rendered.html,
            summary,
            truncated,
            word_count,
            reading_time: helpers::reading_time(word_count),
            rel_permalink: helpers::rel_url(config, &path),
            permalink: helpers::abs_url(config, &path),
            path,
        }
    }

    /// `main_sections` from the config, else the section with the most
    /// documents (alphabetically first on a tie)
    fn main_sections(&self, sections: &BTreeMap<&str, Vec<usize>>) -> Vec<String> {
        if !self.site.config.main_sections.is_empty() {
            return self.site.config.main_sections.clone();
        }
        let mut best: Option<(&str, usize)> = None;
        for (name, items) in sections {
            match best {
                Some((_, count)) if count >= items.len() => {}
                _ => best = Some((name, items.len())),
            }
        }
        best.map(|(name, _)| vec![name.to_string()])
            .unwrap_or_default()
    }

    fn base_context(&self, site: &SiteData) -> Context {
        let mut context = Context::new();
        context.insert("site", site);
        context.insert("generator_version", env!("CARGO_PKG_VERSION"));
        context
    }

    fn term_link(&self, plural: &str, name: &str, slug: &str, count: usize) -> TermLink {
        let config = &self.site.config;
        let path = normalize_path(&format!("{}/{}", plural, slug));
        TermLink {
            name: name.to_string(),
            slug: slug.to_string(),
            permalink: helpers::abs_url(config, &path),
            rel_permalink: helpers::rel_url(config, &path),
            count,
        }
    }

    /// Template data for a single document
    fn page_data(
        &self,
        r: &RenderedDocument,
        term_links: &HashMap<(String, String), TermLink>,
    ) -> PageData {
        let doc = r.doc;
        let mut taxonomies = IndexMap::new();
        for plural in self.site.config.taxonomies.values() {
            let mut seen = HashSet::new();
            let links: Vec<TermLink> = doc
                .terms(plural)
                .iter()
                .filter_map(|name| term_links.get(&(plural.clone(), slug::slugify(name))))
                .filter(|link| seen.insert(link.slug.clone()))
                .cloned()
                .collect();
            taxonomies.insert(plural.clone(), links);
        }

        PageData {
            kind: "page".to_string(),
            title: doc.title.clone(),
            description: doc.description.clone(),
            author: doc.author.clone(),
            date: doc.date.to_rfc3339(),
            lastmod: doc.modified().to_rfc3339(),
            draft: doc.draft,
            section: doc.section.clone(),
            path: doc.path.clone(),
            permalink: r.permalink.clone(),
            rel_permalink: r.rel_permalink.clone(),
            rss_url: None,
            content: r.content.clone(),
            summary: r.summary.clone(),
            truncated: r.truncated,
            toc: r.toc.clone(),
            word_count: r.word_count,
            reading_time: r.reading_time,
            weight: doc.weight,
            tags: taxonomies.get("tags").cloned().unwrap_or_default(),
            categories: taxonomies.get("categories").cloned().unwrap_or_default(),
            taxonomies,
            params: doc.params.clone(),
            prev: None,
            next: None,
        }
    }

    /// Template data for a listing: home, section or term
    fn listing_page(
        &self,
        kind: &str,
        meta: Option<&Document>,
        fallback_title: &str,
        path: &str,
        items: &[usize],
        docs: &[RenderedDocument],
    ) -> PageData {
        let config = &self.site.config;
        let rss_path = format!("{}index.xml", path);
        let newest = items.first().map(|&i| docs[i].doc.date);

        let mut page = PageData {
            kind: kind.to_string(),
            title: fallback_title.to_string(),
            date: newest.map(|d| d.to_rfc3339()).unwrap_or_default(),
            lastmod: newest.map(|d| d.to_rfc3339()).unwrap_or_default(),
            permalink: helpers::abs_url(config, path),
            rel_permalink: helpers::rel_url(config, path),
            rss_url: Some(helpers::abs_url(config, &rss_path)),
            ..Default::default()
        };

        if let Some(doc) = meta {
            let rendered = self.markdown.render(&doc.body);
            page.title = doc.title.clone();
            page.description = doc.description.clone();
            page.author = doc.author.clone();
            page.path = doc.path.clone();
            page.section = doc.section.clone();
            page.params = doc.params.clone();
            page.word_count = helpers::count_words(&rendered.html);
            page.reading_time = helpers::reading_time(page.word_count);
            page.toc = rendered.table_of_contents();
            page.content = rendered.html;
        }

        page
    }

    /// One job per pager of a listing
    fn listing_jobs(&self, listing: Listing, context: Context, pages: &[PageData]) -> Vec<PageJob> {
        let config = &self.site.config;
        let base = listing.path.as_str();
        let lastmod = DateTime::parse_from_rfc3339(&listing.page.lastmod).ok();

        paginate(base, listing.items.len(), config.per_page)
            .into_iter()
            .map(|pager| {
                let mut page = listing.page.clone();
                page.permalink = helpers::abs_url(config, &pager.path);
                page.rel_permalink = helpers::rel_url(config, &pager.path);

                let paginator = PaginatorData {
                    page_number: pager.number,
                    total_pages: pager.total_pages,
                    per_page: config.per_page,
                    total_items: listing.items.len(),
                    has_prev: pager.has_prev(),
                    has_next: pager.has_next(),
                    prev_url: pager
                        .has_prev()
                        .then(|| helpers::rel_url(config, &page_path(base, pager.number - 1))),
                    next_url: pager
                        .has_next()
                        .then(|| helpers::rel_url(config, &page_path(base, pager.number + 1))),
                    first_url: helpers::rel_url(config, base),
                    last_url: helpers::rel_url(config, &page_path(base, pager.total_pages)),
                    pages: listing.items[pager.range.clone()]
                        .iter()
                        .map(|&i| pages[i].clone())
                        .collect(),
                };

                let mut context = context.clone();
                context.insert("page", &page);
                context.insert("paginator", &paginator);

                PageJob {
                    output_path: output_file(&pager.path),
                    source: listing.source.clone(),
                    kind: listing.kind,
                    section: listing.section.to_string(),
                    layout: None,
                    context,
                    // Only the first page of a listing goes in the sitemap
                    sitemap: (pager.number == 1).then_some(lastmod),
                    path: pager.path,
                }
            })
            .collect()
    }

    fn render_job(&self, job: PageJob) -> (Result<RenderedPage, PageFailure>, Option<SitemapEntry>) {
        let lookup = Lookup::new(job.kind, &job.section).with_layout(job.layout.as_deref());
        match self.renderer.render_page(&lookup, &job.context) {
            Ok(html) => {
                tracing::debug!("Rendered {}", job.output_path.display());
                let entry = job.sitemap.map(|lastmod| SitemapEntry {
                    loc: helpers::abs_url(&self.site.config, &job.path),
                    lastmod,
                });
                (
                    Ok(RenderedPage {
                        output_path: job.output_path,
                        html,
                    }),
                    entry,
                )
            }
            Err(error) => (
                Err(PageFailure {
                    output_path: job.output_path,
                    source: job.source,
                    error,
                }),
                None,
            ),
        }
    }

    /// RSS feeds for the home page, every section and every term
    fn feeds(
        &self,
        docs: &[RenderedDocument],
        home_items: &[usize],
        sections: &BTreeMap<&str, Vec<usize>>,
        taxonomies: &[Taxonomy],
        home_doc: Option<&Document>,
        section_docs: &HashMap<&str, &Document>,
    ) -> Vec<RenderedPage> {
        let config = &self.site.config;
        let mut feeds = vec![self.feed(
            "/",
            home_doc.map(|d| d.title.as_str()).unwrap_or(&config.title),
            &config.description,
            home_items,
            docs,
        )];

        for (name, items) in sections {
            let title = section_docs
                .get(name)
                .map(|d| d.title.clone())
                .unwrap_or_else(|| title_case(name));
            let description = format!("Recent content in {} on {}", title, config.title);
            feeds.push(self.feed(&normalize_path(name), &title, &description, items, docs));
        }

        for tax in taxonomies {
            for term in &tax.terms {
                let path = normalize_path(&format!("{}/{}", tax.plural, term.slug));
                let description = format!("Recent content in {} on {}", term.name, config.title);
                feeds.push(self.feed(&path, &term.name, &description, &term.documents, docs));
            }
        }

        feeds
    }

    fn feed(
        &self,
        path: &str,
        title: &str,
        description: &str,
        items: &[usize],
        docs: &[RenderedDocument],
    ) -> RenderedPage {
        let config = &self.site.config;
        let feed_path = format!("{}index.xml", path);
        let link = helpers::abs_url(config, path);
        let feed_link = helpers::abs_url(config, &feed_path);

        let entries: Vec<FeedItem> = items
            .iter()
            .take(config.rss_limit)
            .map(|&i| {
                let r = &docs[i];
                FeedItem {
                    title: &r.doc.title,
                    link: &r.permalink,
                    date: r.doc.date,
                    author: r.doc.author.as_deref(),
                    description: &r.summary,
                }
            })
            .collect();

        let channel = Channel {
            title,
            link: &link,
            feed_link: &feed_link,
            description,
            language: &config.language_code,
        };

        RenderedPage {
            output_path: output_file(&feed_path),
            html: feed::rss(&channel, &entries, &helpers::host_url(config)),
        }
    }
}

/// Output directories of leaf bundles (`<dir>/index.md`)
fn bundle_dirs(docs: &[RenderedDocument]) -> BTreeMap<String, PathBuf> {
    docs.iter()
        .filter_map(|r| {
            let dir = r.doc.bundle_dir()?;
            let out = output_file(&r.path);
            Some((dir.to_string(), out.parent()?.to_path_buf()))
        })
        .collect()
}

fn page_link(r: &RenderedDocument) -> PageLink {
    PageLink {
        title: r.doc.title.clone(),
        permalink: r.permalink.clone(),
        rel_permalink: r.rel_permalink.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    fn site(dir: &tempfile::TempDir, options: BuildOptions) -> Site {
        Site::new(dir.path()).unwrap().with_options(options)
    }

    fn options() -> BuildOptions {
        BuildOptions {
            now: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            ..Default::default()
        }
    }

    fn doc(path: &str, raw: &str) -> Document {
        let taxonomies = vec!["tags".to_string(), "categories".to_string()];
        Document::parse(path, PathBuf::from(path), raw, Tz::UTC, &taxonomies).unwrap()
    }

    fn page<'p>(composition: &'p Composition, path: &str) -> &'p str {
        &composition
            .pages
            .iter()
            .find(|p| p.output_path == PathBuf::from(path))
            .unwrap_or_else(|| panic!("no page {}", path))
            .html
    }

    fn has_page(composition: &Composition, path: &str) -> bool {
        composition
            .pages
            .iter()
            .any(|p| p.output_path == PathBuf::from(path))
    }

    #[test]
    fn test_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir, options());
        let generator = Generator::new(&site).unwrap();

        let docs = vec![doc(
            "posts/hello.md",
            "---\ntitle: Hello\ndate: 2024-01-01\ndraft: false\n---\n# Hi\n",
        )];
        let composition = generator.compose(&docs);

        assert!(composition.failures.is_empty());
        assert_eq!(composition.published, 1);
        let html = page(&composition, "posts/hello/index.html");
        assert!(html.contains("<h1 id=\"hi\">Hi</h1>"));
        assert!(html.contains("<title>Hello | My New Site</title>"));
    }

    #[test]
    fn test_drafts_and_future_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let docs = vec![
            doc("posts/draft.md", "---\ntitle: D\ndate: 2024-01-01\ndraft: true\n---\n"),
            doc("posts/later.md", "---\ntitle: L\ndate: 2030-01-01\n---\n"),
            doc("posts/now.md", "---\ntitle: N\ndate: 2024-01-01\n---\n"),
        ];

        let site_default = site(&dir, options());
        let composition = Generator::new(&site_default).unwrap().compose(&docs);
        assert!(has_page(&composition, "posts/now/index.html"));
        assert!(!has_page(&composition, "posts/draft/index.html"));
        assert!(!has_page(&composition, "posts/later/index.html"));

        let site_all = site(
            &dir,
            BuildOptions {
                build_drafts: true,
                build_future: true,
                ..options()
            },
        );
        let composition = Generator::new(&site_all).unwrap().compose(&docs);
        assert!(has_page(&composition, "posts/draft/index.html"));
        assert!(has_page(&composition, "posts/later/index.html"));
    }

    #[test]
    fn test_listing_order_and_pagination() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "paginate = 2\n").unwrap();
        let site = site(&dir, options());
        let docs = vec![
            doc("posts/a.md", "---\ntitle: Alpha\ndate: 2024-01-01\n---\n"),
            doc("posts/b.md", "---\ntitle: Bravo\ndate: 2024-01-02\n---\n"),
            doc("posts/c.md", "---\ntitle: Charlie\ndate: 2024-01-01\n---\n"),
        ];
        let composition = Generator::new(&site).unwrap().compose(&docs);

        let home = page(&composition, "index.html");
        let bravo = home.find("Bravo").unwrap();
        let alpha = home.find("Alpha").unwrap();
        assert!(bravo < alpha);
        assert!(!home.contains("Charlie"));

        let second = page(&composition, "page/2/index.html");
        assert!(second.contains("Charlie"));
        assert!(has_page(&composition, "posts/index.html"));
        assert!(has_page(&composition, "posts/page/2/index.html"));
    }

    #[test]
    fn test_taxonomy_pages_and_feeds() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir, options());
        let docs = vec![
            doc("posts/a.md", "---\ntitle: A\ndate: 2024-01-01\ntags: [Rust, web]\n---\n"),
            doc("posts/b.md", "---\ntitle: B\ndate: 2024-01-02\ntags: [rust]\n---\n"),
        ];
        let composition = Generator::new(&site).unwrap().compose(&docs);

        let terms = page(&composition, "tags/index.html");
        assert!(terms.contains("/tags/rust/"));
        assert!(terms.contains("(2)"));
        assert!(has_page(&composition, "tags/web/index.html"));
        assert!(has_page(&composition, "categories/index.html"));

        let feed = page(&composition, "index.xml");
        assert!(feed.contains("<link>http://localhost:1313/posts/b/</link>"));
        assert!(has_page(&composition, "posts/index.xml"));
        assert!(has_page(&composition, "tags/rust/index.xml"));

        let sitemap = page(&composition, "sitemap.xml");
        assert!(sitemap.contains("<loc>http://localhost:1313/posts/a/</loc>"));
        assert!(!sitemap.contains("404.html"));
        assert!(has_page(&composition, "404.html"));
    }

    #[test]
    fn test_duplicate_output_path_skips_later_document() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir, options());
        let docs = vec![
            doc("posts/b.md", "---\ntitle: Second\nurl: /same/\n---\n"),
            doc("posts/a.md", "---\ntitle: First\nurl: /same/\n---\n"),
        ];
        let composition = Generator::new(&site).unwrap().compose(&docs);
        assert_eq!(composition.published, 1);
        assert!(page(&composition, "same/index.html").contains("First"));
    }

    #[test]
    fn test_template_error_only_loses_that_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("layouts/notes")).unwrap();
        std::fs::write(
            dir.path().join("layouts/notes/single.html"),
            "{{ page.no_such_field }}",
        )
        .unwrap();
        let site = site(&dir, options());
        let docs = vec![
            doc("notes/broken.md", "---\ntitle: Broken\ndate: 2024-01-01\n---\n"),
            doc("posts/fine.md", "---\ntitle: Fine\ndate: 2024-01-01\n---\n"),
        ];
        let composition = Generator::new(&site).unwrap().compose(&docs);

        assert_eq!(composition.failures.len(), 1);
        assert_eq!(composition.failures[0].source, "notes/broken.md");
        assert!(!has_page(&composition, "notes/broken/index.html"));
        assert!(has_page(&composition, "posts/fine/index.html"));
    }

    #[test]
    fn test_weight_reaches_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("layouts/docs")).unwrap();
        std::fs::write(
            dir.path().join("layouts/docs/single.html"),
            "{{ page.title }}:{{ page.weight }}",
        )
        .unwrap();
        let site = site(&dir, options());
        let docs = vec![
            doc("docs/intro.md", "---\ntitle: Intro\ndate: 2024-01-01\nweight: 3\n---\n"),
            doc("docs/plain.md", "---\ntitle: Plain\ndate: 2024-01-01\n---\n"),
        ];
        let composition = Generator::new(&site).unwrap().compose(&docs);

        assert_eq!(page(&composition, "docs/intro/index.html"), "Intro:3");
        assert_eq!(page(&composition, "docs/plain/index.html"), "Plain:0");
    }

    #[test]
    fn test_summary_sources() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir, options());
        let generator = Generator::new(&site).unwrap();

        let d = doc("posts/a.md", "Intro text.\n\n<!--more-->\n\nThe rest.\n");
        let r = generator.render_document(&d);
        assert_eq!(r.summary, "<p>Intro text.</p>\n");
        assert!(r.truncated);
        assert!(r.content.contains("The rest."));

        let d = doc("posts/b.md", "---\nsummary: Custom *one*\n---\nBody\n");
        let r = generator.render_document(&d);
        assert_eq!(r.summary, "<p>Custom <em>one</em></p>\n");

        let d = doc("posts/c.md", "Short & sweet.\n");
        let r = generator.render_document(&d);
        assert_eq!(r.summary, "Short &amp; sweet.");
        assert!(!r.truncated);
        assert_eq!(r.rel_permalink, "/posts/c/");
        assert_eq!(r.permalink, "http://localhost:1313/posts/c/");
    }

    #[test]
    fn test_prev_next_within_section() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(&dir, options());
        let docs = vec![
            doc("posts/a.md", "---\ntitle: Older\ndate: 2024-01-01\n---\n"),
            doc("posts/b.md", "---\ntitle: Newer\ndate: 2024-01-02\n---\n"),
        ];
        let composition = Generator::new(&site).unwrap().compose(&docs);
        let newer = page(&composition, "posts/b/index.html");
        assert!(newer.contains("class=\"prev\" href=\"/posts/a/\""));
        let older = page(&composition, "posts/a/index.html");
        assert!(older.contains("class=\"next\" href=\"/posts/b/\""));
    }
}
