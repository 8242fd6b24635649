//! Content loader - loads documents from the content directory

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{Document, ParseError};
use crate::Site;

/// A document that could not be parsed
#[derive(Debug)]
pub struct LoadFailure {
    pub path: String,
    pub error: ParseError,
}

/// Everything found under the content directory
#[derive(Debug, Default)]
pub struct LoadedContent {
    /// Parsed documents, ordered by path
    pub documents: Vec<Document>,
    /// Documents skipped because their metadata was malformed
    pub failures: Vec<LoadFailure>,
    /// Non-Markdown files (bundle images and the like), relative paths
    pub resources: Vec<PathBuf>,
}

/// Loads content from the content directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    tz: Tz,
    taxonomies: Vec<String>,
    ignore: Vec<Regex>,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Result<Self> {
        let ignore = site
            .config
            .ignore_files
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| anyhow!("Invalid ignore_files pattern {:?}: {}", pattern, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            site,
            tz: site.config.tz()?,
            taxonomies: site.config.taxonomy_names(),
            ignore,
        })
    }

    /// Load every document under the content directory.
    ///
    /// Unreadable files abort the load; malformed metadata only skips the
    /// affected document.
    pub fn load(&self) -> Result<LoadedContent> {
        let content_dir = &self.site.content_dir;
        let mut loaded = LoadedContent::default();

        if !content_dir.exists() {
            tracing::warn!("Content directory {:?} does not exist", content_dir);
            return Ok(loaded);
        }

        for entry in WalkDir::new(content_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        {
            let entry = entry.with_context(|| format!("Failed to scan {:?}", content_dir))?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_path(path, content_dir);
            if self.is_ignored(&relative) {
                tracing::debug!("Ignoring {}", relative);
                continue;
            }

            if !is_markdown_file(path) {
                loaded.resources.push(PathBuf::from(&relative));
                continue;
            }

            match self.load_document(path, &relative)? {
                Ok(doc) => loaded.documents.push(doc),
                Err(error) => {
                    tracing::warn!("Skipping {}: {}", relative, error);
                    loaded.failures.push(LoadFailure {
                        path: relative,
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            "Loaded {} documents ({} skipped, {} resources)",
            loaded.documents.len(),
            loaded.failures.len(),
            loaded.resources.len()
        );

        Ok(loaded)
    }

    /// Read and parse a single document. The outer result carries I/O
    /// errors, the inner one metadata errors.
    fn load_document(
        &self,
        path: &Path,
        relative: &str,
    ) -> Result<std::result::Result<Document, ParseError>> {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Document::parse(
            relative,
            path.to_path_buf(),
            &raw,
            self.tz,
            &self.taxonomies,
        ))
    }

    fn is_ignored(&self, relative: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(relative))
    }
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// `/`-separated path relative to `base`
fn relative_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
