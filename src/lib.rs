//! quire: a static site generator for Markdown documents with frontmatter
//!
//! A site is a directory with a config file, a `content/` tree of Markdown
//! documents, optional `layouts/`, `static/` and `themes/`, and a publish
//! directory the build writes into.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod publish;
pub mod server;
pub mod templates;

use anyhow::{anyhow, bail, Result};
use std::path::{Component, Path, PathBuf};

use config::{BuildOptions, SiteConfig};

/// A site on disk plus the options for the current invocation.
///
/// Built once per command and passed around by reference.
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: SiteConfig,
    /// Command-line options for this run
    pub options: BuildOptions,
    /// Site root
    pub base_dir: PathBuf,
    /// Config file the configuration came from, if any
    pub config_path: Option<PathBuf>,
    pub content_dir: PathBuf,
    pub static_dir: PathBuf,
    pub layout_dir: PathBuf,
    pub archetype_dir: PathBuf,
    /// Selected theme, if the config names one
    pub theme_dir: Option<PathBuf>,
    /// Publish (output) directory
    pub public_dir: PathBuf,
}

impl Site {
    /// Open the site rooted at `base_dir`, reading its config file if there
    /// is one
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = SiteConfig::discover(&base_dir);

        let config = match &config_path {
            Some(path) => SiteConfig::load(path)?,
            None => {
                tracing::debug!("No config file in {:?}, using defaults", base_dir);
                SiteConfig::default()
            }
        };

        let theme_dir = if config.theme.trim().is_empty() {
            None
        } else {
            let dir = base_dir.join(&config.themes_dir).join(config.theme.trim());
            if !dir.is_dir() {
                return Err(anyhow!("Theme directory not found: {:?}", dir));
            }
            Some(dir)
        };

        Ok(Self {
            content_dir: base_dir.join(&config.content_dir),
            static_dir: base_dir.join(&config.static_dir),
            layout_dir: base_dir.join(&config.layout_dir),
            archetype_dir: base_dir.join(&config.archetype_dir),
            public_dir: base_dir.join(&config.publish_dir),
            theme_dir,
            config_path,
            config,
            options: BuildOptions::default(),
            base_dir,
        })
    }

    /// Layer command-line options over the config
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        if let Some(base_url) = &options.base_url {
            self.config.base_url = base_url.clone();
        }
        if let Some(destination) = &options.destination {
            self.public_dir = if destination.is_absolute() {
                destination.clone()
            } else {
                self.base_dir.join(destination)
            };
        }
        self.options = options;
        self
    }

    pub fn include_drafts(&self) -> bool {
        self.options.build_drafts || self.config.build_drafts
    }

    pub fn include_future(&self) -> bool {
        self.options.build_future || self.config.build_future
    }

    /// Whether stale files are pruned from the publish directory
    pub fn clean_destination(&self) -> bool {
        self.config.clean_destination && !self.options.no_clean
    }

    /// Refuse a publish directory that holds the site or its sources, since
    /// building prunes it and `clean` deletes it
    pub fn check_public_dir(&self) -> Result<()> {
        let public_dir = absolute(&self.public_dir);
        let protected = [
            &self.base_dir,
            &self.content_dir,
            &self.layout_dir,
            &self.static_dir,
            &self.archetype_dir,
        ];
        if let Some(dir) = protected
            .iter()
            .find(|dir| absolute(dir).starts_with(&public_dir))
        {
            bail!(
                "Publish directory {:?} contains {:?}; choose a directory inside the site",
                self.public_dir,
                dir
            );
        }
        Ok(())
    }

    /// Build the site into the publish directory
    pub fn build(&self) -> Result<commands::build::BuildReport> {
        commands::build::run(self)
    }

    /// Remove the publish directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }

    /// Create a content file from an archetype
    pub fn new_content(&self, path: &str) -> Result<PathBuf> {
        commands::new::run(self, path)
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
