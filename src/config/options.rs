//! Per-invocation build options layered over the site config

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Options coming from the command line for a single build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Include documents with `draft: true`
    pub build_drafts: bool,
    /// Include documents dated after `now`
    pub build_future: bool,
    /// Override the publish directory
    pub destination: Option<PathBuf>,
    /// Override `base_url`
    pub base_url: Option<String>,
    /// Skip pruning stale files from the publish directory
    pub no_clean: bool,
    /// Reference time for future-dated documents
    pub now: DateTime<Utc>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            build_drafts: false,
            build_future: false,
            destination: None,
            base_url: None,
            no_clean: false,
            now: Utc::now(),
        }
    }
}
