//! Build the site: load, compose, publish

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::content::loader::{ContentLoader, LoadFailure};
use crate::generator::{Generator, PageFailure};
use crate::publish::{AssetSet, PublishSummary, Publisher};
use crate::Site;

/// Outcome of a build
#[derive(Debug)]
pub struct BuildReport {
    /// Documents parsed
    pub loaded: usize,
    /// Regular documents that made it into the site
    pub published: usize,
    /// Documents skipped because of malformed metadata
    pub skipped: Vec<LoadFailure>,
    /// Pages whose template failed
    pub failed: Vec<PageFailure>,
    pub summary: PublishSummary,
    pub elapsed: Duration,
}

impl BuildReport {
    /// True when every page rendered
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run a full build into `site.public_dir`
pub fn run(site: &Site) -> Result<BuildReport> {
    let start = Instant::now();
    site.check_public_dir()?;

    let loaded = ContentLoader::new(site)?.load()?;
    tracing::info!(
        "Loaded {} documents from {:?} ({} skipped)",
        loaded.documents.len(),
        site.content_dir,
        loaded.failures.len()
    );

    let composition = Generator::new(site)?.compose(&loaded.documents);

    let mut assets = AssetSet::new();
    if let Some(theme_dir) = &site.theme_dir {
        assets.add_dir(&theme_dir.join("static"))?;
    }
    assets.add_dir(&site.static_dir)?;

    let all_bundles: HashSet<&str> = loaded
        .documents
        .iter()
        .filter_map(|doc| doc.bundle_dir())
        .collect();
    for resource in &loaded.resources {
        match resource_output(resource, &composition.bundles, &all_bundles) {
            Some(output_path) => assets.add(site.content_dir.join(resource), output_path),
            None => tracing::debug!("Skipping resource of unpublished bundle: {:?}", resource),
        }
    }

    let summary = Publisher::new(&site.public_dir, site.clean_destination())
        .publish(&composition.pages, &assets)
        .with_context(|| format!("Failed to publish to {:?}", site.public_dir))?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Published {} pages and {} assets to {:?}, removed {} stale files in {:?}",
        summary.pages,
        summary.assets,
        site.public_dir,
        summary.removed,
        elapsed
    );

    Ok(BuildReport {
        loaded: loaded.documents.len(),
        published: composition.published,
        skipped: loaded.failures,
        failed: composition.failures,
        summary,
        elapsed,
    })
}

/// Where a content resource lands in the publish dir. Resources of a
/// published bundle go next to its page; those of an unpublished bundle are
/// dropped; anything else keeps its content-relative path.
fn resource_output(
    resource: &Path,
    published: &BTreeMap<String, PathBuf>,
    all_bundles: &HashSet<&str>,
) -> Option<PathBuf> {
    let owner = resource
        .ancestors()
        .skip(1)
        .filter_map(|dir| dir.to_str())
        .find(|dir| all_bundles.contains(dir));

    match owner {
        Some(dir) => {
            let out_dir = published.get(dir)?;
            let rest = resource.strip_prefix(dir).ok()?;
            Some(out_dir.join(rest))
        }
        None => Some(resource.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_output() {
        let mut published = BTreeMap::new();
        published.insert("posts/trip".to_string(), PathBuf::from("2024/trip"));
        let all: HashSet<&str> = ["posts/trip", "posts/secret"].into_iter().collect();

        assert_eq!(
            resource_output(Path::new("posts/trip/photo.jpg"), &published, &all),
            Some(PathBuf::from("2024/trip/photo.jpg"))
        );
        assert_eq!(
            resource_output(Path::new("posts/trip/img/a.png"), &published, &all),
            Some(PathBuf::from("2024/trip/img/a.png"))
        );
        assert_eq!(
            resource_output(Path::new("posts/secret/photo.jpg"), &published, &all),
            None
        );
        assert_eq!(
            resource_output(Path::new("files/cv.pdf"), &published, &all),
            Some(PathBuf::from("files/cv.pdf"))
        );
    }
}
