//! Publisher - writes composed pages and static assets to the publish dir
//!
//! Static files are layered (theme, then site, then content resources), pages
//! are written on top, and whatever the run did not produce is pruned.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::generator::RenderedPage;

/// Output I/O failures. Any of them aborts the build.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a publish run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub pages: usize,
    pub assets: usize,
    /// Stale files deleted
    pub removed: usize,
}

/// A file copied verbatim into the publish dir
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub source: PathBuf,
    /// Relative to the publish dir
    pub output_path: PathBuf,
}

/// Static assets from several directories; later layers replace files of
/// the same name from earlier ones
#[derive(Debug, Default)]
pub struct AssetSet {
    files: IndexMap<PathBuf, PathBuf>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every non-hidden file under `dir`. A missing directory adds
    /// nothing.
    pub fn add_dir(&mut self, dir: &Path) -> Result<(), PublishError> {
        if !dir.is_dir() {
            return Ok(());
        }

        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        {
            let entry = entry.map_err(|source| PublishError::Scan {
                path: dir.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            self.add(entry.path().to_path_buf(), relative.to_path_buf());
        }

        Ok(())
    }

    /// Add one file
    pub fn add(&mut self, source: PathBuf, output_path: PathBuf) {
        self.files.insert(output_path, source);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn assets(&self) -> impl Iterator<Item = Asset> + '_ {
        self.files.iter().map(|(output_path, source)| Asset {
            source: source.clone(),
            output_path: output_path.clone(),
        })
    }
}

/// Writes a build into the publish directory
pub struct Publisher<'a> {
    public_dir: &'a Path,
    clean: bool,
}

impl<'a> Publisher<'a> {
    /// `clean` enables pruning of files this run did not produce
    pub fn new(public_dir: &'a Path, clean: bool) -> Self {
        Self { public_dir, clean }
    }

    /// Copy assets, write pages, then prune stale output
    pub fn publish(
        &self,
        pages: &[RenderedPage],
        assets: &AssetSet,
    ) -> Result<PublishSummary, PublishError> {
        create_dir(self.public_dir)?;

        let mut produced: HashSet<PathBuf> = HashSet::new();
        let mut summary = PublishSummary::default();

        for asset in assets.assets() {
            let dest = self.public_dir.join(&asset.output_path);
            if let Some(parent) = dest.parent() {
                create_dir(parent)?;
            }
            fs::copy(&asset.source, &dest).map_err(|source| PublishError::Copy {
                from: asset.source.clone(),
                to: dest.clone(),
                source,
            })?;
            tracing::debug!("Copied: {:?} -> {:?}", asset.source, dest);
            produced.insert(dest);
            summary.assets += 1;
        }

        for page in pages {
            let dest = self.public_dir.join(&page.output_path);
            if let Some(parent) = dest.parent() {
                create_dir(parent)?;
            }
            // Leave identical files alone so their mtimes stay put
            let unchanged = fs::read(&dest)
                .map(|existing| existing == page.html.as_bytes())
                .unwrap_or(false);
            if !unchanged {
                fs::write(&dest, &page.html).map_err(|source| PublishError::Write {
                    path: dest.clone(),
                    source,
                })?;
                tracing::debug!("Wrote: {:?}", dest);
            }
            produced.insert(dest);
            summary.pages += 1;
        }

        if self.clean {
            summary.removed = self.prune(&produced)?;
        }

        Ok(summary)
    }

    /// Remove files not in `produced`, then any directory left empty.
    /// Hidden entries (`.git` and the like) are never touched.
    fn prune(&self, produced: &HashSet<PathBuf>) -> Result<usize, PublishError> {
        let mut stale = Vec::new();
        let mut dirs = Vec::new();

        for entry in WalkDir::new(self.public_dir)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !is_hidden(e.path()))
        {
            let entry = entry.map_err(|source| PublishError::Scan {
                path: self.public_dir.to_path_buf(),
                source,
            })?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            } else if !produced.contains(entry.path()) {
                stale.push(entry.into_path());
            }
        }

        for path in &stale {
            fs::remove_file(path).map_err(|source| PublishError::Remove {
                path: path.clone(),
                source,
            })?;
            tracing::debug!("Removed stale: {:?}", path);
        }

        // Pre-order walk: children come after their parent
        for dir in dirs.iter().rev() {
            let empty = fs::read_dir(dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if empty {
                fs::remove_dir(dir).map_err(|source| PublishError::Remove {
                    path: dir.clone(),
                    source,
                })?;
            }
        }

        Ok(stale.len())
    }
}

fn create_dir(path: &Path) -> Result<(), PublishError> {
    fs::create_dir_all(path).map_err(|source| PublishError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str, html: &str) -> RenderedPage {
        RenderedPage {
            output_path: PathBuf::from(path),
            html: html.to_string(),
        }
    }

    #[test]
    fn test_publish_writes_pages_and_assets() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        let static_dir = dir.path().join("static");
        fs::create_dir_all(static_dir.join("css")).unwrap();
        fs::write(static_dir.join("css/site.css"), "body{}").unwrap();

        let mut assets = AssetSet::new();
        assets.add_dir(&static_dir).unwrap();

        let summary = Publisher::new(&public, true)
            .publish(&[page("posts/hello/index.html", "<h1>Hi</h1>")], &assets)
            .unwrap();

        assert_eq!(
            summary,
            PublishSummary {
                pages: 1,
                assets: 1,
                removed: 0
            }
        );
        assert_eq!(
            fs::read_to_string(public.join("posts/hello/index.html")).unwrap(),
            "<h1>Hi</h1>"
        );
        assert_eq!(fs::read_to_string(public.join("css/site.css")).unwrap(), "body{}");
    }

    #[test]
    fn test_later_asset_layers_win() {
        let dir = tempfile::tempdir().unwrap();
        let theme = dir.path().join("theme");
        let site = dir.path().join("site");
        fs::create_dir_all(&theme).unwrap();
        fs::create_dir_all(&site).unwrap();
        fs::write(theme.join("logo.svg"), "theme").unwrap();
        fs::write(theme.join("theme-only.txt"), "t").unwrap();
        fs::write(site.join("logo.svg"), "site").unwrap();
        fs::write(site.join(".DS_Store"), "junk").unwrap();

        let mut assets = AssetSet::new();
        assets.add_dir(&theme).unwrap();
        assets.add_dir(&site).unwrap();
        assets.add_dir(&dir.path().join("missing")).unwrap();
        assert_eq!(assets.len(), 2);

        let public = dir.path().join("public");
        Publisher::new(&public, true).publish(&[], &assets).unwrap();
        assert_eq!(fs::read_to_string(public.join("logo.svg")).unwrap(), "site");
        assert!(!public.join(".DS_Store").exists());
    }

    #[test]
    fn test_stale_files_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(public.join("old/post")).unwrap();
        fs::write(public.join("old/post/index.html"), "stale").unwrap();
        fs::create_dir_all(public.join(".git")).unwrap();
        fs::write(public.join(".git/HEAD"), "ref").unwrap();

        let summary = Publisher::new(&public, true)
            .publish(&[page("index.html", "home")], &AssetSet::new())
            .unwrap();

        assert_eq!(summary.removed, 1);
        assert!(!public.join("old").exists());
        assert!(public.join("index.html").exists());
        assert!(public.join(".git/HEAD").exists());
    }

    #[test]
    fn test_prune_walks_past_hidden_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        // Hidden dirs sorting before and after the stale siblings
        for hidden in [".git", "z/.cache"] {
            fs::create_dir_all(public.join(hidden)).unwrap();
            fs::write(public.join(hidden).join("keep"), "x").unwrap();
        }
        for stale in ["a/old.html", "z/old.html", "zz/deep/old.html"] {
            fs::create_dir_all(public.join(stale).parent().unwrap()).unwrap();
            fs::write(public.join(stale), "stale").unwrap();
        }

        let summary = Publisher::new(&public, true)
            .publish(&[page("z/index.html", "new")], &AssetSet::new())
            .unwrap();

        assert_eq!(summary.removed, 3);
        assert!(public.join(".git/keep").exists());
        assert!(public.join("z/.cache/keep").exists());
        assert!(public.join("z/index.html").exists());
        assert!(!public.join("a").exists());
        assert!(!public.join("z/old.html").exists());
        assert!(!public.join("zz").exists());
    }

    #[test]
    fn test_no_clean_keeps_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(&public).unwrap();
        fs::write(public.join("stale.html"), "stale").unwrap();

        let summary = Publisher::new(&public, false)
            .publish(&[page("index.html", "home")], &AssetSet::new())
            .unwrap();

        assert_eq!(summary.removed, 0);
        assert!(public.join("stale.html").exists());
    }

    #[test]
    fn test_write_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        // A file where a directory needs to go
        fs::create_dir_all(&public).unwrap();
        fs::write(public.join("posts"), "not a dir").unwrap();

        let err = Publisher::new(&public, true)
            .publish(&[page("posts/hello/index.html", "x")], &AssetSet::new())
            .unwrap_err();
        assert!(matches!(err, PublishError::CreateDir { .. }));
    }
}
