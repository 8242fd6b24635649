//! Clean the publish directory

use anyhow::{Context, Result};
use std::fs;

use crate::Site;

/// Remove the publish directory
pub fn run(site: &Site) -> Result<()> {
    site.check_public_dir()?;

    if site.public_dir.exists() {
        fs::remove_dir_all(&site.public_dir)
            .with_context(|| format!("Failed to delete {:?}", site.public_dir))?;
        tracing::info!("Deleted: {:?}", site.public_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use std::path::PathBuf;

    #[test]
    fn test_clean_removes_public_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("public/posts")).unwrap();
        fs::write(dir.path().join("public/index.html"), "x").unwrap();

        let site = Site::new(dir.path()).unwrap();
        run(&site).unwrap();
        assert!(!dir.path().join("public").exists());

        // Nothing to do the second time
        run(&site).unwrap();
    }

    #[test]
    fn test_clean_refuses_site_root() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap().with_options(BuildOptions {
            destination: Some(PathBuf::from(".")),
            ..Default::default()
        });
        assert!(run(&site).is_err());
        assert!(dir.path().exists());
    }
}
