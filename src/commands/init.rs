//! Initialize a new site

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"baseURL = "https://example.com/"
title = "My New Site"
languageCode = "en-us"
author = ""
description = ""
paginate = 10

[taxonomies]
tag = "tags"
category = "categories"

[permalinks]
posts = "/posts/:slug/"

[markup]
unsafe = false

[[menu.main]]
name = "Posts"
url = "/posts/"
weight = 1

[[menu.main]]
name = "Tags"
url = "/tags/"
weight = 2
"#;

const ARCHETYPE: &str = r#"---
title: "{{ title }}"
date: {{ date }}
draft: true
tags: []
---

"#;

/// Scaffold a site in `target_dir`. Refuses a directory that already holds
/// files.
pub fn init_site(target_dir: &Path) -> Result<()> {
    if target_dir.exists() {
        let mut entries = fs::read_dir(target_dir)
            .with_context(|| format!("Failed to read {:?}", target_dir))?;
        if entries.next().is_some() {
            bail!("{:?} already exists and is not empty", target_dir);
        }
    }

    for dir in ["content/posts", "layouts", "static", "archetypes", "themes"] {
        let path = target_dir.join(dir);
        fs::create_dir_all(&path).with_context(|| format!("Failed to create {:?}", path))?;
    }

    write(&target_dir.join("config.toml"), CONFIG)?;
    write(&target_dir.join("archetypes/default.md"), ARCHETYPE)?;
    write(
        &target_dir.join("content/_index.md"),
        "---\ntitle: Home\n---\n",
    )?;

    let sample_post = format!(
        r#"---
title: "Hello World"
date: {}
tags: [welcome]
---

Welcome to your new site. This post lives in `content/posts/hello-world.md`.

<!--more-->

## Next steps

- `quire new posts/my-post.md` creates a draft from `archetypes/default.md`
- `quire serve -D` previews the site with drafts and live reload
- `quire build` writes the site to `public/`
"#,
        Utc::now().format("%Y-%m-%dT%H:%M:%S%:z")
    );
    write(&target_dir.join("content/posts/hello-world.md"), &sample_post)?;

    tracing::info!("Created new site in {:?}", target_dir);
    Ok(())
}

fn write(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::Site;

    #[test]
    fn test_init_builds() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("blog");
        init_site(&root).unwrap();

        assert!(root.join("config.toml").exists());
        assert!(root.join("archetypes/default.md").exists());

        let site = Site::new(&root).unwrap().with_options(BuildOptions {
            now: Utc::now() + chrono::Duration::hours(1),
            ..Default::default()
        });
        assert_eq!(site.config.title, "My New Site");
        let report = site.build().unwrap();
        assert!(report.is_success());
        assert_eq!(report.published, 1);
        assert!(root.join("public/posts/hello-world/index.html").exists());
        assert!(root.join("public/tags/welcome/index.html").exists());
    }

    #[test]
    fn test_init_refuses_non_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert!(init_site(dir.path()).is_err());
    }
}
