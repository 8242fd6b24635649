//! Create a new content file from an archetype

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tera::Tera;

use crate::content::{loader::is_markdown_file, title_case};
use crate::Site;

/// Used when neither the site nor the theme has an archetype
const DEFAULT_ARCHETYPE: &str = r#"---
title: "{{ title }}"
date: {{ date }}
draft: true
---

"#;

/// Create `content/<path>`, adding `.md` when no Markdown extension is given.
/// Returns the path of the new file.
pub fn run(site: &Site, path: &str) -> Result<PathBuf> {
    let relative = content_path(path)?;
    let target = site.content_dir.join(&relative);
    if target.exists() {
        bail!("File already exists: {:?}", target);
    }

    let section = section_of(&relative);
    let name = entry_name(&relative);
    let archetype = find_archetype(site, section.as_deref())?;

    let date = site
        .options
        .now
        .with_timezone(&site.config.tz()?)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string();

    let mut context = tera::Context::new();
    context.insert("title", &title_case(&name.replace(['-', '_'], " ")));
    context.insert("name", &name);
    context.insert("date", &date);
    context.insert("section", &section.unwrap_or_default());

    let content = Tera::one_off(&archetype, &context, false)
        .map_err(|e| anyhow::anyhow!("Failed to render archetype: {}", e))?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(&target, content).with_context(|| format!("Failed to write {:?}", target))?;

    tracing::info!("Created: {:?}", target);
    Ok(target)
}

/// Validate a content path and give it a Markdown extension
fn content_path(path: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::from(path.trim().trim_start_matches("content/"));
    if relative.as_os_str().is_empty() {
        bail!("Missing content path");
    }
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("Content path must be relative to the content directory: {:?}", path);
    }
    if !is_markdown_file(&relative) {
        let file_name = format!("{}.md", relative.to_string_lossy());
        relative = PathBuf::from(file_name);
    }
    Ok(relative)
}

/// First directory of the path, if the file is not at the top level
fn section_of(relative: &Path) -> Option<String> {
    let mut components = relative.components();
    let first = components.next()?;
    components.next()?;
    Some(first.as_os_str().to_string_lossy().into_owned())
}

/// File stem, or the bundle directory name for `<dir>/index.md`
fn entry_name(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem == "index" || stem == "_index" {
        if let Some(dir) = relative.parent().and_then(|p| p.file_name()) {
            return dir.to_string_lossy().into_owned();
        }
    }
    stem
}

/// Section archetype, then the default one, site before theme
fn find_archetype(site: &Site, section: Option<&str>) -> Result<String> {
    let mut dirs = vec![site.archetype_dir.clone()];
    if let Some(theme_dir) = &site.theme_dir {
        dirs.push(theme_dir.join("archetypes"));
    }

    let mut names = Vec::new();
    if let Some(section) = section {
        names.push(format!("{}.md", section));
    }
    names.push("default.md".to_string());

    for name in &names {
        for dir in &dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                tracing::debug!("Using archetype {:?}", candidate);
                return fs::read_to_string(&candidate)
                    .with_context(|| format!("Failed to read {:?}", candidate));
            }
        }
    }

    Ok(DEFAULT_ARCHETYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildOptions;
    use crate::content::Document;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    fn site(dir: &Path) -> Site {
        Site::new(dir).unwrap().with_options(BuildOptions {
            now: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            ..Default::default()
        })
    }

    #[test]
    fn test_new_uses_builtin_scaffold() {
        let dir = tempfile::tempdir().unwrap();
        let path = run(&site(dir.path()), "posts/my-first-post").unwrap();
        assert_eq!(path, dir.path().join("content/posts/my-first-post.md"));

        let raw = fs::read_to_string(&path).unwrap();
        let taxonomies = vec!["tags".to_string()];
        let doc = Document::parse("posts/my-first-post.md", path, &raw, Tz::UTC, &taxonomies)
            .unwrap();
        assert_eq!(doc.title, "My first post");
        assert!(doc.draft);
        assert_eq!(doc.date.to_rfc3339(), "2024-03-01T12:00:00+00:00");
    }

    #[test]
    fn test_new_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        run(&site, "about.md").unwrap();
        assert!(run(&site, "about.md").is_err());
    }

    #[test]
    fn test_section_archetype_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("archetypes")).unwrap();
        fs::write(
            dir.path().join("archetypes/default.md"),
            "---\ntitle: default\n---\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("archetypes/notes.md"),
            "---\ntitle: \"{{ title }}\"\nsection: {{ section }}\n---\n",
        )
        .unwrap();

        let site = site(dir.path());
        let note = run(&site, "notes/trip/index.md").unwrap();
        let raw = fs::read_to_string(note).unwrap();
        assert!(raw.contains("title: \"Trip\""));
        assert!(raw.contains("section: notes"));

        let page = run(&site, "about").unwrap();
        assert!(fs::read_to_string(page).unwrap().contains("title: default"));
    }

    #[test]
    fn test_rejects_paths_outside_content() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&site(dir.path()), "../escape.md").is_err());
        assert!(run(&site(dir.path()), "").is_err());
    }
}
