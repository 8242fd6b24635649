//! Permalinks and output file locations

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::PathBuf;

use crate::content::{Document, DocumentKind};
use crate::helpers::normalize_path;

lazy_static! {
    static ref PERMALINK_TOKEN: Regex =
        Regex::new(r":(slugorfilename|filename|section|year|month|day|slug|title)\b").unwrap();
}

/// Site-relative permalink path of a document, without the base URL's path.
///
/// In order of precedence: the `url` frontmatter, the section's pattern
/// from `[permalinks]`, then `/<dir>/<slug>/`.
pub fn permalink_path(doc: &Document, patterns: &IndexMap<String, String>) -> String {
    if let Some(url) = doc.url.as_deref().filter(|u| !u.trim().is_empty()) {
        return normalize_path(url);
    }

    match doc.kind {
        DocumentKind::Home => return "/".to_string(),
        DocumentKind::Section => return normalize_path(&doc.dir),
        DocumentKind::Page => {}
    }

    if !doc.section.is_empty() {
        if let Some(pattern) = patterns.get(&doc.section) {
            return normalize_path(&expand_pattern(pattern, doc));
        }
    }

    normalize_path(&format!("{}/{}", doc.dir, doc.slug))
}

/// Substitute `:year`, `:month`, `:day`, `:section`, `:slug`, `:title`,
/// `:filename` and `:slugorfilename` in a permalink pattern
pub fn expand_pattern(pattern: &str, doc: &Document) -> String {
    PERMALINK_TOKEN
        .replace_all(pattern, |caps: &Captures| match &caps[1] {
            "year" => doc.date.format("%Y").to_string(),
            "month" => doc.date.format("%m").to_string(),
            "day" => doc.date.format("%d").to_string(),
            "section" => doc.section.clone(),
            "title" => slug::slugify(&doc.title),
            "filename" => file_slug(&doc.path),
            // "slug" and "slugorfilename": the slug already falls back to
            // the file name
            _ => doc.slug.clone(),
        })
        .into_owned()
}

/// Publish-dir-relative file for a permalink path. Directory paths get an
/// `index.html`; `.` and `..` components are dropped.
pub fn output_file(path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.split('/').filter(|p| !p.is_empty() && *p != "." && *p != "..") {
        out.push(part);
    }
    if path.ends_with('/') || out.as_os_str().is_empty() {
        out.push("index.html");
    }
    out
}

/// Slugified file stem, or the bundle directory for `index.md`
fn file_slug(path: &str) -> String {
    let mut parts = path.rsplit('/');
    let file = parts.next().unwrap_or_default();
    let stem = file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file);
    if stem == "index" {
        if let Some(dir) = parts.next() {
            return slug::slugify(dir);
        }
    }
    slug::slugify(stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn doc(path: &str, raw: &str) -> Document {
        Document::parse(path, PathBuf::from(path), raw, Tz::UTC, &[]).unwrap()
    }

    fn patterns(section: &str, pattern: &str) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        map.insert(section.to_string(), pattern.to_string());
        map
    }

    #[test]
    fn test_default_permalinks() {
        let none = IndexMap::new();
        assert_eq!(
            permalink_path(&doc("posts/hello.md", "# Hi"), &none),
            "/posts/hello/"
        );
        assert_eq!(permalink_path(&doc("resume.md", ""), &none), "/resume/");
        assert_eq!(permalink_path(&doc("about/index.md", ""), &none), "/about/");
        assert_eq!(
            permalink_path(&doc("posts/trip/index.md", ""), &none),
            "/posts/trip/"
        );
        assert_eq!(permalink_path(&doc("_index.md", ""), &none), "/");
        assert_eq!(permalink_path(&doc("posts/_index.md", ""), &none), "/posts/");
    }

    #[test]
    fn test_url_override_wins() {
        let d = doc("posts/hello.md", "---\nurl: /greeting\n---\n");
        let p = patterns("posts", "/:year/:slug/");
        assert_eq!(permalink_path(&d, &p), "/greeting/");
    }

    #[test]
    fn test_section_pattern() {
        let d = doc(
            "posts/Hello World.md",
            "---\ntitle: First Post!\ndate: 2024-03-07T10:00:00+02:00\nslug: hi\n---\n",
        );
        let p = patterns("posts", "/:year/:month/:day/:slug/");
        assert_eq!(permalink_path(&d, &p), "/2024/03/07/hi/");

        let p = patterns("posts", "/:section/:title/");
        assert_eq!(permalink_path(&d, &p), "/posts/first-post/");

        let p = patterns("posts", "/:filename/");
        assert_eq!(permalink_path(&d, &p), "/hello-world/");

        // Patterns only apply to their own section
        let other = doc("notes/x.md", "");
        assert_eq!(permalink_path(&other, &p), "/notes/x/");
    }

    #[test]
    fn test_output_file() {
        assert_eq!(output_file("/"), PathBuf::from("index.html"));
        assert_eq!(
            output_file("/posts/hello/"),
            PathBuf::from("posts/hello/index.html")
        );
        assert_eq!(output_file("/index.xml"), PathBuf::from("index.xml"));
        assert_eq!(
            output_file("/../../etc/"),
            PathBuf::from("etc/index.html")
        );
    }
}
