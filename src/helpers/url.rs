//! URL helper functions

use crate::config::SiteConfig;

/// Site-relative path with exactly one leading slash and, for directory
/// paths, a trailing slash.
///
/// # Examples
/// ```ignore
/// normalize_path("posts/hello") // -> "/posts/hello/"
/// normalize_path("/index.xml")  // -> "/index.xml"
/// ```
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }

    let collapsed: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
    let joined = collapsed.join("/");
    let is_file = collapsed
        .last()
        .map(|last| last.contains('.'))
        .unwrap_or(false);

    if is_file {
        format!("/{}", joined)
    } else {
        format!("/{}/", joined)
    }
}

/// Path component of the base URL, e.g. "/blog" for "https://example.com/blog/"
pub fn base_path(config: &SiteConfig) -> String {
    let url = config.base_url.trim();
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match without_scheme.find('/') {
        Some(i) => without_scheme[i..].trim_end_matches('/').to_string(),
        None => String::new(),
    }
}

/// Generate a URL with the base path prepended
///
/// # Examples
/// ```ignore
/// rel_url(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn rel_url(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    let root = base_path(config);
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// abs_url(&config, "/about/") // -> "https://example.com/about/"
/// ```
pub fn abs_url(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    format!("{}{}", host_url(config), rel_url(config, path))
}

/// Scheme and host of the base URL, e.g. "https://example.com"
pub fn host_url(config: &SiteConfig) -> String {
    let base = config.base_url.trim().trim_end_matches('/');
    let root = base_path(config);
    base.strip_suffix(root.as_str()).unwrap_or(base).to_string()
}

/// Whether a link points outside the site
pub fn is_external(path: &str) -> bool {
    path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("//")
        || path.starts_with("mailto:")
}

/// Decode a percent-encoded request path
pub fn decode_url(path: &str) -> String {
    percent_encoding::percent_decode_str(path)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        SiteConfig {
            base_url: "https://example.com/blog/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("posts//hello"), "/posts/hello/");
        assert_eq!(normalize_path("/index.xml"), "/index.xml");
    }

    #[test]
    fn test_rel_url() {
        let config = test_config();
        assert_eq!(rel_url(&config, "/css/style.css"), "/blog/css/style.css");
        assert_eq!(rel_url(&config, "about/"), "/blog/about/");
        assert_eq!(rel_url(&config, "https://x.org/"), "https://x.org/");
    }

    #[test]
    fn test_abs_url() {
        let config = test_config();
        assert_eq!(abs_url(&config, "/about/"), "https://example.com/blog/about/");

        let root = SiteConfig {
            base_url: "https://example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(abs_url(&root, "/"), "https://example.com/");
        assert_eq!(abs_url(&root, "/tags/rust/"), "https://example.com/tags/rust/");
        assert_eq!(host_url(&config), "https://example.com");
    }

    #[test]
    fn test_decode_url() {
        assert_eq!(decode_url("/posts/caf%C3%A9/"), "/posts/café/");
        assert_eq!(decode_url("/a%20b/"), "/a b/");
    }
}
