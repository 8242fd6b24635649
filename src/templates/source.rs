//! Where templates come from: the built-in theme, a theme's `layouts/`,
//! and the site's own `layouts/`

use std::fs;
use std::path::{Path, PathBuf};

use super::TemplateError;

/// A set of named templates. Names are `/`-separated paths relative to
/// the layouts root, e.g. `_default/single.html`.
pub trait TemplateSource: Send + Sync {
    /// Label used in log messages
    fn name(&self) -> String;

    /// Every template this source provides
    fn templates(&self) -> Result<Vec<(String, String)>, TemplateError>;
}

/// Templates compiled into the binary
pub struct EmbeddedTheme;

impl TemplateSource for EmbeddedTheme {
    fn name(&self) -> String {
        "built-in theme".to_string()
    }

    fn templates(&self) -> Result<Vec<(String, String)>, TemplateError> {
        Ok(vec![
            ("_default/baseof.html", include_str!("default/_default/baseof.html")),
            ("_default/single.html", include_str!("default/_default/single.html")),
            ("_default/list.html", include_str!("default/_default/list.html")),
            ("_default/terms.html", include_str!("default/_default/terms.html")),
            ("_default/term.html", include_str!("default/_default/term.html")),
            ("index.html", include_str!("default/index.html")),
            ("404.html", include_str!("default/404.html")),
            ("partials/head.html", include_str!("default/partials/head.html")),
            ("partials/header.html", include_str!("default/partials/header.html")),
            ("partials/footer.html", include_str!("default/partials/footer.html")),
            (
                "partials/pagination.html",
                include_str!("default/partials/pagination.html"),
            ),
        ]
        .into_iter()
        .map(|(name, body)| (name.to_string(), body.to_string()))
        .collect())
    }
}

/// Every `*.html` file under a layouts directory
pub struct LayoutDir {
    root: PathBuf,
}

impl LayoutDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl TemplateSource for LayoutDir {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    fn templates(&self) -> Result<Vec<(String, String)>, TemplateError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/**/*.html",
            glob::Pattern::escape(&self.root.to_string_lossy())
        );
        let entries = glob::glob(&pattern).map_err(|e| TemplateError::Load {
            source_name: self.name(),
            message: e.to_string(),
        })?;

        let mut templates = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| TemplateError::Load {
                source_name: self.name(),
                message: e.to_string(),
            })?;
            if !path.is_file() {
                continue;
            }
            let name = template_name(&path, &self.root);
            let body = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            templates.push((name, body));
        }
        templates.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(templates)
    }
}

/// Template sources for a site, lowest precedence first
pub fn sources_for(layout_dir: &Path, theme_dir: Option<&Path>) -> Vec<Box<dyn TemplateSource>> {
    let mut sources: Vec<Box<dyn TemplateSource>> = vec![Box::new(EmbeddedTheme)];
    if let Some(theme_dir) = theme_dir {
        sources.push(Box::new(LayoutDir::new(theme_dir.join("layouts"))));
    }
    sources.push(Box::new(LayoutDir::new(layout_dir)));
    sources
}

fn template_name(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
