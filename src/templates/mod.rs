//! Tera template rendering
//!
//! Templates are gathered from every [`TemplateSource`] in precedence order
//! (built-in theme, then the theme's layouts, then the site's layouts) and
//! compiled into a single Tera instance. Later sources replace templates of
//! the same name.

mod context;
mod source;

use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tera::{Context, Tera};
use thiserror::Error;

use crate::config::SiteConfig;
use crate::content::MarkdownRenderer;
use crate::helpers;

pub use context::{
    MenuItem, PageData, PageLink, PaginatorData, SiteData, TaxonomyData, TermLink,
};
pub use source::{sources_for, EmbeddedTheme, LayoutDir, TemplateSource};

/// Errors raised while loading or rendering templates
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("no template found for {kind} page (tried {})", .tried.join(", "))]
    NotFound { kind: &'static str, tried: Vec<String> },

    #[error("failed to render {template}: {message}")]
    Render { template: String, message: String },

    #[error("failed to load templates from {source_name}: {message}")]
    Load { source_name: String, message: String },

    #[error("failed to read template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Kind of page being rendered, used to pick a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Home,
    Single,
    Section,
    Terms,
    Term,
    NotFound,
}

impl PageKind {
    /// Template base name for the kind
    pub fn name(&self) -> &'static str {
        match self {
            PageKind::Home => "index",
            PageKind::Single => "single",
            PageKind::Section => "list",
            PageKind::Terms => "terms",
            PageKind::Term => "term",
            PageKind::NotFound => "404",
        }
    }
}

/// A template lookup: what is being rendered and where it lives
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    pub kind: PageKind,
    /// Section name, or the taxonomy's plural name for terms/term pages
    pub section: &'a str,
    /// `layout` frontmatter override
    pub layout: Option<&'a str>,
}

impl<'a> Lookup<'a> {
    pub fn new(kind: PageKind, section: &'a str) -> Self {
        Self {
            kind,
            section,
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: Option<&'a str>) -> Self {
        self.layout = layout.filter(|l| !l.trim().is_empty());
        self
    }

    /// Template names to try, most specific first:
    /// `<section>/<layout>`, `<section>/<kind>`, `_default/<layout>`,
    /// `_default/<kind>`, then kind-specific fallbacks.
    pub fn candidates(&self) -> Vec<String> {
        let kind = self.kind.name();
        let mut names = Vec::new();

        match self.kind {
            PageKind::Home | PageKind::NotFound => names.push(format!("{}.html", kind)),
            _ => {}
        }

        let mut dirs = Vec::new();
        if !self.section.is_empty() && !matches!(self.kind, PageKind::Home | PageKind::NotFound) {
            dirs.push(self.section);
        }
        dirs.push("_default");

        for dir in dirs {
            if let Some(layout) = self.layout {
                names.push(format!("{}/{}.html", dir, layout));
            }
            names.push(format!("{}/{}.html", dir, kind));
        }

        match self.kind {
            PageKind::Home | PageKind::Term => names.push("_default/list.html".to_string()),
            _ => {}
        }

        names.dedup();
        names
    }
}

/// Compiled template set plus the site-aware filters
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Compile templates from every source. Later sources win.
    pub fn new(
        config: &SiteConfig,
        markdown: Arc<MarkdownRenderer>,
        sources: &[Box<dyn TemplateSource>],
    ) -> Result<Self, TemplateError> {
        let mut merged: IndexMap<String, String> = IndexMap::new();
        for source in sources {
            let templates = source.templates()?;
            tracing::debug!("Loaded {} templates from {}", templates.len(), source.name());
            for (name, body) in templates {
                merged.insert(name, body);
            }
        }

        // Tera autoescapes `.html` templates by default; content that is
        // already HTML goes through `| safe` in the templates.
        let mut tera = Tera::default();
        tera.add_raw_templates(merged.iter().map(|(n, b)| (n.as_str(), b.as_str())))
            .map_err(|e| TemplateError::Load {
                source_name: "layouts".to_string(),
                message: error_chain(&e),
            })?;

        tera.register_filter("plainify", plainify_filter);
        tera.register_filter("truncate_words", truncate_words_filter);
        tera.register_filter("date_format", date_format_filter);
        tera.register_filter("urlize", urlize_filter);

        let abs_config = config.clone();
        tera.register_filter(
            "abs_url",
            move |value: &tera::Value, _: &HashMap<String, tera::Value>| {
                let s = tera::try_get_value!("abs_url", "value", String, value);
                Ok(tera::Value::String(helpers::abs_url(&abs_config, &s)))
            },
        );
        let rel_config = config.clone();
        tera.register_filter(
            "rel_url",
            move |value: &tera::Value, _: &HashMap<String, tera::Value>| {
                let s = tera::try_get_value!("rel_url", "value", String, value);
                Ok(tera::Value::String(helpers::rel_url(&rel_config, &s)))
            },
        );
        tera.register_filter(
            "markdownify",
            move |value: &tera::Value, _: &HashMap<String, tera::Value>| {
                let s = tera::try_get_value!("markdownify", "value", String, value);
                Ok(tera::Value::String(markdownify(&markdown, &s)))
            },
        );

        Ok(Self { tera })
    }

    /// Whether a template with this name was loaded
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// First candidate template that exists
    pub fn resolve(&self, lookup: &Lookup) -> Result<String, TemplateError> {
        let candidates = lookup.candidates();
        if let Some(name) = candidates.iter().find(|name| self.has_template(name)) {
            return Ok(name.clone());
        }
        Err(TemplateError::NotFound {
            kind: lookup.kind.name(),
            tried: candidates,
        })
    }

    /// Resolve and render in one step
    pub fn render_page(&self, lookup: &Lookup, context: &Context) -> Result<String, TemplateError> {
        let template = self.resolve(lookup)?;
        self.render(&template, context)
    }

    /// Render a template by name
    pub fn render(&self, template: &str, context: &Context) -> Result<String, TemplateError> {
        self.tera
            .render(template, context)
            .map_err(|e| TemplateError::Render {
                template: template.to_string(),
                message: error_chain(&e),
            })
    }
}

/// Tera wraps the useful message a few levels down
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Render inline Markdown, dropping the paragraph wrapper of a one-line
/// result
fn markdownify(markdown: &MarkdownRenderer, s: &str) -> String {
    let html = markdown.render(s).html;
    let trimmed = html.trim_end();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_string(),
        _ => html,
    }
}

/// Tera filter: strip HTML tags
fn plainify_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("plainify", "value", String, value);
    Ok(tera::Value::String(helpers::strip_html(&s)))
}

/// Tera filter: keep the first `count` words, appending an ellipsis when
/// anything was cut
fn truncate_words_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_words", "value", String, value);
    let count = match args.get("count") {
        Some(val) => tera::try_get_value!("truncate_words", "count", usize, val),
        None => 70,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_words", "omission", String, val),
        None => "…".to_string(),
    };

    let (text, truncated) = helpers::truncate_words(&s, count);
    if truncated {
        Ok(tera::Value::String(format!("{}{}", text, omission)))
    } else {
        Ok(tera::Value::String(text))
    }
}

/// Tera filter: format an RFC 3339 (or `YYYY-MM-DD`) date with a chrono
/// format string
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "%Y-%m-%d".to_string(),
    };

    if let Ok(date) = chrono::DateTime::parse_from_rfc3339(&s) {
        return Ok(tera::Value::String(date.format(&format).to_string()));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        return Ok(tera::Value::String(date.format(&format).to_string()));
    }
    Err(tera::Error::msg(format!(
        "Filter `date_format` received an unparseable date: {:?}",
        s
    )))
}

/// Tera filter: slugify a string for use in a URL
fn urlize_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("urlize", "value", String, value);
    Ok(tera::Value::String(slug::slugify(s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<(&'static str, &'static str)>);

    impl TemplateSource for Fixed {
        fn name(&self) -> String {
            "fixed".to_string()
        }

        fn templates(&self) -> Result<Vec<(String, String)>, TemplateError> {
            Ok(self
                .0
                .iter()
                .map(|(n, b)| (n.to_string(), b.to_string()))
                .collect())
        }
    }

    fn renderer(extra: Vec<(&'static str, &'static str)>) -> TemplateRenderer {
        let config = SiteConfig {
            base_url: "https://example.com/blog/".to_string(),
            ..Default::default()
        };
        let sources: Vec<Box<dyn TemplateSource>> = vec![Box::new(EmbeddedTheme), Box::new(Fixed(extra))];
        TemplateRenderer::new(&config, Arc::new(MarkdownRenderer::new()), &sources).unwrap()
    }

    #[test]
    fn test_single_candidates() {
        let lookup = Lookup::new(PageKind::Single, "posts").with_layout(Some("wide"));
        assert_eq!(
            lookup.candidates(),
            vec![
                "posts/wide.html",
                "posts/single.html",
                "_default/wide.html",
                "_default/single.html",
            ]
        );

        let lookup = Lookup::new(PageKind::Single, "");
        assert_eq!(lookup.candidates(), vec!["_default/single.html"]);
    }

    #[test]
    fn test_list_candidates() {
        assert_eq!(
            Lookup::new(PageKind::Home, "").candidates(),
            vec!["index.html", "_default/index.html", "_default/list.html"]
        );
        assert_eq!(
            Lookup::new(PageKind::Term, "tags").candidates(),
            vec!["tags/term.html", "_default/term.html", "_default/list.html"]
        );
        assert_eq!(
            Lookup::new(PageKind::NotFound, "").candidates(),
            vec!["404.html", "_default/404.html"]
        );
    }

    #[test]
    fn test_site_layout_overrides_builtin() {
        let r = renderer(vec![("posts/single.html", "custom {{ page.title }}")]);
        let lookup = Lookup::new(PageKind::Single, "posts");
        assert_eq!(r.resolve(&lookup).unwrap(), "posts/single.html");

        let lookup = Lookup::new(PageKind::Single, "notes");
        assert_eq!(r.resolve(&lookup).unwrap(), "_default/single.html");

        let mut ctx = Context::new();
        ctx.insert("page", &serde_json::json!({ "title": "A & B" }));
        let html = r
            .render_page(&Lookup::new(PageKind::Single, "posts"), &ctx)
            .unwrap();
        assert_eq!(html, "custom A &amp; B");
    }

    #[test]
    fn test_missing_template() {
        let sources: Vec<Box<dyn TemplateSource>> = vec![Box::new(Fixed(vec![]))];
        let r = TemplateRenderer::new(
            &SiteConfig::default(),
            Arc::new(MarkdownRenderer::new()),
            &sources,
        )
        .unwrap();
        let err = r.resolve(&Lookup::new(PageKind::Single, "posts")).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { kind: "single", .. }));
    }

    #[test]
    fn test_undefined_variable_is_render_error() {
        let r = renderer(vec![("broken.html", "{{ page.missing }}")]);
        let mut ctx = Context::new();
        ctx.insert("page", &serde_json::json!({}));
        let err = r.render("broken.html", &ctx).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_syntax_error_fails_load() {
        let sources: Vec<Box<dyn TemplateSource>> =
            vec![Box::new(Fixed(vec![("bad.html", "{% if %}")]))];
        let result = TemplateRenderer::new(
            &SiteConfig::default(),
            Arc::new(MarkdownRenderer::new()),
            &sources,
        );
        assert!(matches!(result, Err(TemplateError::Load { .. })));
    }

    #[test]
    fn test_filters() {
        let r = renderer(vec![(
            "filters.html",
            "{{ d | date_format(format=\"%B %-d, %Y\") }}|{{ h | plainify }}|{{ t | truncate_words(count=2) }}|{{ n | urlize }}|{{ \"/about/\" | rel_url | safe }}|{{ \"/about/\" | abs_url | safe }}|{{ m | markdownify | safe }}",
        )]);
        let mut ctx = Context::new();
        ctx.insert("d", "2024-01-02T10:00:00+00:00");
        ctx.insert("h", "<p>Hi <b>there</b></p>");
        ctx.insert("t", "one two three");
        ctx.insert("n", "Hello World");
        ctx.insert("m", "*hi*");
        let out = r.render("filters.html", &ctx).unwrap();
        assert_eq!(
            out,
            "January 2, 2024|Hi there|one two…|hello-world|/blog/about/|https://example.com/blog/about/|<em>hi</em>"
        );
    }

    #[test]
    fn test_date_format_rejects_garbage() {
        let mut args = HashMap::new();
        args.insert("format".to_string(), tera::Value::String("%Y".to_string()));
        assert!(date_format_filter(&tera::Value::String("soon".to_string()), &args).is_err());
        let out = date_format_filter(&tera::Value::String("2024-03-01".to_string()), &args).unwrap();
        assert_eq!(out, tera::Value::String("2024".to_string()));
    }
}
