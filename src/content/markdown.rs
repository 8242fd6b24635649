//! Markdown rendering with syntax highlighting

use lazy_static::lazy_static;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashMap;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::helpers::html_escape;

/// Placeholder left where raw HTML was removed
pub const RAW_HTML_OMITTED: &str = "<!-- raw HTML omitted -->";

lazy_static! {
    static ref MORE_DIVIDER: Regex = Regex::new(r"(?i)<!--\s*more\s*-->").unwrap();
}

/// A heading found while rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Output of a Markdown render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMarkdown {
    pub html: String,
    pub headings: Vec<Heading>,
}

impl RenderedMarkdown {
    /// Nested table of contents built from h2-h4, empty when there are none
    pub fn table_of_contents(&self) -> String {
        build_toc(&self.headings)
    }
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
    unsafe_html: bool,
}

struct CodeBuffer {
    lang: Option<String>,
    source: String,
}

struct HeadingBuffer<'a> {
    level: HeadingLevel,
    id: Option<CowStr<'a>>,
    classes: Vec<CowStr<'a>>,
    attrs: Vec<(CowStr<'a>, Option<CowStr<'a>>)>,
    events: Vec<Event<'a>>,
    text: String,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options("InspiredGitHub", false, false)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool, unsafe_html: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
            unsafe_html,
        }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> RenderedMarkdown {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_DEFINITION_LIST;
        let parser = Parser::new_ext(markdown, options);

        let mut events: Vec<Event> = Vec::new();
        let mut headings = Vec::new();
        let mut ids = HeadingIds::default();
        let mut code: Option<CodeBuffer> = None;
        let mut heading: Option<HeadingBuffer> = None;
        let mut in_html_block = false;

        for event in parser {
            if let Some(block) = code.as_mut() {
                match event {
                    Event::Text(text) => block.source.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let highlighted = self.highlight_code(&block.source, block.lang.as_deref());
                        code = None;
                        events.push(Event::Html(CowStr::from(highlighted)));
                    }
                    _ => {}
                }
                continue;
            }

            if in_html_block {
                if matches!(event, Event::End(TagEnd::HtmlBlock)) {
                    in_html_block = false;
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => fence_language(&info),
                        CodeBlockKind::Indented => None,
                    };
                    code = Some(CodeBuffer {
                        lang,
                        source: String::new(),
                    });
                }
                Event::Start(Tag::HtmlBlock) if !self.unsafe_html => {
                    in_html_block = true;
                    events.push(Event::Html(CowStr::Borrowed(RAW_HTML_OMITTED)));
                }
                Event::InlineHtml(_) if !self.unsafe_html => {
                    emit(
                        &mut heading,
                        &mut events,
                        Event::InlineHtml(CowStr::Borrowed(RAW_HTML_OMITTED)),
                    );
                }
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => {
                    heading = Some(HeadingBuffer {
                        level,
                        id,
                        classes,
                        attrs,
                        events: Vec::new(),
                        text: String::new(),
                    });
                }
                Event::End(TagEnd::Heading(level)) => {
                    if let Some(h) = heading.take() {
                        let id = match h.id {
                            Some(explicit) => ids.reserve(explicit.to_string()),
                            None => ids.allocate(&h.text),
                        };
                        headings.push(Heading {
                            level: h.level as u8,
                            id: id.clone(),
                            text: h.text.trim().to_string(),
                        });
                        events.push(Event::Start(Tag::Heading {
                            level: h.level,
                            id: Some(CowStr::from(id)),
                            classes: h.classes,
                            attrs: h.attrs,
                        }));
                        events.extend(h.events);
                        events.push(Event::End(TagEnd::Heading(level)));
                    }
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    emit(
                        &mut heading,
                        &mut events,
                        Event::Start(Tag::Link {
                            link_type,
                            dest_url: sanitize_url(dest_url, false),
                            title,
                            id,
                        }),
                    );
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    emit(
                        &mut heading,
                        &mut events,
                        Event::Start(Tag::Image {
                            link_type,
                            dest_url: sanitize_url(dest_url, true),
                            title,
                            id,
                        }),
                    );
                }
                other => emit(&mut heading, &mut events, other),
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        RenderedMarkdown {
            html: html_output,
            headings,
        }
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let Some(lang) = lang else {
            return format!("<pre><code>{}</code></pre>\n", html_escape(code));
        };

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let (body, style) = match theme {
            Some(theme) => match self.highlight_lines(code, syntax, theme) {
                Ok(body) => (body, background_style(theme)),
                Err(e) => {
                    tracing::debug!("Highlighting {} failed: {}", lang, e);
                    (self.plain_lines(code), String::new())
                }
            },
            None => (self.plain_lines(code), String::new()),
        };

        format!(
            r#"<div class="highlight"><pre tabindex="0"{}><code class="language-{}" data-lang="{}">{}</code></pre></div>"#,
            style, lang, lang, body
        ) + "\n"
    }

    fn highlight_lines(
        &self,
        code: &str,
        syntax: &SyntaxReference,
        theme: &Theme,
    ) -> Result<String, syntect::Error> {
        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut out = String::new();

        for (i, line) in LinesWithEndings::from(code).enumerate() {
            let ranges = highlighter.highlight_line(line, &self.syntax_set)?;
            let html = styled_line_to_highlighted_html(&ranges[..], IncludeBackground::No)?;
            out.push_str(&self.number_line(i, &html));
        }

        Ok(out)
    }

    fn plain_lines(&self, code: &str) -> String {
        LinesWithEndings::from(code)
            .enumerate()
            .map(|(i, line)| self.number_line(i, &html_escape(line)))
            .collect()
    }

    fn number_line(&self, index: usize, html: &str) -> String {
        if self.line_numbers {
            format!(
                r#"<span class="line"><span class="ln">{}</span><span class="cl">{}</span></span>"#,
                index + 1,
                html
            )
        } else {
            html.to_string()
        }
    }

    /// Split a body at the `<!--more-->` divider.
    /// Returns (summary, body without the divider) when a divider is present.
    pub fn split_excerpt(content: &str) -> Option<(String, String)> {
        let m = MORE_DIVIDER.find(content)?;
        let summary = content[..m.start()].trim_end().to_string();
        let full = format!(
            "{}\n\n{}",
            content[..m.start()].trim_end(),
            content[m.end()..].trim_start()
        );
        Some((summary, full))
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn emit<'a>(heading: &mut Option<HeadingBuffer<'a>>, events: &mut Vec<Event<'a>>, event: Event<'a>) {
    match heading {
        Some(h) => {
            if let Event::Text(t) | Event::Code(t) = &event {
                h.text.push_str(t);
            }
            h.events.push(event);
        }
        None => events.push(event),
    }
}

/// Language from a fence info string such as "rust,ignore" or "go {linenos=true}"
fn fence_language(info: &str) -> Option<String> {
    let lang: String = info
        .split(|c: char| c == ',' || c == '{' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect();
    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}

/// Replace destinations that would run script or read local files
fn sanitize_url(dest: CowStr<'_>, image: bool) -> CowStr<'_> {
    let normalized: String = dest
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let dangerous = ["javascript:", "vbscript:", "file:"]
        .iter()
        .any(|scheme| normalized.starts_with(scheme));
    let bad_data = normalized.starts_with("data:")
        && !(image
            && ["data:image/png", "data:image/gif", "data:image/jpeg", "data:image/webp"]
                .iter()
                .any(|prefix| normalized.starts_with(prefix)));

    if dangerous || bad_data {
        CowStr::Borrowed("#")
    } else {
        dest
    }
}

fn background_style(theme: &Theme) -> String {
    match theme.settings.background {
        Some(c) => format!(r#" style="background-color:#{:02x}{:02x}{:02x};""#, c.r, c.g, c.b),
        None => String::new(),
    }
}

/// Hands out unique heading ids: "intro", "intro-1", "intro-2"
#[derive(Default)]
struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    fn allocate(&mut self, text: &str) -> String {
        let base = slug::slugify(text);
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };
        self.reserve(base)
    }

    fn reserve(&mut self, base: String) -> String {
        match self.seen.get_mut(&base) {
            Some(n) => {
                *n += 1;
                let id = format!("{}-{}", base, n);
                self.seen.insert(id.clone(), 0);
                id
            }
            None => {
                self.seen.insert(base.clone(), 0);
                base
            }
        }
    }
}

/// Nested `<nav>` list from h2-h4 headings
fn build_toc(headings: &[Heading]) -> String {
    let entries: Vec<&Heading> = headings
        .iter()
        .filter(|h| (2..=4).contains(&h.level))
        .collect();
    let Some(base) = entries.iter().map(|h| h.level).min() else {
        return String::new();
    };

    let mut html = String::from("<nav id=\"TableOfContents\">\n<ul>\n");
    let mut current = base;

    for (i, h) in entries.iter().enumerate() {
        let level = h.level;
        if i == 0 {
            html.push_str("<li>");
        } else if level > current {
            for _ in current..level {
                html.push_str("\n<ul>\n<li>");
            }
        } else {
            html.push_str("</li>\n");
            for _ in level..current {
                html.push_str("</ul>\n</li>\n");
            }
            html.push_str("<li>");
        }
        html.push_str(&format!(
            r##"<a href="#{}">{}</a>"##,
            h.id,
            html_escape(&h.text)
        ));
        current = level;
    }

    html.push_str("</li>\n");
    for _ in base..current {
        html.push_str("</ul>\n</li>\n");
    }
    html.push_str("</ul>\n</nav>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# Hello World\n\nThis is a test.");
        assert!(out.html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(out.html.contains("<p>This is a test.</p>"));
        assert_eq!(out.headings[0].level, 1);
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = MarkdownRenderer::new();
        let src = "# Title\n\n```rust\nfn main() {}\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";
        assert_eq!(renderer.render(src), renderer.render(src));
    }

    #[test]
    fn test_render_code_block() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("```rust\nfn main() {}\n```");
        assert!(out.html.contains("highlight"));
        assert!(out.html.contains(r#"class="language-rust""#));
        assert!(out.html.contains("main"));
    }

    #[test]
    fn test_code_block_without_language_is_escaped() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("```\n<b>x</b>\n```");
        assert!(out.html.contains("<pre><code>&lt;b&gt;x&lt;/b&gt;"));
    }

    #[test]
    fn test_line_numbers() {
        let renderer = MarkdownRenderer::with_options("InspiredGitHub", true, false);
        let out = renderer.render("```text\na\nb\n```");
        assert!(out.html.contains(r#"<span class="ln">2</span>"#));
    }

    #[test]
    fn test_common_constructs() {
        let renderer = MarkdownRenderer::new();
        let src = "- one\n- two\n\n> quote\n\n*em* and [link](https://example.com) ![alt](/img.png)\n\n| a |\n|---|\n| 1 |\n";
        let html = renderer.render(src).html;
        assert!(html.contains("<ul>"));
        assert!(html.contains("<blockquote>"));
        assert!(html.contains("<em>em</em>"));
        assert!(html.contains(r#"<a href="https://example.com">link</a>"#));
        assert!(html.contains(r#"<img src="/img.png" alt="alt" />"#));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_raw_html_omitted_by_default() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("<script>alert(1)</script>\n\nText with <b>inline</b>.")
            .html;
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b>"));
        assert!(html.contains(RAW_HTML_OMITTED));
    }

    #[test]
    fn test_raw_html_kept_when_unsafe() {
        let renderer = MarkdownRenderer::with_options("InspiredGitHub", false, true);
        let html = renderer.render("<div class=\"x\">hi</div>\n").html;
        assert!(html.contains("<div class=\"x\">hi</div>"));
    }

    #[test]
    fn test_script_links_neutralized() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("[x](javascript:alert(1)) [y](<JaVa ScRiPt:alert(2)>) ![z](data:text/html;base64,xx)")
            .html;
        assert!(!html.to_lowercase().contains("javascript"));
        assert!(!html.contains("data:text/html"));
        assert!(html.contains(r##"href="#""##));
    }

    #[test]
    fn test_duplicate_heading_ids() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("## Intro\n\n## Intro\n\n## Intro {#custom}\n");
        let ids: Vec<_> = out.headings.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["intro", "intro-1", "custom"]);
    }

    #[test]
    fn test_table_of_contents() {
        let renderer = MarkdownRenderer::new();
        let out = renderer.render("# Top\n\n## A\n\n### B\n\n## C\n");
        let toc = out.table_of_contents();
        assert_eq!(
            toc,
            "<nav id=\"TableOfContents\">\n<ul>\n<li><a href=\"#a\">A</a>\n<ul>\n<li><a href=\"#b\">B</a></li>\n</ul>\n</li>\n<li><a href=\"#c\">C</a></li>\n</ul>\n</nav>"
        );

        let out = renderer.render("# Only a title\n");
        assert_eq!(out.table_of_contents(), "");
    }

    #[test]
    fn test_split_excerpt() {
        let content = "This is excerpt.\n<!-- more -->\nThis is more content.";
        let (excerpt, full) = MarkdownRenderer::split_excerpt(content).unwrap();
        assert_eq!(excerpt, "This is excerpt.");
        assert_eq!(full, "This is excerpt.\n\nThis is more content.");

        assert!(MarkdownRenderer::split_excerpt("no divider").is_none());
        assert!(MarkdownRenderer::split_excerpt("a<!--MORE-->b").is_some());
    }
}
