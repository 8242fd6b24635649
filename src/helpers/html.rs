//! HTML and text helper functions

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// A root-relative `href`/`src`; protocol-relative `//host` links are
    /// left out
    static ref ROOT_RELATIVE_URL: Regex = Regex::new(r#"\b(href|src)="/([^/])"#).unwrap();
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape XML special characters
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Strip HTML tags from a string
pub fn strip_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;

    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }

    result
}

/// Count words in HTML content (strips tags first). Each CJK character
/// counts as one word.
pub fn count_words(html: &str) -> usize {
    let text = strip_html(html);
    let mut count = 0;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk(c) {
            count += 1;
            in_word = false;
        } else if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            count += 1;
        }
    }

    count
}

/// Minutes to read `words` at 213 words per minute, at least one
pub fn reading_time(words: usize) -> usize {
    words.div_ceil(213).max(1)
}

fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
        || ('\u{3040}'..='\u{30FF}').contains(&c)
        || ('\u{AC00}'..='\u{D7AF}').contains(&c)
}

/// Keep the first `count` whitespace-separated words.
/// Returns the text and whether anything was cut.
pub fn truncate_words(text: &str, count: usize) -> (String, bool) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= count {
        (words.join(" "), false)
    } else {
        (words[..count].join(" "), true)
    }
}

/// Strip invalid XML control characters (except tab, newline, carriage return)
/// XML 1.0 only allows: #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]
pub fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}

/// Convert root-relative URLs in HTML content to absolute URLs
pub fn absolutize_urls(content: &str, base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    ROOT_RELATIVE_URL
        .replace_all(content, |caps: &Captures| {
            format!("{}=\"{}/{}", &caps[1], base_url, &caps[2])
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello <b>World</b></p>"), "Hello World");
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("<p>one two  three</p>"), 3);
        assert_eq!(count_words("<p>写代码 rust</p>"), 4);
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(0), 1);
        assert_eq!(reading_time(213), 1);
        assert_eq!(reading_time(214), 2);
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("a b  c", 5), ("a b c".to_string(), false));
        assert_eq!(truncate_words("a b c d", 2), ("a b".to_string(), true));
    }

    #[test]
    fn test_absolutize_urls() {
        assert_eq!(
            absolutize_urls(r#"<a href="/x/">x</a><img src="/a.png">"#, "https://e.com/"),
            r#"<a href="https://e.com/x/">x</a><img src="https://e.com/a.png">"#
        );
        assert_eq!(
            absolutize_urls(r#"<a href="/">home</a>"#, "https://e.com"),
            r#"<a href="https://e.com/">home</a>"#
        );
    }

    #[test]
    fn test_absolutize_keeps_protocol_relative_urls() {
        let html = r#"<img src="//cdn.example/a.png"><a href="//other.org/">o</a>"#;
        assert_eq!(absolutize_urls(html, "https://e.com/"), html);
    }

    #[test]
    fn test_strip_invalid_xml_chars() {
        assert_eq!(strip_invalid_xml_chars("a\u{0}b\u{b}c\n"), "abc\n");
    }
}
