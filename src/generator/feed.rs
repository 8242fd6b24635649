//! RSS 2.0 feeds and the sitemap

use chrono::{DateTime, FixedOffset};

use crate::helpers::{absolutize_urls, escape_xml, strip_invalid_xml_chars};

/// Channel-level feed metadata
pub struct Channel<'a> {
    pub title: &'a str,
    /// Absolute URL of the listing
    pub link: &'a str,
    /// Absolute URL of the feed itself
    pub feed_link: &'a str,
    pub description: &'a str,
    pub language: &'a str,
}

pub struct FeedItem<'a> {
    pub title: &'a str,
    /// Absolute URL
    pub link: &'a str,
    pub date: DateTime<FixedOffset>,
    pub author: Option<&'a str>,
    /// HTML
    pub description: &'a str,
}

/// Render an RSS 2.0 document. Root-relative links in descriptions are
/// made absolute against `host`. `lastBuildDate` is the newest item's date so
/// the output only changes when content does.
pub fn rss(channel: &Channel, items: &[FeedItem], host: &str) -> String {
    let mut feed = String::new();
    feed.push_str(r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#);
    feed.push('\n');
    feed.push_str(r#"<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">"#);
    feed.push('\n');
    feed.push_str("  <channel>\n");
    feed.push_str(&format!("    <title>{}</title>\n", escape_xml(channel.title)));
    feed.push_str(&format!("    <link>{}</link>\n", escape_xml(channel.link)));
    feed.push_str(&format!(
        "    <description>{}</description>\n",
        escape_xml(channel.description)
    ));
    feed.push_str("    <generator>quire</generator>\n");
    if !channel.language.is_empty() {
        feed.push_str(&format!(
            "    <language>{}</language>\n",
            escape_xml(channel.language)
        ));
    }
    if let Some(newest) = items.iter().map(|i| i.date).max() {
        feed.push_str(&format!(
            "    <lastBuildDate>{}</lastBuildDate>\n",
            newest.to_rfc2822()
        ));
    }
    feed.push_str(&format!(
        "    <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_xml(channel.feed_link)
    ));

    for item in items {
        feed.push_str("    <item>\n");
        feed.push_str(&format!("      <title>{}</title>\n", escape_xml(item.title)));
        feed.push_str(&format!("      <link>{}</link>\n", escape_xml(item.link)));
        feed.push_str(&format!("      <pubDate>{}</pubDate>\n", item.date.to_rfc2822()));
        if let Some(author) = item.author {
            feed.push_str(&format!("      <author>{}</author>\n", escape_xml(author)));
        }
        feed.push_str(&format!("      <guid>{}</guid>\n", escape_xml(item.link)));
        let description = strip_invalid_xml_chars(&absolutize_urls(item.description, host));
        feed.push_str(&format!(
            "      <description>{}</description>\n",
            escape_xml(&description)
        ));
        feed.push_str("    </item>\n");
    }

    feed.push_str("  </channel>\n");
    feed.push_str("</rss>\n");
    feed
}

pub struct SitemapEntry {
    /// Absolute URL
    pub loc: String,
    pub lastmod: Option<DateTime<FixedOffset>>,
}

/// Render a sitemap listing every entry in the given order
pub fn sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');
    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
        if let Some(lastmod) = entry.lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod.to_rfc3339()));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}
