//! List site content

use anyhow::Result;

use crate::content::loader::ContentLoader;
use crate::content::{newest_first, Document, DocumentKind};
use crate::Site;

/// Which documents to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListFilter {
    All,
    Drafts,
    Future,
}

impl ListFilter {
    fn matches(self, doc: &Document, site: &Site) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Drafts => doc.draft,
            ListFilter::Future => doc.is_future(site.options.now),
        }
    }
}

/// Print matching documents as `path,title,date,draft` rows, newest first
pub fn run(site: &Site, filter: ListFilter) -> Result<()> {
    print!("{}", render(site, filter)?);
    Ok(())
}

/// The listing as text, header row included
pub fn render(site: &Site, filter: ListFilter) -> Result<String> {
    let loaded = ContentLoader::new(site)?.load()?;

    let mut docs: Vec<&Document> = loaded
        .documents
        .iter()
        .filter(|doc| doc.kind == DocumentKind::Page && filter.matches(doc, site))
        .collect();
    docs.sort_by(|a, b| newest_first(a, b));

    let mut out = String::from("path,title,date,draft\n");
    for doc in docs {
        let row = [
            csv_field(&format!("content/{}", doc.path)),
            csv_field(&doc.title),
            doc.date.to_rfc3339(),
            doc.draft.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    Ok(out)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
