//! Content module - documents, front-matter, Markdown and taxonomies

mod document;
pub mod frontmatter;
pub mod loader;
mod markdown;
mod metadata;
mod taxonomy;

pub(crate) use document::title_case;
pub use document::{newest_first, Document, DocumentKind};
pub use frontmatter::{FrontMatter, ParseError};
pub use markdown::{Heading, MarkdownRenderer, RenderedMarkdown, RAW_HTML_OMITTED};
pub use metadata::{parse_timestamp, MetaValue, Metadata};
pub use taxonomy::{Taxonomy, Term};
