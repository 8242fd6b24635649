//! Configuration module

mod options;
mod site;

pub use options::BuildOptions;
pub use site::HighlightConfig;
pub use site::MarkupConfig;
pub use site::MenuConfig;
pub use site::MenuEntry;
pub use site::SiteConfig;
pub use site::CONFIG_FILES;
