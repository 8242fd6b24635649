//! Helper functions shared by the renderer, the templates and the feeds

mod html;
mod url;

pub use html::*;
pub use url::*;
