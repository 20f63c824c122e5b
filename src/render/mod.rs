//! String-built XHTML for metadata blocks, navigation and standalone
//! documents.

mod document;
mod metadata;
mod navigation;

pub use document::{render_binder, render_document, render_pointer};
pub use metadata::MetadataBlock;
pub use navigation::{child_title_markup, package_link, render_nav};
