//! Content model for books.
//!
//! This module contains:
//! - Node identity (`id@version`) and live, shareable names
//! - Metadata records and contributor lists
//! - Binders, pages and pointers (the content tree)
//! - References found in page content and the resources they bind to
//! - Pre-order flattening and serializable tree summaries

mod document;
mod flatten;
mod ident;
mod metadata;
mod node;
mod reference;
mod resource;
mod tree;

pub use document::{Document, DocumentPointer};
pub use flatten::Flatten;
pub use ident::{Ident, SharedName};
pub use metadata::{Metadata, Person, PersonRole};
pub use node::{Binder, Children, Node, TRANSLUCENT_BINDER_ID, TranslucentBinder};
pub use reference::{Reference, RemoteType, classify_uri, find_references};
pub use resource::Resource;
pub use tree::{TreeNode, flatten_tree_to_ident_hashes, model_to_tree};
