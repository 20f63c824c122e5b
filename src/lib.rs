//! # bindery
//!
//! A content model for EPUB3-derived educational books, with the transforms
//! that move books between packaged, single-document and collated forms.
//!
//! ## Features
//!
//! - Binders, pages and pointers with shared, renameable identities
//! - Microdata metadata extraction and rendering
//! - Package adaptation (`.opf` + navigation document) in both directions
//! - Whole-book flattening into one XHTML document, and reconstitution
//! - A collation bridge to an external cascade engine
//!
//! ## Quick Start
//!
//! ```
//! use bindery::model::{Binder, Document, Metadata, TranslucentBinder};
//! use bindery::{Node, format_single_html, reconstitute};
//!
//! let page = Document::new("e78d4f90@3", "<p>Hello</p>")
//!     .unwrap()
//!     .with_metadata(Metadata::new("Document One"));
//! let book: Node = Binder::new("8d75ea29@3", Metadata::new("Book One"))
//!     .unwrap()
//!     .with_child(TranslucentBinder::new(Metadata::new("Part One")).with_child(page))
//!     .into();
//!
//! let html = format_single_html(&book).unwrap().value;
//! let rebuilt = reconstitute(&html).unwrap().value;
//! assert_eq!(rebuilt.ident_hash().as_deref(), Some("8d75ea29@3"));
//! ```

pub mod collation;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod extract;
pub mod model;
pub mod package;
pub mod render;
pub mod single;
pub(crate) mod util;

pub use collation::{CascadeEngine, Collator, collate};
pub use config::{FormatterConfig, ReconstituteConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity, Transformed};
pub use error::{BoxError, Error, Result};
pub use model::{Binder, Document, DocumentPointer, Metadata, Node, Resource, TranslucentBinder};
pub use package::{Container, Package, adapt_package, make_package, read_container, write_container};
pub use single::{Hook, SingleHtmlFormatter, format_single_html, reconstitute, reconstitute_with};
