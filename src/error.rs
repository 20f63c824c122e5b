//! Error types for bindery operations.

use thiserror::Error;

/// Boxed error returned by external collaborators (hooks, cascade engines).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a container, model or document transformation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("package {package:?} has no navigation item")]
    MissingNavigation { package: String },

    #[error("package {package:?} has {count} navigation items, expected exactly one")]
    AdditionalNavigation { package: String, count: usize },

    #[error("missing required metadata {field:?} in {context}")]
    MissingMetadata { field: &'static str, context: String },

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("no file extension known for media type {media_type:?} (node {node})")]
    UnknownMediaType { media_type: String, node: String },

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("item {name:?} not found in package {package:?}")]
    MissingItem { name: String, package: String },

    #[error("invalid package: {0}")]
    InvalidPackage(String),

    #[error("{node}: navigation lists {expected} children but the markup has {found}")]
    ChildCountMismatch {
        node: String,
        expected: usize,
        found: usize,
    },

    #[error("{node}: unknown structural role {role:?}")]
    UnknownStructuralRole { role: String, node: String },

    #[error("invalid selector {query:?}: {message}")]
    InvalidQuery { query: String, message: String },

    #[error("reference to {uri:?} is bound; unbind it before setting the URI")]
    BoundReference { uri: String },

    #[error("hook {query:?} failed: {source}")]
    Hook {
        query: String,
        #[source]
        source: BoxError,
    },

    #[error("collation failed: {0}")]
    Collation(#[source] BoxError),

    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn missing(field: &'static str, context: impl Into<String>) -> Self {
        Error::MissingMetadata {
            field,
            context: context.into(),
        }
    }
}
