//! Hand a flattened book to an external cascade engine and read the result
//! back.

use crate::config::{FormatterConfig, ReconstituteConfig};
use crate::diagnostics::Transformed;
use crate::error::{BoxError, Error, Result};
use crate::model::Node;
use crate::single::{Hook, SingleHtmlFormatter, reconstitute_with};

/// An engine that applies a ruleset to a flattened book document.
pub trait CascadeEngine {
    /// Return the collated document. The ruleset is opaque to this crate.
    fn collate(&self, document: &str, ruleset: &[u8]) -> std::result::Result<String, BoxError>;
}

impl<F> CascadeEngine for F
where
    F: Fn(&str, &[u8]) -> std::result::Result<String, BoxError>,
{
    fn collate(&self, document: &str, ruleset: &[u8]) -> std::result::Result<String, BoxError> {
        self(document, ruleset)
    }
}

/// Collate with default configurations. Without a ruleset the book is
/// returned unchanged.
pub fn collate(
    book: &Node,
    ruleset: Option<&[u8]>,
    engine: &dyn CascadeEngine,
) -> Result<Transformed<Node>> {
    Collator::new(engine).collate(book, ruleset)
}

/// Format, collate and reconstitute with explicit settings.
pub struct Collator<'a> {
    engine: &'a dyn CascadeEngine,
    formatter: FormatterConfig,
    reconstitute: ReconstituteConfig,
    hooks: Vec<Hook>,
}

impl<'a> Collator<'a> {
    pub fn new(engine: &'a dyn CascadeEngine) -> Self {
        Self {
            engine,
            formatter: FormatterConfig::default(),
            reconstitute: ReconstituteConfig::default(),
            hooks: Vec::new(),
        }
    }

    pub fn with_formatter_config(mut self, config: FormatterConfig) -> Self {
        self.formatter = config;
        self
    }

    pub fn with_reconstitute_config(mut self, config: ReconstituteConfig) -> Self {
        self.reconstitute = config;
        self
    }

    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn collate(&self, book: &Node, ruleset: Option<&[u8]>) -> Result<Transformed<Node>> {
        let Some(ruleset) = ruleset else {
            return Ok(Transformed::new(book.clone(), Default::default()));
        };

        let formatted = SingleHtmlFormatter::new(book)
            .with_config(self.formatter.clone())
            .with_hooks(self.hooks.iter().cloned())
            .format()?;
        tracing::debug!(
            book = %book.ident_hash().unwrap_or_default(),
            ruleset_len = ruleset.len(),
            "running cascade engine"
        );
        let collated = self
            .engine
            .collate(&formatted.value, ruleset)
            .map_err(Error::Collation)?;

        let mut rebuilt = reconstitute_with(&collated, &self.reconstitute)?;
        let mut diagnostics = formatted.diagnostics;
        diagnostics.extend(rebuilt.diagnostics);
        rebuilt.diagnostics = diagnostics;
        Ok(rebuilt)
    }
}
