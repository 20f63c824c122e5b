//! Options for the single-document transforms.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for flattening a book into one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Rewrite element ids inside pages to `auto_<page>_<id>` and fix links.
    /// Disabling this leaves page content untouched (ids may then collide).
    pub generate_ids: bool,
    /// Size of the worker pool used to run extension hooks.
    pub hook_workers: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            generate_ids: true,
            hook_workers: 4,
        }
    }
}

impl FormatterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generate_ids(mut self, generate_ids: bool) -> Self {
        self.generate_ids = generate_ids;
        self
    }

    /// Set the hook pool size (clamped to at least one worker).
    pub fn with_hook_workers(mut self, workers: usize) -> Self {
        self.hook_workers = workers.max(1);
        self
    }

    /// Load from a JSON object; absent keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Configuration for rebuilding a tree from a flattened document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstituteConfig {
    /// Restore `auto_` ids to their original local form and rewrite links.
    pub fix_generated_ids: bool,
    /// Derive UUID5 identifiers for binders that lack one, when an ancestor
    /// carries a UUID to derive from.
    pub derive_identifiers: bool,
}

impl Default for ReconstituteConfig {
    fn default() -> Self {
        Self {
            fix_generated_ids: true,
            derive_identifiers: true,
        }
    }
}

impl ReconstituteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fix_generated_ids(mut self, fix: bool) -> Self {
        self.fix_generated_ids = fix;
        self
    }

    pub fn with_derive_identifiers(mut self, derive: bool) -> Self {
        self.derive_identifiers = derive;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
