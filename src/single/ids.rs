//! Element id bookkeeping for flattened documents.

use std::collections::HashSet;

const GENERATED_PREFIX: &str = "auto_";

/// The set of ids already used in one document.
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    used: HashSet<String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `candidate`, or the first free `<candidate>_<n>` (n = 1, 2, ...).
    pub fn reserve(&mut self, candidate: &str) -> String {
        if self.used.insert(candidate.to_string()) {
            return candidate.to_string();
        }
        (1..)
            .map(|n| format!("{candidate}_{n}"))
            .find(|id| !self.used.contains(id))
            .map(|id| {
                self.used.insert(id.clone());
                id
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// `auto_<page>_<local>`, with underscores dropped from the page id so the
/// local part can be split off again.
pub fn generated_id(page_id: &str, local: &str) -> String {
    format!("{GENERATED_PREFIX}{}_{local}", page_id.replace('_', ""))
}

/// The local part of a generated id.
pub fn local_id(id: &str) -> Option<&str> {
    id.strip_prefix(GENERATED_PREFIX)?
        .split_once('_')
        .map(|(_, local)| local)
        .filter(|local| !local.is_empty())
}
