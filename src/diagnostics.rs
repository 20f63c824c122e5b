//! Non-fatal findings collected while transforming a book.
//!
//! Transformations never log through hidden global state alone: every
//! warning is pushed into a [`Diagnostics`] sink that travels with the call
//! and is handed back next to the result in a [`Transformed`]. Each entry
//! is also emitted as a `tracing` event so subscribers see it live.

use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A `/contents/...` link points at a page outside this book.
    ExternalPageLink { href: String },
    /// A link names an in-book page but a fragment that page does not have.
    UnresolvedFragment { href: String },
    /// A same-book fragment link whose target could not be found at all.
    UnresolvedLink { href: String },
    /// A document references a resource the package does not carry.
    MissingResource { name: String },
    /// A nav entry names a node whose item carries no metadata block.
    MissingMetadataBlock,
}

/// A single finding tied to the node it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// `ident_hash` (or name) of the node being processed.
    pub node: String,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::ExternalPageLink { href } => {
                write!(f, "{}: link {href} points outside this book", self.node)
            }
            DiagnosticKind::UnresolvedFragment { href } => {
                write!(f, "{}: link {href} names an unknown fragment", self.node)
            }
            DiagnosticKind::UnresolvedLink { href } => {
                write!(f, "{}: link target {href} not found", self.node)
            }
            DiagnosticKind::MissingResource { name } => {
                write!(f, "{}: missing resource {name}", self.node)
            }
            DiagnosticKind::MissingMetadataBlock => {
                write!(f, "{}: no metadata block", self.node)
            }
        }
    }
}

/// Ordered collection of diagnostics for one transformation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and mirror it to `tracing`.
    pub fn push(&mut self, severity: Severity, node: impl Into<String>, kind: DiagnosticKind) {
        let diagnostic = Diagnostic {
            severity,
            node: node.into(),
            kind,
        };
        match severity {
            Severity::Info => tracing::debug!(node = %diagnostic.node, "{diagnostic}"),
            Severity::Warning => tracing::warn!(node = %diagnostic.node, "{diagnostic}"),
            Severity::Error => tracing::error!(node = %diagnostic.node, "{diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    pub fn info(&mut self, node: impl Into<String>, kind: DiagnosticKind) {
        self.push(Severity::Info, node, kind);
    }

    pub fn warn(&mut self, node: impl Into<String>, kind: DiagnosticKind) {
        self.push(Severity::Warning, node, kind);
    }

    pub fn error(&mut self, node: impl Into<String>, kind: DiagnosticKind) {
        self.push(Severity::Error, node, kind);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity >= severity)
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

/// A transformation result paired with the diagnostics gathered producing it.
#[derive(Debug)]
pub struct Transformed<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Transformed<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Transformed<U> {
        Transformed {
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}
