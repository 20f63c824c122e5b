//! Links and media pointers found inside page content.

use super::ident::{Ident, SharedName};
use super::resource::Resource;
use crate::dom::{ArenaDom, ArenaNodeId};
use crate::error::{Error, Result};

/// Element/attribute pairs that carry references, scanned in this order.
const REFERENCE_SOURCES: &[(&str, &str)] = &[
    ("a", "href"),
    ("img", "src"),
    ("audio", "src"),
    ("video", "src"),
    ("object", "data"),
    ("embed", "src"),
    ("source", "src"),
    ("span", "data-src"),
];

/// Where a reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteType {
    /// Same-book path (no network authority).
    Internal,
    /// Absolute URL with a network authority.
    External,
    /// Embedded `data:` URI.
    Inline,
}

/// Classify a URI by shape.
pub fn classify_uri(uri: &str) -> RemoteType {
    let (scheme, rest) = match split_scheme(uri) {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, uri),
    };
    let has_authority = rest
        .strip_prefix("//")
        .is_some_and(|after| after.split(['/', '?', '#']).next().is_some_and(|a| !a.is_empty()));

    if has_authority {
        RemoteType::External
    } else if scheme.is_some_and(|s| s.eq_ignore_ascii_case("data")) {
        RemoteType::Inline
    } else {
        RemoteType::Internal
    }
}

fn split_scheme(uri: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = uri.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

#[derive(Debug, Clone)]
enum Target {
    Resource(Resource),
    Node(SharedName),
}

#[derive(Debug, Clone)]
struct Binding {
    target: Target,
    template: String,
}

/// A cross-link or media pointer inside a document.
///
/// A bound reference derives its URI from the target's current name every
/// time it is read.
#[derive(Debug, Clone)]
pub struct Reference {
    element: ArenaNodeId,
    attribute: &'static str,
    uri: String,
    remote_type: RemoteType,
    binding: Option<Binding>,
}

impl Reference {
    /// Element carrying the reference.
    pub fn element(&self) -> ArenaNodeId {
        self.element
    }

    /// Attribute holding the URI (`href`, `src`, `data`, `data-src`).
    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    /// Classification made when the reference was scanned.
    pub fn remote_type(&self) -> RemoteType {
        self.remote_type
    }

    /// Current URI.
    pub fn uri(&self) -> String {
        match &self.binding {
            Some(binding) => {
                let name = match &binding.target {
                    Target::Resource(r) => r.id(),
                    Target::Node(handle) => handle.get(),
                };
                binding.template.replacen("{}", &name, 1)
            }
            None => self.uri.clone(),
        }
    }

    /// Replace the URI of an unbound reference.
    pub fn set_uri(&mut self, uri: impl Into<String>) -> Result<()> {
        if self.binding.is_some() {
            return Err(Error::BoundReference { uri: self.uri() });
        }
        self.uri = uri.into();
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// The resource this reference is bound to, if any.
    pub fn bound_resource(&self) -> Option<&Resource> {
        match &self.binding {
            Some(Binding {
                target: Target::Resource(r),
                ..
            }) => Some(r),
            _ => None,
        }
    }

    /// Bind to a resource; `template` contains one `{}` for the resource id.
    pub fn bind_resource(&mut self, resource: &Resource, template: impl Into<String>) {
        self.binding = Some(Binding {
            target: Target::Resource(resource.clone()),
            template: template.into(),
        });
    }

    /// Bind to a node's identifier.
    pub fn bind_node(&mut self, ident: &Ident, template: impl Into<String>) {
        self.binding = Some(Binding {
            target: Target::Node(ident.handle()),
            template: template.into(),
        });
    }

    /// Drop the binding, keeping the last derived URI.
    pub fn unbind(&mut self) {
        self.uri = self.uri();
        self.binding = None;
    }
}

/// Scan the subtree under `root` for references, anchors first.
pub fn find_references(dom: &ArenaDom, root: ArenaNodeId) -> Vec<Reference> {
    let mut found = Vec::new();
    for &(tag, attribute) in REFERENCE_SOURCES {
        for id in dom.descendants(root) {
            if !dom.is_tag(id, tag) {
                continue;
            }
            if tag == "embed" && !dom.parent(id).is_some_and(|p| dom.is_tag(p, "object")) {
                continue;
            }
            if let Some(uri) = dom.get_attr(id, attribute) {
                found.push(Reference {
                    element: id,
                    attribute,
                    uri: uri.to_string(),
                    remote_type: classify_uri(uri),
                    binding: None,
                });
            }
        }
    }
    found
}
