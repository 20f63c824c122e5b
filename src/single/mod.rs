//! Whole-book flattening into one document, and the way back.
//!
//! [`SingleHtmlFormatter`] nests one `div[data-type]` per node, opening
//! with the book's metadata and a `nav#toc`. Element ids inside pages are
//! rewritten to `auto_<page>_<id>` so the whole book shares one id space,
//! and `/contents/<uuid>` links between pages become fragment links.
//! [`reconstitute`] reads such a document (possibly after collation) back
//! into a content tree.

mod formatter;
mod hooks;
mod ids;
mod reconstitute;

use std::fmt;

pub use formatter::{SingleHtmlFormatter, format_single_html};
pub use hooks::{Hook, HookFn};
pub use ids::{IdRegistry, generated_id, local_id};
pub use reconstitute::{reconstitute, reconstitute_with};

use crate::model::Node;

/// Structural role of an element in a flattened book (`data-type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Book,
    Unit,
    Chapter,
    CompositeChapter,
    Page,
    CompositePage,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Book => "book",
            Role::Unit => "unit",
            Role::Chapter => "chapter",
            Role::CompositeChapter => "composite-chapter",
            Role::Page => "page",
            Role::CompositePage => "composite-page",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "book" => Role::Book,
            "unit" => Role::Unit,
            "chapter" => Role::Chapter,
            "composite-chapter" => Role::CompositeChapter,
            "page" => Role::Page,
            "composite-page" => Role::CompositePage,
            _ => return None,
        })
    }

    /// Pages carry content; everything else nests.
    pub fn is_leaf(self) -> bool {
        matches!(self, Role::Page | Role::CompositePage)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of `node`; `is_root` marks the book itself.
pub fn node_role(node: &Node, is_root: bool) -> Role {
    match node {
        Node::CompositeDocument(_) => Role::CompositePage,
        Node::Document(_) | Node::DocumentPointer(_) => Role::Page,
        _ if is_root => Role::Book,
        _ => {
            let has_translucent_child = node
                .children()
                .is_some_and(|children| children.iter().any(Node::is_translucent));
            if has_translucent_child {
                Role::Unit
            } else {
                Role::Chapter
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Binder, Document, Metadata, TranslucentBinder};

    #[test]
    fn test_node_roles() {
        let page = Document::new("p@1", "<p/>").unwrap();
        assert_eq!(node_role(&Node::from(page.clone()), false), Role::Page);
        assert_eq!(node_role(&Node::CompositeDocument(page.clone()), false), Role::CompositePage);

        let chapter = TranslucentBinder::new(Metadata::new("Chapter")).with_child(page);
        let unit = TranslucentBinder::new(Metadata::new("Unit")).with_child(chapter.clone());
        assert_eq!(node_role(&Node::from(chapter), false), Role::Chapter);
        assert_eq!(node_role(&Node::from(unit.clone()), false), Role::Unit);

        let book = Binder::new("b@1", Metadata::new("Book")).unwrap().with_child(unit);
        assert_eq!(node_role(&Node::from(book), true), Role::Book);
    }

    #[test]
    fn test_role_names() {
        for role in [Role::Book, Role::Unit, Role::Chapter, Role::CompositeChapter, Role::Page, Role::CompositePage] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("appendix"), None);
        assert!(Role::CompositePage.is_leaf());
        assert!(!Role::CompositeChapter.is_leaf());
    }
}
