//! Pre-order traversal of the content tree.

use super::node::Node;

/// Lazy pre-order iterator over a node and its descendants.
///
/// Uses an explicit stack, so arbitrarily deep trees do not grow the call
/// stack. Call [`Node::flatten`] again to restart.
pub struct Flatten<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Flatten<'a> {
    pub(crate) fn new(root: &'a Node) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(children) = node.children() {
            self.stack.extend(children.iter().rev());
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Binder, Document, DocumentPointer, Metadata, Node, TranslucentBinder};

    fn sample() -> Node {
        let leaf = |id: &str| Document::new(id, "<p/>").unwrap();
        Binder::new("book", Metadata::new("Book"))
            .unwrap()
            .with_child(
                TranslucentBinder::new(Metadata::new("Part"))
                    .with_child(leaf("p1"))
                    .with_child(DocumentPointer::new("ptr", Metadata::new("Ptr")).unwrap()),
            )
            .with_child(Binder::new("ch", Metadata::new("Chapter")).unwrap().with_child(leaf("p2")))
            .into()
    }

    #[test]
    fn test_pre_order() {
        let book = sample();
        let ids: Vec<_> = book
            .flatten()
            .map(|n| n.id().unwrap_or_else(|| "subcol".to_string()))
            .collect();
        assert_eq!(ids, vec!["book", "subcol", "p1", "ptr", "ch", "p2"]);
    }

    #[test]
    fn test_documents_with_and_without_pointers() {
        let book = sample();
        let docs: Vec<_> = book.flatten_to_documents(false).filter_map(Node::id).collect();
        assert_eq!(docs, vec!["p1", "p2"]);
        let all: Vec<_> = book.flatten_to_documents(true).filter_map(Node::id).collect();
        assert_eq!(all, vec!["p1", "ptr", "p2"]);
    }

    #[test]
    fn test_restartable() {
        let book = sample();
        assert_eq!(book.flatten().count(), book.flatten().count());
    }
}
