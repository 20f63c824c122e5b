//! The content tree: binders and leaves.

use super::document::{Document, DocumentPointer};
use super::flatten::Flatten;
use super::ident::Ident;
use super::metadata::Metadata;
use super::resource::Resource;
use crate::error::Result;

/// Tree id reported for binders without a persistent identifier.
pub const TRANSLUCENT_BINDER_ID: &str = "subcol";

/// Ordered child nodes, each with an optional title override.
///
/// Both sequences always have the same length.
#[derive(Debug, Clone, Default)]
pub struct Children {
    nodes: Vec<Node>,
    title_overrides: Vec<Option<String>>,
}

impl Children {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.nodes.push(node.into());
        self.title_overrides.push(None);
    }

    /// Append with a title override (markup) that replaces the child's own
    /// title in this parent's navigation.
    pub fn push_with_title(&mut self, node: impl Into<Node>, title: Option<String>) {
        self.nodes.push(node.into());
        self.title_overrides.push(title);
    }

    /// Insert at `index`; panics when `index > len`, like `Vec::insert`.
    pub fn insert(&mut self, index: usize, node: impl Into<Node>) {
        self.nodes.insert(index, node.into());
        self.title_overrides.insert(index, None);
    }

    /// Remove and return the child at `index` with its override.
    pub fn remove(&mut self, index: usize) -> (Node, Option<String>) {
        (self.nodes.remove(index), self.title_overrides.remove(index))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }

    /// Children paired with their title overrides.
    pub fn with_titles(&self) -> impl Iterator<Item = (&Node, Option<&str>)> {
        self.nodes
            .iter()
            .zip(self.title_overrides.iter().map(Option::as_deref))
    }

    pub fn title_override(&self, index: usize) -> Option<&str> {
        self.title_overrides.get(index).and_then(Option::as_deref)
    }

    /// Set or clear the override of the child at `index`. Out-of-range
    /// indexes are ignored.
    pub fn set_title_override(&mut self, index: usize, title: Option<String>) {
        if let Some(slot) = self.title_overrides.get_mut(index) {
            *slot = title;
        }
    }

    /// Title shown for the child at `index`: the override, else the child's
    /// own title.
    pub fn title_for(&self, index: usize) -> Option<String> {
        match self.title_override(index) {
            Some(title) => Some(title.to_string()),
            None => self.nodes.get(index).and_then(|n| n.title().map(str::to_string)),
        }
    }
}

impl<'a> IntoIterator for &'a Children {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// A persisted container of nodes (book, unit, chapter).
#[derive(Debug, Clone)]
pub struct Binder {
    ident: Ident,
    pub metadata: Metadata,
    pub children: Children,
    /// Resources referenced by the binder's navigation document.
    pub resources: Vec<Resource>,
}

impl Binder {
    pub fn new(id: &str, metadata: Metadata) -> Result<Self> {
        Ok(Self {
            ident: Ident::parse(id)?,
            metadata,
            children: Children::new(),
            resources: Vec::new(),
        })
    }

    pub fn with_child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node);
        self
    }

    pub fn ident(&self) -> &Ident {
        &self.ident
    }

    pub fn id(&self) -> String {
        self.ident.id()
    }

    pub fn ident_hash(&self) -> String {
        self.ident.ident_hash()
    }

    pub fn set_id(&mut self, value: &str) -> Result<()> {
        self.ident.set(value)
    }
}

/// A grouping without its own identity; it only contributes a title.
#[derive(Debug, Clone, Default)]
pub struct TranslucentBinder {
    pub metadata: Metadata,
    pub children: Children,
}

impl TranslucentBinder {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            children: Children::new(),
        }
    }

    pub fn with_child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node);
        self
    }
}

/// Any node of the content tree.
#[derive(Debug, Clone)]
pub enum Node {
    Binder(Binder),
    TranslucentBinder(TranslucentBinder),
    Document(Document),
    /// A page produced by collation.
    CompositeDocument(Document),
    DocumentPointer(DocumentPointer),
}

impl Node {
    /// Persistent identity; translucent binders have none.
    pub fn ident(&self) -> Option<&Ident> {
        match self {
            Node::Binder(b) => Some(b.ident()),
            Node::TranslucentBinder(_) => None,
            Node::Document(d) | Node::CompositeDocument(d) => Some(d.ident()),
            Node::DocumentPointer(p) => Some(p.ident()),
        }
    }

    pub fn id(&self) -> Option<String> {
        self.ident().map(Ident::id)
    }

    pub fn ident_hash(&self) -> Option<String> {
        self.ident().map(Ident::ident_hash)
    }

    /// Replace the identifier. A no-op on translucent binders.
    pub fn set_id(&mut self, value: &str) -> Result<()> {
        match self {
            Node::Binder(b) => b.set_id(value),
            Node::TranslucentBinder(_) => Ok(()),
            Node::Document(d) | Node::CompositeDocument(d) => d.set_id(value),
            Node::DocumentPointer(p) => p.set_id(value),
        }
    }

    pub fn metadata(&self) -> &Metadata {
        match self {
            Node::Binder(b) => &b.metadata,
            Node::TranslucentBinder(t) => &t.metadata,
            Node::Document(d) | Node::CompositeDocument(d) => d.metadata(),
            Node::DocumentPointer(p) => p.metadata(),
        }
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        match self {
            Node::Binder(b) => &mut b.metadata,
            Node::TranslucentBinder(t) => &mut t.metadata,
            Node::Document(d) | Node::CompositeDocument(d) => d.metadata_mut(),
            Node::DocumentPointer(p) => p.metadata_mut(),
        }
    }

    /// The node's intrinsic title.
    pub fn title(&self) -> Option<&str> {
        self.metadata().title.as_deref()
    }

    pub fn children(&self) -> Option<&Children> {
        match self {
            Node::Binder(b) => Some(&b.children),
            Node::TranslucentBinder(t) => Some(&t.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Children> {
        match self {
            Node::Binder(b) => Some(&mut b.children),
            Node::TranslucentBinder(t) => Some(&mut t.children),
            _ => None,
        }
    }

    pub fn is_binder(&self) -> bool {
        matches!(self, Node::Binder(_) | Node::TranslucentBinder(_))
    }

    pub fn is_translucent(&self) -> bool {
        matches!(self, Node::TranslucentBinder(_))
    }

    /// The page behind a document or composite document.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Node::Document(d) | Node::CompositeDocument(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Document> {
        match self {
            Node::Document(d) | Node::CompositeDocument(d) => Some(d),
            _ => None,
        }
    }

    /// Resources bound to this node.
    pub fn resources(&self) -> &[Resource] {
        match self {
            Node::Binder(b) => &b.resources,
            Node::Document(d) | Node::CompositeDocument(d) => d.resources(),
            Node::TranslucentBinder(_) | Node::DocumentPointer(_) => &[],
        }
    }

    /// Pre-order walk over this node and all of its descendants.
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten::new(self)
    }

    /// Document-like leaves in pre-order, optionally including pointers.
    pub fn flatten_to_documents(&self, include_pointers: bool) -> impl Iterator<Item = &Node> {
        self.flatten().filter(move |node| match node {
            Node::Document(_) | Node::CompositeDocument(_) => true,
            Node::DocumentPointer(_) => include_pointers,
            _ => false,
        })
    }

    /// Visit every document and composite document in pre-order.
    pub fn for_each_document_mut<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Document) -> Result<()>,
    {
        fn walk<F>(node: &mut Node, visit: &mut F) -> Result<()>
        where
            F: FnMut(&mut Document) -> Result<()>,
        {
            match node {
                Node::Document(d) | Node::CompositeDocument(d) => visit(d),
                Node::Binder(Binder { children, .. })
                | Node::TranslucentBinder(TranslucentBinder { children, .. }) => {
                    for child in children.nodes_mut() {
                        walk(child, visit)?;
                    }
                    Ok(())
                }
                Node::DocumentPointer(_) => Ok(()),
            }
        }
        walk(self, &mut visit)
    }
}

impl From<Binder> for Node {
    fn from(binder: Binder) -> Self {
        Node::Binder(binder)
    }
}

impl From<TranslucentBinder> for Node {
    fn from(binder: TranslucentBinder) -> Self {
        Node::TranslucentBinder(binder)
    }
}

impl From<Document> for Node {
    fn from(document: Document) -> Self {
        Node::Document(document)
    }
}

impl From<DocumentPointer> for Node {
    fn from(pointer: DocumentPointer) -> Self {
        Node::DocumentPointer(pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, title: &str) -> Document {
        Document::new(id, "<p>x</p>")
            .unwrap()
            .with_metadata(Metadata::new(title))
    }

    #[test]
    fn test_children_keep_overrides_in_lockstep() {
        let mut children = Children::new();
        children.push(page("a", "A"));
        children.push_with_title(page("b", "B"), Some("Bee".to_string()));
        children.insert(0, page("c", "C"));
        assert_eq!(children.len(), 3);
        assert_eq!(children.title_for(0).as_deref(), Some("C"));
        assert_eq!(children.title_for(2).as_deref(), Some("Bee"));

        let (removed, title) = children.remove(2);
        assert_eq!(removed.id().as_deref(), Some("b"));
        assert_eq!(title.as_deref(), Some("Bee"));

        children.set_title_override(1, Some("Ay".to_string()));
        children.set_title_override(7, Some("ignored".to_string()));
        let titles: Vec<_> = children.with_titles().map(|(_, t)| t).collect();
        assert_eq!(titles, vec![None, Some("Ay")]);
    }

    #[test]
    fn test_translucent_has_no_identity() {
        let mut node = Node::from(TranslucentBinder::new(Metadata::new("Part")));
        assert_eq!(node.ident_hash(), None);
        node.set_id("ignored").unwrap();
        assert_eq!(node.id(), None);
        assert_eq!(node.title(), Some("Part"));
    }

    #[test]
    fn test_for_each_document_mut_visits_leaves() {
        let mut book = Node::from(
            Binder::new("book@1", Metadata::new("Book"))
                .unwrap()
                .with_child(TranslucentBinder::new(Metadata::new("Part")).with_child(page("p1", "One")))
                .with_child(page("p2", "Two")),
        );
        let mut seen = Vec::new();
        book.for_each_document_mut(|doc| {
            seen.push(doc.id());
            doc.metadata_mut().language = Some("en".to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["p1", "p2"]);
        assert!(
            book.flatten_to_documents(false)
                .all(|n| n.metadata().language.as_deref() == Some("en"))
        );
    }
}
