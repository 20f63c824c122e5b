//! Arena-based DOM for page markup.
//!
//! html5ever parses into this tree; selector matching, metadata extraction,
//! identifier rewriting and serialization all walk it. Nodes live in one
//! vector and link to each other by index. The document node is always the
//! first entry. Detached nodes stay in the arena until the DOM is dropped.

use html5ever::{LocalName, Namespace, QualName, ns};

/// Index of a node in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaNodeId(u32);

impl ArenaNodeId {
    const DOCUMENT: ArenaNodeId = ArenaNodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum ArenaNodeData {
    Document,
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
        /// Mirrors the `id` attribute; kept in sync by `set_attr`.
        id: Option<String>,
        /// Mirrors the `class` attribute.
        classes: Vec<String>,
    },
    Text(String),
    Comment(String),
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
}

/// Markup attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

impl Attribute {
    /// Attribute with no namespace, as produced for HTML elements.
    pub fn new(local: &str, value: impl Into<String>) -> Self {
        Self {
            name: QualName::new(None, ns!(), LocalName::from(local)),
            value: value.into(),
        }
    }
}

/// A node and its links into the tree.
#[derive(Debug, Clone)]
pub struct ArenaNode {
    pub data: ArenaNodeData,
    pub parent: Option<ArenaNodeId>,
    pub first_child: Option<ArenaNodeId>,
    pub last_child: Option<ArenaNodeId>,
    pub prev_sibling: Option<ArenaNodeId>,
    pub next_sibling: Option<ArenaNodeId>,
}

impl From<ArenaNodeData> for ArenaNode {
    fn from(data: ArenaNodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArenaDom {
    nodes: Vec<ArenaNode>,
}

impl Default for ArenaDom {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaDom {
    /// An empty document.
    pub fn new() -> Self {
        Self {
            nodes: vec![ArenaNode::from(ArenaNodeData::Document)],
        }
    }

    pub fn document(&self) -> ArenaNodeId {
        ArenaNodeId::DOCUMENT
    }

    pub fn get(&self, id: ArenaNodeId) -> Option<&ArenaNode> {
        self.nodes.get(id.index())
    }

    fn node_mut(&mut self, id: ArenaNodeId) -> Option<&mut ArenaNode> {
        self.nodes.get_mut(id.index())
    }

    fn push(&mut self, data: ArenaNodeData) -> ArenaNodeId {
        let id = ArenaNodeId(self.nodes.len() as u32);
        self.nodes.push(ArenaNode::from(data));
        id
    }

    /// Number of nodes ever created, detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Only the document node exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> ArenaNodeId {
        let (id, classes) = id_and_classes(&attrs);
        self.push(ArenaNodeData::Element {
            name,
            attrs,
            id,
            classes,
        })
    }

    /// An XHTML element from a tag name and attribute pairs.
    pub fn create_html_element(&mut self, local: &str, attrs: &[(&str, &str)]) -> ArenaNodeId {
        let attrs = attrs
            .iter()
            .map(|&(name, value)| Attribute::new(name, value))
            .collect();
        self.create_element(QualName::new(None, ns!(html), LocalName::from(local)), attrs)
    }

    pub fn create_text(&mut self, text: String) -> ArenaNodeId {
        self.push(ArenaNodeData::Text(text))
    }

    pub fn create_comment(&mut self, text: String) -> ArenaNodeId {
        self.push(ArenaNodeData::Comment(text))
    }

    pub fn create_doctype(&mut self, name: String, public_id: String, system_id: String) -> ArenaNodeId {
        self.push(ArenaNodeData::Doctype {
            name,
            public_id,
            system_id,
        })
    }

    /// Deep-copy a subtree of `other` into this arena. The copy is detached.
    pub fn import(&mut self, other: &ArenaDom, root: ArenaNodeId) -> ArenaNodeId {
        let data = other
            .get(root)
            .map_or(ArenaNodeData::Document, |node| node.data.clone());
        let copy = self.push(data);
        for child in other.children(root) {
            let child_copy = self.import(other, child);
            self.append(copy, child_copy);
        }
        copy
    }

    // ------------------------------------------------------------------------
    // Tree edits
    // ------------------------------------------------------------------------

    /// Move `child` to the end of `parent`'s children.
    pub fn append(&mut self, parent: ArenaNodeId, child: ArenaNodeId) {
        self.detach(child);
        let last = self.get(parent).and_then(|n| n.last_child);
        self.link(child, parent, last, None);
    }

    /// Move `new_node` to just before `sibling`. Does nothing when `sibling`
    /// is detached.
    pub fn insert_before(&mut self, sibling: ArenaNodeId, new_node: ArenaNodeId) {
        self.detach(new_node);
        let Some((parent, prev)) = self.get(sibling).and_then(|n| Some((n.parent?, n.prev_sibling)))
        else {
            return;
        };
        self.link(new_node, parent, prev, Some(sibling));
    }

    /// Append text under `parent`, extending a trailing text node if there
    /// is one.
    pub fn append_text(&mut self, parent: ArenaNodeId, text: &str) {
        let last = self.get(parent).and_then(|n| n.last_child);
        if let Some(node) = last.and_then(|id| self.node_mut(id))
            && let ArenaNodeData::Text(existing) = &mut node.data
        {
            existing.push_str(text);
            return;
        }
        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Unlink a node (with its subtree) from its parent.
    pub fn detach(&mut self, target: ArenaNodeId) {
        let Some(node) = self.get(target) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(prev) => self.set_next(prev, next),
            None => {
                if let Some(p) = self.node_mut(parent) {
                    p.first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.set_prev(next, prev),
            None => {
                if let Some(p) = self.node_mut(parent) {
                    p.last_child = prev;
                }
            }
        }
        if let Some(node) = self.node_mut(target) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Move every child of `from` to the end of `to`.
    pub fn reparent_children(&mut self, from: ArenaNodeId, to: ArenaNodeId) {
        while let Some(child) = self.get(from).and_then(|n| n.first_child) {
            self.append(to, child);
        }
    }

    /// Attach a detached `child` under `parent` between `prev` and `next`.
    fn link(
        &mut self,
        child: ArenaNodeId,
        parent: ArenaNodeId,
        prev: Option<ArenaNodeId>,
        next: Option<ArenaNodeId>,
    ) {
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        match prev {
            Some(prev) => self.set_next(prev, Some(child)),
            None => {
                if let Some(p) = self.node_mut(parent) {
                    p.first_child = Some(child);
                }
            }
        }
        match next {
            Some(next) => self.set_prev(next, Some(child)),
            None => {
                if let Some(p) = self.node_mut(parent) {
                    p.last_child = Some(child);
                }
            }
        }
    }

    fn set_next(&mut self, id: ArenaNodeId, next: Option<ArenaNodeId>) {
        if let Some(node) = self.node_mut(id) {
            node.next_sibling = next;
        }
    }

    fn set_prev(&mut self, id: ArenaNodeId, prev: Option<ArenaNodeId>) {
        if let Some(node) = self.node_mut(id) {
            node.prev_sibling = prev;
        }
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    pub fn children(&self, parent: ArenaNodeId) -> impl Iterator<Item = ArenaNodeId> + '_ {
        let first = self.get(parent).and_then(|n| n.first_child);
        std::iter::successors(first, move |&id| self.get(id).and_then(|n| n.next_sibling))
    }

    pub fn element_children(&self, parent: ArenaNodeId) -> impl Iterator<Item = ArenaNodeId> + '_ {
        self.children(parent).filter(move |&c| self.is_element(c))
    }

    /// Pre-order walk below `root` (`root` itself excluded).
    pub fn descendants(&self, root: ArenaNodeId) -> Descendants<'_> {
        Descendants {
            dom: self,
            root,
            next: self.get(root).and_then(|n| n.first_child),
        }
    }

    pub fn parent(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Whether `ancestor` strictly contains `id`.
    pub fn is_ancestor(&self, ancestor: ArenaNodeId, id: ArenaNodeId) -> bool {
        std::iter::successors(self.parent(id), |&p| self.parent(p)).any(|p| p == ancestor)
    }

    /// First node in document order satisfying `predicate`.
    pub fn find<F>(&self, predicate: F) -> Option<ArenaNodeId>
    where
        F: Fn(&ArenaNode) -> bool,
    {
        std::iter::once(self.document())
            .chain(self.descendants(self.document()))
            .find(|&id| self.get(id).is_some_and(&predicate))
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<ArenaNodeId> {
        self.find(|node| {
            matches!(&node.data, ArenaNodeData::Element { name, .. } if name.local.as_ref() == tag)
        })
    }

    pub fn get_by_id(&self, id: &str) -> Option<ArenaNodeId> {
        self.find(|node| {
            matches!(&node.data, ArenaNodeData::Element { id: Some(own), .. } if own == id)
        })
    }

    pub fn body(&self) -> Option<ArenaNodeId> {
        self.find_by_tag("body")
    }

    pub fn first_element_child(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        self.element_children(id).next()
    }

    // ------------------------------------------------------------------------
    // Elements and text
    // ------------------------------------------------------------------------

    fn qual_name(&self, id: ArenaNodeId) -> Option<&QualName> {
        match &self.get(id)?.data {
            ArenaNodeData::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn element_name(&self, id: ArenaNodeId) -> Option<&LocalName> {
        self.qual_name(id).map(|name| &name.local)
    }

    pub fn element_namespace(&self, id: ArenaNodeId) -> Option<&Namespace> {
        self.qual_name(id).map(|name| &name.ns)
    }

    pub fn is_element(&self, id: ArenaNodeId) -> bool {
        self.qual_name(id).is_some()
    }

    pub fn is_tag(&self, id: ArenaNodeId, tag: &str) -> bool {
        self.element_name(id).is_some_and(|n| n.as_ref() == tag)
    }

    /// Attributes of an element; empty for other nodes.
    pub fn attrs(&self, id: ArenaNodeId) -> &[Attribute] {
        match self.get(id).map(|n| &n.data) {
            Some(ArenaNodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn get_attr(&self, id: ArenaNodeId, attr_name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.as_str())
    }

    /// Set or add an attribute.
    pub fn set_attr(&mut self, id: ArenaNodeId, attr_name: &str, value: impl Into<String>) {
        let value = value.into();
        self.edit_attrs(id, |attrs| {
            match attrs.iter_mut().find(|a| a.name.local.as_ref() == attr_name) {
                Some(existing) => existing.value = value,
                None => attrs.push(Attribute::new(attr_name, value)),
            }
        });
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, id: ArenaNodeId, attr_name: &str) -> Option<String> {
        self.edit_attrs(id, |attrs| {
            let pos = attrs.iter().position(|a| a.name.local.as_ref() == attr_name)?;
            Some(attrs.remove(pos).value)
        })
        .flatten()
    }

    /// Run `edit` on an element's attributes and refresh the mirrored id and
    /// classes. `None` for non-elements.
    fn edit_attrs<R>(&mut self, id: ArenaNodeId, edit: impl FnOnce(&mut Vec<Attribute>) -> R) -> Option<R> {
        let ArenaNodeData::Element {
            attrs,
            id: own_id,
            classes,
            ..
        } = &mut self.node_mut(id)?.data
        else {
            return None;
        };
        let result = edit(&mut *attrs);
        (*own_id, *classes) = id_and_classes(attrs);
        Some(result)
    }

    pub fn element_id(&self, id: ArenaNodeId) -> Option<&str> {
        match &self.get(id)?.data {
            ArenaNodeData::Element { id, .. } => id.as_deref(),
            _ => None,
        }
    }

    pub fn element_classes(&self, id: ArenaNodeId) -> &[String] {
        match self.get(id).map(|n| &n.data) {
            Some(ArenaNodeData::Element { classes, .. }) => classes,
            _ => &[],
        }
    }

    /// Contents of a text node.
    pub fn text_content(&self, id: ArenaNodeId) -> Option<&str> {
        match &self.get(id)?.data {
            ArenaNodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Concatenated text of a node and its descendants.
    pub fn text(&self, id: ArenaNodeId) -> String {
        std::iter::once(id)
            .chain(self.descendants(id))
            .filter_map(|d| self.text_content(d))
            .collect()
    }
}

fn id_and_classes(attrs: &[Attribute]) -> (Option<String>, Vec<String>) {
    let value = |key: &str| {
        attrs
            .iter()
            .find(|a| a.name.local.as_ref() == key)
            .map(|a| a.value.as_str())
    };
    let classes = value("class")
        .map(|v| v.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    (value("id").map(str::to_string), classes)
}

/// Pre-order iterator that follows sibling and parent links, so it needs no
/// stack.
pub struct Descendants<'a> {
    dom: &'a ArenaDom,
    root: ArenaNodeId,
    next: Option<ArenaNodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = ArenaNodeId;

    fn next(&mut self) -> Option<ArenaNodeId> {
        let id = self.next?;
        self.next = self.following(id);
        Some(id)
    }
}

impl Descendants<'_> {
    fn following(&self, id: ArenaNodeId) -> Option<ArenaNodeId> {
        let node = self.dom.get(id)?;
        if node.first_child.is_some() {
            return node.first_child;
        }
        let mut current = id;
        while current != self.root {
            let node = self.dom.get(current)?;
            if node.next_sibling.is_some() {
                return node.next_sibling;
            }
            current = node.parent?;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_elements() {
        let mut dom = ArenaDom::new();
        assert!(dom.is_empty());

        let div = dom.create_html_element("div", &[("id", "main")]);
        dom.append(dom.document(), div);

        assert_eq!(dom.element_name(div).unwrap().as_ref(), "div");
        assert_eq!(dom.element_namespace(div), Some(&ns!(html)));
        assert_eq!(dom.element_id(div), Some("main"));
        assert_eq!(dom.get_by_id("main"), Some(div));
        assert_eq!(dom.len(), 2);
    }

    #[test]
    fn test_append_and_detach() {
        let mut dom = ArenaDom::new();

        let parent = dom.create_html_element("div", &[]);
        let [a, b, c] = ["a", "b", "c"].map(|id| dom.create_html_element("p", &[("id", id)]));
        dom.append(dom.document(), parent);
        for child in [a, b, c] {
            dom.append(parent, child);
        }

        dom.detach(b);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(dom.parent(b), None);

        dom.insert_before(a, b);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![b, a, c]);

        // Appending an attached node moves it.
        dom.append(parent, b);
        assert_eq!(dom.children(parent).collect::<Vec<_>>(), vec![a, c, b]);
        dom.detach(b);
        dom.detach(c);
        assert_eq!(dom.get(parent).unwrap().last_child, Some(a));
    }

    #[test]
    fn test_reparent_children() {
        let mut dom = ArenaDom::new();
        let from = dom.create_html_element("div", &[]);
        let to = dom.create_html_element("section", &[]);
        dom.append(dom.document(), from);
        dom.append(dom.document(), to);
        dom.append_text(from, "one");
        let em = dom.create_html_element("em", &[]);
        dom.append(from, em);

        dom.reparent_children(from, to);
        assert_eq!(dom.children(from).count(), 0);
        assert_eq!(dom.children(to).count(), 2);
        assert_eq!(dom.text(to), "one");
    }

    #[test]
    fn test_text_merging() {
        let mut dom = ArenaDom::new();

        let p = dom.create_html_element("p", &[]);
        dom.append(dom.document(), p);

        dom.append_text(p, "Hello, ");
        dom.append_text(p, "World!");

        let children: Vec<_> = dom.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(dom.text_content(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_set_attr_updates_cache() {
        let mut dom = ArenaDom::new();
        let p = dom.create_html_element("p", &[("id", "old"), ("class", "a b")]);
        dom.append(dom.document(), p);

        dom.set_attr(p, "id", "new");
        dom.set_attr(p, "class", "c");
        assert_eq!(dom.element_id(p), Some("new"));
        assert_eq!(dom.element_classes(p), &["c".to_string()]);
        assert_eq!(dom.get_by_id("old"), None);

        assert_eq!(dom.remove_attr(p, "id").as_deref(), Some("new"));
        assert_eq!(dom.element_id(p), None);
        assert_eq!(dom.remove_attr(p, "id"), None);
        assert_eq!(dom.remove_attr(dom.document(), "id"), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut dom = ArenaDom::new();
        let root = dom.create_html_element("div", &[]);
        let a = dom.create_html_element("a", &[]);
        let a1 = dom.create_html_element("b", &[]);
        let b = dom.create_html_element("c", &[]);
        let after = dom.create_html_element("d", &[]);
        dom.append(dom.document(), root);
        dom.append(dom.document(), after);
        dom.append(root, a);
        dom.append(a, a1);
        dom.append(root, b);

        let order: Vec<_> = dom.descendants(root).collect();
        assert_eq!(order, vec![a, a1, b]);
        assert_eq!(dom.descendants(a1).count(), 0);
        assert!(dom.is_ancestor(root, a1));
        assert!(!dom.is_ancestor(a, b));
    }

    #[test]
    fn test_import_subtree() {
        let mut src = ArenaDom::new();
        let p = src.create_html_element("p", &[("id", "x")]);
        src.append(src.document(), p);
        src.append_text(p, "hi");

        let mut dst = ArenaDom::new();
        let copy = dst.import(&src, p);
        assert_eq!(dst.parent(copy), None);
        dst.append(dst.document(), copy);
        assert_eq!(dst.element_id(copy), Some("x"));
        assert_eq!(dst.text(copy), "hi");
    }
}
