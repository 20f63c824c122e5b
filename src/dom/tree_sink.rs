//! Page markup -> [`ArenaDom`] through html5ever's tree builder.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};

use html5ever::driver::ParseOpts;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{QualName, parse_document};

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId, Attribute};

/// Parse a complete markup document.
///
/// html5ever always synthesizes `html`, `head` and `body`, so fragments
/// such as `<body class="x">...</body>` or bare `<p>` content parse into a
/// full document whose body holds the content.
pub fn parse_html(html: &str) -> ArenaDom {
    let sink = parse_document(PageSink::default(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes());
    if sink.errors.get() > 0 {
        tracing::trace!(errors = sink.errors.get(), "lenient parse recovered from markup errors");
    }
    sink.dom.into_inner()
}

/// Builder state. Tree-builder callbacks take `&self`, hence the cells.
#[derive(Default)]
pub(crate) struct PageSink {
    dom: RefCell<ArenaDom>,
    errors: Cell<usize>,
}

impl PageSink {
    fn node(&self, child: NodeOrText<ArenaNodeId>) -> ArenaNodeId {
        match child {
            NodeOrText::AppendNode(id) => id,
            NodeOrText::AppendText(text) => self.dom.borrow_mut().create_text(text.to_string()),
        }
    }

    fn append_child(&self, parent: ArenaNodeId, child: NodeOrText<ArenaNodeId>) {
        if let NodeOrText::AppendText(text) = &child {
            self.dom.borrow_mut().append_text(parent, text);
            return;
        }
        let node = self.node(child);
        self.dom.borrow_mut().append(parent, node);
    }
}

impl TreeSink for PageSink {
    type Handle = ArenaNodeId;
    type Output = Self;
    type ElemName<'a>
        = &'a QualName
    where
        Self: 'a;

    fn finish(self) -> Self {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        self.errors.set(self.errors.get() + 1);
    }

    fn get_document(&self) -> ArenaNodeId {
        self.dom.borrow().document()
    }

    fn elem_name<'a>(&'a self, target: &'a ArenaNodeId) -> &'a QualName {
        static NO_NAME: QualName = QualName {
            prefix: None,
            ns: html5ever::ns!(),
            local: html5ever::local_name!(""),
        };
        let dom = self.dom.borrow();
        match dom.get(*target).map(|n| &n.data) {
            // SAFETY: element names are never rewritten and arena nodes are
            // never freed while the sink lives, so the name outlives the
            // released `RefCell` guard.
            Some(ArenaNodeData::Element { name, .. }) => unsafe {
                std::mem::transmute::<&QualName, &'a QualName>(name)
            },
            _ => &NO_NAME,
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: ElementFlags,
    ) -> ArenaNodeId {
        let attrs = attrs
            .into_iter()
            .map(|a| Attribute {
                name: a.name,
                value: a.value.to_string(),
            })
            .collect();
        self.dom.borrow_mut().create_element(name, attrs)
    }

    fn create_comment(&self, text: StrTendril) -> ArenaNodeId {
        self.dom.borrow_mut().create_comment(text.to_string())
    }

    /// Processing instructions are kept as comments.
    fn create_pi(&self, target: StrTendril, data: StrTendril) -> ArenaNodeId {
        self.dom
            .borrow_mut()
            .create_comment(format!("?{target} {data}?"))
    }

    fn append(&self, parent: &ArenaNodeId, child: NodeOrText<ArenaNodeId>) {
        self.append_child(*parent, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &ArenaNodeId,
        prev_element: &ArenaNodeId,
        child: NodeOrText<ArenaNodeId>,
    ) {
        let parent = self.dom.borrow().parent(*element);
        self.append_child(parent.unwrap_or(*prev_element), child);
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        let mut dom = self.dom.borrow_mut();
        let doctype =
            dom.create_doctype(name.to_string(), public_id.to_string(), system_id.to_string());
        let document = dom.document();
        dom.append(document, doctype);
    }

    /// Template content stays inline under the template element.
    fn get_template_contents(&self, target: &ArenaNodeId) -> ArenaNodeId {
        *target
    }

    fn same_node(&self, x: &ArenaNodeId, y: &ArenaNodeId) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn append_before_sibling(&self, sibling: &ArenaNodeId, new_node: NodeOrText<ArenaNodeId>) {
        let node = self.node(new_node);
        self.dom.borrow_mut().insert_before(*sibling, node);
    }

    fn add_attrs_if_missing(&self, target: &ArenaNodeId, attrs: Vec<html5ever::Attribute>) {
        let mut dom = self.dom.borrow_mut();
        for attr in attrs {
            if dom.get_attr(*target, &attr.name.local).is_none() {
                dom.set_attr(*target, &attr.name.local, attr.value.to_string());
            }
        }
    }

    fn remove_from_parent(&self, target: &ArenaNodeId) {
        self.dom.borrow_mut().detach(*target);
    }

    fn reparent_children(&self, node: &ArenaNodeId, new_parent: &ArenaNodeId) {
        self.dom.borrow_mut().reparent_children(*node, *new_parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let dom = parse_html("<html><body><p>Hello</p></body></html>");

        let p = dom.find_by_tag("p").expect("should find p");
        let text_id = dom.children(p).next().expect("p should have child");
        assert_eq!(dom.text_content(text_id), Some("Hello"));
    }

    #[test]
    fn test_body_fragment_keeps_attributes() {
        let dom = parse_html(r#"<body class="fruity" data-x="1"><p id="a">x</p></body>"#);
        let body = dom.body().expect("body");
        assert_eq!(dom.get_attr(body, "class"), Some("fruity"));
        assert_eq!(dom.get_attr(body, "data-x"), Some("1"));
        assert!(dom.get_by_id("a").is_some());
    }

    #[test]
    fn test_bare_content_lands_in_body() {
        let dom = parse_html("<p>one</p><p>two</p>");
        let body = dom.body().expect("body");
        assert_eq!(dom.element_children(body).count(), 2);
    }

    #[test]
    fn test_misnested_markup_recovers() {
        let dom = parse_html("<div><p>unterminated<div>next</div>");
        let divs = dom
            .descendants(dom.document())
            .filter(|&n| dom.is_tag(n, "div"))
            .count();
        assert_eq!(divs, 2);
    }

    #[test]
    fn test_adjacent_text_merges() {
        let dom = parse_html("<p>one &amp; two<!-- c --> three</p>");
        let p = dom.find_by_tag("p").unwrap();
        let texts: Vec<&str> = dom.children(p).filter_map(|c| dom.text_content(c)).collect();
        assert_eq!(texts, vec!["one & two", " three"]);
    }
}
