//! Content tree -> one flattened document.

use std::collections::{HashMap, HashSet};

use super::hooks::{Hook, run_hooks};
use super::ids::{IdRegistry, generated_id};
use super::{Role, node_role};
use crate::config::FormatterConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics, Transformed};
use crate::dom::{ArenaDom, ArenaNodeId, document_xhtml, inner_html, parse_html};
use crate::error::Result;
use crate::model::{Children, Document, DocumentPointer, Metadata, Node};
use crate::render::{MetadataBlock, render_nav};
use crate::util::{escape_text, escape_xml};

const CONTENTS_PREFIX: &str = "/contents/";
const NAV_ID: &str = "toc";

/// Flatten `book` with the default configuration and no hooks.
pub fn format_single_html(book: &Node) -> Result<Transformed<String>> {
    SingleHtmlFormatter::new(book).format()
}

/// Builds the single document for one book.
#[derive(Debug)]
pub struct SingleHtmlFormatter<'a> {
    book: &'a Node,
    config: FormatterConfig,
    hooks: Vec<Hook>,
}

impl<'a> SingleHtmlFormatter<'a> {
    pub fn new(book: &'a Node) -> Self {
        Self {
            book,
            config: FormatterConfig::default(),
            hooks: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: FormatterConfig) -> Self {
        self.config = config;
        self
    }

    /// Append a hook; hooks run in the order they were added.
    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_hooks(mut self, hooks: impl IntoIterator<Item = Hook>) -> Self {
        self.hooks.extend(hooks);
        self
    }

    pub fn format(&self) -> Result<Transformed<String>> {
        let book_label = self.book.ident_hash().unwrap_or_else(|| "book".to_string());
        tracing::debug!(book = %book_label, hooks = self.hooks.len(), "formatting single document");

        let mut emitter = Emitter {
            config: &self.config,
            ids: IdRegistry::new(),
            page_anchors: HashMap::new(),
            page_ids: HashMap::new(),
        };
        emitter.ids.reserve(NAV_ID);

        let mut contents = String::new();
        if let Some(children) = self.book.children() {
            emitter.emit_children(children, &mut contents);
        }

        let html = self.assemble(&emitter, &contents);
        let mut dom = parse_html(&html);
        let body = dom.body().unwrap_or_else(|| dom.document());

        let page_uuids: HashSet<String> = emitter.page_anchors.keys().cloned().collect();
        run_hooks(&mut dom, body, &self.hooks, &page_uuids, self.config.hook_workers)?;

        let mut diagnostics = Diagnostics::new();
        rewrite_page_links(&mut dom, &emitter, &book_label, &mut diagnostics);
        Ok(Transformed::new(document_xhtml(&dom), diagnostics))
    }

    fn assemble(&self, emitter: &Emitter<'_>, contents: &str) -> String {
        let metadata = with_identifier(self.book.metadata(), self.book.ident_hash());
        let mut html = String::from(r#"<html xmlns="http://www.w3.org/1999/xhtml""#);
        if let Some(language) = &metadata.language {
            html.push_str(&format!(r#" lang="{}""#, escape_xml(language)));
        }
        html.push_str(&format!(
            "><head><title>{}</title></head>",
            escape_text(metadata.title.as_deref().unwrap_or_default())
        ));
        html.push_str(r#"<body itemscope="itemscope" itemtype="http://schema.org/Book">"#);
        html.push_str(
            &MetadataBlock::new(&metadata)
                .translucent(self.book.is_translucent())
                .resources(self.book.resources())
                .render(),
        );
        html.push_str(&render_nav(self.book, |node| {
            if node.is_binder() {
                return None;
            }
            let id = node.id()?;
            emitter
                .page_anchors
                .get(&id)
                .map(|anchor| format!("#{anchor}"))
        }));
        html.push_str(contents);
        html.push_str("</body></html>");
        html
    }
}

struct Emitter<'a> {
    config: &'a FormatterConfig,
    ids: IdRegistry,
    /// Page id (no version) -> id of its `div[data-type=page]`.
    page_anchors: HashMap<String, String>,
    /// Page id -> original element id -> id in the flattened document.
    page_ids: HashMap<String, HashMap<String, String>>,
}

impl Emitter<'_> {
    fn emit_children(&mut self, children: &Children, out: &mut String) {
        for child in children.iter() {
            self.emit_node(child, out);
        }
    }

    fn emit_node(&mut self, node: &Node, out: &mut String) {
        let role = node_role(node, false);
        match node {
            Node::Binder(_) | Node::TranslucentBinder(_) => self.emit_binder(node, role, out),
            Node::Document(document) | Node::CompositeDocument(document) => {
                self.emit_document(document, role, out)
            }
            Node::DocumentPointer(pointer) => self.emit_pointer(pointer, out),
        }
    }

    fn emit_binder(&mut self, node: &Node, role: Role, out: &mut String) {
        out.push_str(&format!(r#"<div data-type="{role}""#));
        if let Some(id) = node.id() {
            let anchor = self.ids.reserve(&format!("{role}_{id}"));
            out.push_str(&format!(r#" id="{}""#, escape_xml(&anchor)));
        }
        out.push('>');

        let metadata = with_identifier(node.metadata(), node.ident_hash());
        out.push_str(
            &MetadataBlock::new(&metadata)
                .translucent(node.is_translucent())
                .resources(node.resources())
                .render(),
        );
        out.push_str(&format!(
            r#"<h1 data-type="document-title">{}</h1>"#,
            escape_text(metadata.title.as_deref().unwrap_or_default())
        ));
        if let Some(children) = node.children() {
            self.emit_children(children, out);
        }
        out.push_str("</div>");
    }

    fn emit_document(&mut self, document: &Document, role: Role, out: &mut String) {
        let page_id = document.id();
        let anchor = self.page_anchor(&page_id);
        tracing::debug!(page = %document.ident_hash(), anchor = %anchor, "emitting page");

        let mut dom = document.resolved_dom().into_owned();
        let body = document.body();
        let mapping = if self.config.generate_ids {
            self.generate_ids(&mut dom, body, &page_id)
        } else {
            keep_ids(&dom, body)
        };
        self.page_ids.entry(page_id).or_insert(mapping);

        out.push_str(&format!(
            r#"<div data-type="{role}" id="{}""#,
            escape_xml(&anchor)
        ));
        for attr in dom.attrs(body) {
            let name = attr.name.local.as_ref();
            if name.starts_with("item") || matches!(name, "id" | "data-type") {
                continue;
            }
            out.push_str(&format!(r#" {name}="{}""#, escape_xml(&attr.value)));
        }
        out.push('>');
        let metadata = with_identifier(document.metadata(), Some(document.ident_hash()));
        out.push_str(
            &MetadataBlock::new(&metadata)
                .resources(document.resources())
                .render(),
        );
        out.push_str(&inner_html(&dom, body));
        out.push_str("</div>");
    }

    fn emit_pointer(&mut self, pointer: &DocumentPointer, out: &mut String) {
        let anchor = self.page_anchor(&pointer.id());
        let metadata = with_identifier(pointer.metadata(), Some(pointer.ident_hash()));
        out.push_str(&format!(
            r#"<div data-type="{}" id="{}">"#,
            Role::Page,
            escape_xml(&anchor)
        ));
        out.push_str(&MetadataBlock::new(&metadata).pointer(true).render());
        out.push_str(&format!(
            r#"<div><p>Click <a href="{}">here</a> to read {}.</p></div>"#,
            escape_xml(pointer.url().unwrap_or_default()),
            escape_text(metadata.title.as_deref().unwrap_or_default())
        ));
        out.push_str("</div>");
    }

    /// Reserve `page_<id>`; the first occurrence of a page is the link target.
    fn page_anchor(&mut self, page_id: &str) -> String {
        let anchor = self.ids.reserve(&format!("page_{page_id}"));
        self.page_anchors
            .entry(page_id.to_string())
            .or_insert_with(|| anchor.clone());
        anchor
    }

    /// Rename every id under `body` and fix same-page links.
    fn generate_ids(
        &mut self,
        dom: &mut ArenaDom,
        body: ArenaNodeId,
        page_id: &str,
    ) -> HashMap<String, String> {
        let mut mapping = HashMap::new();
        let with_ids: Vec<(ArenaNodeId, String)> = dom
            .descendants(body)
            .filter_map(|id| dom.element_id(id).map(|old| (id, old.to_string())))
            .collect();
        for (element, old) in with_ids {
            let new = self.ids.reserve(&generated_id(page_id, &old));
            dom.set_attr(element, "id", new.clone());
            mapping.entry(old).or_insert(new);
        }

        let links: Vec<(ArenaNodeId, String)> = dom
            .descendants(body)
            .filter(|&id| dom.is_tag(id, "a"))
            .filter_map(|id| {
                let fragment = dom.get_attr(id, "href")?.strip_prefix('#')?;
                mapping.get(fragment).map(|new| (id, format!("#{new}")))
            })
            .collect();
        for (link, href) in links {
            dom.set_attr(link, "href", href);
        }
        mapping
    }
}

fn keep_ids(dom: &ArenaDom, body: ArenaNodeId) -> HashMap<String, String> {
    dom.descendants(body)
        .filter_map(|id| dom.element_id(id))
        .map(|id| (id.to_string(), id.to_string()))
        .collect()
}

/// Metadata with the archive URI filled in from the node's identity, so the
/// identifier survives the round trip.
fn with_identifier(metadata: &Metadata, ident_hash: Option<String>) -> Metadata {
    let mut metadata = metadata.clone();
    if metadata.archive_uri.is_none() {
        metadata.archive_uri = ident_hash;
    }
    metadata
}

/// Rewrite `/contents/<uuid>[@version][#fragment]` links that target a page
/// of this book.
fn rewrite_page_links(
    dom: &mut ArenaDom,
    emitter: &Emitter<'_>,
    book_label: &str,
    diagnostics: &mut Diagnostics,
) {
    let links: Vec<(ArenaNodeId, String)> = dom
        .descendants(dom.document())
        .filter_map(|id| {
            let href = dom.get_attr(id, "href")?;
            href.starts_with(CONTENTS_PREFIX)
                .then(|| (id, href.to_string()))
        })
        .collect();

    for (link, href) in links {
        let target = &href[CONTENTS_PREFIX.len()..];
        let (path, fragment) = match target.split_once('#') {
            Some((path, fragment)) => (path, Some(fragment)),
            None => (target, None),
        };
        let uuid = path.split('@').next().unwrap_or(path);
        let owner = enclosing_page(dom, link).unwrap_or_else(|| book_label.to_string());

        let Some(anchor) = emitter.page_anchors.get(uuid) else {
            diagnostics.info(owner, DiagnosticKind::ExternalPageLink { href });
            continue;
        };
        let rewritten = match fragment {
            None | Some("") => Some(anchor.clone()),
            Some(fragment) => emitter
                .page_ids
                .get(uuid)
                .and_then(|ids| ids.get(fragment))
                .cloned(),
        };
        match rewritten {
            Some(id) => dom.set_attr(link, "href", format!("#{id}")),
            None => diagnostics.warn(owner, DiagnosticKind::UnresolvedFragment { href }),
        }
    }
}

fn enclosing_page(dom: &ArenaDom, id: ArenaNodeId) -> Option<String> {
    let mut current = dom.parent(id);
    while let Some(node) = current {
        if dom
            .get_attr(node, "data-type")
            .and_then(Role::parse)
            .is_some_and(Role::is_leaf)
        {
            return dom.element_id(node).map(str::to_string);
        }
        current = dom.parent(node);
    }
    None
}
