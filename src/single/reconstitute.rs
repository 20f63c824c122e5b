//! One flattened document -> content tree.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

use super::Role;
use super::ids::{IdRegistry, local_id};
use crate::config::ReconstituteConfig;
use crate::diagnostics::{DiagnosticKind, Diagnostics, Transformed};
use crate::dom::{ArenaDom, ArenaNodeId, outer_html, parse_html};
use crate::error::{Error, Result};
use crate::extract::{
    MetadataContext, MetadataParser, NavItem, is_document_pointer, parse_navigation,
};
use crate::model::{
    Binder, Children, Document, DocumentPointer, Ident, Metadata, Node, TranslucentBinder,
};
use crate::util::{escape_text, escape_xml};

const DEFAULT_BOOK_ID: &str = "book";
const SHORT_ID_LEN: usize = 8;

/// Rebuild a tree with the default configuration.
pub fn reconstitute(html: &str) -> Result<Transformed<Node>> {
    reconstitute_with(html, &ReconstituteConfig::default())
}

/// Rebuild a tree from a document produced by the single-document formatter
/// (or by a collation engine working on one).
///
/// The `nav#toc` fixes how many structural children each level must have;
/// a mismatch is fatal, as is an unknown `data-type` role.
pub fn reconstitute_with(html: &str, config: &ReconstituteConfig) -> Result<Transformed<Node>> {
    let dom = parse_html(html);
    let body = dom
        .body()
        .ok_or_else(|| Error::InvalidPackage("document has no <body>".to_string()))?;

    let block = metadata_block(&dom, body);
    let mut metadata = MetadataParser::new(&dom, block.unwrap_or(body), MetadataContext::Reconstituted)
        .with_label(DEFAULT_BOOK_ID)
        .parse()?;
    let book_id = metadata
        .archive_uri
        .clone()
        .unwrap_or_else(|| DEFAULT_BOOK_ID.to_string());
    let book_ident = Ident::parse(&book_id)?;
    let ancestor = Uuid::parse_str(&book_ident.id()).ok();
    if metadata.short_id.is_none() {
        metadata.short_id = ancestor.as_ref().map(short_id);
    }
    tracing::debug!(book = %book_id, "reconstituting single document");

    let navigation = parse_navigation(&dom)?;
    if metadata.title.is_none() {
        metadata.title = Some(navigation.title.clone());
    }

    let mut builder = Builder {
        dom: &dom,
        config,
        version: book_ident.version().map(str::to_string),
        id_map: HashMap::new(),
    };
    let children = builder.children(body, &navigation.items, ancestor, &book_id)?;

    let mut book = Binder::new(&book_id, metadata)?;
    book.children = children;
    let mut book = Node::from(book);

    let mut diagnostics = Diagnostics::new();
    if config.fix_generated_ids {
        let id_map = builder.id_map;
        book.for_each_document_mut(|document| {
            rewrite_fragment_links(document, &id_map, &mut diagnostics);
            Ok(())
        })?;
    }
    Ok(Transformed::new(book, diagnostics))
}

/// Where an id of the flattened document lives after reconstitution.
#[derive(Debug, Clone)]
struct IdTarget {
    page: String,
    /// `None` for the page element itself.
    id: Option<String>,
}

struct Builder<'a> {
    dom: &'a ArenaDom,
    config: &'a ReconstituteConfig,
    version: Option<String>,
    /// Flattened-document id -> page and restored id.
    id_map: HashMap<String, IdTarget>,
}

impl Builder<'_> {
    fn children(
        &mut self,
        container: ArenaNodeId,
        entries: &[NavItem],
        ancestor: Option<Uuid>,
        label: &str,
    ) -> Result<Children> {
        let structural = self.structural_children(container, label)?;
        if structural.len() != entries.len() {
            return Err(Error::ChildCountMismatch {
                node: label.to_string(),
                expected: entries.len(),
                found: structural.len(),
            });
        }

        let mut children = Children::new();
        for ((element, role), entry) in structural.into_iter().zip(entries) {
            let node = if role.is_leaf() {
                self.leaf(element, role, entry, ancestor, label)?
            } else {
                self.binder(element, entry, ancestor)?
            };
            let intrinsic = escape_text(node.title().unwrap_or_default());
            let title = (intrinsic != entry.title).then(|| entry.title.clone());
            children.push_with_title(node, title);
        }
        Ok(children)
    }

    /// Direct children of `container` that carry a structural role.
    fn structural_children(&self, container: ArenaNodeId, label: &str) -> Result<Vec<(ArenaNodeId, Role)>> {
        let dom = self.dom;
        let mut found = Vec::new();
        for child in dom.element_children(container) {
            if !dom.is_tag(child, "div") {
                continue;
            }
            let Some(data_type) = dom.get_attr(child, "data-type") else {
                continue;
            };
            if data_type == "metadata" {
                continue;
            }
            match Role::parse(data_type) {
                Some(Role::Book) | None => {
                    return Err(Error::UnknownStructuralRole {
                        role: data_type.to_string(),
                        node: label.to_string(),
                    });
                }
                Some(role) => found.push((child, role)),
            }
        }
        Ok(found)
    }

    fn binder(&mut self, element: ArenaNodeId, entry: &NavItem, ancestor: Option<Uuid>) -> Result<Node> {
        let dom = self.dom;
        let mut metadata = match metadata_block(dom, element) {
            Some(block) => MetadataParser::new(dom, block, MetadataContext::Reconstituted)
                .lenient()
                .parse()?,
            None => Metadata::default(),
        };
        if metadata.title.is_none() {
            metadata.title = dom
                .element_children(element)
                .find(|&c| dom.get_attr(c, "data-type") == Some("document-title"))
                .map(|c| dom.text(c))
                .or_else(|| Some(markup_text(&entry.title)));
        }
        let entries = entry.contents.as_deref().unwrap_or_default();
        let label = metadata.title.clone().unwrap_or_default();

        if let Some(uri) = metadata.archive_uri.clone() {
            let own = Uuid::parse_str(&Ident::parse(&uri)?.id()).ok();
            if metadata.short_id.is_none() {
                metadata.short_id = own.as_ref().map(short_id);
            }
            let mut binder = Binder::new(&uri, metadata)?;
            binder.children = self.children(element, entries, own.or(ancestor), &uri)?;
            return Ok(binder.into());
        }

        match ancestor.filter(|_| self.config.derive_identifiers) {
            Some(ancestor) => {
                let uuid = self.derive_uuid(element, &ancestor, &label);
                let id = self.versioned(&uuid);
                metadata.short_id = Some(short_id(&uuid));
                tracing::debug!(binder = %id, title = %label, "derived binder identifier");
                let mut binder = Binder::new(&id, metadata)?;
                binder.children = self.children(element, entries, Some(uuid), &id)?;
                Ok(binder.into())
            }
            None => {
                let mut binder = TranslucentBinder::new(metadata);
                binder.children = self.children(element, entries, ancestor, &label)?;
                Ok(binder.into())
            }
        }
    }

    fn leaf(
        &mut self,
        element: ArenaNodeId,
        role: Role,
        entry: &NavItem,
        ancestor: Option<Uuid>,
        parent: &str,
    ) -> Result<Node> {
        let dom = self.dom;
        let block = metadata_block(dom, element);
        let source = block.unwrap_or(element);
        let label = dom
            .element_id(element)
            .map(str::to_string)
            .unwrap_or_else(|| markup_text(&entry.title));

        if is_document_pointer(dom, source) {
            let metadata = MetadataParser::new(dom, source, MetadataContext::Pointer)
                .with_label(&label)
                .parse()?;
            let ident_hash = metadata.archive_uri.clone().unwrap_or_default();
            let url = dom
                .descendants(element)
                .filter(|&id| dom.is_tag(id, "a"))
                .filter(|&id| !block.is_some_and(|b| dom.is_ancestor(b, id)))
                .find_map(|id| dom.get_attr(id, "href"));
            let mut pointer = DocumentPointer::new(&ident_hash, metadata)?;
            if let Some(url) = url {
                pointer = pointer.with_url(url);
            }
            if let Some(anchor) = dom.element_id(element) {
                self.register(anchor, &ident_hash, None);
            }
            return Ok(pointer.into());
        }

        let metadata = MetadataParser::new(dom, source, MetadataContext::Reconstituted)
            .with_label(&label)
            .parse()?;
        let anchored = dom
            .element_id(element)
            .and_then(|anchor| anchor.strip_prefix("page_"))
            .map(str::to_string);
        let id = match (&metadata.archive_uri, anchored) {
            (Some(uri), _) => uri.clone(),
            (None, Some(id)) => id,
            // Added by a collation engine: never persisted, so give it an
            // identifier derived from where it sits in the book.
            (None, None) => {
                let base = ancestor
                    .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_URL, parent.as_bytes()));
                let title = metadata.title.clone().unwrap_or_else(|| label.clone());
                let id = self.versioned(&self.derive_uuid(element, &base, &title));
                tracing::debug!(page = %id, title = %title, "derived page identifier");
                id
            }
        };

        let mut content = String::from("<body");
        for attr in dom.attrs(element) {
            let name = attr.name.local.as_ref();
            if name.starts_with("item") || matches!(name, "id" | "data-type") {
                continue;
            }
            content.push_str(&format!(r#" {name}="{}""#, escape_xml(&attr.value)));
        }
        content.push('>');
        for child in dom.children(element) {
            if Some(child) != block {
                content.push_str(&outer_html(dom, child));
            }
        }
        content.push_str("</body>");

        let mut document = Document::new(&id, &content)?.with_metadata(metadata);
        let page = document.ident_hash();
        if let Some(anchor) = dom.element_id(element) {
            self.register(anchor, &page, None);
        }
        if self.config.fix_generated_ids {
            let restored = document.edit_content(|dom, body| restore_ids(dom, body));
            for (old, new) in restored {
                self.register(&old, &page, Some(new));
            }
        }

        Ok(match role {
            Role::CompositePage => Node::CompositeDocument(document),
            _ => Node::Document(document),
        })
    }

    /// UUID5 under `base`, keyed on `data-uuid-key`, else `class`, else the
    /// title.
    fn derive_uuid(&self, element: ArenaNodeId, base: &Uuid, title: &str) -> Uuid {
        let key = self
            .dom
            .get_attr(element, "data-uuid-key")
            .or_else(|| self.dom.get_attr(element, "class"))
            .unwrap_or(title);
        Uuid::new_v5(base, key.as_bytes())
    }

    fn versioned(&self, uuid: &Uuid) -> String {
        match &self.version {
            Some(version) => format!("{uuid}@{version}"),
            None => uuid.to_string(),
        }
    }

    fn register(&mut self, old: &str, page: &str, id: Option<String>) {
        self.id_map.entry(old.to_string()).or_insert(IdTarget {
            page: page.to_string(),
            id,
        });
    }
}

/// Strip `auto_<page>_` prefixes, suffixing ids that then collide within
/// the page. Returns `(flattened id, restored id)` pairs.
fn restore_ids(dom: &mut ArenaDom, body: ArenaNodeId) -> Vec<(String, String)> {
    let mut local = IdRegistry::new();
    let with_ids: Vec<(ArenaNodeId, String)> = dom
        .descendants(body)
        .filter_map(|id| dom.element_id(id).map(|old| (id, old.to_string())))
        .collect();
    let mut restored = Vec::with_capacity(with_ids.len());
    for (element, old) in with_ids {
        let new = local.reserve(local_id(&old).unwrap_or(&old));
        if new != old {
            dom.set_attr(element, "id", new.clone());
        }
        restored.push((old, new));
    }
    restored
}

/// Point `#fragment` links back at the page and id they target.
fn rewrite_fragment_links(
    document: &mut Document,
    id_map: &HashMap<String, IdTarget>,
    diagnostics: &mut Diagnostics,
) {
    let page = document.ident_hash();
    let mut unresolved = Vec::new();
    document.edit_content(|dom, body| {
        let links: Vec<(ArenaNodeId, String)> = dom
            .descendants(body)
            .filter(|&id| dom.is_tag(id, "a"))
            .filter_map(|id| {
                let fragment = dom.get_attr(id, "href")?.strip_prefix('#')?;
                Some((id, fragment.to_string()))
            })
            .filter(|(_, fragment)| !fragment.is_empty())
            .collect();
        for (link, fragment) in links {
            let href = match id_map.get(&fragment) {
                Some(IdTarget { page: target, id }) if *target == page => match id {
                    Some(id) => format!("#{id}"),
                    None => format!("/contents/{page}"),
                },
                Some(IdTarget { page: target, id }) => match id {
                    Some(id) => format!("/contents/{target}#{id}"),
                    None => format!("/contents/{target}"),
                },
                None => {
                    unresolved.push(format!("#{fragment}"));
                    continue;
                }
            };
            dom.set_attr(link, "href", href);
        }
    });
    for href in unresolved {
        diagnostics.warn(page.clone(), DiagnosticKind::UnresolvedLink { href });
    }
}

/// The element's own metadata block: its first `div[data-type=metadata]`
/// child.
fn metadata_block(dom: &ArenaDom, element: ArenaNodeId) -> Option<ArenaNodeId> {
    dom.element_children(element)
        .find(|&c| dom.get_attr(c, "data-type") == Some("metadata"))
}

/// First eight characters of the URL-safe base64 form of the UUID bytes.
fn short_id(uuid: &Uuid) -> String {
    URL_SAFE_NO_PAD
        .encode(uuid.as_bytes())
        .chars()
        .take(SHORT_ID_LEN)
        .collect()
}

fn markup_text(markup: &str) -> String {
    let (dom, root) = crate::dom::parse_fragment(markup);
    dom.text(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TRANSLUCENT_BINDER_ID, model_to_tree};
    use crate::single::format_single_html;

    fn book(id: &str) -> Node {
        let one = Document::new(
            "e78d4f90@3",
            r##"<p id="p1">One <a href="#p1">self</a> <a href="/contents/3c448dc6@1#fig">fig</a> <a href="/contents/e78d4f90@3">top</a></p>"##,
        )
        .unwrap()
        .with_metadata(Metadata::new("Document One"));
        let two = Document::new("3c448dc6@1", r#"<figure id="fig"><p id="p1">Two</p></figure>"#)
            .unwrap()
            .with_metadata(Metadata::new("Document Two"));
        let mut part = TranslucentBinder::new(Metadata::new("Part One"));
        part.children.push(one);
        part.children
            .push_with_title(two, Some("Document <em>Two</em>".to_string()));
        Binder::new(id, Metadata::new("Book One"))
            .unwrap()
            .with_child(part)
            .into()
    }

    #[test]
    fn test_round_trip_tree() {
        let original = book("8d75ea29@3");
        let html = format_single_html(&original).unwrap().value;
        let rebuilt = reconstitute(&html).unwrap();
        assert!(rebuilt.diagnostics.is_empty());
        assert_eq!(model_to_tree(&rebuilt.value), model_to_tree(&original));

        let part = rebuilt.value.children().unwrap().get(0).unwrap();
        assert!(part.is_translucent());
        assert_eq!(part.children().unwrap().title_override(1), Some("Document <em>Two</em>"));
    }

    #[test]
    fn test_ids_restored() {
        let html = format_single_html(&book("8d75ea29@3")).unwrap().value;
        let rebuilt = reconstitute(&html).unwrap().into_inner();
        let pages: Vec<&Document> = rebuilt
            .flatten_to_documents(false)
            .filter_map(Node::as_document)
            .collect();
        let one = pages[0].content();
        assert!(one.contains(r##"<p id="p1">One <a href="#p1">self</a>"##));
        assert!(one.contains(r#"href="/contents/3c448dc6@1#fig""#));
        assert!(pages[1].content().contains(r#"<figure id="fig"><p id="p1">Two</p></figure>"#));
    }

    #[test]
    fn test_derived_identifiers() {
        let id = "d3a2d5d4-5a1b-4c8e-9f3e-0b8a7c6d5e4f@5";
        let html = format_single_html(&book(id)).unwrap().value;
        let first = reconstitute(&html).unwrap().into_inner();
        let second = reconstitute(&html).unwrap().into_inner();

        let part = first.children().unwrap().get(0).unwrap();
        assert!(!part.is_translucent());
        let ident = part.ident_hash().unwrap();
        assert!(ident.ends_with("@5"));
        let short = part.metadata().short_id.clone().unwrap();
        assert_eq!(short.len(), 8);
        assert_eq!(model_to_tree(&first), model_to_tree(&second));

        let expected = Uuid::new_v5(
            &Uuid::parse_str("d3a2d5d4-5a1b-4c8e-9f3e-0b8a7c6d5e4f").unwrap(),
            b"Part One",
        );
        assert_eq!(ident, format!("{expected}@5"));

        let book = Uuid::parse_str("d3a2d5d4-5a1b-4c8e-9f3e-0b8a7c6d5e4f").unwrap();
        assert_eq!(first.metadata().short_id.as_deref(), Some(&*short_id(&book)));

        let tree = model_to_tree(&first);
        assert_ne!(tree.contents.unwrap()[0].id.as_deref(), Some(TRANSLUCENT_BINDER_ID));
    }

    #[test]
    fn test_link_to_own_page_restored() {
        let html = format_single_html(&book("8d75ea29@3")).unwrap().value;
        assert!(html.contains(r##"<a href="#page_e78d4f90">top</a>"##));
        let rebuilt = reconstitute(&html).unwrap();
        assert!(rebuilt.diagnostics.is_empty());
        let page = rebuilt.value.flatten_to_documents(false).next().unwrap();
        let content = page.as_document().unwrap().content();
        assert!(content.contains(r#"<a href="/contents/e78d4f90@3">top</a>"#));
        assert!(!content.contains("page_"));
    }

    #[test]
    fn test_persisted_uuid_binder_gets_short_id() {
        let uuid = Uuid::parse_str("4ad0c2a1-7b3e-4f7a-8c2d-1e9f0a3b5c6d").unwrap();
        let page = Document::new("e78d4f90@3", "<p>One</p>")
            .unwrap()
            .with_metadata(Metadata::new("Document One"));
        let chapter = Binder::new(&format!("{uuid}@2"), Metadata::new("Chapter"))
            .unwrap()
            .with_child(page);
        let original: Node = Binder::new("8d75ea29@3", Metadata::new("Book One"))
            .unwrap()
            .with_child(chapter)
            .into();

        let html = format_single_html(&original).unwrap().value;
        let rebuilt = reconstitute(&html).unwrap().into_inner();
        assert_eq!(rebuilt.metadata().short_id, None);
        let chapter = rebuilt.children().unwrap().get(0).unwrap();
        assert_eq!(chapter.ident_hash().as_deref(), Some(&*format!("{uuid}@2")));
        assert_eq!(chapter.metadata().short_id.as_deref(), Some(&*short_id(&uuid)));
    }

    #[test]
    fn test_recorded_short_id_kept() {
        let uuid = "4ad0c2a1-7b3e-4f7a-8c2d-1e9f0a3b5c6d@2";
        let chapter = Binder::new(uuid, Metadata::new("Chapter").with_short_id("keepme"))
            .unwrap()
            .with_child(Document::new("p@1", "<p/>").unwrap().with_metadata(Metadata::new("P")));
        let original: Node = Binder::new("b@1", Metadata::new("Book")).unwrap().with_child(chapter).into();
        let html = format_single_html(&original).unwrap().value;
        let rebuilt = reconstitute(&html).unwrap().into_inner();
        let chapter = rebuilt.children().unwrap().get(0).unwrap();
        assert_eq!(chapter.metadata().short_id.as_deref(), Some("keepme"));
    }

    fn structural_roles(html: &str) -> Vec<String> {
        let dom = parse_html(html);
        dom.descendants(dom.document())
            .filter(|&id| dom.is_tag(id, "div"))
            .filter_map(|id| dom.get_attr(id, "data-type"))
            .filter(|role| Role::parse(role).is_some())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_derived_unit_reformats_as_chapter() {
        let page = Document::new("e78d4f90@3", "<p>One</p>")
            .unwrap()
            .with_metadata(Metadata::new("Document One"));
        let chapter = TranslucentBinder::new(Metadata::new("Chapter One")).with_child(page);
        let unit = TranslucentBinder::new(Metadata::new("Unit One")).with_child(chapter);
        let original: Node = Binder::new("d3a2d5d4-5a1b-4c8e-9f3e-0b8a7c6d5e4f@5", Metadata::new("Book"))
            .unwrap()
            .with_child(unit)
            .into();

        let html = format_single_html(&original).unwrap().value;
        assert_eq!(structural_roles(&html), vec!["unit", "chapter", "page"]);

        // Derived binders are no longer translucent, so the outer one loses
        // its unit role on the next pass.
        let derived = reconstitute(&html).unwrap().into_inner();
        let again = format_single_html(&derived).unwrap().value;
        assert_eq!(structural_roles(&again), vec!["chapter", "chapter", "page"]);

        let config = ReconstituteConfig::new().with_derive_identifiers(false);
        let kept = reconstitute_with(&html, &config).unwrap().into_inner();
        let again = format_single_html(&kept).unwrap().value;
        assert_eq!(structural_roles(&again), vec!["unit", "chapter", "page"]);
    }

    #[test]
    fn test_unpersisted_pages_get_derived_ids() {
        let html = format_single_html(&book("8d75ea29@3")).unwrap().value;
        let html = html.replacen(r#" id="page_3c448dc6""#, "", 1).replacen(
            r#"<span data-type="cnx-archive-uri" data-value="3c448dc6@1"></span>"#,
            "",
            1,
        );
        let rebuilt = reconstitute(&html).unwrap().into_inner();
        let pages: Vec<&Node> = rebuilt.flatten_to_documents(false).collect();
        let derived = pages[1];
        assert_eq!(derived.metadata().archive_uri, None);

        let base = Uuid::new_v5(&Uuid::NAMESPACE_URL, b"Part One");
        let expected = Uuid::new_v5(&base, b"Document Two");
        assert_eq!(derived.ident_hash(), Some(format!("{expected}@3")));
        assert_eq!(model_to_tree(&rebuilt), model_to_tree(&reconstitute(&html).unwrap().value));
    }

    #[test]
    fn test_derivation_disabled() {
        let id = "d3a2d5d4-5a1b-4c8e-9f3e-0b8a7c6d5e4f@5";
        let html = format_single_html(&book(id)).unwrap().value;
        let config = ReconstituteConfig::new().with_derive_identifiers(false);
        let rebuilt = reconstitute_with(&html, &config).unwrap().into_inner();
        assert!(rebuilt.children().unwrap().get(0).unwrap().is_translucent());
    }

    #[test]
    fn test_child_count_mismatch() {
        let html = format_single_html(&book("8d75ea29@3")).unwrap().value;
        let broken = html.replacen(r#"<div data-type="page""#, r#"<div data-type="skipped""#, 1);
        assert!(matches!(
            reconstitute(&broken),
            Err(Error::UnknownStructuralRole { role, .. }) if role == "skipped"
        ));

        let dropped = html.replacen(r#"<div data-type="page""#, r#"<div data-role="page""#, 1);
        assert!(matches!(
            reconstitute(&dropped),
            Err(Error::ChildCountMismatch { expected: 2, found: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_fragment_reported() {
        let html = format_single_html(&book("8d75ea29@3")).unwrap().value;
        let html = html.replacen(r##"href="#auto_e78d4f90_p1""##, r##"href="#nowhere""##, 1);
        let rebuilt = reconstitute(&html).unwrap();
        let kinds: Vec<_> = rebuilt.diagnostics.iter().map(|d| d.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![DiagnosticKind::UnresolvedLink { href: "#nowhere".to_string() }]
        );
    }

    #[test]
    fn test_short_id() {
        let uuid = Uuid::parse_str("d3a2d5d4-5a1b-4c8e-9f3e-0b8a7c6d5e4f").unwrap();
        assert_eq!(short_id(&uuid), "06LV1Fob");
    }
}
