//! Page leaves: documents with content and pointers to external pages.

use std::borrow::Cow;

use super::ident::Ident;
use super::metadata::Metadata;
use super::reference::{Reference, find_references};
use super::resource::Resource;
use crate::dom::{ArenaDom, ArenaNodeId, outer_html, parse_html};
use crate::error::Result;

/// A page: identity, metadata, markup content and the references found in it.
#[derive(Debug, Clone)]
pub struct Document {
    ident: Ident,
    metadata: Metadata,
    dom: ArenaDom,
    body: ArenaNodeId,
    references: Vec<Reference>,
    resources: Vec<Resource>,
}

impl Document {
    /// Build a page from `id[@version]` and markup.
    ///
    /// `content` may be a full document or a bare fragment; either way the
    /// page keeps the `<body>` element and its attributes.
    pub fn new(id: &str, content: &str) -> Result<Self> {
        let ident = Ident::parse(id)?;
        let (dom, body) = parse_content(content);
        let references = find_references(&dom, body);
        Ok(Self {
            ident,
            metadata: Metadata::default(),
            dom,
            body,
            references,
            resources: Vec::new(),
        })
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_resources(mut self, resources: Vec<Resource>) -> Self {
        self.resources = resources;
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

    /// Replace the identifier (`id` or `id@version`).
    pub fn set_id(&mut self, value: &str) -> Result<()> {
        self.ident.set(value)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// The serialized `<body>` element, with current reference URIs applied.
    pub fn content(&self) -> String {
        let dom = self.resolved_dom();
        outer_html(&dom, self.body)
    }

    /// Replace the content and rescan references. Existing bindings are lost.
    pub fn set_content(&mut self, content: &str) {
        let (dom, body) = parse_content(content);
        self.references = find_references(&dom, body);
        self.dom = dom;
        self.body = body;
    }

    /// Mutate the DOM in place, then rescan references.
    ///
    /// Reference URIs are written into the markup before `edit` runs. A bound
    /// reference whose element and URI survive the edit keeps its binding.
    pub fn edit_content<R>(&mut self, edit: impl FnOnce(&mut ArenaDom, ArenaNodeId) -> R) -> R {
        self.apply_references();
        let result = edit(&mut self.dom, self.body);

        let previous = std::mem::take(&mut self.references);
        let mut rescanned = find_references(&self.dom, self.body);
        for reference in &mut rescanned {
            let carried = previous.iter().find(|old| {
                old.is_bound()
                    && old.element() == reference.element()
                    && old.attribute() == reference.attribute()
                    && old.uri() == reference.uri()
            });
            if let Some(old) = carried {
                *reference = old.clone();
            }
        }
        self.references = rescanned;
        result
    }

    /// The DOM with every reference URI written into its attribute.
    pub fn resolved_dom(&self) -> Cow<'_, ArenaDom> {
        let stale = self
            .references
            .iter()
            .any(|r| self.dom.get_attr(r.element(), r.attribute()) != Some(r.uri().as_str()));
        if !stale {
            return Cow::Borrowed(&self.dom);
        }
        let mut dom = self.dom.clone();
        for reference in &self.references {
            dom.set_attr(reference.element(), reference.attribute(), reference.uri());
        }
        Cow::Owned(dom)
    }

    /// Raw DOM, without reference URIs applied.
    pub fn dom(&self) -> &ArenaDom {
        &self.dom
    }

    /// The `<body>` element in [`Document::dom`].
    pub fn body(&self) -> ArenaNodeId {
        self.body
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn references_mut(&mut self) -> &mut [Reference] {
        &mut self.references
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Attach a resource unless the same one is already attached.
    pub fn add_resource(&mut self, resource: Resource) {
        if !self.resources.iter().any(|r| r.same_as(&resource)) {
            self.resources.push(resource);
        }
    }

    fn apply_references(&mut self) {
        for reference in &self.references {
            let uri = reference.uri();
            if self.dom.get_attr(reference.element(), reference.attribute()) != Some(uri.as_str()) {
                self.dom.set_attr(reference.element(), reference.attribute(), uri);
            }
        }
    }
}

fn parse_content(content: &str) -> (ArenaDom, ArenaNodeId) {
    let mut dom = parse_html(content);
    let body = match dom.body() {
        Some(body) => body,
        None => {
            let body = dom.create_html_element("body", &[]);
            let root = dom.document();
            dom.append(root, body);
            body
        }
    };
    (dom, body)
}

/// A leaf naming a page that lives outside the tree.
#[derive(Debug, Clone)]
pub struct DocumentPointer {
    ident: Ident,
    metadata: Metadata,
    url: Option<String>,
}

impl DocumentPointer {
    pub fn new(ident_hash: &str, metadata: Metadata) -> Result<Self> {
        Ok(Self {
            ident: Ident::parse(ident_hash)?,
            metadata,
            url: None,
        })
    }

    /// Where readers are sent to find the page.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
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

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_keeps_body_attributes() {
        let doc = Document::new(
            "e78d4f90@3",
            r#"<html><body class="intro" data-foo="bar"><p>Hi</p></body></html>"#,
        )
        .unwrap();
        assert_eq!(
            doc.content(),
            r#"<body class="intro" data-foo="bar"><p>Hi</p></body>"#
        );
        assert_eq!(doc.ident_hash(), "e78d4f90@3");
    }

    #[test]
    fn test_content_reflects_bound_references() {
        let mut doc = Document::new("p1", r#"<p><img src="cover.png"/></p>"#).unwrap();
        let resource = Resource::with_name("r1", b"png".to_vec(), "image/png");
        doc.references_mut()[0].bind_resource(&resource, "../resources/{}");
        assert_eq!(
            doc.content(),
            r#"<body><p><img src="../resources/r1"/></p></body>"#
        );
        resource.rename("r2");
        assert!(doc.content().contains(r#"src="../resources/r2""#));
    }

    #[test]
    fn test_set_content_rescans() {
        let mut doc = Document::new("p1", "<p>none</p>").unwrap();
        assert!(doc.references().is_empty());
        doc.set_content(r##"<a href="#x">x</a><a href="http://e.org">e</a>"##);
        assert_eq!(doc.references().len(), 2);
    }

    #[test]
    fn test_edit_content_keeps_surviving_bindings() {
        let mut doc = Document::new("p1", r#"<img src="a.png"/><p id="old">t</p>"#).unwrap();
        let resource = Resource::with_name("r1", b"png".to_vec(), "image/png");
        doc.references_mut()[0].bind_resource(&resource, "../resources/{}");

        doc.edit_content(|dom, body| {
            let p = dom.get_by_id("old").unwrap();
            dom.set_attr(p, "id", "new");
            dom.append_text(body, " ");
            let a = dom.create_html_element("a", &[("href", "#new")]);
            dom.append(body, a);
        });

        assert_eq!(doc.references().len(), 2);
        let img = doc.references().iter().find(|r| r.attribute() == "src").unwrap();
        assert!(img.is_bound());
        resource.rename("r9");
        assert!(doc.content().contains("../resources/r9"));
        assert!(doc.content().contains(r##"<p id="new">"##));
    }

    #[test]
    fn test_pointer_identity() {
        let pointer = DocumentPointer::new("pointer@1", Metadata::new("Pointer")).unwrap();
        assert_eq!(pointer.id(), "pointer");
        assert_eq!(pointer.metadata().title.as_deref(), Some("Pointer"));
        assert!(DocumentPointer::new("@1", Metadata::default()).is_err());
    }
}
