//! Package -> content model.

use std::collections::HashMap;

use super::Package;
use crate::diagnostics::{DiagnosticKind, Diagnostics, Transformed};
use crate::dom::{ArenaDom, ArenaNodeId, outer_html, parse_fragment, parse_html};
use crate::error::{Error, Result};
use crate::extract::{
    MetadataContext, MetadataParser, NavItem, find_metadata_block, is_document_pointer,
    parse_navigation, parse_resources,
};
use crate::model::{
    Binder, Children, Document, DocumentPointer, Metadata, Node, Resource, TranslucentBinder,
};
use crate::util::{basename, escape_text};

const RESOURCE_TEMPLATE: &str = "../resources/{}";

/// Build the content tree described by a package's navigation item.
///
/// Items named by the navigation must exist. Resources referenced by a page
/// but absent from the package are reported in the returned diagnostics.
pub fn adapt_package(package: &Package) -> Result<Transformed<Node>> {
    tracing::debug!(package = %package.name(), "adapting package");
    let mut adapter = Adapter {
        package,
        resources: HashMap::new(),
        diagnostics: Diagnostics::new(),
    };
    let root = adapter.root()?;
    Ok(Transformed::new(root, adapter.diagnostics))
}

struct Adapter<'a> {
    package: &'a Package,
    /// Resources already loaded, so every page shares one instance per item.
    resources: HashMap<String, Resource>,
    diagnostics: Diagnostics,
}

impl Adapter<'_> {
    fn root(&mut self) -> Result<Node> {
        let item = self.package.navigation();
        let dom = parse_html(&item.text());
        let navigation = parse_navigation(&dom)?;
        let mut metadata = self.binder_metadata(&dom, &item.name)?;
        metadata.title.get_or_insert_with(|| navigation.title.clone());
        let children = self.children(&navigation.items)?;

        if navigation.translucent {
            let mut binder = TranslucentBinder::new(metadata);
            binder.children = children;
            return Ok(binder.into());
        }

        let stem = item.name.strip_suffix(".xhtml").unwrap_or(&item.name);
        let id = metadata.archive_uri.clone().unwrap_or_else(|| stem.to_string());
        let mut binder = Binder::new(&id, metadata)?;
        binder.resources = self.listed_resources(&dom, &id);
        binder.children = children;
        Ok(binder.into())
    }

    fn children(&mut self, entries: &[NavItem]) -> Result<Children> {
        let mut children = Children::new();
        for entry in entries {
            let mut node = self.node(entry)?;
            if node.metadata().short_id.is_none() {
                node.metadata_mut().short_id = entry.short_id.clone();
            }
            let intrinsic = escape_text(node.title().unwrap_or_default());
            let title = (intrinsic != entry.title).then(|| entry.title.clone());
            children.push_with_title(node, title);
        }
        Ok(children)
    }

    fn node(&mut self, entry: &NavItem) -> Result<Node> {
        match (&entry.contents, &entry.id) {
            (Some(contents), Some(id)) => self.binder(id, entry, contents),
            (Some(contents), None) => {
                let mut binder = TranslucentBinder::new(Metadata::new(markup_text(&entry.title)));
                binder.children = self.children(contents)?;
                Ok(binder.into())
            }
            (None, Some(name)) => self.leaf(name, entry),
            (None, None) => Err(Error::InvalidPackage(
                "navigation leaf without a target".to_string(),
            )),
        }
    }

    fn binder(&mut self, id: &str, entry: &NavItem, contents: &[NavItem]) -> Result<Node> {
        let item = self.package.require(id)?;
        let dom = parse_html(&item.text());
        let mut metadata = self.binder_metadata(&dom, id)?;
        metadata
            .title
            .get_or_insert_with(|| markup_text(&entry.title));
        let mut binder = Binder::new(id, metadata)?;
        binder.resources = self.listed_resources(&dom, id);
        binder.children = self.children(contents)?;
        Ok(binder.into())
    }

    fn binder_metadata(&mut self, dom: &ArenaDom, label: &str) -> Result<Metadata> {
        match find_metadata_block(dom, dom.document()) {
            Some(block) => MetadataParser::new(dom, block, MetadataContext::Package)
                .lenient()
                .with_label(label)
                .parse(),
            None => {
                self.diagnostics
                    .warn(label, DiagnosticKind::MissingMetadataBlock);
                Ok(Metadata::default())
            }
        }
    }

    fn leaf(&mut self, name: &str, entry: &NavItem) -> Result<Node> {
        let item = self.package.require(name)?;
        let mut dom = parse_html(&item.text());
        let root = dom.document();
        let stem = item.name.strip_suffix(".xhtml").unwrap_or(&item.name).to_string();
        let block = find_metadata_block(&dom, root);

        if is_document_pointer(&dom, root) {
            let metadata = MetadataParser::new(&dom, block.unwrap_or(root), MetadataContext::Pointer)
                .with_label(&item.name)
                .parse()?;
            let ident_hash = metadata.archive_uri.clone().unwrap_or(stem);
            let url = pointer_url(&dom, block);
            let mut pointer = DocumentPointer::new(&ident_hash, metadata)?;
            if let Some(url) = url {
                pointer = pointer.with_url(url);
            }
            return Ok(pointer.into());
        }

        let metadata = match block {
            Some(block) => MetadataParser::new(&dom, block, MetadataContext::Package)
                .with_label(&item.name)
                .parse()?,
            None => {
                self.diagnostics
                    .warn(&item.name, DiagnosticKind::MissingMetadataBlock);
                Metadata::new(markup_text(&entry.title))
            }
        };
        let id = metadata.archive_uri.clone().unwrap_or(stem);

        let body = dom.body().unwrap_or(root);
        if let Some(block) = block {
            dom.detach(block);
        }
        dom.remove_attr(body, "itemscope");
        dom.remove_attr(body, "itemtype");

        let mut document = Document::new(&id, &outer_html(&dom, body))?.with_metadata(metadata);
        self.bind_resources(&mut document);
        Ok(document.into())
    }

    fn bind_resources(&mut self, document: &mut Document) {
        let owner = document.ident_hash();
        let mut bound = Vec::new();
        for reference in document.references_mut() {
            let uri = reference.uri();
            if !uri.contains("../resources/") {
                continue;
            }
            let name = basename(&uri).to_string();
            match self.resource(&name) {
                Some(resource) => {
                    reference.bind_resource(&resource, RESOURCE_TEMPLATE);
                    bound.push(resource);
                }
                None => self
                    .diagnostics
                    .warn(&owner, DiagnosticKind::MissingResource { name }),
            }
        }
        for resource in bound {
            document.add_resource(resource);
        }
    }

    fn listed_resources(&mut self, dom: &ArenaDom, owner: &str) -> Vec<Resource> {
        let mut resources = Vec::new();
        for name in parse_resources(dom, dom.document()) {
            match self.resource(&name) {
                Some(resource) => resources.push(resource),
                None => self
                    .diagnostics
                    .warn(owner, DiagnosticKind::MissingResource { name }),
            }
        }
        resources
    }

    fn resource(&mut self, name: &str) -> Option<Resource> {
        if let Some(resource) = self.resources.get(name) {
            return Some(resource.clone());
        }
        let item = self
            .package
            .items()
            .iter()
            .find(|item| item.name == name && !item.is_navigation)?;
        let resource = Resource::with_name(name, item.data.clone(), item.media_type.clone());
        self.resources.insert(name.to_string(), resource.clone());
        Some(resource)
    }
}

/// First link outside the metadata block.
fn pointer_url(dom: &ArenaDom, block: Option<ArenaNodeId>) -> Option<String> {
    dom.descendants(dom.document())
        .filter(|&id| dom.is_tag(id, "a"))
        .filter(|&id| !block.is_some_and(|b| dom.is_ancestor(b, id)))
        .find_map(|id| dom.get_attr(id, "href"))
        .map(str::to_string)
}

fn markup_text(markup: &str) -> String {
    let (dom, root) = parse_fragment(markup);
    dom.text(root)
}
