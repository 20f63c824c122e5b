//! Content model -> package.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;

use super::{Container, Item, Package, PackageMetadata, XHTML_MEDIA_TYPE};
use crate::error::{Error, Result};
use crate::model::{Document, Node, RemoteType, Resource};
use crate::render::{render_binder, render_document, render_pointer};
use crate::util::{basename, extension_for_media_type};

const RESOURCE_TEMPLATE: &str = "../resources/{}";

/// One package per book.
pub fn make_container(books: &[Node]) -> Result<Container> {
    books
        .iter()
        .map(make_package)
        .collect::<Result<Vec<_>>>()
        .map(Container::new)
}

/// Like [`make_container`], stamping every package with a publisher and a
/// publication message.
pub fn make_publication_container(
    books: &[Node],
    publisher: &str,
    publication_message: &str,
) -> Result<Container> {
    let mut container = make_container(books)?;
    for package in &mut container.packages {
        package.metadata.publisher = Some(publisher.to_string());
        package.metadata.publication_message = Some(publication_message.to_string());
    }
    Ok(container)
}

/// Serialize a book into a package.
///
/// The root must be a persisted binder; its navigation item encodes the
/// whole tree. Inline `data:` references become resources, so the caller's
/// tree is cloned before any reference is rebound.
pub fn make_package(book: &Node) -> Result<Package> {
    let Node::Binder(root) = book else {
        return Err(Error::InvalidPackage(
            "package root must be a persisted binder".to_string(),
        ));
    };
    let ident_hash = root.ident_hash();
    tracing::debug!(book = %ident_hash, "making package");

    let mut book = book.clone();
    book.for_each_document_mut(externalize_inline)?;

    let mut items = Vec::new();
    let mut resources: Vec<Resource> = Vec::new();
    for node in book.flatten() {
        let name = node.ident_hash().map(|h| format!("{h}.xhtml"));
        match node {
            Node::Binder(_) => {
                if let (Some(markup), Some(name)) = (render_binder(node), name) {
                    if node.ident_hash().as_deref() == Some(ident_hash.as_str()) {
                        items.push(Item::navigation(name, markup));
                    } else {
                        items.push(Item::new(name, markup, XHTML_MEDIA_TYPE));
                    }
                }
            }
            Node::Document(document) | Node::CompositeDocument(document) => {
                if let Some(name) = name {
                    items.push(Item::new(name, render_document(document), XHTML_MEDIA_TYPE));
                }
            }
            Node::DocumentPointer(pointer) => {
                if let Some(name) = name {
                    items.push(Item::new(name, render_pointer(pointer), XHTML_MEDIA_TYPE));
                }
            }
            Node::TranslucentBinder(_) => {}
        }

        let bound = node
            .as_document()
            .into_iter()
            .flat_map(|d| d.references().iter().filter_map(|r| r.bound_resource()));
        for resource in node.resources().iter().chain(bound) {
            let known = resources
                .iter()
                .any(|r| r.same_as(resource) || r.id() == resource.id());
            if known {
                continue;
            }
            if extension_for_media_type(resource.media_type()).is_none() {
                return Err(Error::UnknownMediaType {
                    media_type: resource.media_type().to_string(),
                    node: node.ident_hash().unwrap_or_else(|| resource.id()),
                });
            }
            resources.push(resource.clone());
        }
    }
    items.extend(
        resources
            .iter()
            .map(|r| Item::new(r.id(), r.data().to_vec(), r.media_type())),
    );

    Package::new(format!("{ident_hash}.opf"), items, package_metadata(&book))
}

/// Turn `data:` references into bound resources and bind plain references
/// to resources the page already carries.
fn externalize_inline(document: &mut Document) -> Result<()> {
    let owner = document.ident_hash();
    let known: Vec<Resource> = document.resources().to_vec();
    let mut added = Vec::new();

    for reference in document.references_mut() {
        if reference.is_bound() {
            continue;
        }
        let uri = reference.uri();
        match reference.remote_type() {
            RemoteType::Inline => {
                let (media_type, data) = decode_data_uri(&uri)?;
                let resource = Resource::new(data, media_type).map_err(|err| match err {
                    Error::UnknownMediaType { media_type, .. } => Error::UnknownMediaType {
                        media_type,
                        node: owner.clone(),
                    },
                    other => other,
                })?;
                reference.bind_resource(&resource, RESOURCE_TEMPLATE);
                added.push(resource);
            }
            RemoteType::Internal if uri.contains("../resources/") => {
                let name = basename(&uri);
                if let Some(resource) = known.iter().find(|r| r.id() == name) {
                    reference.bind_resource(resource, RESOURCE_TEMPLATE);
                }
            }
            _ => {}
        }
    }
    for resource in added {
        document.add_resource(resource);
    }
    Ok(())
}

/// Split `data:[<media type>][;base64],<payload>` into media type and bytes.
fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let invalid = || Error::InvalidDataUri(uri.chars().take(64).collect());
    let rest = uri
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .map(|_| &uri[5..])
        .ok_or_else(invalid)?;
    let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;

    let mut params = header.split(';');
    let media_type = params
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("text/plain")
        .to_ascii_lowercase();
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let raw: Vec<u8> = percent_decode_str(payload).collect();
    let data = if is_base64 {
        let compact: Vec<u8> = raw.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
        STANDARD.decode(compact).map_err(|_| invalid())?
    } else {
        raw
    };
    Ok((media_type, data))
}

fn package_metadata(book: &Node) -> PackageMetadata {
    let metadata = book.metadata();
    let publishers: Vec<&str> = metadata.publishers.iter().map(|p| p.name.as_str()).collect();
    PackageMetadata {
        title: metadata.title.clone(),
        creator: (!publishers.is_empty()).then(|| publishers.join(", ")),
        publisher: None,
        identifier: book.ident_hash(),
        language: metadata.language.clone(),
        license_text: metadata.license_text.clone(),
        license_url: metadata.license_url.clone(),
        publication_message: None,
    }
}
