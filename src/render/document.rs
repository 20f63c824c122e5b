//! Standalone XHTML documents for pages, pointers and binders.

use super::metadata::MetadataBlock;
use super::navigation::{package_link, render_nav};
use crate::dom::inner_html;
use crate::model::{Document, DocumentPointer, Metadata, Node};
use crate::util::{escape_text, escape_xml};

const XML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const BODY_MICRODATA: &str = r#" itemscope="itemscope" itemtype="http://schema.org/Book""#;

fn open_document(metadata: &Metadata, out: &mut String) {
    out.push_str(XML_PROLOG);
    out.push_str(r#"<html xmlns="http://www.w3.org/1999/xhtml""#);
    if let Some(language) = &metadata.language {
        out.push_str(&format!(r#" lang="{}""#, escape_xml(language)));
    }
    out.push_str("><head>");
    out.push_str(&format!(
        "<title>{}</title>",
        escape_text(metadata.title.as_deref().unwrap_or_default())
    ));
    out.push_str("</head>");
}

/// A page as a complete document: metadata block followed by its content.
pub fn render_document(document: &Document) -> String {
    let mut out = String::new();
    open_document(document.metadata(), &mut out);

    let dom = document.resolved_dom();
    let body = document.body();
    out.push_str("<body");
    out.push_str(BODY_MICRODATA);
    for attr in dom.attrs(body) {
        let name = attr.name.local.as_ref();
        if matches!(name, "itemscope" | "itemtype") {
            continue;
        }
        out.push_str(&format!(r#" {name}="{}""#, escape_xml(&attr.value)));
    }
    out.push('>');
    out.push_str(
        &MetadataBlock::new(document.metadata())
            .resources(document.resources())
            .person_anchors(true)
            .render(),
    );
    out.push_str(&inner_html(&dom, body));
    out.push_str("</body></html>\n");
    out
}

/// A placeholder page sending readers to the pointer's URL.
pub fn render_pointer(pointer: &DocumentPointer) -> String {
    let metadata = pointer.metadata();
    let mut out = String::new();
    open_document(metadata, &mut out);
    out.push_str("<body");
    out.push_str(BODY_MICRODATA);
    out.push('>');
    out.push_str(
        &MetadataBlock::new(metadata)
            .pointer(true)
            .person_anchors(true)
            .render(),
    );
    out.push_str(&format!(
        r#"<div><p>Click <a href="{}">here</a> to read {}.</p></div>"#,
        escape_xml(pointer.url().unwrap_or_default()),
        escape_text(metadata.title.as_deref().unwrap_or_default())
    ));
    out.push_str("</body></html>\n");
    out
}

/// A binder's navigation document. Returns `None` for leaves.
pub fn render_binder(node: &Node) -> Option<String> {
    if !node.is_binder() {
        return None;
    }
    let metadata = node.metadata();
    let mut out = String::new();
    open_document(metadata, &mut out);
    out.push_str("<body");
    out.push_str(BODY_MICRODATA);
    out.push('>');
    out.push_str(
        &MetadataBlock::new(metadata)
            .translucent(node.is_translucent())
            .resources(node.resources())
            .person_anchors(true)
            .render(),
    );
    out.push_str(&render_nav(node, package_link));
    out.push_str("</body></html>\n");
    Some(out)
}
