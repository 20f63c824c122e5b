//! XHTML serialization of arena nodes.
//!
//! Output is well-formed XML that html5ever parses back into the same tree:
//! void elements self-close, other empty elements get an explicit end tag,
//! and `script`/`style` bodies are written raw.

use html5ever::{Namespace, ns};

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId, Attribute};

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize a node and its subtree.
pub fn outer_html(dom: &ArenaDom, id: ArenaNodeId) -> String {
    let mut out = String::new();
    write_node(dom, id, &mut out);
    out
}

/// Serialize only the children of a node.
pub fn inner_html(dom: &ArenaDom, id: ArenaNodeId) -> String {
    let mut out = String::new();
    for child in dom.children(id) {
        write_node(dom, child, &mut out);
    }
    out
}

/// Serialize a whole document as XHTML with an XML declaration.
pub fn document_xhtml(dom: &ArenaDom) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>\n");
    for child in dom.element_children(dom.document()) {
        write_node(dom, child, &mut out);
    }
    out
}

fn write_node(dom: &ArenaDom, id: ArenaNodeId, out: &mut String) {
    let Some(node) = dom.get(id) else {
        return;
    };
    match &node.data {
        ArenaNodeData::Document => {
            for child in dom.children(id) {
                write_node(dom, child, out);
            }
        }
        ArenaNodeData::Element { name, attrs, .. } => {
            let local = name.local.as_ref();
            out.push('<');
            out.push_str(local);
            if needs_xmlns(dom, id, &name.ns, attrs) {
                out.push_str(" xmlns=\"");
                out.push_str(&name.ns);
                out.push('"');
            }
            for attr in attrs {
                write_attr(attr, out);
            }

            let foreign = name.ns != ns!(html);
            if node.first_child.is_none() {
                if VOID_ELEMENTS.contains(&local) || foreign {
                    out.push_str("/>");
                } else {
                    out.push_str("></");
                    out.push_str(local);
                    out.push('>');
                }
                return;
            }

            out.push('>');
            if !foreign && RAW_TEXT_ELEMENTS.contains(&local) {
                for child in dom.children(id) {
                    if let Some(text) = dom.text_content(child) {
                        out.push_str(text);
                    }
                }
            } else {
                if matches!(local, "pre" | "textarea" | "listing")
                    && node
                        .first_child
                        .and_then(|first| dom.text_content(first))
                        .is_some_and(|t| t.starts_with('\n'))
                {
                    out.push('\n');
                }
                for child in dom.children(id) {
                    write_node(dom, child, out);
                }
            }
            out.push_str("</");
            out.push_str(local);
            out.push('>');
        }
        ArenaNodeData::Text(text) => escape_into(text, false, out),
        ArenaNodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        ArenaNodeData::Doctype { .. } => {}
    }
}

/// The root `html` element and the outermost foreign (MathML/SVG) element
/// carry their namespace explicitly unless the markup already declares it.
fn needs_xmlns(dom: &ArenaDom, id: ArenaNodeId, ns: &Namespace, attrs: &[Attribute]) -> bool {
    if attrs.iter().any(|a| a.name.prefix.is_none() && a.name.local.as_ref() == "xmlns") {
        return false;
    }
    let parent_ns = dom.parent(id).and_then(|p| dom.element_namespace(p));
    match parent_ns {
        Some(parent_ns) => parent_ns != ns,
        None => ns.as_ref() == XHTML_NS && dom.is_tag(id, "html"),
    }
}

fn write_attr(attr: &Attribute, out: &mut String) {
    out.push(' ');
    if let Some(prefix) = &attr.name.prefix {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(&attr.name.local);
    out.push_str("=\"");
    escape_into(&attr.value, true, out);
    out.push('"');
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
