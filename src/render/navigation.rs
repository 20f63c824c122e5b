//! Nested `nav > ol > li` tables of contents.

use crate::model::{Children, Node};
use crate::util::{escape_text, escape_xml};

/// Render the children of `node` as `<nav id="toc">`.
///
/// `link` chooses the `href` of each entry; entries without one are written
/// as `<span>`. Leaves and binders both go through `link`, so callers decide
/// whether binders are linkable.
pub fn render_nav<F>(node: &Node, link: F) -> String
where
    F: Fn(&Node) -> Option<String>,
{
    let mut out = String::from(r#"<nav id="toc"><ol>"#);
    if let Some(children) = node.children() {
        write_items(children, &link, &mut out);
    }
    out.push_str("</ol></nav>");
    out
}

/// Title markup for the child at `index`: the override as written, else
/// the escaped intrinsic title.
pub fn child_title_markup(children: &Children, index: usize) -> String {
    match children.title_override(index) {
        Some(markup) => markup.to_string(),
        None => children
            .get(index)
            .and_then(Node::title)
            .map(escape_text)
            .unwrap_or_default(),
    }
}

fn write_items<F>(children: &Children, link: &F, out: &mut String)
where
    F: Fn(&Node) -> Option<String>,
{
    for (index, child) in children.iter().enumerate() {
        out.push_str("<li");
        if let Some(ident_hash) = child.ident_hash() {
            out.push_str(&format!(r#" cnx-archive-uri="{}""#, escape_xml(&ident_hash)));
        }
        if let Some(short_id) = &child.metadata().short_id {
            out.push_str(&format!(r#" cnx-archive-shortid="{}""#, escape_xml(short_id)));
        }
        out.push('>');

        let title = child_title_markup(children, index);
        match link(child) {
            Some(href) => out.push_str(&format!(r#"<a href="{}">{title}</a>"#, escape_xml(&href))),
            None => out.push_str(&format!("<span>{title}</span>")),
        }
        if let Some(grandchildren) = child.children() {
            out.push_str("<ol>");
            write_items(grandchildren, link, out);
            out.push_str("</ol>");
        }
        out.push_str("</li>");
    }
}

/// Link target used in package navigation: `<ident_hash>.xhtml` for leaves.
pub fn package_link(node: &Node) -> Option<String> {
    if node.is_binder() {
        return None;
    }
    node.ident_hash().map(|ident_hash| format!("{ident_hash}.xhtml"))
}
