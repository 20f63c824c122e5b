//! Markup DOM: html5ever parsing into an arena, selector queries, and
//! XHTML serialization.
//!
//! ```
//! use bindery::dom::{Query, inner_html, parse_html};
//!
//! let dom = parse_html(r#"<p id="a">Hello, <em>World</em></p>"#);
//! let em = Query::parse("p > em").unwrap().select_first(&dom, dom.document()).unwrap();
//! assert_eq!(dom.text(em), "World");
//! assert_eq!(inner_html(&dom, dom.body().unwrap()), r#"<p id="a">Hello, <em>World</em></p>"#);
//! ```

mod arena;
mod matching;
mod select;
mod serialize;
mod tree_sink;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute, Descendants};
pub use select::Query;
pub use serialize::{document_xhtml, inner_html, outer_html};
pub use tree_sink::parse_html;

/// Parse a markup fragment and return the DOM together with the element
/// that holds the fragment's top-level nodes (the synthesized `<body>`).
pub fn parse_fragment(markup: &str) -> (ArenaDom, ArenaNodeId) {
    let dom = parse_html(markup);
    let body = dom.body().unwrap_or_else(|| dom.document());
    (dom, body)
}

/// Copy every child of `src_parent` (in `src`) to the end of `dst_parent`.
pub fn import_children(
    dst: &mut ArenaDom,
    dst_parent: ArenaNodeId,
    src: &ArenaDom,
    src_parent: ArenaNodeId,
) {
    for child in src.children(src_parent) {
        let copy = dst.import(src, child);
        dst.append(dst_parent, copy);
    }
}

/// Parse `markup` as a fragment and append its nodes under `parent`.
pub fn append_markup(dom: &mut ArenaDom, parent: ArenaNodeId, markup: &str) {
    let (fragment, root) = parse_fragment(markup);
    import_children(dom, parent, &fragment, root);
}
