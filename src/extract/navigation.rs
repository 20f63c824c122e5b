//! Navigation documents: `nav > ol > li` trees and resource lists.

use super::metadata::subtree;
use crate::dom::{ArenaDom, ArenaNodeId, inner_html};
use crate::error::{Error, Result};

/// One entry of a navigation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavItem {
    /// Item name for leaves, archive URI for subtrees (absent when the
    /// subtree is translucent).
    pub id: Option<String>,
    pub short_id: Option<String>,
    /// Title markup as written in the list.
    pub title: String,
    /// Present exactly for subtrees.
    pub contents: Option<Vec<NavItem>>,
}

impl NavItem {
    pub fn is_subtree(&self) -> bool {
        self.contents.is_some()
    }
}

/// A parsed navigation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Text of the document title.
    pub title: String,
    /// The document carries the translucent binding marker.
    pub translucent: bool,
    pub items: Vec<NavItem>,
}

/// Parse the first `nav` element of `dom` and the document title.
pub fn parse_navigation(dom: &ArenaDom) -> Result<Navigation> {
    let root = dom.document();
    let title = subtree(dom, root)
        .find(|&id| dom.get_attr(id, "data-type") == Some("document-title"))
        .map(|id| dom.text(id))
        .ok_or_else(|| Error::missing("title", "navigation document"))?;
    let translucent = subtree(dom, root).any(|id| {
        dom.get_attr(id, "data-type") == Some("binding")
            && dom.get_attr(id, "data-value") == Some("translucent")
    });
    let nav = dom
        .find_by_tag("nav")
        .ok_or_else(|| Error::InvalidPackage("navigation document has no <nav>".to_string()))?;
    Ok(Navigation {
        title,
        translucent,
        items: nav_items(dom, nav)?,
    })
}

/// Entries of the `ol` lists directly under `parent`.
pub fn nav_items(dom: &ArenaDom, parent: ArenaNodeId) -> Result<Vec<NavItem>> {
    let mut items = Vec::new();
    for ol in dom.element_children(parent).filter(|&c| dom.is_tag(c, "ol")) {
        for li in dom.element_children(ol).filter(|&c| dom.is_tag(c, "li")) {
            items.push(nav_item(dom, li)?);
        }
    }
    Ok(items)
}

fn nav_item(dom: &ArenaDom, li: ArenaNodeId) -> Result<NavItem> {
    let short_id = dom.get_attr(li, "cnx-archive-shortid").map(str::to_string);
    if dom.element_children(li).any(|c| dom.is_tag(c, "ol")) {
        let title = dom
            .first_element_child(li)
            .filter(|&c| !dom.is_tag(c, "ol"))
            .map(|c| inner_html(dom, c))
            .unwrap_or_default();
        return Ok(NavItem {
            id: dom.get_attr(li, "cnx-archive-uri").map(str::to_string),
            short_id,
            title,
            contents: Some(nav_items(dom, li)?),
        });
    }
    let anchor = dom
        .element_children(li)
        .find(|&c| dom.is_tag(c, "a"))
        .ok_or_else(|| Error::InvalidPackage("navigation leaf without a link".to_string()))?;
    Ok(NavItem {
        id: dom.get_attr(anchor, "href").map(str::to_string),
        short_id,
        title: inner_html(dom, anchor),
        contents: None,
    })
}

/// Names listed under `[data-type=resources]` (`li > a@href`).
pub fn parse_resources(dom: &ArenaDom, root: ArenaNodeId) -> Vec<String> {
    subtree(dom, root)
        .filter(|&id| dom.get_attr(id, "data-type") == Some("resources"))
        .flat_map(|list| dom.descendants(list))
        .filter(|&id| dom.is_tag(id, "a"))
        .filter(|&id| dom.parent(id).is_some_and(|p| dom.is_tag(p, "li")))
        .filter_map(|id| dom.get_attr(id, "href"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    const NAV: &str = r#"<html><body>
      <div data-type="metadata"><h1 data-type="document-title">Book One</h1>
        <div data-type="resources"><ul><li><a href="cover.png">cover.png</a></li></ul></div>
      </div>
      <nav id="toc"><ol>
        <li><span>Part <em>One</em></span><ol>
          <li cnx-archive-shortid="54_PkC"><a href="e78d4f90@3.xhtml">Document One</a></li>
        </ol></li>
        <li cnx-archive-uri="ch1@2" cnx-archive-shortid="c1"><span>Chapter</span><ol>
          <li><a href="3c448dc6@1.xhtml">Two &amp; Three</a></li>
        </ol></li>
      </ol></nav></body></html>"#;

    #[test]
    fn test_parse_navigation_tree() {
        let dom = parse_html(NAV);
        let nav = parse_navigation(&dom).unwrap();
        assert_eq!(nav.title, "Book One");
        assert!(!nav.translucent);
        assert_eq!(nav.items.len(), 2);

        let part = &nav.items[0];
        assert_eq!(part.id, None);
        assert_eq!(part.title, "Part <em>One</em>");
        let leaf = &part.contents.as_ref().unwrap()[0];
        assert_eq!(leaf.id.as_deref(), Some("e78d4f90@3.xhtml"));
        assert_eq!(leaf.short_id.as_deref(), Some("54_PkC"));
        assert!(!leaf.is_subtree());

        let chapter = &nav.items[1];
        assert_eq!(chapter.id.as_deref(), Some("ch1@2"));
        assert_eq!(chapter.contents.as_ref().unwrap()[0].title, "Two &amp; Three");
    }

    #[test]
    fn test_translucent_marker() {
        let dom = parse_html(
            r#"<div data-type="metadata"><h1 data-type="document-title">P</h1>
               <span data-type="binding" data-value="translucent"></span></div>
               <nav><ol></ol></nav>"#,
        );
        let nav = parse_navigation(&dom).unwrap();
        assert!(nav.translucent);
        assert!(nav.items.is_empty());
    }

    #[test]
    fn test_missing_nav() {
        let dom = parse_html(r#"<h1 data-type="document-title">P</h1>"#);
        assert!(matches!(parse_navigation(&dom), Err(Error::InvalidPackage(_))));
    }

    #[test]
    fn test_parse_resources() {
        let dom = parse_html(NAV);
        assert_eq!(parse_resources(&dom, dom.document()), vec!["cover.png"]);
    }
}
