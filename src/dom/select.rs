//! Compiled CSS selector queries over an [`ArenaDom`].

use cssparser::{Parser, ParserInput};
use selectors::context::{
    MatchingContext, MatchingForInvalidation, MatchingMode, NeedsSelectorFlags, QuirksMode,
    SelectorCaches,
};
use selectors::parser::{ParseRelative, Selector, SelectorList};

use super::arena::{ArenaDom, ArenaNodeId};
use super::matching::{PageElement, PageSelectors};
use crate::error::{Error, Result};

/// A parsed, comma-separated selector list.
#[derive(Clone)]
pub struct Query {
    source: String,
    selectors: Vec<Selector<PageSelectors>>,
}

impl Query {
    /// Parse a selector list such as `div[data-type="exercise"] > a, .note`.
    pub fn parse(source: &str) -> Result<Self> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        let list = SelectorList::parse(&PageSelectors, &mut parser, ParseRelative::No).map_err(
            |e| Error::InvalidQuery {
                query: source.to_string(),
                message: format!("{:?}", e.kind),
            },
        )?;
        Ok(Self {
            source: source.to_string(),
            selectors: list.slice().to_vec(),
        })
    }

    /// The selector text this query was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether a single element matches any selector in the list.
    pub fn matches(&self, dom: &ArenaDom, id: ArenaNodeId) -> bool {
        if !dom.is_element(id) {
            return false;
        }
        let mut caches = SelectorCaches::default();
        let mut context = new_context(&mut caches);
        self.matches_in(dom, id, &mut context)
    }

    fn matches_in(
        &self,
        dom: &ArenaDom,
        id: ArenaNodeId,
        context: &mut MatchingContext<'_, PageSelectors>,
    ) -> bool {
        let element = PageElement::new(dom, id);
        self.selectors
            .iter()
            .any(|s| selectors::matching::matches_selector(s, 0, None, &element, context))
    }

    /// All matching elements under `root`, in document order.
    pub fn select(&self, dom: &ArenaDom, root: ArenaNodeId) -> Vec<ArenaNodeId> {
        let mut caches = SelectorCaches::default();
        let mut context = new_context(&mut caches);
        dom.descendants(root)
            .filter(|&id| dom.is_element(id) && self.matches_in(dom, id, &mut context))
            .collect()
    }

    /// First matching element under `root`.
    pub fn select_first(&self, dom: &ArenaDom, root: ArenaNodeId) -> Option<ArenaNodeId> {
        let mut caches = SelectorCaches::default();
        let mut context = new_context(&mut caches);
        dom.descendants(root)
            .find(|&id| dom.is_element(id) && self.matches_in(dom, id, &mut context))
    }

    /// Matches under `root` with any match nested inside an earlier match dropped.
    pub fn select_outermost(&self, dom: &ArenaDom, root: ArenaNodeId) -> Vec<ArenaNodeId> {
        let mut outermost: Vec<ArenaNodeId> = Vec::new();
        for id in self.select(dom, root) {
            if !outermost.iter().any(|&o| dom.is_ancestor(o, id)) {
                outermost.push(id);
            }
        }
        outermost
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Query").field(&self.source).finish()
    }
}

fn new_context(caches: &mut SelectorCaches) -> MatchingContext<'_, PageSelectors> {
    MatchingContext::new(
        MatchingMode::Normal,
        None,
        caches,
        QuirksMode::NoQuirks,
        NeedsSelectorFlags::No,
        MatchingForInvalidation::No,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn tags(dom: &ArenaDom, ids: &[ArenaNodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| dom.element_name(id).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_tag_selector() {
        let dom = parse_html("<div><p>Hello</p></div>");
        let q = Query::parse("p").unwrap();
        let found = q.select(&dom, dom.document());
        assert_eq!(tags(&dom, &found), vec!["p"]);
    }

    #[test]
    fn test_class_and_id_selectors() {
        let dom = parse_html(r#"<p class="intro highlight" id="main">Hello</p><p>Bye</p>"#);
        let p = dom.find_by_tag("p").unwrap();
        assert!(Query::parse(".intro").unwrap().matches(&dom, p));
        assert!(Query::parse("p.highlight#main").unwrap().matches(&dom, p));
        assert!(!Query::parse(".missing").unwrap().matches(&dom, p));
    }

    #[test]
    fn test_attribute_selector() {
        let dom = parse_html(
            r#"<div data-type="metadata"><span data-type="binding" data-value="translucent"></span></div>"#,
        );
        let q = Query::parse(r#"[data-type="binding"][data-value="translucent"]"#).unwrap();
        assert_eq!(q.select(&dom, dom.document()).len(), 1);
    }

    #[test]
    fn test_child_and_descendant() {
        let dom = parse_html("<div><span><p>Nested</p></span></div>");
        let p = dom.find_by_tag("p").unwrap();
        assert!(Query::parse("div p").unwrap().matches(&dom, p));
        assert!(!Query::parse("div > p").unwrap().matches(&dom, p));
        assert!(Query::parse("span > p").unwrap().matches(&dom, p));
    }

    #[test]
    fn test_selector_list_document_order() {
        let dom = parse_html("<h1>t</h1><p>a</p><h2>s</h2>");
        let q = Query::parse("h2, h1").unwrap();
        let found = q.select(&dom, dom.document());
        assert_eq!(tags(&dom, &found), vec!["h1", "h2"]);
    }

    #[test]
    fn test_select_outermost() {
        let dom = parse_html(r#"<div class="x"><div class="x">inner</div></div><div class="x"></div>"#);
        let q = Query::parse(".x").unwrap();
        assert_eq!(q.select(&dom, dom.document()).len(), 3);
        assert_eq!(q.select_outermost(&dom, dom.document()).len(), 2);
    }

    #[test]
    fn test_invalid_query() {
        let err = Query::parse("p[").unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
    }

    #[test]
    fn test_sibling_combinators_skip_text() {
        let dom = parse_html("<div><h1>t</h1> text <p>a</p><!-- c --><p>b</p></div>");
        let found = Query::parse("h1 + p").unwrap().select(&dom, dom.document());
        assert_eq!(found.len(), 1);
        assert_eq!(dom.text(found[0]), "a");
        assert_eq!(Query::parse("h1 ~ p").unwrap().select(&dom, dom.document()).len(), 2);
        assert_eq!(Query::parse("p:first-child").unwrap().select(&dom, dom.document()).len(), 0);
    }

    #[test]
    fn test_pseudo_classes_rejected() {
        assert!(matches!(Query::parse("a:link"), Err(Error::InvalidQuery { .. })));
        assert!(matches!(Query::parse("p::before"), Err(Error::InvalidQuery { .. })));
    }
}
