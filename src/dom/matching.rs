//! Matching page markup against `selectors` queries.
//!
//! Queries only ever see HTML elements of a single document, so one string
//! type stands in for every name the selector grammar needs and no
//! pseudo-classes or pseudo-elements are recognised.

use std::fmt;

use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::context::MatchingContext;
use selectors::matching::ElementSelectorFlags;
use selectors::parser::SelectorParseErrorKind;
use selectors::{OpaqueElement, SelectorImpl};

use super::arena::{ArenaDom, ArenaNodeData, ArenaNodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageSelectors;

/// Names, identifiers and attribute values of a parsed selector.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub(crate) struct CssString(String);

impl CssString {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl precomputed_hash::PrecomputedHash for CssString {
    fn precomputed_hash(&self) -> u32 {
        self.0
            .bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)))
    }
}

impl AsRef<str> for CssString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CssString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl cssparser::ToCss for CssString {
    fn to_css<W: fmt::Write>(&self, dest: &mut W) -> fmt::Result {
        dest.write_str(&self.0)
    }
}

/// Uninhabited: pages are matched as static markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Never {}

impl cssparser::ToCss for Never {
    fn to_css<W: fmt::Write>(&self, _dest: &mut W) -> fmt::Result {
        match *self {}
    }
}

impl selectors::parser::PseudoElement for Never {
    type Impl = PageSelectors;

    fn accepts_state_pseudo_classes(&self) -> bool {
        match *self {}
    }

    fn valid_after_slotted(&self) -> bool {
        match *self {}
    }
}

impl selectors::parser::NonTSPseudoClass for Never {
    type Impl = PageSelectors;

    fn is_active_or_hover(&self) -> bool {
        match *self {}
    }

    fn is_user_action_state(&self) -> bool {
        match *self {}
    }
}

impl<'i> selectors::parser::Parser<'i> for PageSelectors {
    type Impl = PageSelectors;
    type Error = SelectorParseErrorKind<'i>;
}

impl SelectorImpl for PageSelectors {
    type ExtraMatchingData<'a> = ();
    type AttrValue = CssString;
    type Identifier = CssString;
    type LocalName = CssString;
    type NamespaceUrl = CssString;
    type NamespacePrefix = CssString;
    type BorrowedLocalName = CssString;
    type BorrowedNamespaceUrl = CssString;
    type NonTSPseudoClass = Never;
    type PseudoElement = Never;
}

/// An element of an [`ArenaDom`] as seen by the matcher.
#[derive(Clone, Copy)]
pub(crate) struct PageElement<'a> {
    dom: &'a ArenaDom,
    id: ArenaNodeId,
}

impl<'a> PageElement<'a> {
    pub(crate) fn new(dom: &'a ArenaDom, id: ArenaNodeId) -> Self {
        Self { dom, id }
    }

    fn at(&self, id: ArenaNodeId) -> Self {
        Self::new(self.dom, id)
    }

    fn sibling_element(&self, forward: bool) -> Option<Self> {
        let step = |id: ArenaNodeId| -> Option<ArenaNodeId> {
            let node = self.dom.get(id)?;
            if forward { node.next_sibling } else { node.prev_sibling }
        };
        std::iter::successors(step(self.id), |&id| step(id))
            .find(|&id| self.dom.is_element(id))
            .map(|id| self.at(id))
    }
}

impl fmt::Debug for PageElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageElement({:?})", self.dom.element_name(self.id))
    }
}

impl selectors::Element for PageElement<'_> {
    type Impl = PageSelectors;

    fn opaque(&self) -> OpaqueElement {
        OpaqueElement::new(self)
    }

    fn parent_element(&self) -> Option<Self> {
        self.dom
            .parent(self.id)
            .filter(|&p| self.dom.is_element(p))
            .map(|p| self.at(p))
    }

    fn parent_node_is_shadow_root(&self) -> bool {
        false
    }

    fn containing_shadow_host(&self) -> Option<Self> {
        None
    }

    fn is_pseudo_element(&self) -> bool {
        false
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.sibling_element(false)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.sibling_element(true)
    }

    fn first_element_child(&self) -> Option<Self> {
        self.dom.first_element_child(self.id).map(|c| self.at(c))
    }

    fn is_html_element_in_html_document(&self) -> bool {
        true
    }

    fn has_local_name(&self, name: &CssString) -> bool {
        self.dom
            .element_name(self.id)
            .is_some_and(|own| &**own == name.as_str())
    }

    fn has_namespace(&self, ns: &CssString) -> bool {
        self.dom
            .element_namespace(self.id)
            .is_some_and(|own| &**own == ns.as_str())
    }

    fn is_same_type(&self, other: &Self) -> bool {
        self.dom.element_name(self.id) == other.dom.element_name(other.id)
    }

    fn attr_matches(
        &self,
        ns: &NamespaceConstraint<&CssString>,
        local_name: &CssString,
        operation: &AttrSelectorOperation<&CssString>,
    ) -> bool {
        self.dom.attrs(self.id).iter().any(|attr| {
            let in_namespace = match ns {
                NamespaceConstraint::Any => true,
                NamespaceConstraint::Specific(ns) => &*attr.name.ns == ns.as_str(),
            };
            in_namespace && &*attr.name.local == local_name.as_str() && operation.eval_str(&attr.value)
        })
    }

    fn match_non_ts_pseudo_class(
        &self,
        pc: &Never,
        _context: &mut MatchingContext<'_, PageSelectors>,
    ) -> bool {
        match *pc {}
    }

    fn match_pseudo_element(
        &self,
        pe: &Never,
        _context: &mut MatchingContext<'_, PageSelectors>,
    ) -> bool {
        match *pe {}
    }

    fn is_link(&self) -> bool {
        self.dom.is_tag(self.id, "a") && self.dom.get_attr(self.id, "href").is_some()
    }

    fn is_html_slot_element(&self) -> bool {
        false
    }

    fn has_id(&self, id: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .element_id(self.id)
            .is_some_and(|own| case_sensitivity.eq(own.as_bytes(), id.as_str().as_bytes()))
    }

    fn has_class(&self, name: &CssString, case_sensitivity: CaseSensitivity) -> bool {
        self.dom
            .element_classes(self.id)
            .iter()
            .any(|c| case_sensitivity.eq(c.as_bytes(), name.as_str().as_bytes()))
    }

    fn imported_part(&self, _name: &CssString) -> Option<CssString> {
        None
    }

    fn is_part(&self, _name: &CssString) -> bool {
        false
    }

    /// No element children and no non-empty text.
    fn is_empty(&self) -> bool {
        !self.dom.children(self.id).any(|child| {
            match self.dom.get(child).map(|n| &n.data) {
                Some(ArenaNodeData::Element { .. }) => true,
                Some(ArenaNodeData::Text(t)) => !t.is_empty(),
                _ => false,
            }
        })
    }

    fn is_root(&self) -> bool {
        self.dom
            .parent(self.id)
            .and_then(|p| self.dom.get(p))
            .is_some_and(|p| matches!(p.data, ArenaNodeData::Document))
    }

    fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

    fn add_element_unique_hashes(&self, _filter: &mut selectors::bloom::BloomFilter) -> bool {
        false
    }

    fn has_custom_state(&self, _name: &CssString) -> bool {
        false
    }
}
