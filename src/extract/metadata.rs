//! Role-tagged metadata blocks.
//!
//! A metadata block tags each value with a `data-type` attribute:
//!
//! ```html
//! <div data-type="metadata">
//!   <h1 data-type="document-title">Physics</h1>
//!   <span data-type="author" id="author-1"><a href="https://x/u" data-type="cnx-id">Ann</a></span>
//!   <meta refines="#author-1" property="display-seq" content="1"/>
//!   <a data-type="license" href="http://creativecommons.org/licenses/by/4.0/">CC BY</a>
//! </div>
//! ```

use std::iter;

use crate::dom::{ArenaDom, ArenaNodeId, inner_html};
use crate::error::{Error, Result};
use crate::model::{Metadata, Person, PersonRole};

/// Where a metadata block comes from; decides which fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataContext {
    /// Page or binder navigation item inside a package.
    Package,
    /// Document pointer page.
    Pointer,
    /// Structural element of a flattened document.
    Reconstituted,
}

impl MetadataContext {
    fn required(self) -> &'static [&'static str] {
        match self {
            MetadataContext::Package => &["title", "license_url"],
            MetadataContext::Pointer => &["title", "archive_uri"],
            MetadataContext::Reconstituted => &["title"],
        }
    }
}

/// Reads a [`Metadata`] record out of the subtree under `root`.
pub struct MetadataParser<'a> {
    dom: &'a ArenaDom,
    root: ArenaNodeId,
    context: MetadataContext,
    strict: bool,
    label: String,
}

impl<'a> MetadataParser<'a> {
    pub fn new(dom: &'a ArenaDom, root: ArenaNodeId, context: MetadataContext) -> Self {
        Self {
            dom,
            root,
            context,
            strict: true,
            label: "metadata".to_string(),
        }
    }

    /// Return whatever is present instead of failing on missing fields.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Name used in error messages (usually the item or node id).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn parse(&self) -> Result<Metadata> {
        let mut metadata = Metadata {
            title: self.first_text("document-title"),
            language: self.language(),
            summary: self
                .tagged("description")
                .next()
                .map(|id| inner_html(self.dom, id)),
            keywords: self.tagged("keyword").map(|id| self.dom.text(id)).collect(),
            subjects: self.tagged("subject").map(|id| self.dom.text(id)).collect(),
            created: self.meta_itemprop("dateCreated"),
            revised: self.meta_itemprop("dateModified"),
            archive_uri: self.first_value("cnx-archive-uri"),
            short_id: self.first_value("cnx-archive-shortid"),
            derived_from_uri: self
                .tagged("derived-from")
                .find_map(|id| self.dom.get_attr(id, "href"))
                .map(str::to_string),
            derived_from_title: self.first_text("derived-from"),
            print_style: self.tagged("print-style").next().map(|id| {
                self.dom
                    .get_attr(id, "data-value")
                    .map(str::to_string)
                    .unwrap_or_else(|| self.dom.text(id))
            }),
            ..Metadata::default()
        };

        if let Some(license) = self.license() {
            metadata.license_url = self.dom.get_attr(license, "href").map(str::to_string);
            let text = self.dom.text(license);
            metadata.license_text = (!text.trim().is_empty()).then_some(text);
        }

        for role in PersonRole::ALL {
            *metadata.persons_mut(role) = self.persons(role);
        }

        if self.strict {
            for &field in self.context.required() {
                let present = match field {
                    "title" => metadata.title.is_some(),
                    "license_url" => metadata.license_url.is_some(),
                    "archive_uri" => metadata.archive_uri.is_some(),
                    _ => true,
                };
                if !present {
                    return Err(Error::missing(field, self.label.clone()));
                }
            }
        }
        Ok(metadata)
    }

    fn subtree(&self) -> impl Iterator<Item = ArenaNodeId> + 'a {
        subtree(self.dom, self.root)
    }

    fn tagged(&self, data_type: &'a str) -> impl Iterator<Item = ArenaNodeId> + 'a {
        let dom = self.dom;
        self.subtree()
            .filter(move |&id| dom.get_attr(id, "data-type") == Some(data_type))
    }

    fn first_text(&self, data_type: &'a str) -> Option<String> {
        self.tagged(data_type).next().map(|id| self.dom.text(id))
    }

    fn first_value(&self, data_type: &'a str) -> Option<String> {
        self.tagged(data_type)
            .find_map(|id| self.dom.get_attr(id, "data-value"))
            .map(str::to_string)
    }

    fn meta_itemprop(&self, itemprop: &str) -> Option<String> {
        self.subtree()
            .filter(|&id| self.dom.is_tag(id, "meta"))
            .filter(|&id| self.dom.get_attr(id, "itemprop") == Some(itemprop))
            .find_map(|id| self.dom.get_attr(id, "content"))
            .map(str::to_string)
    }

    /// `[data-type=language]@content` inside the block, else the nearest
    /// `lang` on the block or its ancestors.
    fn language(&self) -> Option<String> {
        let tagged = self
            .tagged("language")
            .filter_map(|id| self.dom.get_attr(id, "content"))
            .last();
        if let Some(language) = tagged {
            return Some(language.to_string());
        }
        let mut current = Some(self.root);
        while let Some(id) = current {
            if let Some(lang) = self.dom.get_attr(id, "lang") {
                return Some(lang.to_string());
            }
            current = self.dom.parent(id);
        }
        None
    }

    /// The license element in the block, else in the nearest metadata block
    /// attached to an ancestor.
    fn license(&self) -> Option<ArenaNodeId> {
        let is_license = |id: ArenaNodeId| self.dom.get_attr(id, "data-type") == Some("license");
        if let Some(found) = self.subtree().filter(|&id| is_license(id)).last() {
            return Some(found);
        }
        let mut current = self.dom.parent(self.root);
        while let Some(ancestor) = current {
            let found = self
                .dom
                .element_children(ancestor)
                .filter(|&c| c != self.root && self.dom.get_attr(c, "data-type") == Some("metadata"))
                .flat_map(|block| subtree(self.dom, block))
                .filter(|&id| is_license(id))
                .last();
            if found.is_some() {
                return found;
            }
            current = self.dom.parent(ancestor);
        }
        None
    }

    /// Persons tagged with `role`, in display order.
    fn persons(&self, role: PersonRole) -> Vec<Person> {
        let mut ordered: Vec<(Option<i64>, Person)> = self
            .tagged(role.data_type())
            .map(|id| {
                let person = match self.dom.first_element_child(id) {
                    Some(link) => Person {
                        name: self.dom.text(link).trim().to_string(),
                        id: self.dom.get_attr(link, "href").map(str::to_string),
                        kind: self.dom.get_attr(link, "data-type").map(str::to_string),
                    },
                    None => Person::new(self.dom.text(id).trim()),
                };
                let order = self
                    .dom
                    .element_id(id)
                    .and_then(|anchor| self.display_seq(anchor));
                (order, person)
            })
            .collect();
        sort_by_display_seq(&mut ordered);
        ordered.into_iter().map(|(_, person)| person).collect()
    }

    fn display_seq(&self, anchor: &str) -> Option<i64> {
        let refines = format!("#{anchor}");
        self.subtree()
            .filter(|&id| self.dom.is_tag(id, "meta"))
            .filter(|&id| {
                self.dom.get_attr(id, "refines") == Some(refines.as_str())
                    && self.dom.get_attr(id, "property") == Some("display-seq")
            })
            .find_map(|id| self.dom.get_attr(id, "content"))
            .and_then(|content| content.trim().parse().ok())
    }
}

/// Stable sort: ascending display sequence, unrefined entries last.
pub fn sort_by_display_seq<T>(entries: &mut [(Option<i64>, T)]) {
    entries.sort_by_key(|(order, _)| (order.is_none(), order.unwrap_or_default()));
}

/// Parse with the given context, failing on missing required fields.
pub fn parse_metadata(dom: &ArenaDom, root: ArenaNodeId, context: MetadataContext) -> Result<Metadata> {
    MetadataParser::new(dom, root, context).parse()
}

/// Whether the subtree marks its page as a pointer to an external page.
pub fn is_document_pointer(dom: &ArenaDom, root: ArenaNodeId) -> bool {
    subtree(dom, root).any(|id| {
        dom.get_attr(id, "data-type") == Some("document")
            && dom.get_attr(id, "data-value") == Some("pointer")
    })
}

/// `root` followed by its descendants, pre-order.
pub(crate) fn subtree(dom: &ArenaDom, root: ArenaNodeId) -> impl Iterator<Item = ArenaNodeId> + '_ {
    iter::once(root).chain(dom.descendants(root))
}

/// The first element with `data-type="metadata"` under `root`.
pub fn find_metadata_block(dom: &ArenaDom, root: ArenaNodeId) -> Option<ArenaNodeId> {
    subtree(dom, root).find(|&id| dom.get_attr(id, "data-type") == Some("metadata"))
}
