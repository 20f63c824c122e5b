//! Metadata blocks: the `div[data-type=metadata]` every page and binder
//! document opens with.

use crate::model::{Metadata, Person, PersonRole, Resource};
use crate::util::{escape_text, escape_xml};

/// Renders a [`Metadata`] record as a hidden, role-tagged block.
pub struct MetadataBlock<'a> {
    metadata: &'a Metadata,
    resources: &'a [Resource],
    translucent: bool,
    pointer: bool,
    person_anchors: bool,
}

impl<'a> MetadataBlock<'a> {
    pub fn new(metadata: &'a Metadata) -> Self {
        Self {
            metadata,
            resources: &[],
            translucent: false,
            pointer: false,
            person_anchors: false,
        }
    }

    /// Mark the block as belonging to a binder without identity.
    pub fn translucent(mut self, translucent: bool) -> Self {
        self.translucent = translucent;
        self
    }

    /// Mark the block as belonging to a document pointer.
    pub fn pointer(mut self, pointer: bool) -> Self {
        self.pointer = pointer;
        self
    }

    /// List resources under `[data-type=resources]`.
    pub fn resources(mut self, resources: &'a [Resource]) -> Self {
        self.resources = resources;
        self
    }

    /// Give each person an `id` anchor with a `display-seq` refinement.
    ///
    /// Only standalone documents use anchors; in a flattened book the same
    /// person appears on many pages and the anchors would collide.
    pub fn person_anchors(mut self, anchors: bool) -> Self {
        self.person_anchors = anchors;
        self
    }

    pub fn render(&self) -> String {
        let md = self.metadata;
        let mut out = String::from(r#"<div data-type="metadata" style="display: none;">"#);

        out.push_str(&format!(
            r#"<h1 data-type="document-title" itemprop="name">{}</h1>"#,
            escape_text(md.title.as_deref().unwrap_or_default())
        ));
        if self.translucent {
            out.push_str(r#"<span data-type="binding" data-value="translucent"></span>"#);
        }
        if self.pointer {
            out.push_str(r#"<span data-type="document" data-value="pointer"></span>"#);
        }
        if let Some(uri) = &md.archive_uri {
            out.push_str(&format!(
                r#"<span data-type="cnx-archive-uri" data-value="{}"></span>"#,
                escape_xml(uri)
            ));
        }
        if let Some(short_id) = &md.short_id {
            out.push_str(&format!(
                r#"<span data-type="cnx-archive-shortid" data-value="{}"></span>"#,
                escape_xml(short_id)
            ));
        }
        if let Some(language) = &md.language {
            out.push_str(&format!(
                r#"<meta itemprop="inLanguage" data-type="language" content="{}"/>"#,
                escape_xml(language)
            ));
        }
        if let Some(created) = &md.created {
            out.push_str(&format!(
                r#"<meta itemprop="dateCreated" content="{}"/>"#,
                escape_xml(created)
            ));
        }
        if let Some(revised) = &md.revised {
            out.push_str(&format!(
                r#"<meta itemprop="dateModified" content="{}"/>"#,
                escape_xml(revised)
            ));
        }

        for role in PersonRole::ALL {
            for (index, person) in md.persons(role).iter().enumerate() {
                self.write_person(role, index + 1, person, &mut out);
            }
        }

        if let Some(uri) = &md.derived_from_uri {
            out.push_str(&format!(
                r#"<a href="{}" itemprop="isDerivedFromURL" data-type="derived-from">{}</a>"#,
                escape_xml(uri),
                escape_text(md.derived_from_title.as_deref().unwrap_or_default())
            ));
        }
        if let Some(style) = &md.print_style {
            out.push_str(&format!(
                r#"<span data-type="print-style" data-value="{}">{}</span>"#,
                escape_xml(style),
                escape_text(style)
            ));
        }
        if let Some(url) = &md.license_url {
            out.push_str(&format!(
                r#"<a href="{}" itemprop="dc:license,lrmi:useRightsURL" data-type="license">{}</a>"#,
                escape_xml(url),
                escape_text(md.license_text.as_deref().unwrap_or_default())
            ));
        }
        if let Some(summary) = &md.summary {
            out.push_str(r#"<div itemprop="description" data-type="description">"#);
            out.push_str(summary);
            out.push_str("</div>");
        }
        for keyword in &md.keywords {
            out.push_str(&format!(
                r#"<div itemprop="keywords" data-type="keyword">{}</div>"#,
                escape_text(keyword)
            ));
        }
        for subject in &md.subjects {
            out.push_str(&format!(
                r#"<div itemprop="about" data-type="subject">{}</div>"#,
                escape_text(subject)
            ));
        }
        if !self.resources.is_empty() {
            out.push_str(r#"<div data-type="resources"><ul>"#);
            for resource in self.resources {
                let id = escape_xml(&resource.id());
                out.push_str(&format!(r#"<li><a href="{id}">{id}</a></li>"#));
            }
            out.push_str("</ul></div>");
        }

        out.push_str("</div>");
        out
    }

    fn write_person(&self, role: PersonRole, seq: usize, person: &Person, out: &mut String) {
        let kind = role.data_type();
        out.push_str("<span");
        if self.person_anchors {
            out.push_str(&format!(r#" id="{kind}-{seq}""#));
        }
        out.push_str(&format!(
            r#" itemscope="itemscope" itemtype="http://schema.org/Person" itemprop="{}" data-type="{kind}"><a"#,
            role.itemprop()
        ));
        if let Some(id) = &person.id {
            out.push_str(&format!(r#" href="{}""#, escape_xml(id)));
        }
        out.push_str(r#" itemprop="url""#);
        if let Some(scheme) = &person.kind {
            out.push_str(&format!(r#" data-type="{}""#, escape_xml(scheme)));
        }
        out.push_str(&format!(">{}</a></span>", escape_text(&person.name)));
        if self.person_anchors {
            out.push_str(&format!(
                r##"<meta refines="#{kind}-{seq}" property="display-seq" content="{seq}"/>"##
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::extract::{MetadataContext, find_metadata_block, parse_metadata};

    fn sample() -> Metadata {
        Metadata::new("Forces & Motion")
            .with_language("en")
            .with_license("http://creativecommons.org/licenses/by/4.0/", Some("CC BY"))
            .with_summary("<p>About <em>forces</em>.</p>")
            .with_person(
                PersonRole::Author,
                Person::new("Ann").with_id("https://x/ann").with_kind("cnx-id"),
            )
            .with_person(PersonRole::Author, Person::new("Bob"))
            .with_person(PersonRole::CopyrightHolder, Person::new("Rice"))
            .with_keyword("force")
            .with_subject("Science")
            .with_archive_uri("e78d4f90@3")
            .with_short_id("54_PkC")
    }

    #[test]
    fn test_block_extracts_back() {
        for anchors in [true, false] {
            let md = sample();
            let html = MetadataBlock::new(&md).person_anchors(anchors).render();
            let dom = parse_html(&html);
            let root = find_metadata_block(&dom, dom.document()).unwrap();
            let parsed = parse_metadata(&dom, root, MetadataContext::Package).unwrap();
            assert_eq!(parsed, md, "anchors: {anchors}");
        }
    }

    #[test]
    fn test_markers_and_resources() {
        let md = Metadata::new("Part");
        let resource = Resource::with_name("cover.png", b"".to_vec(), "image/png");
        let html = MetadataBlock::new(&md)
            .translucent(true)
            .pointer(true)
            .resources(std::slice::from_ref(&resource))
            .render();
        assert!(html.contains(r#"<span data-type="binding" data-value="translucent"></span>"#));
        assert!(html.contains(r#"<span data-type="document" data-value="pointer"></span>"#));
        assert!(html.contains(r#"<li><a href="cover.png">cover.png</a></li>"#));
    }

    #[test]
    fn test_anchor_refinements() {
        let md = sample();
        let html = MetadataBlock::new(&md).person_anchors(true).render();
        assert!(html.contains(r#"id="author-2""#));
        assert!(html.contains(r##"<meta refines="#author-2" property="display-seq" content="2"/>"##));
        let plain = MetadataBlock::new(&md).render();
        assert!(!plain.contains("author-1"));
    }
}
