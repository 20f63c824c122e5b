//! Metadata records attached to every node.

use serde::{Deserialize, Serialize};

/// A contributor entry (`{name, id, type}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    /// Account or profile URI identifying the person.
    pub id: Option<String>,
    /// Identity scheme of `id` (e.g. `cnx-id`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// The person lists a metadata record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonRole {
    Author,
    Editor,
    Illustrator,
    Translator,
    Publisher,
    CopyrightHolder,
}

impl PersonRole {
    pub const ALL: [PersonRole; 6] = [
        PersonRole::Author,
        PersonRole::Editor,
        PersonRole::Illustrator,
        PersonRole::Translator,
        PersonRole::Publisher,
        PersonRole::CopyrightHolder,
    ];

    /// Value of the `data-type` attribute tagging this role in markup.
    pub fn data_type(self) -> &'static str {
        match self {
            PersonRole::Author => "author",
            PersonRole::Editor => "editor",
            PersonRole::Illustrator => "illustrator",
            PersonRole::Translator => "translator",
            PersonRole::Publisher => "publisher",
            PersonRole::CopyrightHolder => "copyright-holder",
        }
    }

    /// schema.org property used for the role's microdata.
    pub fn itemprop(self) -> &'static str {
        match self {
            PersonRole::Author => "author",
            PersonRole::Editor => "editor",
            PersonRole::Illustrator => "illustrator",
            PersonRole::Translator => "contributor",
            PersonRole::Publisher => "publisher",
            PersonRole::CopyrightHolder => "copyrightHolder",
        }
    }
}

/// Semantic metadata of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub language: Option<String>,
    /// Serialized markup, not plain text.
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub subjects: Vec<String>,
    pub created: Option<String>,
    pub revised: Option<String>,
    pub license_text: Option<String>,
    pub license_url: Option<String>,
    pub authors: Vec<Person>,
    pub editors: Vec<Person>,
    pub illustrators: Vec<Person>,
    pub translators: Vec<Person>,
    pub publishers: Vec<Person>,
    pub copyright_holders: Vec<Person>,
    pub archive_uri: Option<String>,
    pub short_id: Option<String>,
    pub derived_from_uri: Option<String>,
    pub derived_from_title: Option<String>,
    pub print_style: Option<String>,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_license(mut self, url: impl Into<String>, text: Option<&str>) -> Self {
        self.license_url = Some(url.into());
        self.license_text = text.map(str::to_string);
        self
    }

    pub fn with_summary(mut self, markup: impl Into<String>) -> Self {
        self.summary = Some(markup.into());
        self
    }

    pub fn with_person(mut self, role: PersonRole, person: Person) -> Self {
        self.persons_mut(role).push(person);
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subjects.push(subject.into());
        self
    }

    pub fn with_archive_uri(mut self, uri: impl Into<String>) -> Self {
        self.archive_uri = Some(uri.into());
        self
    }

    pub fn with_short_id(mut self, short_id: impl Into<String>) -> Self {
        self.short_id = Some(short_id.into());
        self
    }

    pub fn persons(&self, role: PersonRole) -> &[Person] {
        match role {
            PersonRole::Author => &self.authors,
            PersonRole::Editor => &self.editors,
            PersonRole::Illustrator => &self.illustrators,
            PersonRole::Translator => &self.translators,
            PersonRole::Publisher => &self.publishers,
            PersonRole::CopyrightHolder => &self.copyright_holders,
        }
    }

    pub fn persons_mut(&mut self, role: PersonRole) -> &mut Vec<Person> {
        match role {
            PersonRole::Author => &mut self.authors,
            PersonRole::Editor => &mut self.editors,
            PersonRole::Illustrator => &mut self.illustrators,
            PersonRole::Translator => &mut self.translators,
            PersonRole::Publisher => &mut self.publishers,
            PersonRole::CopyrightHolder => &mut self.copyright_holders,
        }
    }
}
