//! Packages: named items plus manifest metadata, and their conversion to
//! and from the content model.
//!
//! A [`Container`] holds one [`Package`] per book. Each package has exactly
//! one navigation item (the book's table of contents); every other item is
//! a page document or a binary resource.

mod adapt;
mod directory;
mod make;
mod opf;

use std::borrow::Cow;

pub use adapt::adapt_package;
pub use directory::{read_container, write_container};
pub use make::{make_container, make_package, make_publication_container};
pub use opf::{parse_container_xml, parse_opf, write_container_xml, write_opf};

use crate::error::{Error, Result};
use crate::util::decode_markup;

/// Media type of page and navigation documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// One file of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// File name, unique within the package.
    pub name: String,
    pub data: Vec<u8>,
    pub media_type: String,
    pub is_navigation: bool,
    /// Manifest properties (`nav`, ...).
    pub properties: Vec<String>,
}

impl Item {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            media_type: media_type.into(),
            is_navigation: false,
            properties: Vec::new(),
        }
    }

    /// A navigation document (`properties="nav"`).
    pub fn navigation(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            is_navigation: true,
            properties: vec!["nav".to_string()],
            ..Self::new(name, data, XHTML_MEDIA_TYPE)
        }
    }

    pub fn is_markup(&self) -> bool {
        self.media_type.split(';').next().map(str::trim) == Some(XHTML_MEDIA_TYPE)
    }

    /// Item bytes decoded as text, honoring an XML encoding declaration.
    pub fn text(&self) -> Cow<'_, str> {
        decode_markup(&self.data)
    }
}

/// Manifest-level metadata of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub publisher: Option<String>,
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub license_text: Option<String>,
    pub license_url: Option<String>,
    pub publication_message: Option<String>,
}

/// An ordered set of items with exactly one navigation item.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    items: Vec<Item>,
    metadata: PackageMetadata,
    navigation: usize,
}

impl Package {
    /// Build a package, checking that exactly one item is flagged as
    /// navigation.
    pub fn new(name: impl Into<String>, items: Vec<Item>, metadata: PackageMetadata) -> Result<Self> {
        let name = name.into();
        let mut navigation = items.iter().enumerate().filter(|(_, item)| item.is_navigation);
        let first = navigation.next();
        let index = match (first, navigation.count()) {
            (None, _) => return Err(Error::MissingNavigation { package: name }),
            (Some((index, _)), 0) => index,
            (Some(_), extra) => {
                return Err(Error::AdditionalNavigation {
                    package: name,
                    count: extra + 1,
                });
            }
        };
        Ok(Self {
            name,
            items,
            metadata,
            navigation: index,
        })
    }

    /// File name of the package manifest (e.g. `8d75ea29@3.opf`).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    pub fn navigation(&self) -> &Item {
        &self.items[self.navigation]
    }

    /// Look an item up by name, also trying `<name>.xhtml`.
    pub fn grab_by_name(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.name == name).or_else(|| {
            let with_ext = format!("{name}.xhtml");
            self.items.iter().find(|item| item.name == with_ext)
        })
    }

    pub(crate) fn require(&self, name: &str) -> Result<&Item> {
        self.grab_by_name(name).ok_or_else(|| Error::MissingItem {
            name: name.to_string(),
            package: self.name.clone(),
        })
    }
}

/// The packages of one publication.
#[derive(Debug, Clone, Default)]
pub struct Container {
    pub packages: Vec<Package>,
}

impl Container {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }
}
