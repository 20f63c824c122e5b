//! Binary assets referenced by pages.

use std::fmt;
use std::sync::Arc;

use super::ident::SharedName;
use crate::error::{Error, Result};
use crate::util::{extension_for_media_type, sha1_hex};

/// An immutable blob (image, stylesheet, ...) with a renameable name.
///
/// Clones share both the bytes and the name cell, so renaming any copy
/// renames all of them and every reference bound to them.
#[derive(Clone)]
pub struct Resource {
    name: SharedName,
    data: Arc<[u8]>,
    media_type: String,
}

impl Resource {
    /// Name the resource after its content: `<sha1><ext>`.
    ///
    /// Fails when the media type has no known file extension.
    pub fn new(data: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Result<Self> {
        let data: Vec<u8> = data.into();
        let media_type = media_type.into();
        let ext = extension_for_media_type(&media_type).ok_or_else(|| Error::UnknownMediaType {
            media_type: media_type.clone(),
            node: "resource".to_string(),
        })?;
        let name = format!("{}{}", sha1_hex(&data), ext);
        Ok(Self::with_name(name, data, media_type))
    }

    /// Use a caller-supplied name.
    pub fn with_name(
        name: impl Into<String>,
        data: impl Into<Vec<u8>>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            name: SharedName::new(name),
            data: Arc::from(data.into()),
            media_type: media_type.into(),
        }
    }

    /// Identifier, which is also the file name in a container.
    pub fn id(&self) -> String {
        self.name.get()
    }

    /// Rename the resource. Bound references follow the new name.
    pub fn rename(&self, name: impl Into<String>) {
        self.name.set(name);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// SHA-1 of the bytes.
    pub fn hash(&self) -> String {
        sha1_hex(&self.data)
    }

    pub(crate) fn handle(&self) -> SharedName {
        self.name.clone()
    }

    /// Whether `other` is the same resource (shares the name cell).
    pub fn same_as(&self, other: &Resource) -> bool {
        self.name.same_cell(&other.name)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id())
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}
