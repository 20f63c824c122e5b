//! Node identity: `id[@version]` and live, shareable names.

use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};

/// A string cell shared between an owner and everything bound to it.
///
/// Resources and nodes keep their identifier in a `SharedName`; references
/// bound to them hold a clone of the handle and read the current value
/// whenever their URI is requested.
#[derive(Clone)]
pub struct SharedName(Arc<RwLock<String>>);

impl SharedName {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::new(RwLock::new(value.into())))
    }

    /// Current value.
    pub fn get(&self) -> String {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the value; every clone observes the change.
    pub fn set(&self, value: impl Into<String>) {
        let value = value.into();
        match self.0.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }

    /// Whether two handles refer to the same cell.
    pub fn same_cell(&self, other: &SharedName) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SharedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.get())
    }
}

impl PartialEq for SharedName {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// Persistent identity of a node.
///
/// Cloning an `Ident` produces an independent cell: copies of a node can be
/// renamed without affecting the original.
#[derive(PartialEq)]
pub struct Ident {
    id: SharedName,
    version: Option<String>,
}

impl Ident {
    /// Parse `id` or `id@version`, splitting once on the first `@`.
    pub fn parse(value: &str) -> Result<Self> {
        let (id, version) = split_ident(value)?;
        Ok(Self {
            id: SharedName::new(id),
            version: version.map(str::to_string),
        })
    }

    /// Build from separate parts. `id` must not be empty or contain `@`.
    pub fn new(id: &str, version: Option<&str>) -> Result<Self> {
        if id.is_empty() || id.contains('@') || version.is_some_and(str::is_empty) {
            return Err(Error::InvalidIdentifier(match version {
                Some(v) => format!("{id}@{v}"),
                None => id.to_string(),
            }));
        }
        Ok(Self {
            id: SharedName::new(id),
            version: version.map(str::to_string),
        })
    }

    pub fn id(&self) -> String {
        self.id.get()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `id` if unversioned, else `id@version`.
    pub fn ident_hash(&self) -> String {
        match &self.version {
            Some(v) => format!("{}@{}", self.id.get(), v),
            None => self.id.get(),
        }
    }

    /// Replace the identifier. A value containing `@` also replaces the
    /// version; a bare id leaves the version untouched.
    pub fn set(&mut self, value: &str) -> Result<()> {
        let (id, version) = split_ident(value)?;
        self.id.set(id);
        if let Some(v) = version {
            self.version = Some(v.to_string());
        }
        Ok(())
    }

    pub fn set_version(&mut self, version: Option<&str>) {
        self.version = version.map(str::to_string);
    }

    /// Live handle to the id, for binding references.
    pub fn handle(&self) -> SharedName {
        self.id.clone()
    }
}

impl Clone for Ident {
    fn clone(&self) -> Self {
        Self {
            id: SharedName::new(self.id.get()),
            version: self.version.clone(),
        }
    }
}

impl fmt::Debug for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ident({})", self.ident_hash())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ident_hash())
    }
}

fn split_ident(value: &str) -> Result<(&str, Option<&str>)> {
    let (id, version) = match value.split_once('@') {
        Some((id, version)) => (id, Some(version)),
        None => (value, None),
    };
    if id.is_empty() || version.is_some_and(str::is_empty) {
        return Err(Error::InvalidIdentifier(value.to_string()));
    }
    Ok((id, version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_versioned() {
        let plain = Ident::parse("8d75ea29").unwrap();
        assert_eq!(plain.id(), "8d75ea29");
        assert_eq!(plain.version(), None);
        assert_eq!(plain.ident_hash(), "8d75ea29");

        let versioned = Ident::parse("e78d4f90@3").unwrap();
        assert_eq!(versioned.id(), "e78d4f90");
        assert_eq!(versioned.version(), Some("3"));
        assert_eq!(versioned.ident_hash(), "e78d4f90@3");
    }

    #[test]
    fn test_split_once_on_first_at() {
        let ident = Ident::parse("abc@1.2@x").unwrap();
        assert_eq!(ident.id(), "abc");
        assert_eq!(ident.version(), Some("1.2@x"));
    }

    #[test]
    fn test_empty_sides_rejected() {
        for bad in ["@3", "abc@", "@", ""] {
            assert!(
                matches!(Ident::parse(bad), Err(Error::InvalidIdentifier(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(Ident::new("a@b", None).is_err());
        assert!(Ident::new("a", Some("")).is_err());
    }

    #[test]
    fn test_set_splits_version() {
        let mut ident = Ident::parse("apple@1").unwrap();
        ident.set("pear@2").unwrap();
        assert_eq!(ident.ident_hash(), "pear@2");
        ident.set("plum").unwrap();
        assert_eq!(ident.ident_hash(), "plum@2");
        assert!(ident.set("plum@").is_err());
        assert_eq!(ident.ident_hash(), "plum@2");
    }

    #[test]
    fn test_handle_is_live_and_clone_is_not() {
        let mut ident = Ident::parse("one").unwrap();
        let handle = ident.handle();
        let copy = ident.clone();
        ident.set("two").unwrap();
        assert_eq!(handle.get(), "two");
        assert_eq!(copy.id(), "one");
        assert!(handle.same_cell(&ident.handle()));
        assert!(!handle.same_cell(&copy.handle()));
    }
}
