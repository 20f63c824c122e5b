//! Metadata and navigation extraction from markup.

mod metadata;
mod navigation;

pub use metadata::{
    MetadataContext, MetadataParser, find_metadata_block, is_document_pointer, parse_metadata,
    sort_by_display_seq,
};
pub use navigation::{NavItem, Navigation, nav_items, parse_navigation, parse_resources};

pub(crate) use metadata::subtree;
