//! Book resources and their page links

pub mod index;
pub mod types;

use thiserror::Error;

pub use index::ResourceIndex;
pub use types::{Asset, Link, Resource, ResourceImage, ResourceWithLink, Role};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("unknown link: {0}")]
    UnknownLink(String),

    #[error("link {link_id} points at resource {link_resource_id}, not {resource_id}")]
    LinkMismatch {
        link_id: String,
        link_resource_id: String,
        resource_id: String,
    },

    #[error("asset {asset_id}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        asset_id: i64,
        expected: u64,
        actual: u64,
    },

    #[error("asset {asset_id}: checksum mismatch (expected {expected}, got {actual})")]
    ChecksumMismatch {
        asset_id: i64,
        expected: String,
        actual: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
