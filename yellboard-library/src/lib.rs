//! Local clip storage for yellboard.
//!
//! Clips live on disk as `storage_root/{group}/{file}`. [`LibraryIndex`]
//! turns a group directory into a [`LibrarySnapshot`], encodes snapshots for
//! the listing topic, and reads or atomically writes individual clips.

mod error;
mod index;

pub use error::{LibraryError, LibraryResult};
pub use index::LibraryIndex;
pub use yellboard_types::PARTIAL_PREFIX;
