//! Core value types for yellboard.
//!
//! Everything peers exchange about a group's clip library is expressed
//! with the types in this crate:
//!
//! - [`GroupId`] names a synchronization group and derives its broker [`Topics`]
//! - [`SoundEntry`] names one clip file inside a group
//! - [`LibrarySnapshot`] is an immutable, ordered set of entries
//! - [`MissingSet`] is the transient result of diffing two snapshots
//! - [`ServerFrame`] is the JSON frame pushed to realtime clients

mod error;
mod frame;
mod group;
mod snapshot;
mod sound;

pub use error::{TypesError, TypesResult};
pub use frame::ServerFrame;
pub use group::{GroupId, Topics, LISTING_SUFFIX, PAYLOAD_SUFFIX, PLAYBACK_SUFFIX};
pub use snapshot::{missing, LibrarySnapshot, MissingSet};
pub use sound::{SoundEntry, PARTIAL_PREFIX};
