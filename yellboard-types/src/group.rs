//! Group identifiers and the broker topics scoped by them.

use crate::error::{TypesError, TypesResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix of the topic carrying library announcements.
pub const LISTING_SUFFIX: &str = "sounds";
/// Suffix of the request/reply topic serving clip bytes.
pub const PAYLOAD_SUFFIX: &str = "sounds.payload";
/// Suffix of the topic carrying playback requests.
pub const PLAYBACK_SUFFIX: &str = "playback";

/// Opaque identifier of one synchronization group.
///
/// The id doubles as the name of the group's storage subdirectory and as the
/// prefix of every broker topic, so it must be usable as both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> TypesResult<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id
                .chars()
                .any(|c| matches!(c, '/' | '\\' | '*' | '>' | '\0') || c.is_whitespace());
        if !valid {
            return Err(TypesError::InvalidGroupId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Broker topics for this group.
    pub fn topics(&self) -> Topics {
        Topics {
            listing: format!("{}.{LISTING_SUFFIX}", self.0),
            payload: format!("{}.{PAYLOAD_SUFFIX}", self.0),
            playback: format!("{}.{PLAYBACK_SUFFIX}", self.0),
        }
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for GroupId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

impl AsRef<str> for GroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The three topics a group session uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// `{group}.sounds`: publish/subscribe library announcements.
    pub listing: String,
    /// `{group}.sounds.payload`: request/reply clip transfer.
    pub payload: String,
    /// `{group}.playback`: publish/subscribe playback requests.
    pub playback: String,
}
