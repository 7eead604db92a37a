//! Frames pushed to realtime clients.

use crate::error::TypesResult;
use crate::snapshot::LibrarySnapshot;
use serde::{Deserialize, Serialize};

/// Server-to-client JSON frame.
///
/// Encodes as a single-key object: `{"salutation": ...}`, `{"sounds": [...]}`
/// or `{"playing": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerFrame {
    Salutation(String),
    Sounds(LibrarySnapshot),
    Playing(String),
}

impl ServerFrame {
    pub fn to_json(&self) -> TypesResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
