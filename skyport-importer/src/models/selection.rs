//! Selection handles and requests

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque reference to a persisted selection artifact
///
/// Only meaningful to the session that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionHandle(Uuid);

impl SelectionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SelectionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SelectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SelectionHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Body of `POST /import/start`
///
/// Positions arrive string-encoded, as submitted by the selection form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub tweet_indices: Vec<String>,
    /// When true, `tweet_indices` lists the positions to exclude
    #[serde(default)]
    pub inversion: bool,
}
