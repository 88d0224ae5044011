//! Subjects tracked for version drift
//!
//! A subject is either the server build itself or one add-on package. The
//! watch list comes from configuration and is fixed for the lifetime of the
//! orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a tracked subject (server build or add-on package).
///
/// Treated as opaque: no numeric or semantic-version meaning is attached,
/// which keeps content-addressed and hash-style identifiers working.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What category of content a subject refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// The game server build itself.
    ServerBuild,
    /// A subscribed add-on package (workshop mod or similar).
    Package,
}

/// A watched subject: identifier plus content category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub kind: SubjectKind,
}

impl Subject {
    pub fn server_build(id: impl Into<SubjectId>) -> Self {
        Self {
            id: id.into(),
            kind: SubjectKind::ServerBuild,
        }
    }

    pub fn package(id: impl Into<SubjectId>) -> Self {
        Self {
            id: id.into(),
            kind: SubjectKind::Package,
        }
    }

    pub fn is_server_build(&self) -> bool {
        self.kind == SubjectKind::ServerBuild
    }
}
