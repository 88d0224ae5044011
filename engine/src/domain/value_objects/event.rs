//! Outbound status events
//!
//! Notifications are best-effort: delivery failure is logged by the sink and
//! never affects orchestration.

use crate::domain::value_objects::SubjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of tick outcome being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Tick completed with an empty plan.
    NoDrift,
    /// All plan entries applied and the server restarted.
    Applied,
    /// At least one plan entry failed; the failing subject is listed.
    ApplyFailed,
    /// The server did not become live within the startup timeout.
    StartupTimeout,
    /// A running server was found dead outside the update path.
    Crashed,
    /// The server came back up after a crash.
    Recovered,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::NoDrift => write!(f, "no-drift"),
            EventKind::Applied => write!(f, "applied"),
            EventKind::ApplyFailed => write!(f, "apply-failed"),
            EventKind::StartupTimeout => write!(f, "startup-timeout"),
            EventKind::Crashed => write!(f, "crashed"),
            EventKind::Recovered => write!(f, "recovered"),
        }
    }
}

/// Wire payload handed to the notification sink after every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event_kind: EventKind,
    pub subjects: Vec<SubjectId>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn now(event_kind: EventKind, subjects: Vec<SubjectId>) -> Self {
        Self {
            event_kind,
            subjects,
            timestamp: Utc::now(),
        }
    }
}
