//! RestartPolicyHint value object
//! Declared to the host's service supervisor; the orchestrator itself only
//! stores and reports it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Restart behavior the orchestrator asks its own service registration for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RestartPolicyHint {
    /// Never restart the orchestrator.
    Never,

    /// Restart the orchestrator only after an abnormal exit.
    #[default]
    OnCrash,

    /// Always restart the orchestrator, regardless of exit status.
    Always,
}

impl RestartPolicyHint {
    /// Parse from string representation (systemd-style).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "never" | "no" => Some(RestartPolicyHint::Never),
            "on-crash" | "oncrash" | "on-failure" => Some(RestartPolicyHint::OnCrash),
            "always" => Some(RestartPolicyHint::Always),
            _ => None,
        }
    }
}

impl fmt::Display for RestartPolicyHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPolicyHint::Never => write!(f, "never"),
            RestartPolicyHint::OnCrash => write!(f, "on-crash"),
            RestartPolicyHint::Always => write!(f, "always"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            RestartPolicyHint::parse("never"),
            Some(RestartPolicyHint::Never)
        );
        assert_eq!(
            RestartPolicyHint::parse("no"),
            Some(RestartPolicyHint::Never)
        );
        assert_eq!(
            RestartPolicyHint::parse("on-crash"),
            Some(RestartPolicyHint::OnCrash)
        );
        assert_eq!(
            RestartPolicyHint::parse("ALWAYS"),
            Some(RestartPolicyHint::Always)
        );
        assert_eq!(RestartPolicyHint::parse("invalid"), None);
    }

    #[test]
    fn test_display_round_trip() {
        for hint in [
            RestartPolicyHint::Never,
            RestartPolicyHint::OnCrash,
            RestartPolicyHint::Always,
        ] {
            assert_eq!(RestartPolicyHint::parse(&hint.to_string()), Some(hint));
        }
    }
}
