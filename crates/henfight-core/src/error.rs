use serde::{Deserialize, Serialize};

/// How loudly a problem should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Problems reported through [`crate::diagnostics::Diagnostics`].
///
/// None of these stop the simulation: a missing collaborator degrades the
/// feature that needs it and an invalid operation is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    MissingDependency {
        owner: String,
        dependency: &'static str,
        severity: Severity,
    },
    InvalidOperation {
        owner: String,
        reason: String,
    },
}

impl CoreError {
    pub fn missing(owner: impl Into<String>, dependency: &'static str) -> Self {
        Self::MissingDependency {
            owner: owner.into(),
            dependency,
            severity: Severity::Error,
        }
    }

    pub fn missing_optional(owner: impl Into<String>, dependency: &'static str) -> Self {
        Self::MissingDependency {
            owner: owner.into(),
            dependency,
            severity: Severity::Warning,
        }
    }

    pub fn invalid(owner: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            owner: owner.into(),
            reason: reason.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingDependency { severity, .. } => *severity,
            Self::InvalidOperation { .. } => Severity::Error,
        }
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDependency {
                owner, dependency, ..
            } => write!(f, "{owner} is missing its {dependency}"),
            Self::InvalidOperation { owner, reason } => write!(f, "{owner}: {reason}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Result of a rate-limited action. Being rate limited is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Performed,
    RateLimited,
}

impl ActionOutcome {
    pub fn performed(self) -> bool {
        self == Self::Performed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_owner_and_dependency() {
        let e = CoreError::missing("Player 1", "egg prefab");
        assert_eq!(e.to_string(), "Player 1 is missing its egg prefab");
        assert_eq!(e.severity(), Severity::Error);
    }

    #[test]
    fn optional_dependencies_are_warnings() {
        let e = CoreError::missing_optional("Player 2", "particle effects");
        assert_eq!(e.severity(), Severity::Warning);
    }

    #[test]
    fn invalid_operation_display() {
        let e = CoreError::invalid("Door A", "could not teleport player, contact entity is null");
        assert_eq!(
            e.to_string(),
            "Door A: could not teleport player, contact entity is null"
        );
    }
}
