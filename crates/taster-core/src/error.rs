//! Error taxonomy for the taster core.
//!
//! Only session-level faults are errors here. Per-combination render failures
//! and per-taster faults are recorded as data on `CombinationRun` and
//! `TasterResult` instead.

/// A user selection that does not fit the template's option schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSelection {
    #[error("unknown option: {option}")]
    UnknownOption { option: String },

    #[error("invalid value '{value}' for option '{option}'; valid choices: {choices:?}")]
    InvalidValue {
        option: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("option '{option}' declares no choices")]
    NoChoices { option: String },

    #[error("option '{option}' is declared more than once")]
    DuplicateOption { option: String },
}

/// Errors produced by the taster core.
#[derive(Debug, thiserror::Error)]
pub enum TasterError {
    #[error("invalid selection: {0}")]
    InvalidSelection(#[from] InvalidSelection),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for taster core operations.
pub type Result<T> = std::result::Result<T, TasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_display_lists_choices() {
        let err = InvalidSelection::InvalidValue {
            option: "color".to_string(),
            value: "purple".to_string(),
            choices: vec!["red".to_string(), "blue".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("purple"));
        assert!(msg.contains("color"));
        assert!(msg.contains("red"));
    }

    #[test]
    fn test_selection_error_converts_into_taster_error() {
        let err: TasterError = InvalidSelection::UnknownOption {
            option: "flavor".to_string(),
        }
        .into();
        assert!(err.to_string().contains("invalid selection"));
        assert!(err.to_string().contains("flavor"));
    }
}
