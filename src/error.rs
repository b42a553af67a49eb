//! Error types for the EW effect engine.
//!
//! Configuration problems surface from `initialize` and from the
//! technique/context mutators. Runtime policy misses (no per-type data,
//! no mitigating effect) are never errors and do not appear here.

use thiserror::Error;

/// Errors raised while wiring or initializing techniques and effects.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Technique '{id}' is already defined")]
    DuplicateTechnique {
        id: String,
    },

    #[error("Effect '{effect}' is already defined on technique '{technique}'")]
    DuplicateEffect {
        technique: String,
        effect: String,
    },

    #[error("Technique '{id}' is not defined")]
    UnknownTechnique {
        id: String,
    },

    #[error("Effect '{effect}': an auxiliary antenna pattern must be defined")]
    MissingAntennaPattern {
        effect: String,
    },

    #[error("Effect '{effect}': no cancellation ratios defined{}", .count.map(|n| format!(" for {n} canceled jammer(s)")).unwrap_or_default())]
    MissingCancellationRatios {
        effect: String,
        count: Option<u32>,
    },

    #[error("Effect '{effect}': false-target type '{name}' is not defined")]
    MissingFalseTarget {
        effect: String,
        name: String,
    },

    #[error("Effect '{effect}': consistent false target '{name}' must be referenced by type, not defined inline")]
    InconsistentFalseTarget {
        effect: String,
        name: String,
    },

    #[error("Invalid table: {reason}")]
    InvalidTable {
        reason: String,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        field: String,
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for an out-of-range scalar.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum EwError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl EwError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

impl From<serde_json::Error> for EwError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for EW engine operations.
pub type EwResult<T> = Result<T, EwError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ratios_message_names_the_count() {
        let err = ConfigError::MissingCancellationRatios {
            effect: "slc".to_string(),
            count: Some(3),
        };
        let msg = format!("{err}");
        assert!(msg.contains("slc"));
        assert!(msg.contains("3 canceled"));

        let err = ConfigError::MissingCancellationRatios {
            effect: "slc".to_string(),
            count: None,
        };
        assert!(!format!("{err}").contains("canceled"));
    }

    #[test]
    fn config_errors_convert_into_top_level() {
        let err: EwError = ConfigError::UnknownTechnique {
            id: "noise".to_string(),
        }
        .into();
        assert!(err.is_config());
        assert!(!err.is_internal());
        assert!(format!("{err}").contains("noise"));
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let Err(json_err) = parse else {
            panic!("expected parse failure");
        };
        let err = EwError::from(json_err);
        assert!(matches!(err, EwError::Serialization { .. }));
    }

    #[test]
    fn internal_helper_sets_message() {
        let err = EwError::internal("guard left set");
        assert!(err.is_internal());
        assert!(format!("{err}").contains("guard left set"));
    }
}
