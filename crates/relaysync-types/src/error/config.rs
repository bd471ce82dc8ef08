//! Configuration-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while resolving startup configuration.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// A value could not be parsed (URL, CIDR, number)
    #[error("Config parse error: {message}")]
    ParseError {
        /// Description of the parse failure
        message: String,
    },

    /// Config validation error (invalid values)
    #[error("Config validation error for {field}: {message}")]
    ValidationError {
        /// Name of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },
}

impl ConfigError {
    /// Flatten `validator` output into the first offending field.
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let first = errors.field_errors().into_iter().next();
        match first {
            Some((field, errs)) => {
                let message = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(ToString::to_string))
                    .unwrap_or_else(|| {
                        errs.first().map(|e| e.code.to_string()).unwrap_or_default()
                    });
                Self::ValidationError { field: field.to_string(), message }
            },
            None => Self::ValidationError { field: "config".to_string(), message: errors.to_string() },
        }
    }
}
