//! Error types and handling for Plumbum
//!
//! This module defines the error types used throughout the controller,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Plumbum operations
pub type Result<T> = std::result::Result<T, ChargerError>;

/// Main error type for Plumbum
#[derive(Debug, Error)]
pub enum ChargerError {
    /// Configuration-related errors (unknown mode, bad parameter)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Power supply communication errors
    #[error("Hardware communication error: {message}")]
    Hardware { message: String },

    /// Hard safety limit exceeded
    #[error("Safety violation: {message}")]
    Safety { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl ChargerError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new hardware communication error
    pub fn hardware<S: Into<String>>(message: S) -> Self {
        Self::Hardware {
            message: message.into(),
        }
    }

    /// Create a new safety violation error
    pub fn safety<S: Into<String>>(message: S) -> Self {
        Self::Safety {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// True for errors raised by the power interface
    pub const fn is_hardware(&self) -> bool {
        matches!(self, Self::Hardware { .. } | Self::Timeout { .. })
    }
}

impl From<std::io::Error> for ChargerError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for ChargerError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChargerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ChargerError::config("test config error");
        assert!(matches!(err, ChargerError::Config { .. }));

        let err = ChargerError::hardware("serial port gone");
        assert!(matches!(err, ChargerError::Hardware { .. }));
        assert!(err.is_hardware());

        let err = ChargerError::validation("field", "test validation error");
        assert!(matches!(err, ChargerError::Validation { .. }));
        assert!(!err.is_hardware());
    }

    #[test]
    fn test_error_display() {
        let err = ChargerError::config("Unknown charging mode: Boost");
        assert_eq!(
            format!("{}", err),
            "Configuration error: Unknown charging mode: Boost"
        );

        let err = ChargerError::validation("safety.min_voltage", "Must be positive");
        assert_eq!(
            format!("{}", err),
            "Validation error: safety.min_voltage - Must be positive"
        );
    }
}
