//! # Error Handling
//!
//! Error types for the meshplane listener model, defined with `thiserror`.
//!
//! Classification fallbacks (an unsupported declared protocol resolving to
//! `Auto`, an unknown transport code rendering as `"unknown"`, an unknown
//! tunnel bit rendering as `"notunnel"`) are documented defaults and never
//! surface here. The only failure produced by the model itself is
//! [`Error::Serialization`], raised by strict payload packing.

/// Custom result type for meshplane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for meshplane
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// A structured message could not be encoded into a typed payload
    #[error("Serialization error: failed to encode {type_url}")]
    Serialization {
        type_url: String,
        #[source]
        source: prost::EncodeError,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a serialization error for the given payload type
    pub fn serialization<S: Into<String>>(type_url: S, source: prost::EncodeError) -> Self {
        Self::Serialization { type_url: type_url.into(), source }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error came from payload packing
    pub fn is_serialization(&self) -> bool {
        matches!(self, Error::Serialization { .. })
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
