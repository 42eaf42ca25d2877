//! Error types and handling for the morning briefing

use thiserror::Error;

/// Main error type for the `MorningBot` library
#[derive(Error, Debug)]
pub enum MorningBotError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Remote service communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Malformed payloads from a remote service
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A looked-up item is absent from an otherwise valid payload
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Calendar authentication failures
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// The assembled message could not be handed to its channel
    #[error("Delivery error: {message}")]
    Delivery { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MorningBotError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a new authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new delivery error
    pub fn delivery<S: Into<String>>(message: S) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            MorningBotError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file and TMB_* variables.")
            }
            MorningBotError::Api { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            MorningBotError::Parse { .. } => {
                "A service returned data in an unexpected format. No briefing was sent.".to_string()
            }
            MorningBotError::NotFound { message } => format!("Not found: {message}"),
            MorningBotError::Auth { .. } => {
                "Calendar authentication failed. Rerun to start the consent flow again.".to_string()
            }
            MorningBotError::Delivery { .. } => {
                "The briefing was assembled but could not be delivered.".to_string()
            }
            MorningBotError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for MorningBotError {
    fn from(err: reqwest::Error) -> Self {
        // request URLs may carry API keys
        let err = err.without_url();
        if err.is_decode() {
            Self::parse(err.to_string())
        } else {
            Self::api(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MorningBotError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<quick_xml::DeError> for MorningBotError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::parse(err.to_string())
    }
}

impl From<config::ConfigError> for MorningBotError {
    fn from(err: config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}
