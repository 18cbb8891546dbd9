//! Error types for the SSO harness
//!
//! Failures split into two classes with different retry policy: configuration
//! errors (environment/setup problems, never retried) and everything else
//! (transient probing that exhausted its deadline, driver faults).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Missing required environment variable: {name}\nAdd it to the environment, e.g. {hint}")]
    MissingEnv { name: String, hint: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },

    #[error("Could not find a \"Forgot password\" link/button")]
    ForgotPasswordNotFound,

    #[error("Timed out waiting for: {0}")]
    Timeout(String),

    #[error("Browser error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Configuration-class errors indicate environment/setup problems rather
    /// than UI flakiness; the runner does not retry them.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            HarnessError::MissingEnv { .. }
                | HarnessError::InvalidEnv { .. }
                | HarnessError::ForgotPasswordNotFound
        )
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_names_the_variable() {
        let err = HarnessError::MissingEnv {
            name: "AUTH_PASS".into(),
            hint: "AUTH_PASS=\"your#StrongP@ss\"".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("AUTH_PASS"));
        assert!(msg.contains("Missing required environment variable"));
    }

    #[test]
    fn config_classification() {
        assert!(HarnessError::ForgotPasswordNotFound.is_config_error());
        assert!(HarnessError::MissingEnv {
            name: "AUTH_EMAIL".into(),
            hint: "AUTH_EMAIL=value".into()
        }
        .is_config_error());
        assert!(!HarnessError::Timeout("password field".into()).is_config_error());
    }
}
