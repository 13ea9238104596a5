use thiserror::Error;

/// Crate-wide error type covering every failure mode of the dispatch
/// pipeline.
///
/// Construction-time validation problems surface as `Configuration` and
/// prevent a provider instance from ever existing; everything else is a
/// delivery-time failure propagated through `Provider::post`. None of the
/// variants are retried internally.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Invalid provider configuration: malformed endpoint, malformed
    /// compound routing string, missing mandatory credential
    #[error("{message}")]
    Configuration { message: String },

    /// Token exchange against the app authentication endpoint failed
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The target endpoint answered with a non-2xx status
    #[error("delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },

    /// Transport-level failure (DNS, connect, TLS) before a response
    /// was received
    #[error("transport error")]
    Transport {
        #[source]
        source: anyhow::Error,
    },

    /// The request was cancelled or timed out mid-flight
    #[error("request cancelled or timed out")]
    Cancelled,
}

impl NotifyError {
    /// Shorthand for a configuration error with a plain message.
    pub fn config(message: impl Into<String>) -> Self {
        NotifyError::Configuration {
            message: message.into(),
        }
    }
}

/// Type alias for Result with NotifyError to simplify function signatures
pub type NotifyResult<T> = Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_display_is_bare_message() {
        let err = NotifyError::config("github token or github app details must be specified");
        assert_eq!(
            err.to_string(),
            "github token or github app details must be specified"
        );
    }

    #[test]
    fn test_delivery_display_includes_status_and_body() {
        let err = NotifyError::Delivery {
            status: 502,
            body: "bad gateway".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("bad gateway"));
    }
}
