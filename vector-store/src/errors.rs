//! Error types for the vector layer, classified by retry behavior.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("qdrant error: {0}")]
    Qdrant(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("model not accessible: {model}")]
    ModelNotAccessible { model: String },

    #[error("no usable embedding backend after exhausting fallbacks: {0}")]
    Exhausted(String),

    #[error("vector size mismatch: got={got}, want={want}")]
    VectorSizeMismatch { got: usize, want: usize },

    #[error(
        "collection '{collection}' has dimension {existing}, current model needs {required}; \
         migration requires force"
    )]
    MigrationRequired {
        collection: String,
        existing: usize,
        required: usize,
    },

    #[error("cache error: {0}")]
    Cache(#[from] embedding_cache::CacheError),
}

impl VectorError {
    /// Transient failures worth an exponential-backoff retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            VectorError::Provider { status, message } => match status {
                Some(429) | Some(502) | Some(503) | Some(504) => true,
                Some(_) => false,
                None => {
                    let m = message.to_ascii_lowercase();
                    m.contains("timeout") || m.contains("no successful provider")
                }
            },
            VectorError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Access failures that should switch models immediately, no backoff.
    pub fn is_access_denied(&self) -> bool {
        match self {
            VectorError::ModelNotAccessible { .. } => true,
            VectorError::Provider { status, message } => {
                *status == Some(403)
                    || message.to_ascii_lowercase().contains("model not accessible")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        let rate_limited = VectorError::Provider {
            status: Some(429),
            message: "too many requests".into(),
        };
        assert!(rate_limited.is_retryable());
        assert!(!rate_limited.is_access_denied());

        let forbidden = VectorError::Provider {
            status: Some(403),
            message: "forbidden".into(),
        };
        assert!(!forbidden.is_retryable());
        assert!(forbidden.is_access_denied());

        let config = VectorError::Config("missing key".into());
        assert!(!config.is_retryable());
        assert!(!config.is_access_denied());
    }
}
