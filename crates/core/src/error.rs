use crate::types::ResourceKind;
use thiserror::Error;

pub type AdWatchResult<T> = Result<T, AdWatchError>;

/// Failure reported by an ads platform client. Retry policy, if any, lives
/// with the client implementation; callers only propagate these.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Rate limited by ads platform")]
    RateLimited,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Ads API error: code={code}, message={message}")]
    Api { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum AdWatchError {
    #[error("Invalid insight target: {0}")]
    InvalidTarget(String),

    #[error("Failed to fetch {kind} resources under `{id}`: {cause}")]
    ResourceFetch {
        kind: ResourceKind,
        id: String,
        #[source]
        cause: ClientError,
    },

    #[error("Upstream ads API failure: {0}")]
    Upstream(#[from] ClientError),

    #[error("No `{field}` data for {target}")]
    MissingData { target: String, field: String },

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AdWatchError {
    /// Whether the failure is a caller/configuration bug rather than
    /// something that may succeed on a later pass.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AdWatchError::InvalidTarget(_)
                | AdWatchError::InvalidRule(_)
                | AdWatchError::Validation(_)
                | AdWatchError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_fetch_message_names_level() {
        let err = AdWatchError::ResourceFetch {
            kind: ResourceKind::AdSet,
            id: "42".into(),
            cause: ClientError::RateLimited,
        };
        let msg = err.to_string();
        assert!(msg.contains("adset"));
        assert!(msg.contains("42"));
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_upstream_from_client_error() {
        let err: AdWatchError = ClientError::Auth("expired token".into()).into();
        assert!(matches!(err, AdWatchError::Upstream(ClientError::Auth(_))));
        assert!(AdWatchError::InvalidTarget("foo/1".into()).is_caller_error());
    }
}
