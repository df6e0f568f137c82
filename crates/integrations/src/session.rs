//! Client session — immutable credentials scope for ads platform calls.

use adwatch_core::types::ServiceConfig;

/// Credentials plus API version for one ads application. Built once per
/// credential set and passed by reference to every client call, so callers
/// using different applications never share mutable client state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSession {
    credentials: ServiceConfig,
    api_version: String,
}

impl ClientSession {
    pub fn new(credentials: ServiceConfig, api_version: impl Into<String>) -> Self {
        Self {
            credentials,
            api_version: api_version.into(),
        }
    }

    pub fn app_id(&self) -> &str {
        &self.credentials.app_id
    }

    pub fn app_secret(&self) -> &str {
        &self.credentials.app_secret
    }

    pub fn access_token(&self) -> &str {
        &self.credentials.access_token
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn has_token(&self) -> bool {
        !self.credentials.access_token.is_empty()
    }
}
