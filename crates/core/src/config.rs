use serde::Deserialize;
use std::path::Path;

use crate::types::ServiceConfig;

/// Root application configuration. Loaded from environment variables
/// with the prefix `ADWATCH__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub ads: AdsConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Process-default ads platform credentials and discovery settings. Rules
/// carry their own credentials and do not use these.
#[derive(Debug, Clone, Deserialize)]
pub struct AdsConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default)]
    pub access_token: String,
    /// Ad user whose accounts are enumerated.
    #[serde(default = "default_ad_user")]
    pub ad_user: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// JSON snapshot served by the fixture client.
    #[serde(default)]
    pub fixture_path: Option<String>,
    /// Emit each ad leaf with its parent ad set's id and name, as the legacy
    /// plugin did.
    #[serde(default)]
    pub legacy_ad_leaf_entries: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_trigger_kind")]
    pub trigger_kind: String,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default)]
    pub rules_path: Option<String>,
}

// Default functions
fn default_node_id() -> String {
    "adwatch-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_ad_user() -> String {
    "me".to_string()
}
fn default_api_version() -> String {
    "v2.8".to_string()
}
fn default_trigger_kind() -> String {
    "adwatch.facebookads/trigger".to_string()
}
fn default_check_interval_secs() -> u64 {
    300
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            access_token: String::new(),
            ad_user: default_ad_user(),
            api_version: default_api_version(),
            fixture_path: None,
            legacy_ad_leaf_entries: false,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            trigger_kind: default_trigger_kind(),
            check_interval_secs: default_check_interval_secs(),
            rules_path: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            ads: AdsConfig::default(),
            rules: RulesConfig::default(),
        }
    }
}

impl AdsConfig {
    pub fn service(&self) -> ServiceConfig {
        ServiceConfig {
            app_id: self.app_id.clone(),
            app_secret: self.app_secret.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], layering the environment over `file`.
    pub fn load_from(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("ADWATCH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ads.ad_user, "me");
        assert_eq!(cfg.rules.check_interval_secs, 300);
        assert!(!cfg.ads.legacy_ad_leaf_entries);
        assert!(cfg.ads.service().app_id.is_empty());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[ads]\napp_id = \"123\"\naccess_token = \"tok\"\n\n[rules]\ncheck_interval_secs = 60\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.ads.app_id, "123");
        assert_eq!(cfg.ads.api_version, "v2.8");
        assert_eq!(cfg.rules.check_interval_secs, 60);
        assert_eq!(cfg.rules.trigger_kind, "adwatch.facebookads/trigger");
        assert_eq!(cfg.api.http_port, 8080);
    }
}
