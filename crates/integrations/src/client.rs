//! Ads platform client — the interface the walker and normalizer call.

use adwatch_core::error::ClientError;
use adwatch_core::insight::{InsightParams, InsightRow};
use adwatch_core::types::{MetricField, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};

use crate::session::ClientSession;

/// Fields requested when enumerating the hierarchy.
pub const RESOURCE_FIELDS: [&str; 2] = ["id", "name"];

/// A hierarchy node as listed by the platform. Names are optional for ad
/// sets and ads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdResource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl AdResource {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }
}

/// Trait for ads platform clients. Implementations own transport,
/// pagination, timeouts and any retry policy.
pub trait AdsClient: Send + Sync {
    fn ad_accounts(
        &self,
        session: &ClientSession,
        user_id: &str,
        fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError>;

    fn campaigns(
        &self,
        session: &ClientSession,
        account_id: &str,
        fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError>;

    fn ad_sets(
        &self,
        session: &ClientSession,
        campaign_id: &str,
        fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError>;

    fn ads(
        &self,
        session: &ClientSession,
        adset_id: &str,
        fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError>;

    fn insights(
        &self,
        session: &ClientSession,
        target: &ResourceRef,
        params: &InsightParams,
        fields: &[MetricField],
    ) -> Result<Vec<InsightRow>, ClientError>;

    /// Lists resources of `kind` directly under `parent_id`. For accounts the
    /// parent is the ad user.
    fn children(
        &self,
        session: &ClientSession,
        kind: ResourceKind,
        parent_id: &str,
        fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError> {
        match kind {
            ResourceKind::Account => self.ad_accounts(session, parent_id, fields),
            ResourceKind::Campaign => self.campaigns(session, parent_id, fields),
            ResourceKind::AdSet => self.ad_sets(session, parent_id, fields),
            ResourceKind::Ad => self.ads(session, parent_id, fields),
        }
    }
}
