//! Fixture-file loader: builds an [`InMemoryAdsClient`] from a JSON
//! snapshot of an ad user's account tree and insight rows.
//!
//! ```json
//! {
//!   "ad_user": "me",
//!   "accounts": [{"id": "act_1", "name": "Main", "campaigns": [
//!     {"id": "c1", "name": "Spring", "adsets": [
//!       {"id": "s1", "ads": [{"id": "a1", "name": "Banner"}]}]}]}],
//!   "insights": {"campaign/c1": {"daily": [{"date_start": "2024-05-01", "impressions": "10"}]}}
//! }
//! ```

use adwatch_core::insight::{BreakdownMode, InsightRow};
use adwatch_core::types::ResourceRef;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::memory::InMemoryAdsClient;

#[derive(Debug, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_user")]
    pub ad_user: String,
    #[serde(default)]
    pub accounts: Vec<AccountNode>,
    #[serde(default)]
    pub insights: HashMap<String, InsightFixture>,
}

fn default_user() -> String {
    "me".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AccountNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub campaigns: Vec<CampaignNode>,
}

#[derive(Debug, Deserialize)]
pub struct CampaignNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub adsets: Vec<AdSetNode>,
}

#[derive(Debug, Deserialize)]
pub struct AdSetNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ads: Vec<AdNode>,
}

#[derive(Debug, Deserialize)]
pub struct AdNode {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightFixture {
    #[serde(default)]
    pub daily: Vec<InsightRow>,
    #[serde(default)]
    pub breakdown: Vec<InsightRow>,
}

impl Snapshot {
    pub fn into_client(self) -> anyhow::Result<InMemoryAdsClient> {
        let client = InMemoryAdsClient::new();
        for account in self.accounts {
            client.add_account(&self.ad_user, &account.id, account.name.as_deref());
            for campaign in account.campaigns {
                client.add_campaign(&account.id, &campaign.id, campaign.name.as_deref());
                for adset in campaign.adsets {
                    client.add_ad_set(&campaign.id, &adset.id, adset.name.as_deref());
                    for ad in adset.ads {
                        client.add_ad(&adset.id, &ad.id, ad.name.as_deref());
                    }
                }
            }
        }
        for (token, fixture) in self.insights {
            let target: ResourceRef = token
                .parse()
                .with_context(|| format!("invalid insight key {token:?} in fixture"))?;
            client.set_insights(&target, BreakdownMode::TimeSeries, fixture.daily);
            client.set_insights(&target, BreakdownMode::ActionBreakdown, fixture.breakdown);
        }
        Ok(client)
    }
}

/// Reads a snapshot file and returns the client serving it.
pub fn load_fixture(path: impl AsRef<Path>) -> anyhow::Result<InMemoryAdsClient> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading ads fixture {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("parsing ads fixture {}", path.display()))?;
    info!(
        path = %path.display(),
        accounts = snapshot.accounts.len(),
        insight_targets = snapshot.insights.len(),
        "Loaded ads fixture"
    );
    snapshot.into_client()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::AdsClient;
    use crate::session::ClientSession;
    use adwatch_core::types::{ResourceKind, ServiceConfig};
    use serde_json::json;

    #[test]
    fn test_snapshot_builds_tree_and_insights() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "accounts": [{"id": "act_1", "name": "Main", "campaigns": [
                {"id": "c1", "name": "Spring", "adsets": [
                    {"id": "s1", "ads": [{"id": "a1"}]}
                ]}
            ]}],
            "insights": {
                "adset/s1": {"breakdown": [{"date_start": "2024-05-01", "like": 3}]}
            }
        }))
        .unwrap();
        let client = snapshot.into_client().unwrap();
        let session = ClientSession::new(ServiceConfig::default(), "v2.8");

        let accounts = client.ad_accounts(&session, "me", &[]).unwrap();
        assert_eq!(accounts[0].name.as_deref(), Some("Main"));
        let ads = client.children(&session, ResourceKind::Ad, "s1", &[]).unwrap();
        assert_eq!(ads[0].id, "a1");
        assert_eq!(ads[0].name, None);
    }

    #[test]
    fn test_snapshot_rejects_bad_insight_key() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "insights": {"creative/1": {}}
        }))
        .unwrap();
        assert!(snapshot.into_client().is_err());
    }

    #[test]
    fn test_load_fixture_missing_file() {
        assert!(load_fixture("/nonexistent/adwatch-fixture.json").is_err());
    }
}
