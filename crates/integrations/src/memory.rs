//! In-memory ads client backed by DashMap.
//!
//! Serves a fixed account tree and canned insight rows. A client built with
//! [`InMemoryAdsClient::recording`] also logs every call it receives, for
//! tests; the default client keeps no history.

use adwatch_core::error::ClientError;
use adwatch_core::insight::{BreakdownMode, InsightParams, InsightRow};
use adwatch_core::types::{MetricField, ResourceKind, ResourceRef};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::client::{AdResource, AdsClient};
use crate::session::ClientSession;

/// One recorded client call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCall {
    pub kind: ResourceKind,
    /// Parent id for listings, resource id for insights.
    pub id: String,
    pub app_id: String,
    pub insights: Option<InsightParams>,
    /// Requested metric fields; empty for listings.
    pub fields: Vec<MetricField>,
}

type Key = (ResourceKind, String);

#[derive(Default)]
pub struct InMemoryAdsClient {
    children: DashMap<Key, Vec<AdResource>>,
    daily_rows: DashMap<Key, Vec<InsightRow>>,
    breakdown_rows: DashMap<Key, Vec<InsightRow>>,
    failures: DashMap<String, ClientError>,
    record_calls: bool,
    calls: Mutex<Vec<ClientCall>>,
}

impl InMemoryAdsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that keeps a log of every call, readable via [`calls`].
    ///
    /// [`calls`]: InMemoryAdsClient::calls
    pub fn recording() -> Self {
        Self {
            record_calls: true,
            ..Self::default()
        }
    }

    /// Registers `child` of `kind` under `parent_id`, after any existing
    /// children.
    pub fn add_child(&self, kind: ResourceKind, parent_id: &str, child: AdResource) {
        self.children
            .entry((kind, parent_id.to_string()))
            .or_default()
            .push(child);
    }

    pub fn add_account(&self, user_id: &str, id: &str, name: Option<&str>) {
        self.add_child(ResourceKind::Account, user_id, AdResource::new(id, name));
    }

    pub fn add_campaign(&self, account_id: &str, id: &str, name: Option<&str>) {
        self.add_child(ResourceKind::Campaign, account_id, AdResource::new(id, name));
    }

    pub fn add_ad_set(&self, campaign_id: &str, id: &str, name: Option<&str>) {
        self.add_child(ResourceKind::AdSet, campaign_id, AdResource::new(id, name));
    }

    pub fn add_ad(&self, adset_id: &str, id: &str, name: Option<&str>) {
        self.add_child(ResourceKind::Ad, adset_id, AdResource::new(id, name));
    }

    /// Sets the rows returned for `target` in `mode`. Daily rows are
    /// filtered by the requested range; breakdown rows are returned as is.
    pub fn set_insights(&self, target: &ResourceRef, mode: BreakdownMode, rows: Vec<InsightRow>) {
        let key = (target.kind, target.id.clone());
        match mode {
            BreakdownMode::TimeSeries => self.daily_rows.insert(key, rows),
            BreakdownMode::ActionBreakdown => self.breakdown_rows.insert(key, rows),
        };
    }

    /// Makes every call touching `id` (as parent or insight target) fail.
    pub fn fail_on(&self, id: &str, error: ClientError) {
        self.failures.insert(id.to_string(), error);
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().clone()
    }

    pub fn insight_calls(&self) -> Vec<ClientCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.insights.is_some())
            .cloned()
            .collect()
    }

    fn record(&self, call: ClientCall) -> Result<(), ClientError> {
        let failure = self.failures.get(&call.id).map(|e| e.value().clone());
        if self.record_calls {
            self.calls.lock().push(call);
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn list(
        &self,
        session: &ClientSession,
        kind: ResourceKind,
        parent_id: &str,
    ) -> Result<Vec<AdResource>, ClientError> {
        self.record(ClientCall {
            kind,
            id: parent_id.to_string(),
            app_id: session.app_id().to_string(),
            insights: None,
            fields: Vec::new(),
        })?;
        let found = self
            .children
            .get(&(kind, parent_id.to_string()))
            .map(|c| c.value().clone())
            .unwrap_or_default();
        debug!(kind = %kind, parent = parent_id, count = found.len(), "Listed in-memory resources");
        Ok(found)
    }
}

impl AdsClient for InMemoryAdsClient {
    fn ad_accounts(
        &self,
        session: &ClientSession,
        user_id: &str,
        _fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError> {
        self.list(session, ResourceKind::Account, user_id)
    }

    fn campaigns(
        &self,
        session: &ClientSession,
        account_id: &str,
        _fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError> {
        self.list(session, ResourceKind::Campaign, account_id)
    }

    fn ad_sets(
        &self,
        session: &ClientSession,
        campaign_id: &str,
        _fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError> {
        self.list(session, ResourceKind::AdSet, campaign_id)
    }

    fn ads(
        &self,
        session: &ClientSession,
        adset_id: &str,
        _fields: &[&str],
    ) -> Result<Vec<AdResource>, ClientError> {
        self.list(session, ResourceKind::Ad, adset_id)
    }

    fn insights(
        &self,
        session: &ClientSession,
        target: &ResourceRef,
        params: &InsightParams,
        fields: &[MetricField],
    ) -> Result<Vec<InsightRow>, ClientError> {
        self.record(ClientCall {
            kind: target.kind,
            id: target.id.clone(),
            app_id: session.app_id().to_string(),
            insights: Some(*params),
            fields: fields.to_vec(),
        })?;

        let key = (target.kind, target.id.clone());
        let rows = match params.mode {
            BreakdownMode::TimeSeries => self
                .daily_rows
                .get(&key)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| {
                            r.date_start >= params.time_range.since()
                                && r.date_start <= params.time_range.until()
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            BreakdownMode::ActionBreakdown => self
                .breakdown_rows
                .get(&key)
                .map(|rows| rows.value().clone())
                .unwrap_or_default(),
        };
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adwatch_core::types::{ServiceConfig, TimeRange};
    use chrono::NaiveDate;

    fn session(app: &str) -> ClientSession {
        ClientSession::new(
            ServiceConfig {
                app_id: app.into(),
                ..Default::default()
            },
            "v2.8",
        )
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let client = InMemoryAdsClient::new();
        client.add_campaign("act_1", "c2", Some("Second"));
        client.add_campaign("act_1", "c1", Some("First"));

        let found = client
            .children(&session("a"), ResourceKind::Campaign, "act_1", &[])
            .unwrap();
        let ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c2", "c1"]);
        assert!(client
            .children(&session("a"), ResourceKind::AdSet, "c1", &[])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_daily_rows_filtered_by_range() {
        let client = InMemoryAdsClient::new();
        let target = ResourceRef::new(ResourceKind::Ad, "9");
        client.set_insights(
            &target,
            BreakdownMode::TimeSeries,
            vec![
                InsightRow::new(day(1)).with("impressions", "1"),
                InsightRow::new(day(2)).with("impressions", "2"),
                InsightRow::new(day(3)).with("impressions", "3"),
            ],
        );
        let params = InsightParams::new(TimeRange::single_day(day(2)), BreakdownMode::TimeSeries);
        let rows = client
            .insights(&session("a"), &target, &params, &["impressions".into()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_start, day(2));
    }

    #[test]
    fn test_failures_and_call_log() {
        let client = InMemoryAdsClient::recording();
        client.fail_on("act_1", ClientError::RateLimited);

        let err = client.campaigns(&session("app-9"), "act_1", &[]).unwrap_err();
        assert_eq!(err, ClientError::RateLimited);

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].app_id, "app-9");
        assert_eq!(calls[0].kind, ResourceKind::Campaign);
        assert!(client.insight_calls().is_empty());
    }

    #[test]
    fn test_default_client_keeps_no_history() {
        let client = InMemoryAdsClient::new();
        client.add_account("me", "act_1", None);
        client.fail_on("act_2", ClientError::RateLimited);
        let target = ResourceRef::new(ResourceKind::Account, "act_1");
        let params = InsightParams::new(TimeRange::single_day(day(1)), BreakdownMode::TimeSeries);
        for _ in 0..100 {
            client.ad_accounts(&session("a"), "me", &[]).unwrap();
            client
                .insights(&session("a"), &target, &params, &["impressions".into()])
                .unwrap();
        }
        assert!(client.campaigns(&session("a"), "act_2", &[]).is_err());
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_recorded_insight_call_keeps_fields() {
        let client = InMemoryAdsClient::recording();
        let target = ResourceRef::new(ResourceKind::Ad, "9");
        let params = InsightParams::new(TimeRange::single_day(day(1)), BreakdownMode::TimeSeries);
        client
            .insights(&session("a"), &target, &params, &["ctr".into(), "impressions".into()])
            .unwrap();
        assert_eq!(client.insight_calls()[0].fields, vec!["ctr", "impressions"]);
    }
}
