//! Rule evaluator — one pass fetches today's value of each active rule's
//! metric, compares it with the rule's threshold and reports ok/nok.

use adwatch_core::error::{AdWatchError, AdWatchResult, ClientError};
use adwatch_core::event_bus::{EventSink, RULES_TRIGGER_TOPIC};
use adwatch_core::insight::BreakdownMode;
use adwatch_core::rule::Rule;
use adwatch_core::types::{RuleEvaluationEvent, RuleState, TimeRange};
use adwatch_integrations::{AdsClient, ClientSession, RuleStore};
use adwatch_reporting::InsightNormalizer;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::condition::Condition;

/// A rule whose evaluation failed during a pass.
#[derive(Debug, Clone, Serialize)]
pub struct RuleFailure {
    pub rule_id: Uuid,
    pub error: String,
}

/// Everything a pass produced. Events were also emitted to the sink.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassReport {
    pub events: Vec<RuleEvaluationEvent>,
    pub failures: Vec<RuleFailure>,
    /// Set when the pass stopped early on cancellation.
    pub aborted: bool,
}

pub struct RuleEvaluator {
    normalizer: InsightNormalizer,
    store: Arc<dyn RuleStore>,
    sink: Arc<dyn EventSink>,
    trigger_kind: String,
    api_version: String,
    cancel: Option<Arc<AtomicBool>>,
}

impl RuleEvaluator {
    pub fn new(
        client: Arc<dyn AdsClient>,
        store: Arc<dyn RuleStore>,
        sink: Arc<dyn EventSink>,
        trigger_kind: impl Into<String>,
    ) -> Self {
        Self {
            normalizer: InsightNormalizer::new(client),
            store,
            sink,
            trigger_kind: trigger_kind.into(),
            api_version: "v2.8".to_string(),
            cancel: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Flag checked between rules; once set, the running pass stops before
    /// the next rule.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Runs a pass for the local calendar day.
    pub fn run_pass(&self) -> AdWatchResult<PassReport> {
        self.run_pass_on(Local::now().date_naive())
    }

    /// Evaluates every active rule against `today`'s data. Per-rule failures
    /// are logged and collected; only a failure to list rules fails the pass.
    pub fn run_pass_on(&self, today: NaiveDate) -> AdWatchResult<PassReport> {
        let rules = self
            .store
            .list_active(&self.trigger_kind)
            .map_err(AdWatchError::Internal)?;
        info!(rules = rules.len(), trigger = %self.trigger_kind, "Starting rule check pass");

        let mut report = PassReport::default();
        for rule in &rules {
            if self.cancelled() {
                warn!(
                    evaluated = report.events.len() + report.failures.len(),
                    remaining = rules.len() - report.events.len() - report.failures.len(),
                    "Rule check pass cancelled"
                );
                report.aborted = true;
                break;
            }
            match self.evaluate(rule, today) {
                Ok(event) => {
                    metrics::counter!("rules.evaluations", "state" => event.state.as_str())
                        .increment(1);
                    self.sink.emit(RULES_TRIGGER_TOPIC, &event);
                    report.events.push(event);
                }
                Err(e) => {
                    error!(rule_id = %rule.uuid, error = %e, "Ads rule check failed");
                    metrics::counter!("rules.failures").increment(1);
                    report.failures.push(RuleFailure {
                        rule_id: rule.uuid,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Evaluates a single rule using the credentials embedded in it.
    pub fn evaluate(&self, rule: &Rule, today: NaiveDate) -> AdWatchResult<RuleEvaluationEvent> {
        let params = rule.params();
        let condition = Condition::from_param(params.condition.as_deref())?;
        let threshold = params.value.as_f64().ok_or_else(|| {
            AdWatchError::InvalidRule(format!("threshold is not a number: {:?}", params.value))
        })?;
        let session = ClientSession::new(params.service.credentials().clone(), &self.api_version);

        let result = self.normalizer.fetch_insights(
            &session,
            &params.insight,
            Some(TimeRange::single_day(today)),
            Some(vec![params.field.clone()]),
            BreakdownMode::TimeSeries,
            today,
        )?;
        let raw = result.first_value().ok_or_else(|| AdWatchError::MissingData {
            target: params.insight.clone(),
            field: params.field.clone(),
        })?;
        let value = raw.as_f64().ok_or_else(|| {
            AdWatchError::Upstream(ClientError::MalformedResponse(format!(
                "`{}` is not numeric: {raw:?}",
                params.field
            )))
        })?;

        let state = RuleState::from_condition(condition.check(value, threshold));
        info!(
            rule_id = %rule.uuid,
            resource = %params.insight,
            state = state.as_str(),
            "ads rule check {}: {} {} {} -> {}",
            rule.uuid,
            value,
            condition,
            threshold,
            state
        );
        Ok(RuleEvaluationEvent {
            rule_id: rule.uuid,
            state,
            value,
        })
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adwatch_core::event_bus::capture_sink;
    use adwatch_core::insight::InsightRow;
    use adwatch_core::rule::Threshold;
    use adwatch_core::types::ResourceRef;
    use adwatch_integrations::{InMemoryAdsClient, StaticRuleStore};
    use serde_json::json;

    const KIND: &str = "adwatch.facebookads/trigger";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 15).unwrap()
    }

    fn rule(insight: &str, field: &str, value: f64, condition: Option<&str>) -> Rule {
        serde_json::from_value(json!({
            "uuid": Uuid::new_v4(),
            "trigger": {
                "trigger": KIND,
                "params": {
                    "service": {"config": {"app_id": format!("app-{insight}"), "app_secret": "s", "access_token": "t"}},
                    "insight": insight,
                    "field": field,
                    "value": value,
                    "condition": condition
                }
            }
        }))
        .unwrap()
    }

    fn client_with(target: &str, field: &str, rows: &[(NaiveDate, &str)]) -> InMemoryAdsClient {
        let client = InMemoryAdsClient::recording();
        let target: ResourceRef = target.parse().unwrap();
        client.set_insights(
            &target,
            BreakdownMode::TimeSeries,
            rows.iter()
                .map(|(d, v)| InsightRow::new(*d).with(field, *v))
                .collect(),
        );
        client
    }

    fn evaluator(client: InMemoryAdsClient) -> RuleEvaluator {
        RuleEvaluator::new(
            Arc::new(client),
            Arc::new(StaticRuleStore::new()),
            adwatch_core::event_bus::noop_sink(),
            KIND,
        )
    }

    #[test]
    fn test_threshold_reached_is_ok() {
        let ev = evaluator(client_with("campaign/1", "impressions", &[(today(), "100")]));
        let event = ev
            .evaluate(&rule("campaign/1", "impressions", 100.0, Some(">=")), today())
            .unwrap();
        assert_eq!(event.state, RuleState::Ok);
        assert_eq!(event.value, 100.0);
    }

    #[test]
    fn test_boundary_per_condition() {
        let cases = [
            (Some(">"), RuleState::Nok),
            (Some(">="), RuleState::Ok),
            (Some("<"), RuleState::Nok),
            (Some("<="), RuleState::Ok),
            (None, RuleState::Nok),
        ];
        let ev = evaluator(client_with("ad/5", "ctr", &[(today(), "5")]));
        for (cond, expected) in cases {
            let event = ev.evaluate(&rule("ad/5", "ctr", 5.0, cond), today()).unwrap();
            assert_eq!(event.state, expected, "{cond:?}");
        }
    }

    #[test]
    fn test_only_today_is_queried() {
        let client = Arc::new(client_with(
            "adset/3",
            "impressions",
            &[
                (today().pred_opt().unwrap(), "900"),
                (today(), "12"),
            ],
        ));
        let ev = RuleEvaluator::new(
            client.clone(),
            Arc::new(StaticRuleStore::new()),
            adwatch_core::event_bus::noop_sink(),
            KIND,
        );
        let event = ev
            .evaluate(&rule("adset/3", "impressions", 50.0, Some(">")), today())
            .unwrap();
        assert_eq!(event.value, 12.0);
        assert_eq!(event.state, RuleState::Nok);

        let call = &client.insight_calls()[0];
        let params = call.insights.unwrap();
        assert_eq!(params.time_range, TimeRange::single_day(today()));
        assert_eq!(call.app_id, "app-adset/3");
    }

    #[test]
    fn test_no_data_today_is_missing_data() {
        let ev = evaluator(InMemoryAdsClient::new());
        let err = ev
            .evaluate(&rule("account/1", "impressions", 1.0, None), today())
            .unwrap_err();
        assert!(matches!(err, AdWatchError::MissingData { .. }));
    }

    #[test]
    fn test_non_numeric_value_is_upstream_error() {
        let ev = evaluator(client_with("ad/8", "ctr", &[(today(), "n/a")]));
        let err = ev.evaluate(&rule("ad/8", "ctr", 1.0, None), today()).unwrap_err();
        assert!(matches!(err, AdWatchError::Upstream(ClientError::MalformedResponse(_))));
    }

    #[test]
    fn test_pass_isolates_failures_and_emits_every_success() {
        let client = client_with("campaign/ok", "impressions", &[(today(), "10")]);
        client.fail_on("broken", ClientError::RateLimited);
        let good = rule("campaign/ok", "impressions", 5.0, None);
        let broken = rule("campaign/broken", "impressions", 5.0, None);
        let bad_token = rule("pixel/1", "impressions", 5.0, None);
        let store = StaticRuleStore::from_rules([good.clone(), broken.clone(), bad_token.clone()]);
        let sink = capture_sink();
        let ev = RuleEvaluator::new(Arc::new(client), Arc::new(store), sink.clone(), KIND);

        let report = ev.run_pass_on(today()).unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert!(!report.aborted);
        assert_eq!(sink.for_rule(good.uuid).len(), 1);
        assert_eq!(sink.for_rule(good.uuid)[0].state, RuleState::Ok);
        assert!(sink.for_rule(broken.uuid).is_empty());

        // Stateless: a second pass re-emits the unchanged state.
        ev.run_pass_on(today()).unwrap();
        assert_eq!(sink.for_rule(good.uuid).len(), 2);
    }

    #[test]
    fn test_bad_threshold_fails_only_its_rule() {
        let good = rule("campaign/1", "impressions", 5.0, None);
        let mut bad = rule("campaign/1", "impressions", 0.0, None);
        bad.trigger.params.value = Threshold::Text("five".into());
        let sink = capture_sink();
        let ev = RuleEvaluator::new(
            Arc::new(client_with("campaign/1", "impressions", &[(today(), "10")])),
            Arc::new(StaticRuleStore::from_rules([good.clone(), bad.clone()])),
            sink.clone(),
            KIND,
        );

        let report = ev.run_pass_on(today()).unwrap();
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].rule_id, good.uuid);
        assert_eq!(report.events[0].value, 10.0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].rule_id, bad.uuid);
        assert!(report.failures[0].error.contains("threshold"));
        assert!(sink.for_rule(bad.uuid).is_empty());
    }

    #[test]
    fn test_cancelled_pass_stops_before_next_rule() {
        let store = StaticRuleStore::from_rules([
            rule("ad/1", "impressions", 1.0, None),
            rule("ad/2", "impressions", 1.0, None),
        ]);
        let flag = Arc::new(AtomicBool::new(true));
        let client = Arc::new(InMemoryAdsClient::recording());
        let ev = RuleEvaluator::new(client.clone(), Arc::new(store), capture_sink(), KIND)
            .with_cancel_flag(flag);
        let report = ev.run_pass_on(today()).unwrap();
        assert!(report.aborted);
        assert!(report.events.is_empty());
        assert!(client.calls().is_empty());
    }

    #[test]
    fn test_rules_from_other_triggers_are_ignored() {
        let mut other = rule("ad/1", "impressions", 1.0, None);
        other.trigger.kind = "someone.else/trigger".into();
        let ev = RuleEvaluator::new(
            Arc::new(InMemoryAdsClient::new()),
            Arc::new(StaticRuleStore::from_rules([other])),
            capture_sink(),
            KIND,
        );
        let report = ev.run_pass_on(today()).unwrap();
        assert!(report.events.is_empty() && report.failures.is_empty());
    }
}
