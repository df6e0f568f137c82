//! Insight normalizer — fetches raw insight rows for one resource and
//! reshapes them into a daily time series or an action breakdown.

use adwatch_core::error::{AdWatchError, AdWatchResult, ClientError};
use adwatch_core::insight::{
    default_fields, BreakdownMode, InsightParams, InsightPoint, InsightQuery, InsightResult,
    InsightRow, InsightSeries, InsightValue,
};
use adwatch_core::types::{MetricField, ResourceRef, TimeRange};
use adwatch_integrations::{AdsClient, ClientSession};
use chrono::NaiveDate;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::display_names::display_name;

pub struct InsightNormalizer {
    client: Arc<dyn AdsClient>,
}

impl InsightNormalizer {
    pub fn new(client: Arc<dyn AdsClient>) -> Self {
        Self { client }
    }

    /// Parses `token` and fetches its insights. A missing range defaults to
    /// the last seven days through `today`; missing fields default to
    /// [`default_fields`]. An unparseable token fails before any API call.
    pub fn fetch_insights(
        &self,
        session: &ClientSession,
        token: &str,
        range: Option<TimeRange>,
        fields: Option<Vec<MetricField>>,
        mode: BreakdownMode,
        today: NaiveDate,
    ) -> AdWatchResult<InsightResult> {
        let target: ResourceRef = token.parse()?;
        let fields = match fields {
            Some(fields) if !fields.is_empty() => fields,
            _ => default_fields(),
        };
        let query = InsightQuery {
            target,
            range: range.unwrap_or_else(|| TimeRange::last_week(today)),
            fields,
            mode,
        };
        self.run(session, &query)
    }

    /// Executes a fully specified query.
    pub fn run(&self, session: &ClientSession, query: &InsightQuery) -> AdWatchResult<InsightResult> {
        let params = InsightParams::new(query.range, query.mode);
        metrics::counter!(
            "insights.fetches",
            "kind" => query.target.kind.prefix(),
            "mode" => query.mode.as_str()
        )
        .increment(1);

        let rows = self
            .client
            .insights(session, &query.target, &params, &query.fields)
            .map_err(|e| {
                warn!(resource = %query.target, error = %e, "Insight fetch failed");
                metrics::counter!("insights.errors").increment(1);
                AdWatchError::Upstream(e)
            })?;

        debug!(
            resource = %query.target,
            rows = rows.len(),
            mode = query.mode.as_str(),
            "Fetched insight rows"
        );

        if rows.is_empty() {
            return Ok(InsightResult::Empty);
        }
        match query.mode {
            BreakdownMode::TimeSeries => time_series(&rows, &query.fields),
            BreakdownMode::ActionBreakdown => breakdown(&rows[0], &query.fields),
        }
    }
}

/// One series per requested field, in request order, one point per row in
/// the order the platform returned them.
pub fn time_series(rows: &[InsightRow], fields: &[MetricField]) -> AdWatchResult<InsightResult> {
    let mut series = Vec::with_capacity(fields.len());
    for field in fields {
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            values.push(InsightPoint {
                date: row.date_start,
                value: required(row, field)?.clone(),
            });
        }
        series.push(InsightSeries {
            name: display_name(field).to_string(),
            values,
        });
    }
    Ok(InsightResult::TimeSeries(series))
}

/// Label → value for each requested field of the single aggregated row, in
/// request order.
pub fn breakdown(row: &InsightRow, fields: &[MetricField]) -> AdWatchResult<InsightResult> {
    let mut out = IndexMap::with_capacity(fields.len());
    for field in fields {
        out.insert(display_name(field).to_string(), required(row, field)?.clone());
    }
    Ok(InsightResult::Breakdown(out))
}

fn required<'r>(row: &'r InsightRow, field: &str) -> AdWatchResult<&'r InsightValue> {
    row.get(field).ok_or_else(|| {
        AdWatchError::Upstream(ClientError::MalformedResponse(format!(
            "row for {} lacks requested field `{field}`",
            row.date_start
        )))
    })
}
