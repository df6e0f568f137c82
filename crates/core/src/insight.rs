//! Insight payload types: raw rows as returned by the ads platform and the
//! two canonical shapes they are normalized into.

use chrono::NaiveDate;
use serde::ser::{SerializeMap, SerializeTuple};
use serde::{Deserialize, Serialize, Serializer};
use indexmap::IndexMap;
use std::collections::HashMap;

use crate::types::{MetricField, ResourceRef, TimeRange};

/// Fields requested when the caller does not name any.
pub const DEFAULT_INSIGHT_FIELDS: [&str; 6] = [
    "call_to_action_clicks",
    "canvas_avg_view_percent",
    "impressions",
    "social_clicks",
    "website_clicks",
    "ctr",
];

pub fn default_fields() -> Vec<MetricField> {
    DEFAULT_INSIGHT_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// Whether to ask for one row per day or a single row broken down by action.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownMode {
    #[default]
    TimeSeries,
    ActionBreakdown,
}

impl BreakdownMode {
    pub fn from_flag(action_breakdown: bool) -> Self {
        if action_breakdown {
            BreakdownMode::ActionBreakdown
        } else {
            BreakdownMode::TimeSeries
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BreakdownMode::TimeSeries => "time_series",
            BreakdownMode::ActionBreakdown => "action_breakdown",
        }
    }
}

/// Parameters sent alongside an insights request. The daily increment and
/// the action breakdown are mutually exclusive; `mode` selects exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightParams {
    pub time_range: TimeRange,
    pub mode: BreakdownMode,
}

impl InsightParams {
    pub fn new(time_range: TimeRange, mode: BreakdownMode) -> Self {
        Self { time_range, mode }
    }

    /// Query parameters in the platform's wire vocabulary.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let range = serde_json::json!({
            "since": self.time_range.since().format("%Y-%m-%d").to_string(),
            "until": self.time_range.until().format("%Y-%m-%d").to_string(),
        });
        let mut pairs = vec![("time_range", range.to_string())];
        match self.mode {
            BreakdownMode::TimeSeries => pairs.push(("time_increment", "1".to_string())),
            BreakdownMode::ActionBreakdown => {
                pairs.push(("action_breakdown", "action_type".to_string()))
            }
        }
        pairs
    }
}

/// A single metric value. The platform reports most metrics as decimal
/// strings; they are kept as received and parsed only when a number is needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InsightValue {
    Number(f64),
    Text(String),
    /// Nested structures such as `actions` lists; never numeric.
    Other(serde_json::Value),
}

impl InsightValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            InsightValue::Number(n) => Some(*n),
            InsightValue::Text(s) => s.trim().parse().ok(),
            InsightValue::Other(_) => None,
        }
    }
}

impl From<f64> for InsightValue {
    fn from(v: f64) -> Self {
        InsightValue::Number(v)
    }
}

impl From<&str> for InsightValue {
    fn from(v: &str) -> Self {
        InsightValue::Text(v.to_string())
    }
}

/// One row of an insights response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightRow {
    pub date_start: NaiveDate,
    #[serde(flatten)]
    pub values: HashMap<String, InsightValue>,
}

impl InsightRow {
    pub fn new(date_start: NaiveDate) -> Self {
        Self {
            date_start,
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, field: &str, value: impl Into<InsightValue>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&InsightValue> {
        self.values.get(field)
    }
}

/// A fully specified insight request.
#[derive(Debug, Clone)]
pub struct InsightQuery {
    pub target: ResourceRef,
    pub range: TimeRange,
    pub fields: Vec<MetricField>,
    pub mode: BreakdownMode,
}

/// One dated observation in a series, serialized as `[date, value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightPoint {
    pub date: NaiveDate,
    pub value: InsightValue,
}

impl Serialize for InsightPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.date)?;
        tup.serialize_element(&self.value)?;
        tup.end()
    }
}

/// Daily values for one field, in the order the platform returned them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsightSeries {
    pub name: String,
    pub values: Vec<InsightPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsightResult {
    TimeSeries(Vec<InsightSeries>),
    /// Label → value, in requested field order.
    Breakdown(IndexMap<String, InsightValue>),
    /// No rows for the period and resource. Not an error.
    Empty,
}

impl InsightResult {
    pub fn is_empty(&self) -> bool {
        matches!(self, InsightResult::Empty)
    }

    /// First value of the first series, the scalar a rule check compares.
    pub fn first_value(&self) -> Option<&InsightValue> {
        match self {
            InsightResult::TimeSeries(series) => {
                series.first()?.values.first().map(|p| &p.value)
            }
            _ => None,
        }
    }
}

impl Serialize for InsightResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InsightResult::TimeSeries(series) => series.serialize(serializer),
            InsightResult::Breakdown(map) => map.serialize(serializer),
            InsightResult::Empty => serializer.serialize_map(Some(0))?.end(),
        }
    }
}
