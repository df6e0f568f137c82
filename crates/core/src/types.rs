use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AdWatchError, AdWatchResult};

/// Raw platform metric identifier, e.g. `impressions` or `ctr`.
pub type MetricField = String;

/// Level of a node in the advertising hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Account,
    Campaign,
    AdSet,
    Ad,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Account,
        ResourceKind::Campaign,
        ResourceKind::AdSet,
        ResourceKind::Ad,
    ];

    /// Token prefix, as in `campaign/123`.
    pub fn prefix(&self) -> &'static str {
        match self {
            ResourceKind::Account => "account",
            ResourceKind::Campaign => "campaign",
            ResourceKind::AdSet => "adset",
            ResourceKind::Ad => "ad",
        }
    }

    /// Label used when the platform omits a name (`Adset #3`).
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Account => "Account",
            ResourceKind::Campaign => "Campaign",
            ResourceKind::AdSet => "Adset",
            ResourceKind::Ad => "Ad",
        }
    }

    /// Depth in the tree; accounts are the roots.
    pub fn depth(&self) -> usize {
        match self {
            ResourceKind::Account => 0,
            ResourceKind::Campaign => 1,
            ResourceKind::AdSet => 2,
            ResourceKind::Ad => 3,
        }
    }

    /// Next level down, `None` for ads.
    pub fn child(&self) -> Option<ResourceKind> {
        match self {
            ResourceKind::Account => Some(ResourceKind::Campaign),
            ResourceKind::Campaign => Some(ResourceKind::AdSet),
            ResourceKind::AdSet => Some(ResourceKind::Ad),
            ResourceKind::Ad => None,
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.prefix() == prefix)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A typed reference to one node of the hierarchy. Identity is `(kind, id)`;
/// the display name is carried along but never compared.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    pub display_name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            kind,
            display_name: id.clone(),
            id,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Prefixed token handed to downstream callers, e.g. `adset/999`.
    pub fn token(&self) -> String {
        format!("{}/{}", self.kind.prefix(), self.id)
    }
}

impl PartialEq for ResourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}

impl Eq for ResourceRef {}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for ResourceRef {
    type Err = AdWatchError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = token
            .split_once('/')
            .ok_or_else(|| AdWatchError::InvalidTarget(token.to_string()))?;
        let kind = ResourceKind::from_prefix(prefix)
            .ok_or_else(|| AdWatchError::InvalidTarget(token.to_string()))?;
        if id.is_empty() || id.contains('/') {
            return Err(AdWatchError::InvalidTarget(token.to_string()));
        }
        Ok(ResourceRef::new(kind, id))
    }
}

/// Inclusive date range for insight queries. `since <= until` always holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    since: NaiveDate,
    until: NaiveDate,
}

#[derive(Deserialize)]
struct RawTimeRange {
    since: NaiveDate,
    until: NaiveDate,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = AdWatchError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.since, raw.until)
    }
}

impl TimeRange {
    pub fn new(since: NaiveDate, until: NaiveDate) -> AdWatchResult<Self> {
        if since > until {
            return Err(AdWatchError::Validation(format!(
                "time range starts after it ends: {since} > {until}"
            )));
        }
        Ok(Self { since, until })
    }

    /// Default range: the seven days before `today`, through `today`.
    pub fn last_week(today: NaiveDate) -> Self {
        Self {
            since: today - Duration::days(7),
            until: today,
        }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            since: day,
            until: day,
        }
    }

    pub fn since(&self) -> NaiveDate {
        self.since
    }

    pub fn until(&self) -> NaiveDate {
        self.until
    }
}

/// Credentials for one ads application.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub app_id: String,
    pub app_secret: String,
    pub access_token: String,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// One entry of a selectable list: raw value plus label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetOption {
    pub value: String,
    pub name: String,
}

/// Outcome of a threshold comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleState {
    Ok,
    Nok,
}

impl RuleState {
    pub fn from_condition(holds: bool) -> Self {
        if holds {
            RuleState::Ok
        } else {
            RuleState::Nok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleState::Ok => "ok",
            RuleState::Nok => "nok",
        }
    }
}

impl fmt::Display for RuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted once per rule per evaluation pass, whether or not the state
/// changed since the previous pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleEvaluationEvent {
    #[serde(rename = "id")]
    pub rule_id: Uuid,
    pub state: RuleState,
    pub value: f64,
}
