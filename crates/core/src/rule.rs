//! Rules as handed over by the external rule store. Only the fields this
//! service reads are modelled; everything else in the stored document is
//! ignored.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{MetricField, ServiceConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub uuid: Uuid,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub trigger: RuleTrigger,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTrigger {
    /// Trigger kind the rule is registered under.
    #[serde(default, rename = "trigger")]
    pub kind: String,
    pub params: TriggerParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerParams {
    pub service: ServiceParam,
    /// Prefixed resource token, e.g. `campaign/123`.
    pub insight: String,
    pub field: MetricField,
    pub value: Threshold,
    /// One of `<`, `<=`, `>`, `>=`; absent or empty means `>`.
    #[serde(default)]
    pub condition: Option<String>,
}

/// Host services arrive wrapped as `{"config": {...}}`; plain credential
/// objects are accepted too.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceParam {
    Wrapped { config: ServiceConfig },
    Flat(ServiceConfig),
}

impl ServiceParam {
    pub fn credentials(&self) -> &ServiceConfig {
        match self {
            ServiceParam::Wrapped { config } => config,
            ServiceParam::Flat(config) => config,
        }
    }
}

impl Rule {
    pub fn params(&self) -> &TriggerParams {
        &self.trigger.params
    }
}

/// Threshold as stored: a number or a numeric string. Parsed per rule at
/// evaluation time so one malformed rule cannot spoil the rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Number(f64),
    Text(String),
}

impl Threshold {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Threshold::Number(n) => Some(*n),
            Threshold::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl From<f64> for Threshold {
    fn from(v: f64) -> Self {
        Threshold::Number(v)
    }
}
