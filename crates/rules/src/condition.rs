use adwatch_core::error::AdWatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison applied as `value <op> threshold`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[default]
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
}

impl Condition {
    /// Reads a rule's `condition` parameter; absent or blank means `>`.
    pub fn from_param(raw: Option<&str>) -> Result<Self, AdWatchError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Condition::default()),
            Some(op) => op.parse(),
        }
    }

    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Condition::Less => value < threshold,
            Condition::LessOrEqual => value <= threshold,
            Condition::Greater => value > threshold,
            Condition::GreaterOrEqual => value >= threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Condition::Less => "<",
            Condition::LessOrEqual => "<=",
            Condition::Greater => ">",
            Condition::GreaterOrEqual => ">=",
        }
    }
}

impl FromStr for Condition {
    type Err = AdWatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Condition::Less),
            "<=" => Ok(Condition::LessOrEqual),
            ">" => Ok(Condition::Greater),
            ">=" => Ok(Condition::GreaterOrEqual),
            other => Err(AdWatchError::InvalidRule(format!(
                "unknown condition {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
