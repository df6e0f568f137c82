//! Rule store — read access to the externally owned rule set.

use adwatch_core::rule::Rule;
use anyhow::Context;
use dashmap::DashMap;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Source of the rules to evaluate. The store owns persistence; this
/// service only lists.
pub trait RuleStore: Send + Sync {
    /// Active rules registered under `trigger_kind`.
    fn list_active(&self, trigger_kind: &str) -> anyhow::Result<Vec<Rule>>;
}

/// Rules held in memory, optionally loaded from a JSON array file.
#[derive(Default)]
pub struct StaticRuleStore {
    rules: DashMap<Uuid, Rule>,
}

impl StaticRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Self {
        let store = Self::new();
        for rule in rules {
            store.upsert(rule);
        }
        store
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading rules file {}", path.display()))?;
        let store = Self::from_json(&raw)
            .with_context(|| format!("parsing rules file {}", path.display()))?;
        info!(path = %path.display(), count = store.len(), "Loaded rules");
        Ok(store)
    }

    /// Parses a JSON array of rule documents. Entries that do not parse as
    /// rules are logged and skipped; only a malformed array is an error.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(raw)?;
        let store = Self::new();
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<Rule>(entry) {
                Ok(rule) => store.upsert(rule),
                Err(e) => warn!(index, error = %e, "Skipping unparseable rule"),
            }
        }
        Ok(store)
    }

    pub fn upsert(&self, rule: Rule) {
        self.rules.insert(rule.uuid, rule);
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.rules.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleStore for StaticRuleStore {
    fn list_active(&self, trigger_kind: &str) -> anyhow::Result<Vec<Rule>> {
        let mut rules: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| r.is_active && r.trigger.kind == trigger_kind)
            .map(|r| r.value().clone())
            .collect();
        rules.sort_by_key(|r| r.uuid);
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(kind: &str, active: bool) -> Rule {
        serde_json::from_value(json!({
            "uuid": Uuid::new_v4(),
            "is_active": active,
            "trigger": {
                "trigger": kind,
                "params": {
                    "service": {"app_id": "a", "app_secret": "s", "access_token": "t"},
                    "insight": "account/1",
                    "field": "impressions",
                    "value": 10
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_list_active_filters_kind_and_state() {
        let store = StaticRuleStore::from_rules([
            rule("ads/trigger", true),
            rule("ads/trigger", false),
            rule("other/trigger", true),
        ]);
        assert_eq!(store.len(), 3);
        let active = store.list_active("ads/trigger").unwrap();
        assert_eq!(active.len(), 1);
        assert!(active[0].is_active);
    }

    #[test]
    fn test_from_json_skips_unparseable_entries() {
        let good = rule("ads/trigger", true);
        let raw = json!([
            good,
            {"uuid": "not-a-uuid", "trigger": {}},
            42
        ])
        .to_string();
        let store = StaticRuleStore::from_json(&raw).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.list_active("ads/trigger").unwrap()[0].uuid, good.uuid);

        assert!(StaticRuleStore::from_json("{\"rules\": []}").is_err());
    }

    #[test]
    fn test_from_json_keeps_rule_with_text_threshold() {
        let mut doc = serde_json::to_value(rule("ads/trigger", true)).unwrap();
        doc["trigger"]["params"]["value"] = json!("five");
        let store = StaticRuleStore::from_json(&json!([doc]).to_string()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove() {
        let r = rule("ads/trigger", true);
        let id = r.uuid;
        let store = StaticRuleStore::from_rules([r]);
        assert!(store.remove(&id));
        assert!(store.is_empty());
    }
}
