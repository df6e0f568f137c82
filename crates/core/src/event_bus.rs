//! Event sink — trait for publishing rule evaluation events to the host.
//!
//! The rule evaluator accepts an `Arc<dyn EventSink>` and emits one event
//! per evaluated rule on the `rules.trigger` topic.

use crate::types::RuleEvaluationEvent;
use serde::Serialize;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Topic the host listens on for rule state reports.
pub const RULES_TRIGGER_TOPIC: &str = "rules.trigger";

/// Trait for emitting rule events. Implementations forward to the host's
/// event bus, a log, or an in-memory buffer.
pub trait EventSink: Send + Sync {
    fn emit(&self, topic: &str, event: &RuleEvaluationEvent);
}

/// No-op sink for callers that only want the returned report.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _topic: &str, _event: &RuleEvaluationEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<(String, RuleEvaluationEvent)>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, RuleEvaluationEvent)>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<RuleEvaluationEvent> {
        self.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn topics(&self) -> Vec<String> {
        self.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn for_rule(&self, rule_id: Uuid) -> Vec<RuleEvaluationEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.rule_id == rule_id)
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, topic: &str, event: &RuleEvaluationEvent) {
        self.lock().push((topic.to_string(), event.clone()));
    }
}

#[derive(Serialize)]
struct EventLine<'a> {
    event: &'a str,
    #[serde(flatten)]
    payload: &'a RuleEvaluationEvent,
}

/// Writes one JSON object per event, e.g.
/// `{"event":"rules.trigger","id":"…","state":"ok","value":100.0}`.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, topic: &str, event: &RuleEvaluationEvent) {
        let line = EventLine {
            event: topic,
            payload: event,
        };
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        let written = serde_json::to_writer(&mut *out, &line)
            .map_err(std::io::Error::from)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush());
        if let Err(e) = written {
            tracing::warn!(error = %e, rule_id = %event.rule_id, "Failed to write event line");
        }
    }
}

/// Convenience: create a no-op sink.
pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

/// Convenience: create a capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
