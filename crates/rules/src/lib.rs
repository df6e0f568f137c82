//! Threshold rules over ads insights: comparison conditions and the
//! periodic evaluation pass.

pub mod condition;
pub mod evaluator;

pub use condition::Condition;
pub use evaluator::{PassReport, RuleEvaluator, RuleFailure};
