//! Insight reporting — hierarchy discovery and insight normalization for
//! the ads platform.

pub mod display_names;
pub mod insights;
pub mod walker;

pub use display_names::display_name;
pub use insights::InsightNormalizer;
pub use walker::ResourceTreeWalker;
