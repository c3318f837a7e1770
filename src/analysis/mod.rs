//! Derivation pipeline.
//!
//! Documents are normalized first, then aggregated into analytics or
//! synthesized into insights.

pub mod aggregator;
pub mod insights;
pub mod normalizer;

pub use aggregator::aggregate;
pub use insights::synthesize;
pub use normalizer::{normalize_documents, Normalized};
