//! Standardized screening instruments: response validation, scoring and
//! severity banding. Everything here is pure and has no database access.

pub mod interpretation;
pub mod scoring;

pub use scoring::{ModuleType, ScoredModule, ScreeningResponses};
