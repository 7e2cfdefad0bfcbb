//! Competency aggregation and cohort statistics.
//!
//! Raw student activity (diagnostic answers, course grades, extracurricular
//! completions) is composed into one summary row per semester, student, and
//! competency. Cohort statistics are then derived from those rows.

pub mod composer;
pub mod config;
pub mod db;
pub mod error;
#[cfg(test)]
mod memory;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod sources;
pub mod stats;
pub mod store;
pub mod weights;

pub use error::{EngineError, Result};
pub use orchestrator::{Recalculator, Repository};
