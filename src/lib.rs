//! CashFlow OS
//!
//! Cash-flow tracking backend for small businesses:
//! - Records inflows and outflows per account in a JSON data file
//! - Derives balance, 30-day burn rate and runway from the records
//! - Grades the position on a configurable risk ladder
//! - Answers CFO questions with a deterministic narrative, optionally
//!   refined by Gemini, and never fails to answer
//!
//! FLOW:
//! RECORDS → SUMMARY → RISK RUNG → NARRATIVE (→ GEMINI?) → REPLY

pub mod advisor;
pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod gemini;
pub mod intent;
pub mod models;
pub mod narrative;
pub mod risk;
pub mod store;
pub mod summary;

pub use error::{CashflowError, Result};

// Re-export common types
pub use models::*;
pub use risk::{classify_risk, LadderPreset, RiskLadder, RiskRung};
pub use summary::compute_summary;
