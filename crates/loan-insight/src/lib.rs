//! Loan portfolio risk insight: a rule-based risk score, portfolio KPIs, segment
//! profiles, and a ranked action list over a tabular loan dataset.

pub mod config;
pub mod error;
pub mod portfolio;
pub mod telemetry;
