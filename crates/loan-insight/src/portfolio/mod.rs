//! Loan portfolio risk analysis: ingest, filtering, scoring, aggregation, and ranking.
//!
//! Every analysis function is pure over borrowed input and returns new values; the
//! loaded dataset is never mutated.

pub mod action;
pub mod analytics;
pub mod dataset;
pub mod domain;
pub mod export;
pub mod filter;
pub mod kpi;
pub mod narrative;
pub mod report;
pub mod risk;
pub mod router;
pub mod segments;

#[cfg(test)]
pub(crate) mod test_support;

pub use action::{rank, ActionListRequest, ActionSortKey};
pub use dataset::{DatasetError, DatasetFetcher, DatasetLoader, DatasetVersion, LoanDataset};
pub use domain::{LoanRecord, RiskBand, ScoredLoan, SegmentDimension, UnknownDimension};
pub use export::{write_action_list, ExportError, ExportFormat};
pub use filter::{apply_filters, FilterSpec, NumericRange};
pub use report::{AnalysisConfig, PortfolioAnalyzer, PortfolioReport};
pub use risk::{RiskBandThresholds, RiskScorer};
pub use router::{portfolio_router, PortfolioService};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    UnknownDimension(#[from] UnknownDimension),
    #[error("unknown action-list sort key '{0}' (expected risk_score or value_at_risk)")]
    UnknownSortKey(String),
    #[error("top_n must be between {min} and {max}, got {requested}")]
    TopNOutOfRange {
        requested: usize,
        min: usize,
        max: usize,
    },
    #[error("risk band thresholds must satisfy 0 <= alert <= critical <= 1 (alert {alert}, critical {critical})")]
    InvalidBandThresholds { alert: f64, critical: f64 },
}
