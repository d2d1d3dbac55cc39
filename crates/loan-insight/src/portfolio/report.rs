use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::action::{self, ActionListRequest, DEFAULT_TOP_N};
use super::analytics::{self, CreditScoreBand, DriverDelta};
use super::dataset::{DatasetVersion, LoanDataset};
use super::domain::{ScoredLoan, SegmentDimension};
use super::filter::{apply_filters, FilterSpec};
use super::kpi::{self, BandCount, PanoramaKpis};
use super::narrative;
use super::risk::{RiskBandThresholds, RiskScorer, DEFAULT_CRITICAL_DTI_THRESHOLD};
use super::segments::{self, SegmentDefaultRate, SegmentProfile, DEFAULT_MIN_SEGMENT_VOLUME};
use super::AnalysisError;

/// Segment tables included in every report unless the caller asks for others.
pub const DEFAULT_REPORT_DIMENSIONS: [SegmentDimension; 2] =
    [SegmentDimension::LoanPurpose, SegmentDimension::EmploymentType];

/// Caller-tunable thresholds shared by every report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub critical_dti_threshold: f64,
    pub min_segment_volume: usize,
    pub default_top_n: usize,
    pub bands: RiskBandThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            critical_dti_threshold: DEFAULT_CRITICAL_DTI_THRESHOLD,
            min_segment_volume: DEFAULT_MIN_SEGMENT_VOLUME,
            default_top_n: DEFAULT_TOP_N,
            bands: RiskBandThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentTable {
    pub dimension: SegmentDimension,
    pub headline: String,
    pub rows: Vec<SegmentProfile>,
}

/// Everything the presentation layer needs for one interaction.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub generated_at: DateTime<Utc>,
    pub dataset: DatasetVersion,
    pub baseline_count: usize,
    pub filtered_count: usize,
    pub panorama: PanoramaKpis,
    pub risk_bands: Vec<BandCount>,
    pub headline: String,
    pub segments: Vec<SegmentTable>,
    pub credit_score_bands: Vec<CreditScoreBand>,
    pub drivers: Vec<DriverDelta>,
    pub action_request: ActionListRequest,
    pub action_list: Vec<ScoredLoan>,
}

/// Runs the filter → score → aggregate → rank pipeline over a loaded dataset.
#[derive(Debug, Clone, Copy)]
pub struct PortfolioAnalyzer {
    config: AnalysisConfig,
    scorer: RiskScorer,
}

impl Default for PortfolioAnalyzer {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl PortfolioAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            scorer: RiskScorer::new(config.critical_dti_threshold, config.bands),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Action-list request using the configured default top-N.
    pub fn default_request(&self) -> ActionListRequest {
        ActionListRequest {
            top_n: self.config.default_top_n,
            ..ActionListRequest::default()
        }
    }

    /// Scores the filtered view within itself.
    pub fn score_view(&self, dataset: &LoanDataset, filters: &FilterSpec) -> Vec<ScoredLoan> {
        self.scorer.enrich(&apply_filters(dataset.records(), filters))
    }

    pub fn report(
        &self,
        dataset: &LoanDataset,
        filters: &FilterSpec,
        request: &ActionListRequest,
    ) -> Result<PortfolioReport, AnalysisError> {
        self.report_for(dataset, filters, request, &DEFAULT_REPORT_DIMENSIONS)
    }

    /// Report with segment tables for `dimensions`; the headline describes the first one.
    pub fn report_for(
        &self,
        dataset: &LoanDataset,
        filters: &FilterSpec,
        request: &ActionListRequest,
        dimensions: &[SegmentDimension],
    ) -> Result<PortfolioReport, AnalysisError> {
        request.validate()?;

        let baseline = self.scorer.enrich(dataset.records());
        let current = self.score_view(dataset, filters);
        let current_records: Vec<_> = current.iter().map(|loan| loan.record.clone()).collect();

        let segments: Vec<SegmentTable> = dimensions
            .iter()
            .map(|dimension| {
                let rows = segments::profile(&current, *dimension);
                SegmentTable {
                    dimension: *dimension,
                    headline: narrative::headline(&rows, *dimension),
                    rows,
                }
            })
            .collect();
        let headline = segments
            .first()
            .map(|table| table.headline.clone())
            .unwrap_or_else(|| narrative::INSUFFICIENT_SEGMENTS.to_string());

        let report = PortfolioReport {
            generated_at: Utc::now(),
            dataset: dataset.version().clone(),
            baseline_count: baseline.len(),
            filtered_count: current.len(),
            panorama: kpi::compare(&current, &baseline),
            risk_bands: kpi::band_distribution(&current),
            headline,
            segments,
            credit_score_bands: analytics::credit_score_bands(&current_records),
            drivers: analytics::numeric_drivers(&current_records),
            action_request: *request,
            action_list: action::rank(&current, request),
        };

        info!(
            source = %report.dataset.source,
            baseline = report.baseline_count,
            filtered = report.filtered_count,
            actions = report.action_list.len(),
            "portfolio report built"
        );
        Ok(report)
    }

    /// Ranked action list for export.
    pub fn action_list(
        &self,
        dataset: &LoanDataset,
        filters: &FilterSpec,
        request: &ActionListRequest,
    ) -> Result<Vec<ScoredLoan>, AnalysisError> {
        request.validate()?;
        Ok(action::rank(&self.score_view(dataset, filters), request))
    }

    /// Minimum-volume default-rate ranking; `min_count` falls back to the configured volume.
    pub fn segment_ranking(
        &self,
        dataset: &LoanDataset,
        filters: &FilterSpec,
        dimension: SegmentDimension,
        min_count: Option<usize>,
    ) -> Vec<SegmentDefaultRate> {
        let records = apply_filters(dataset.records(), filters);
        let min_count = min_count.unwrap_or(self.config.min_segment_volume);
        segments::rank_by_default_rate(&records, dimension, min_count)
    }
}
