//! Rule-based risk score.
//!
//! The score blends three independent signals linearly so every loan's score can be
//! explained from its inputs:
//! - repayment burden: DTI ratio clipped to `[0, 1]`
//! - creditworthiness: credit score clamped to `[300, 850]`, normalized and inverted
//! - cost of credit: interest rate scaled between the recordset's 5th and 95th percentile
//!
//! The interest-rate scale depends on the recordset being scored, so the same loan can
//! score differently in a filtered view than in the full baseline. Scores are always
//! recomputed per recordset.

use super::domain::{LoanRecord, RiskBand, RiskComponents, ScoredLoan};
use super::AnalysisError;
use serde::Serialize;

pub const DTI_WEIGHT: f64 = 0.45;
pub const CREDIT_WEIGHT: f64 = 0.35;
pub const INTEREST_RATE_WEIGHT: f64 = 0.20;

pub const CREDIT_SCORE_FLOOR: f64 = 300.0;
pub const CREDIT_SCORE_CEILING: f64 = 850.0;

pub const LOWER_RATE_PERCENTILE: f64 = 0.05;
pub const UPPER_RATE_PERCENTILE: f64 = 0.95;

pub const DEFAULT_CRITICAL_DTI_THRESHOLD: f64 = 0.40;

pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.33;
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 0.66;

pub fn dti_component(dti_ratio: f64) -> f64 {
    dti_ratio.clamp(0.0, 1.0)
}

/// `1 - normalized credit score`; scores outside the domain range are clamped first.
pub fn credit_risk_component(credit_score: f64) -> f64 {
    let clamped = credit_score.clamp(CREDIT_SCORE_FLOOR, CREDIT_SCORE_CEILING);
    let normalized = ((clamped - CREDIT_SCORE_FLOOR) / (CREDIT_SCORE_CEILING - CREDIT_SCORE_FLOOR))
        .clamp(0.0, 1.0);
    1.0 - normalized
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], quantile: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = quantile.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Robust min-max scale for interest rates within one recordset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterestRateScale {
    lower: f64,
    upper: f64,
}

impl InterestRateScale {
    /// `None` when the percentile range is degenerate (empty, single value, or equal bounds).
    pub fn from_records(records: &[LoanRecord]) -> Option<Self> {
        let rates: Vec<f64> = records.iter().map(|loan| loan.interest_rate).collect();
        let lower = percentile(&rates, LOWER_RATE_PERCENTILE)?;
        let upper = percentile(&rates, UPPER_RATE_PERCENTILE)?;
        (upper > lower).then_some(Self { lower, upper })
    }

    pub fn normalize(&self, rate: f64) -> f64 {
        ((rate - self.lower) / (self.upper - self.lower)).clamp(0.0, 1.0)
    }
}

fn components(loan: &LoanRecord, scale: Option<InterestRateScale>) -> RiskComponents {
    RiskComponents {
        dti: dti_component(loan.dti_ratio),
        credit: credit_risk_component(f64::from(loan.credit_score)),
        interest_rate: scale.map_or(0.0, |scale| scale.normalize(loan.interest_rate)),
    }
}

fn weighted(components: &RiskComponents) -> f64 {
    (DTI_WEIGHT * components.dti
        + CREDIT_WEIGHT * components.credit
        + INTEREST_RATE_WEIGHT * components.interest_rate)
        .clamp(0.0, 1.0)
}

/// Risk score in `[0, 1]` for every loan, scaled within `records`.
pub fn score(records: &[LoanRecord]) -> Vec<f64> {
    let scale = InterestRateScale::from_records(records);
    records
        .iter()
        .map(|loan| weighted(&components(loan, scale)))
        .collect()
}

/// `dti_ratio > threshold` on the unclipped ratio.
pub fn critical_dti(records: &[LoanRecord], threshold: f64) -> Vec<bool> {
    records
        .iter()
        .map(|loan| loan.dti_ratio > threshold)
        .collect()
}

/// Cut-points between the Neutral, Alert and Critical bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskBandThresholds {
    pub alert: f64,
    pub critical: f64,
}

impl Default for RiskBandThresholds {
    fn default() -> Self {
        Self {
            alert: DEFAULT_ALERT_THRESHOLD,
            critical: DEFAULT_CRITICAL_THRESHOLD,
        }
    }
}

impl RiskBandThresholds {
    pub fn new(alert: f64, critical: f64) -> Result<Self, AnalysisError> {
        if !(0.0..=1.0).contains(&alert) || !(0.0..=1.0).contains(&critical) || alert > critical
        {
            return Err(AnalysisError::InvalidBandThresholds { alert, critical });
        }
        Ok(Self { alert, critical })
    }

    pub fn classify(&self, score: f64) -> RiskBand {
        if score >= self.critical {
            RiskBand::Critical
        } else if score >= self.alert {
            RiskBand::Alert
        } else {
            RiskBand::Neutral
        }
    }
}

/// Enriches a recordset with every derived risk attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScorer {
    critical_dti_threshold: f64,
    bands: RiskBandThresholds,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(DEFAULT_CRITICAL_DTI_THRESHOLD, RiskBandThresholds::default())
    }
}

impl RiskScorer {
    pub fn new(critical_dti_threshold: f64, bands: RiskBandThresholds) -> Self {
        Self {
            critical_dti_threshold,
            bands,
        }
    }

    pub fn critical_dti_threshold(&self) -> f64 {
        self.critical_dti_threshold
    }

    pub fn bands(&self) -> RiskBandThresholds {
        self.bands
    }

    pub fn enrich(&self, records: &[LoanRecord]) -> Vec<ScoredLoan> {
        let scale = InterestRateScale::from_records(records);
        records
            .iter()
            .zip(critical_dti(records, self.critical_dti_threshold))
            .map(|(loan, critical_dti)| {
                let components = components(loan, scale);
                let risk_score = weighted(&components);
                ScoredLoan {
                    record: loan.clone(),
                    risk_score,
                    components,
                    risk_band: self.bands.classify(risk_score),
                    value_at_risk: loan.loan_amount * risk_score,
                    critical_dti,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::test_support::{loan, scenario_loans};
    use approx::assert_relative_eq;

    #[test]
    fn scores_are_always_within_unit_interval() {
        let records = vec![
            loan("low", -0.5, 900, 1.0, 100.0, None, false),
            loan("high", 3.0, 100, 40.0, 100.0, None, true),
            loan("mid", 0.4, 640, 12.0, 100.0, None, false),
        ];

        for value in score(&records) {
            assert!((0.0..=1.0).contains(&value), "score {value} out of range");
        }
    }

    #[test]
    fn dti_component_is_monotonic_and_clipped() {
        let samples: Vec<f64> = (0..=10).map(|step| dti_component(step as f64 / 10.0)).collect();
        assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(dti_component(-0.2), 0.0);
        assert_eq!(dti_component(1.7), 1.0);
    }

    #[test]
    fn credit_component_hits_bounds_and_clamps_outliers() {
        assert_eq!(credit_risk_component(850.0), 0.0);
        assert_eq!(credit_risk_component(300.0), 1.0);
        assert_eq!(credit_risk_component(1000.0), credit_risk_component(850.0));
        assert_eq!(credit_risk_component(120.0), 1.0);

        let samples: Vec<f64> = (300..=850)
            .step_by(50)
            .map(|score| credit_risk_component(score as f64))
            .collect();
        assert!(samples.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn out_of_range_credit_score_scores_like_the_ceiling() {
        let capped = vec![
            loan("a", 0.3, 1000, 10.0, 100.0, None, false),
            loan("b", 0.3, 600, 14.0, 100.0, None, false),
        ];
        let ceiling = vec![
            loan("a", 0.3, 850, 10.0, 100.0, None, false),
            loan("b", 0.3, 600, 14.0, 100.0, None, false),
        ];

        assert_eq!(score(&capped), score(&ceiling));
    }

    #[test]
    fn equal_interest_rates_contribute_nothing() {
        let records = vec![
            loan("a", 0.2, 700, 11.0, 100.0, None, false),
            loan("b", 0.6, 500, 11.0, 100.0, None, true),
            loan("c", 0.9, 400, 11.0, 100.0, None, true),
        ];

        assert!(InterestRateScale::from_records(&records).is_none());
        for scored in RiskScorer::default().enrich(&records) {
            assert_eq!(scored.components.interest_rate, 0.0);
            assert!(scored.risk_score.is_finite());
        }
    }

    #[test]
    fn single_row_and_empty_recordsets_are_degenerate() {
        let single = vec![loan("solo", 0.3, 650, 9.0, 100.0, None, false)];
        assert!(InterestRateScale::from_records(&single).is_none());
        assert!(score(&[]).is_empty());
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = [10.0, 12.0, 9.0, 15.0, 14.0];
        assert_relative_eq!(percentile(&values, 0.05).expect("p5"), 9.2, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 0.95).expect("p95"), 14.8, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 0.5).expect("median"), 12.0);
        assert!(percentile(&[], 0.5).is_none());
    }

    #[test]
    fn weighted_blend_matches_hand_computation() {
        let records = scenario_loans();
        let scores = score(&records);

        // Loan 4: dti 0.5, credit 580, rate 15 (above p95 = 14.8, clipped to 1).
        let credit = 1.0 - (580.0 - 300.0) / 550.0;
        let expected = 0.45 * 0.5 + 0.35 * credit + 0.20 * 1.0;
        assert_relative_eq!(scores[3], expected, epsilon = 1e-12);

        // Loan 3: rate 9 sits below p5 = 9.2, clipped to 0.
        let credit = 1.0 - (720.0 - 300.0) / 550.0;
        assert_relative_eq!(scores[2], 0.45 * 0.25 + 0.35 * credit, epsilon = 1e-12);
    }

    #[test]
    fn critical_dti_uses_strict_threshold() {
        let flags = critical_dti(&scenario_loans(), DEFAULT_CRITICAL_DTI_THRESHOLD);
        assert_eq!(flags, vec![false, false, false, true, true]);
        assert_eq!(flags.iter().filter(|flag| **flag).count(), 2);
    }

    #[test]
    fn scores_depend_on_the_recordset() {
        let records = scenario_loans();
        let baseline = score(&records);
        let subset = score(&records[..2]);

        assert_ne!(baseline[0], subset[0]);
    }

    #[test]
    fn enrich_derives_value_at_risk_and_bands() {
        let records = scenario_loans();
        let scorer = RiskScorer::default();
        let scored = scorer.enrich(&records);

        let scores: Vec<f64> = scored.iter().map(|loan| loan.risk_score).collect();
        let flags: Vec<bool> = scored.iter().map(|loan| loan.critical_dti).collect();
        assert_eq!(scores, score(&records));
        assert_eq!(flags, critical_dti(&records, scorer.critical_dti_threshold()));

        let strict = RiskScorer::new(0.45, RiskBandThresholds::default()).enrich(&records);
        assert_eq!(
            strict.iter().filter(|loan| loan.critical_dti).count(),
            1,
            "only the 0.50 ratio exceeds 0.45"
        );

        for loan in &scored {
            assert_relative_eq!(loan.value_at_risk, loan.record.loan_amount * loan.risk_score);
            assert_eq!(loan.risk_band, scorer.bands().classify(loan.risk_score));
        }
    }

    #[test]
    fn band_thresholds_classify_boundaries_upward() {
        let bands = RiskBandThresholds::default();
        assert_eq!(bands.classify(0.0), RiskBand::Neutral);
        assert_eq!(bands.classify(0.3299), RiskBand::Neutral);
        assert_eq!(bands.classify(0.33), RiskBand::Alert);
        assert_eq!(bands.classify(0.66), RiskBand::Critical);
        assert_eq!(bands.classify(1.0), RiskBand::Critical);
    }

    #[test]
    fn band_thresholds_reject_inverted_cut_points() {
        assert!(RiskBandThresholds::new(0.7, 0.3).is_err());
        assert!(RiskBandThresholds::new(-0.1, 0.3).is_err());
        assert!(RiskBandThresholds::new(0.2, 0.8).is_ok());
    }
}
