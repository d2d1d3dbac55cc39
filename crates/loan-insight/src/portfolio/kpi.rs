use super::domain::{LoanRecord, RiskBand, ScoredLoan};
use serde::Serialize;

/// Portfolio-level indicators available on any recordset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PortfolioKpis {
    pub count: usize,
    pub default_rate: f64,
    pub avg_loan_amount: f64,
    pub avg_credit_score: f64,
    pub avg_interest_rate: f64,
}

/// Indicators that require a risk-enriched recordset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RiskKpis {
    pub value_at_risk_total: f64,
    pub avg_risk_score: f64,
    pub critical_rate: f64,
    pub critical_count: usize,
}

/// A KPI in the current view next to its baseline value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiDelta<T> {
    pub current: T,
    pub baseline: T,
    pub delta: f64,
}

/// Current-vs-baseline comparison; deltas are always current minus baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PanoramaKpis {
    pub count: KpiDelta<usize>,
    pub default_rate: KpiDelta<f64>,
    pub avg_loan_amount: KpiDelta<f64>,
    pub avg_credit_score: KpiDelta<f64>,
    pub avg_interest_rate: KpiDelta<f64>,
    pub value_at_risk_total: KpiDelta<f64>,
    pub avg_risk_score: KpiDelta<f64>,
    pub critical_rate: KpiDelta<f64>,
    pub critical_count: KpiDelta<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BandCount {
    pub band: RiskBand,
    pub band_label: &'static str,
    pub count: usize,
}

fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn rate(flags: impl IntoIterator<Item = bool>) -> f64 {
    mean(flags.into_iter().map(|flag| if flag { 1.0 } else { 0.0 }))
}

pub fn compute_kpis(records: &[LoanRecord]) -> PortfolioKpis {
    summarize(records.iter())
}

fn summarize<'a, I>(records: I) -> PortfolioKpis
where
    I: Iterator<Item = &'a LoanRecord> + Clone,
{
    PortfolioKpis {
        count: records.clone().count(),
        default_rate: rate(records.clone().map(|loan| loan.default)),
        avg_loan_amount: mean(records.clone().map(|loan| loan.loan_amount)),
        avg_credit_score: mean(records.clone().map(|loan| f64::from(loan.credit_score))),
        avg_interest_rate: mean(records.map(|loan| loan.interest_rate)),
    }
}

pub fn compute_risk_kpis(scored: &[ScoredLoan]) -> RiskKpis {
    RiskKpis {
        value_at_risk_total: scored.iter().map(|loan| loan.value_at_risk).sum(),
        avg_risk_score: mean(scored.iter().map(|loan| loan.risk_score)),
        critical_rate: rate(scored.iter().map(|loan| loan.critical_dti)),
        critical_count: scored.iter().filter(|loan| loan.critical_dti).count(),
    }
}

/// `Σ loan_amount × score`, pairing loans and scores positionally.
pub fn value_at_risk(records: &[LoanRecord], scores: &[f64]) -> f64 {
    records
        .iter()
        .zip(scores)
        .map(|(loan, score)| loan.loan_amount * score)
        .sum()
}

fn delta(current: f64, baseline: f64) -> KpiDelta<f64> {
    KpiDelta {
        current,
        baseline,
        delta: current - baseline,
    }
}

fn count_delta(current: usize, baseline: usize) -> KpiDelta<usize> {
    KpiDelta {
        current,
        baseline,
        delta: current as f64 - baseline as f64,
    }
}

/// Compares a filtered view against the baseline, each scored within itself.
pub fn compare(current: &[ScoredLoan], baseline: &[ScoredLoan]) -> PanoramaKpis {
    let current_base = summarize(current.iter().map(|loan| &loan.record));
    let baseline_base = summarize(baseline.iter().map(|loan| &loan.record));
    let current_risk = compute_risk_kpis(current);
    let baseline_risk = compute_risk_kpis(baseline);

    PanoramaKpis {
        count: count_delta(current_base.count, baseline_base.count),
        default_rate: delta(current_base.default_rate, baseline_base.default_rate),
        avg_loan_amount: delta(current_base.avg_loan_amount, baseline_base.avg_loan_amount),
        avg_credit_score: delta(current_base.avg_credit_score, baseline_base.avg_credit_score),
        avg_interest_rate: delta(
            current_base.avg_interest_rate,
            baseline_base.avg_interest_rate,
        ),
        value_at_risk_total: delta(
            current_risk.value_at_risk_total,
            baseline_risk.value_at_risk_total,
        ),
        avg_risk_score: delta(current_risk.avg_risk_score, baseline_risk.avg_risk_score),
        critical_rate: delta(current_risk.critical_rate, baseline_risk.critical_rate),
        critical_count: count_delta(current_risk.critical_count, baseline_risk.critical_count),
    }
}

/// Loans per risk band in severity order, empty bands included.
pub fn band_distribution(scored: &[ScoredLoan]) -> Vec<BandCount> {
    RiskBand::ordered()
        .into_iter()
        .map(|band| BandCount {
            band,
            band_label: band.label(),
            count: scored.iter().filter(|loan| loan.risk_band == band).count(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::risk::{score, RiskScorer};
    use crate::portfolio::test_support::scenario_loans;
    use approx::assert_relative_eq;

    #[test]
    fn kpis_match_hand_computation() {
        let kpis = compute_kpis(&scenario_loans());

        assert_eq!(kpis.count, 5);
        assert_relative_eq!(kpis.default_rate, 0.6, epsilon = 1e-9);
        assert_relative_eq!(kpis.avg_loan_amount, 2000.0);
        assert_relative_eq!(kpis.avg_credit_score, 642.0);
        assert_relative_eq!(kpis.avg_interest_rate, 12.0);
    }

    #[test]
    fn empty_recordsets_yield_zero_kpis() {
        assert_eq!(compute_kpis(&[]), PortfolioKpis::default());
        assert_eq!(compute_risk_kpis(&[]), RiskKpis::default());
        assert_eq!(compare(&[], &[]), PanoramaKpis::default());
    }

    #[test]
    fn value_at_risk_total_is_the_exact_sum() {
        let records = scenario_loans();
        let scores = score(&records);
        let expected: f64 = records
            .iter()
            .zip(&scores)
            .map(|(loan, score)| loan.loan_amount * score)
            .sum();

        assert_eq!(value_at_risk(&records, &scores), expected);

        let scored = RiskScorer::default().enrich(&records);
        assert_eq!(compute_risk_kpis(&scored).value_at_risk_total, expected);
    }

    #[test]
    fn critical_alerts_are_counted() {
        let scored = RiskScorer::default().enrich(&scenario_loans());
        let kpis = compute_risk_kpis(&scored);

        assert_eq!(kpis.critical_count, 2);
        assert_relative_eq!(kpis.critical_rate, 0.4);
    }

    #[test]
    fn identical_recordsets_have_zero_deltas() {
        let scorer = RiskScorer::default();
        let current = scorer.enrich(&scenario_loans());
        let baseline = scorer.enrich(&scenario_loans());
        let panorama = compare(&current, &baseline);

        for delta in [
            panorama.count.delta,
            panorama.default_rate.delta,
            panorama.avg_loan_amount.delta,
            panorama.avg_credit_score.delta,
            panorama.avg_interest_rate.delta,
            panorama.value_at_risk_total.delta,
            panorama.avg_risk_score.delta,
            panorama.critical_rate.delta,
            panorama.critical_count.delta,
        ] {
            assert_eq!(delta, 0.0);
        }
    }

    #[test]
    fn deltas_are_current_minus_baseline() {
        let scorer = RiskScorer::default();
        let records = scenario_loans();
        let baseline = scorer.enrich(&records);
        let current = scorer.enrich(&records[3..]);
        let panorama = compare(&current, &baseline);

        assert_eq!(panorama.count.current, 2);
        assert_eq!(panorama.count.delta, -3.0);
        assert_relative_eq!(panorama.default_rate.delta, 1.0 - 0.6, epsilon = 1e-12);
    }

    #[test]
    fn band_distribution_lists_every_band() {
        let scored = RiskScorer::default().enrich(&scenario_loans());
        let bands = band_distribution(&scored);

        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].band, RiskBand::Neutral);
        assert_eq!(bands.iter().map(|entry| entry.count).sum::<usize>(), 5);
    }
}
