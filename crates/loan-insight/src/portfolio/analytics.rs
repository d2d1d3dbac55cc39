use super::domain::LoanRecord;
use serde::Serialize;

/// Credit-score bin edges. The first bin includes its lower edge; every bin includes its
/// upper edge.
pub const CREDIT_SCORE_BIN_EDGES: [u32; 8] = [300, 500, 600, 650, 700, 750, 800, 850];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditScoreBand {
    pub label: String,
    pub low: u32,
    pub high: u32,
    pub count: usize,
    pub default_rate: f64,
}

/// Mean of one numeric attribute among defaulted versus performing loans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverDelta {
    pub feature: &'static str,
    pub mean_default: f64,
    pub mean_non_default: f64,
    pub delta: f64,
    pub delta_pct: f64,
}

type Feature = (&'static str, fn(&LoanRecord) -> f64);

const NUMERIC_FEATURES: [Feature; 9] = [
    ("Age", |loan| f64::from(loan.age)),
    ("Income", |loan| loan.income),
    ("LoanAmount", |loan| loan.loan_amount),
    ("CreditScore", |loan| f64::from(loan.credit_score)),
    ("MonthsEmployed", |loan| f64::from(loan.months_employed)),
    ("NumCreditLines", |loan| f64::from(loan.num_credit_lines)),
    ("InterestRate", |loan| loan.interest_rate),
    ("LoanTerm", |loan| f64::from(loan.loan_term)),
    ("DTIRatio", |loan| loan.dti_ratio),
];

fn bin_index(credit_score: u32) -> Option<usize> {
    let (first, last) = (CREDIT_SCORE_BIN_EDGES[0], CREDIT_SCORE_BIN_EDGES[7]);
    if !(first..=last).contains(&credit_score) {
        return None;
    }
    CREDIT_SCORE_BIN_EDGES[1..]
        .iter()
        .position(|upper| credit_score <= *upper)
}

/// Default rate per credit-score bin, empty bins included. Scores outside the binned
/// range are left out.
pub fn credit_score_bands(records: &[LoanRecord]) -> Vec<CreditScoreBand> {
    let mut tallies = [(0usize, 0usize); 7];
    for loan in records {
        if let Some(index) = bin_index(loan.credit_score) {
            tallies[index].0 += 1;
            tallies[index].1 += usize::from(loan.default);
        }
    }

    CREDIT_SCORE_BIN_EDGES
        .windows(2)
        .zip(tallies)
        .enumerate()
        .map(|(index, (edges, (count, defaults)))| {
            let low = if index == 0 { edges[0] } else { edges[0] + 1 };
            let high = edges[1];
            CreditScoreBand {
                label: format!("{low}-{high}"),
                low,
                high,
                count,
                default_rate: if count == 0 {
                    0.0
                } else {
                    defaults as f64 / count as f64
                },
            }
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Numeric drivers ordered by absolute relative delta, largest first.
///
/// Empty unless both defaulted and performing loans are present.
pub fn numeric_drivers(records: &[LoanRecord]) -> Vec<DriverDelta> {
    let (defaulted, performing): (Vec<&LoanRecord>, Vec<&LoanRecord>) =
        records.iter().partition(|loan| loan.default);
    if defaulted.is_empty() || performing.is_empty() {
        return Vec::new();
    }

    let mut drivers: Vec<DriverDelta> = NUMERIC_FEATURES
        .into_iter()
        .map(|(feature, value)| {
            let mean_default = mean(defaulted.iter().map(|loan| value(loan)));
            let mean_non_default = mean(performing.iter().map(|loan| value(loan)));
            let delta = mean_default - mean_non_default;
            DriverDelta {
                feature,
                mean_default,
                mean_non_default,
                delta,
                delta_pct: if mean_non_default == 0.0 {
                    0.0
                } else {
                    delta / mean_non_default
                },
            }
        })
        .collect();

    drivers.sort_by(|left, right| right.delta_pct.abs().total_cmp(&left.delta_pct.abs()));
    drivers
}
