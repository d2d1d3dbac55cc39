use super::domain::LoanRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive `[low, high]` bound on a numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub low: f64,
    pub high: f64,
}

impl NumericRange {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// Smallest range covering every value, `None` when there are no values.
    pub fn extent<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().fold(None, |range, value| match range {
            None => Some(Self::new(value, value)),
            Some(current) => Some(Self::new(current.low.min(value), current.high.max(value))),
        })
    }
}

/// Immutable description of the currently selected constraints.
///
/// Ranges are inclusive; `None` leaves the attribute unconstrained. Every allow-set
/// follows the same rule: an empty set imposes no restriction, a non-empty set keeps
/// only the listed values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub age: Option<NumericRange>,
    pub income: Option<NumericRange>,
    pub loan_amount: Option<NumericRange>,
    pub credit_score: Option<NumericRange>,
    pub interest_rate: Option<NumericRange>,
    pub dti_ratio: Option<NumericRange>,
    pub education: BTreeSet<String>,
    pub employment_type: BTreeSet<String>,
    pub marital_status: BTreeSet<String>,
    pub loan_purpose: BTreeSet<String>,
    pub has_mortgage: BTreeSet<bool>,
    pub has_dependents: BTreeSet<bool>,
    pub has_cosigner: BTreeSet<bool>,
    pub default: BTreeSet<bool>,
}

impl FilterSpec {
    /// Filter whose ranges span the full data extent and whose sets are all open.
    pub fn full_extent(records: &[LoanRecord]) -> Self {
        Self {
            age: NumericRange::extent(records.iter().map(|loan| f64::from(loan.age))),
            income: NumericRange::extent(records.iter().map(|loan| loan.income)),
            loan_amount: NumericRange::extent(records.iter().map(|loan| loan.loan_amount)),
            credit_score: NumericRange::extent(
                records.iter().map(|loan| f64::from(loan.credit_score)),
            ),
            interest_rate: NumericRange::extent(records.iter().map(|loan| loan.interest_rate)),
            dti_ratio: NumericRange::extent(records.iter().map(|loan| loan.dti_ratio)),
            ..Self::default()
        }
    }

    pub fn matches(&self, loan: &LoanRecord) -> bool {
        within(self.age, f64::from(loan.age))
            && within(self.income, loan.income)
            && within(self.loan_amount, loan.loan_amount)
            && within(self.credit_score, f64::from(loan.credit_score))
            && within(self.interest_rate, loan.interest_rate)
            && within(self.dti_ratio, loan.dti_ratio)
            && allowed(&self.education, loan.education.as_ref())
            && allowed(&self.employment_type, loan.employment_type.as_ref())
            && allowed(&self.marital_status, loan.marital_status.as_ref())
            && allowed(&self.loan_purpose, loan.loan_purpose.as_ref())
            && allowed(&self.has_mortgage, Some(&loan.has_mortgage))
            && allowed(&self.has_dependents, Some(&loan.has_dependents))
            && allowed(&self.has_cosigner, Some(&loan.has_cosigner))
            && allowed(&self.default, Some(&loan.default))
    }
}

fn within(range: Option<NumericRange>, value: f64) -> bool {
    range.map_or(true, |range| range.contains(value))
}

fn allowed<T: Ord>(set: &BTreeSet<T>, value: Option<&T>) -> bool {
    set.is_empty() || value.map_or(false, |value| set.contains(value))
}

/// Working subset of `records` satisfying every predicate, in original order.
pub fn apply_filters(records: &[LoanRecord], spec: &FilterSpec) -> Vec<LoanRecord> {
    records
        .iter()
        .filter(|loan| spec.matches(loan))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::test_support::loan;

    fn sample() -> Vec<LoanRecord> {
        vec![
            loan("1", 0.20, 700, 10.0, 1000.0, Some("A"), false),
            loan("2", 0.40, 600, 12.0, 2000.0, Some("A"), true),
            loan("3", 0.25, 720, 9.0, 1500.0, Some("B"), false),
            loan("4", 0.50, 580, 15.0, 3000.0, None, true),
        ]
    }

    fn ids(records: &[LoanRecord]) -> Vec<&str> {
        records.iter().map(|loan| loan.loan_id.as_str()).collect()
    }

    #[test]
    fn full_extent_keeps_every_row() {
        let records = sample();
        let spec = FilterSpec::full_extent(&records);

        assert_eq!(spec.dti_ratio, Some(NumericRange::new(0.20, 0.50)));
        assert_eq!(apply_filters(&records, &spec), records);
    }

    #[test]
    fn ranges_are_inclusive_on_both_ends() {
        let records = sample();
        let spec = FilterSpec {
            dti_ratio: Some(NumericRange::new(0.25, 0.40)),
            ..FilterSpec::default()
        };

        assert_eq!(ids(&apply_filters(&records, &spec)), vec!["2", "3"]);
    }

    #[test]
    fn empty_allow_set_imposes_no_restriction() {
        let records = sample();
        let spec = FilterSpec {
            loan_purpose: BTreeSet::new(),
            default: BTreeSet::new(),
            ..FilterSpec::default()
        };

        assert_eq!(apply_filters(&records, &spec).len(), records.len());
    }

    #[test]
    fn non_empty_allow_set_keeps_listed_values_only() {
        let records = sample();
        let spec = FilterSpec {
            loan_purpose: BTreeSet::from(["A".to_string()]),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&apply_filters(&records, &spec)), vec!["1", "2"]);

        let spec = FilterSpec {
            default: BTreeSet::from([true]),
            ..FilterSpec::default()
        };
        assert_eq!(ids(&apply_filters(&records, &spec)), vec!["2", "4"]);
    }

    #[test]
    fn predicates_are_anded() {
        let records = sample();
        let spec = FilterSpec {
            loan_purpose: BTreeSet::from(["A".to_string()]),
            credit_score: Some(NumericRange::new(650.0, 850.0)),
            ..FilterSpec::default()
        };

        assert_eq!(ids(&apply_filters(&records, &spec)), vec!["1"]);
    }

    #[test]
    fn filtering_is_idempotent_and_handles_empty_input() {
        let records = sample();
        let spec = FilterSpec {
            income: Some(NumericRange::new(0.0, 1e9)),
            has_mortgage: BTreeSet::from([false]),
            ..FilterSpec::default()
        };

        let once = apply_filters(&records, &spec);
        let twice = apply_filters(&once, &spec);
        assert_eq!(once, twice);
        assert!(apply_filters(&[], &spec).is_empty());
        assert_eq!(FilterSpec::full_extent(&[]).age, None);
    }
}
