//! Segment tables over one categorical dimension.
//!
//! Two aggregation paths share the same grouping: the risk-share profile used for
//! "where is risk concentrated" reporting, and the minimum-volume default-rate ranking
//! that suppresses small, noisy groups before ranking.

use super::domain::{LoanRecord, ScoredLoan, SegmentDimension, MISSING_LABEL};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_MIN_SEGMENT_VOLUME: usize = 200;

/// Representative card for one segment of the risk-share profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentProfile {
    pub dimension: SegmentDimension,
    pub segment: String,
    pub count: usize,
    pub default_rate: f64,
    pub var_sum: f64,
    pub risk_share: f64,
    pub median_age: f64,
    pub median_income: f64,
    pub median_credit_score: f64,
    pub median_dti_ratio: f64,
    pub modal_employment_type: String,
    pub modal_education: String,
    pub modal_marital_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentDefaultRate {
    pub dimension: SegmentDimension,
    pub segment: String,
    pub count: usize,
    pub default_rate: f64,
}

/// Groups items by key in order of first appearance. A missing key is its own group.
fn group_by<'a, T, F>(items: &'a [T], key: F) -> Vec<(Option<String>, Vec<&'a T>)>
where
    F: Fn(&T) -> Option<String>,
{
    let mut index: HashMap<Option<String>, usize> = HashMap::new();
    let mut groups: Vec<(Option<String>, Vec<&'a T>)> = Vec::new();

    for item in items {
        let value = key(item);
        match index.get(&value) {
            Some(position) => groups[*position].1.push(item),
            None => {
                index.insert(value.clone(), groups.len());
                groups.push((value, vec![item]));
            }
        }
    }

    groups
}

fn segment_label(key: Option<String>) -> String {
    key.unwrap_or_else(|| MISSING_LABEL.to_string())
}

fn default_rate<'a>(records: impl Iterator<Item = &'a LoanRecord>) -> f64 {
    let (defaults, total) = records.fold((0usize, 0usize), |(defaults, total), loan| {
        (defaults + usize::from(loan.default), total + 1)
    });
    if total == 0 {
        0.0
    } else {
        defaults as f64 / total as f64
    }
}

/// Median with the midpoint of the two central values for even counts; 0 when empty.
fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Most frequent non-missing value; ties go to the lexicographically smallest.
fn mode<'a>(values: impl Iterator<Item = Option<&'a str>>) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.flatten() {
        *counts.entry(value).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }

    best.map_or_else(|| MISSING_LABEL.to_string(), |(value, _)| value.to_string())
}

fn descending(left: f64, right: f64) -> Ordering {
    right.total_cmp(&left)
}

/// Risk-share profile of a scored recordset, ordered by value at risk, then default
/// rate, then count (all descending). Equal keys keep first-appearance order.
pub fn profile(scored: &[ScoredLoan], dimension: SegmentDimension) -> Vec<SegmentProfile> {
    let groups = group_by(scored, |loan| loan.record.dimension_value(dimension));
    let total_var: f64 = scored.iter().map(|loan| loan.value_at_risk).sum();

    let mut rows: Vec<SegmentProfile> = groups
        .into_iter()
        .map(|(key, members)| {
            let var_sum: f64 = members.iter().map(|loan| loan.value_at_risk).sum();
            let records = || members.iter().map(|loan| &loan.record);
            SegmentProfile {
                dimension,
                segment: segment_label(key),
                count: members.len(),
                default_rate: default_rate(records()),
                var_sum,
                risk_share: if total_var > 0.0 {
                    var_sum / total_var
                } else {
                    0.0
                },
                median_age: median(records().map(|loan| f64::from(loan.age)).collect()),
                median_income: median(records().map(|loan| loan.income).collect()),
                median_credit_score: median(
                    records().map(|loan| f64::from(loan.credit_score)).collect(),
                ),
                median_dti_ratio: median(records().map(|loan| loan.dti_ratio).collect()),
                modal_employment_type: mode(records().map(|loan| loan.employment_type.as_deref())),
                modal_education: mode(records().map(|loan| loan.education.as_deref())),
                modal_marital_status: mode(records().map(|loan| loan.marital_status.as_deref())),
            }
        })
        .collect();

    rows.sort_by(|left, right| {
        descending(left.var_sum, right.var_sum)
            .then_with(|| descending(left.default_rate, right.default_rate))
            .then_with(|| right.count.cmp(&left.count))
    });
    rows
}

/// Default-rate ranking that first drops every group with fewer than `min_count` loans.
pub fn rank_by_default_rate(
    records: &[LoanRecord],
    dimension: SegmentDimension,
    min_count: usize,
) -> Vec<SegmentDefaultRate> {
    let mut rows: Vec<SegmentDefaultRate> = group_by(records, |loan| loan.dimension_value(dimension))
        .into_iter()
        .filter(|(_, members)| members.len() >= min_count)
        .map(|(key, members)| SegmentDefaultRate {
            dimension,
            segment: segment_label(key),
            count: members.len(),
            default_rate: default_rate(members.into_iter()),
        })
        .collect();

    rows.sort_by(|left, right| {
        descending(left.default_rate, right.default_rate)
            .then_with(|| right.count.cmp(&left.count))
    });
    rows
}
