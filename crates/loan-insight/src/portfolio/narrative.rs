//! Presentation helpers: the concentration headline and number formatting shared by the
//! CLI and report views.

use super::domain::SegmentDimension;
use super::segments::SegmentProfile;

pub const INSUFFICIENT_SEGMENTS: &str =
    "Not enough segments in the current view to conclude where risk is concentrated.";

/// One-sentence summary of the top row of a risk-share profile.
///
/// Relies on the profile ordering: the first row is the segment holding the most value
/// at risk.
pub fn headline(rows: &[SegmentProfile], dimension: SegmentDimension) -> String {
    let Some(top) = rows.first() else {
        return INSUFFICIENT_SEGMENTS.to_string();
    };

    format!(
        "{} of the current view's value at risk is concentrated in {} = {} (default rate {}, n={}).",
        fmt_pct(top.risk_share, 0),
        dimension,
        top.segment,
        fmt_pct(top.default_rate, 2),
        fmt_count(top.count),
    )
}

/// `0.1234` with two decimals renders as `12.34%`.
pub fn fmt_pct(ratio: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, ratio * 100.0)
}

pub fn fmt_count(value: usize) -> String {
    group_thousands(&value.to_string())
}

/// Two-decimal amount with comma thousands separators.
pub fn fmt_money(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}{}.{fraction}", group_thousands(whole))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::risk::RiskScorer;
    use crate::portfolio::segments::profile;
    use crate::portfolio::test_support::scenario_loans;

    #[test]
    fn empty_table_reports_insufficient_data() {
        assert_eq!(
            headline(&[], SegmentDimension::LoanPurpose),
            INSUFFICIENT_SEGMENTS
        );
    }

    #[test]
    fn headline_describes_the_top_segment() {
        let scored = RiskScorer::default().enrich(&scenario_loans());
        let rows = profile(&scored, SegmentDimension::LoanPurpose);
        let text = headline(&rows, SegmentDimension::LoanPurpose);

        let share = fmt_pct(rows[0].risk_share, 0);
        assert!(text.starts_with(&share), "unexpected headline: {text}");
        assert!(text.contains("LoanPurpose = B"));
        assert!(text.contains("default rate 66.67%"));
        assert!(text.ends_with("n=3)."));
    }

    #[test]
    fn formats_percentages_counts_and_money() {
        assert_eq!(fmt_pct(0.1234, 2), "12.34%");
        assert_eq!(fmt_pct(0.6, 0), "60%");
        assert_eq!(fmt_count(255_347), "255,347");
        assert_eq!(fmt_count(12), "12");
        assert_eq!(fmt_money(1_234_567.891), "1,234,567.89");
        assert_eq!(fmt_money(-950.5), "-950.50");
        assert_eq!(fmt_money(0.0), "0.00");
    }
}
