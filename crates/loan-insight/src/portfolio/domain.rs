use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder reported wherever a categorical value is absent.
pub const MISSING_LABEL: &str = "N/A";

/// One loan application as supplied by the data source. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: String,
    pub age: u32,
    pub income: f64,
    pub loan_amount: f64,
    pub credit_score: u32,
    pub months_employed: u32,
    pub num_credit_lines: u32,
    pub interest_rate: f64,
    pub loan_term: u32,
    pub dti_ratio: f64,
    pub education: Option<String>,
    pub employment_type: Option<String>,
    pub marital_status: Option<String>,
    pub has_mortgage: bool,
    pub has_dependents: bool,
    pub loan_purpose: Option<String>,
    pub has_cosigner: bool,
    pub default: bool,
}

impl LoanRecord {
    /// Value of a grouping dimension for this loan, `None` when missing.
    pub fn dimension_value(&self, dimension: SegmentDimension) -> Option<String> {
        match dimension {
            SegmentDimension::Education => self.education.clone(),
            SegmentDimension::EmploymentType => self.employment_type.clone(),
            SegmentDimension::MaritalStatus => self.marital_status.clone(),
            SegmentDimension::LoanPurpose => self.loan_purpose.clone(),
            SegmentDimension::HasMortgage => Some(flag_label(self.has_mortgage)),
            SegmentDimension::HasDependents => Some(flag_label(self.has_dependents)),
            SegmentDimension::HasCoSigner => Some(flag_label(self.has_cosigner)),
            SegmentDimension::Default => Some(flag_label(self.default)),
        }
    }
}

fn flag_label(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// Categorical columns a segment table can be grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentDimension {
    Education,
    EmploymentType,
    MaritalStatus,
    LoanPurpose,
    HasMortgage,
    HasDependents,
    HasCoSigner,
    Default,
}

impl SegmentDimension {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Education,
            Self::EmploymentType,
            Self::MaritalStatus,
            Self::LoanPurpose,
            Self::HasMortgage,
            Self::HasDependents,
            Self::HasCoSigner,
            Self::Default,
        ]
    }

    /// Column name as it appears in the source dataset.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Education => "Education",
            Self::EmploymentType => "EmploymentType",
            Self::MaritalStatus => "MaritalStatus",
            Self::LoanPurpose => "LoanPurpose",
            Self::HasMortgage => "HasMortgage",
            Self::HasDependents => "HasDependents",
            Self::HasCoSigner => "HasCoSigner",
            Self::Default => "Default",
        }
    }

    const fn snake_case(self) -> &'static str {
        match self {
            Self::Education => "education",
            Self::EmploymentType => "employment_type",
            Self::MaritalStatus => "marital_status",
            Self::LoanPurpose => "loan_purpose",
            Self::HasMortgage => "has_mortgage",
            Self::HasDependents => "has_dependents",
            Self::HasCoSigner => "has_cosigner",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for SegmentDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown segment dimension '{0}'")]
pub struct UnknownDimension(pub String);

impl FromStr for SegmentDimension {
    type Err = UnknownDimension;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ordered()
            .into_iter()
            .find(|dimension| {
                dimension.column().eq_ignore_ascii_case(trimmed)
                    || dimension.snake_case().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| UnknownDimension(value.to_string()))
    }
}

/// Coarse three-level classification of the continuous risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Neutral,
    Alert,
    Critical,
}

impl RiskBand {
    pub const fn ordered() -> [Self; 3] {
        [Self::Neutral, Self::Alert, Self::Critical]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Neutral => "Neutral",
            Self::Alert => "Alert",
            Self::Critical => "Critical",
        }
    }
}

/// Per-loan contribution of each risk signal before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskComponents {
    pub dti: f64,
    pub credit: f64,
    pub interest_rate: f64,
}

/// A loan enriched with the risk attributes derived within one recordset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLoan {
    #[serde(flatten)]
    pub record: LoanRecord,
    pub risk_score: f64,
    pub components: RiskComponents,
    pub risk_band: RiskBand,
    pub value_at_risk: f64,
    pub critical_dti: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_parses_column_and_snake_case_names() {
        assert_eq!(
            "LoanPurpose".parse::<SegmentDimension>().expect("column name"),
            SegmentDimension::LoanPurpose
        );
        assert_eq!(
            "employment_type".parse::<SegmentDimension>().expect("snake case"),
            SegmentDimension::EmploymentType
        );
        assert_eq!(
            " hascosigner ".parse::<SegmentDimension>().expect("case insensitive"),
            SegmentDimension::HasCoSigner
        );
        assert!("Income".parse::<SegmentDimension>().is_err());
    }

    #[test]
    fn risk_bands_are_ordered_by_severity() {
        let bands = RiskBand::ordered();
        assert!(bands.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(RiskBand::Critical.label(), "Critical");
    }
}
