use super::domain::ScoredLoan;
use super::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TOP_N: usize = 200;
pub const MIN_TOP_N: usize = 50;
pub const MAX_TOP_N: usize = 2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSortKey {
    #[default]
    RiskScore,
    ValueAtRisk,
}

impl ActionSortKey {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RiskScore => "risk_score",
            Self::ValueAtRisk => "value_at_risk",
        }
    }

    fn key(self, loan: &ScoredLoan) -> f64 {
        match self {
            Self::RiskScore => loan.risk_score,
            Self::ValueAtRisk => loan.value_at_risk,
        }
    }
}

impl fmt::Display for ActionSortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ActionSortKey {
    type Err = AnalysisError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "risk_score" => Ok(Self::RiskScore),
            "value_at_risk" | "var" => Ok(Self::ValueAtRisk),
            _ => Err(AnalysisError::UnknownSortKey(value.to_string())),
        }
    }
}

/// Caller choices for the action list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionListRequest {
    pub sort_key: ActionSortKey,
    pub top_n: usize,
    pub critical_only: bool,
}

impl Default for ActionListRequest {
    fn default() -> Self {
        Self {
            sort_key: ActionSortKey::default(),
            top_n: DEFAULT_TOP_N,
            critical_only: false,
        }
    }
}

impl ActionListRequest {
    /// Request with `top_n` checked against the supported range.
    pub fn new(
        sort_key: ActionSortKey,
        top_n: usize,
        critical_only: bool,
    ) -> Result<Self, AnalysisError> {
        let request = Self {
            sort_key,
            top_n,
            critical_only,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if (MIN_TOP_N..=MAX_TOP_N).contains(&self.top_n) {
            Ok(())
        } else {
            Err(AnalysisError::TopNOutOfRange {
                requested: self.top_n,
                min: MIN_TOP_N,
                max: MAX_TOP_N,
            })
        }
    }
}

/// Restricts to critical-DTI loans when requested, then sorts descending by the chosen
/// key and keeps the first `top_n`. Ties keep their input order.
pub fn rank(scored: &[ScoredLoan], request: &ActionListRequest) -> Vec<ScoredLoan> {
    let mut ranked: Vec<&ScoredLoan> = scored
        .iter()
        .filter(|loan| !request.critical_only || loan.critical_dti)
        .collect();

    let key = request.sort_key;
    ranked.sort_by(|left, right| key.key(right).total_cmp(&key.key(left)));
    ranked.truncate(request.top_n);
    ranked.into_iter().cloned().collect()
}
