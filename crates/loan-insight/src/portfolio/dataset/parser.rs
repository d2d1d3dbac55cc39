use super::DatasetError;
use crate::portfolio::domain::LoanRecord;
use serde::{Deserialize, Deserializer};
use std::io::Read;

/// Columns every dataset must carry, in source order.
pub const REQUIRED_COLUMNS: [&str; 18] = [
    "LoanID",
    "Age",
    "Income",
    "LoanAmount",
    "CreditScore",
    "MonthsEmployed",
    "NumCreditLines",
    "InterestRate",
    "LoanTerm",
    "DTIRatio",
    "Education",
    "EmploymentType",
    "MaritalStatus",
    "HasMortgage",
    "HasDependents",
    "LoanPurpose",
    "HasCoSigner",
    "Default",
];

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<LoanRecord>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DatasetError::MissingColumns(missing));
    }

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let raw = result?;
        let line = raw.position().map(|position| position.line()).unwrap_or(0);
        let row: LoanRow = raw.deserialize(Some(&headers))?;
        records.push(row.into_record(line)?);
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct LoanRow {
    #[serde(rename = "LoanID")]
    loan_id: String,
    #[serde(rename = "Age")]
    age: u32,
    #[serde(rename = "Income")]
    income: f64,
    #[serde(rename = "LoanAmount")]
    loan_amount: f64,
    #[serde(rename = "CreditScore")]
    credit_score: u32,
    #[serde(rename = "MonthsEmployed")]
    months_employed: u32,
    #[serde(rename = "NumCreditLines")]
    num_credit_lines: u32,
    #[serde(rename = "InterestRate")]
    interest_rate: f64,
    #[serde(rename = "LoanTerm")]
    loan_term: u32,
    #[serde(rename = "DTIRatio")]
    dti_ratio: f64,
    #[serde(rename = "Education", default, deserialize_with = "empty_string_as_none")]
    education: Option<String>,
    #[serde(
        rename = "EmploymentType",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    employment_type: Option<String>,
    #[serde(
        rename = "MaritalStatus",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    marital_status: Option<String>,
    #[serde(rename = "HasMortgage")]
    has_mortgage: String,
    #[serde(rename = "HasDependents")]
    has_dependents: String,
    #[serde(rename = "LoanPurpose", default, deserialize_with = "empty_string_as_none")]
    loan_purpose: Option<String>,
    #[serde(rename = "HasCoSigner")]
    has_cosigner: String,
    #[serde(rename = "Default")]
    default: String,
}

impl LoanRow {
    fn into_record(self, line: u64) -> Result<LoanRecord, DatasetError> {
        for (column, value) in [
            ("Income", self.income),
            ("LoanAmount", self.loan_amount),
            ("InterestRate", self.interest_rate),
            ("DTIRatio", self.dti_ratio),
        ] {
            ensure_finite(value, column, line)?;
        }

        Ok(LoanRecord {
            has_mortgage: parse_yes_no(&self.has_mortgage, "HasMortgage", line)?,
            has_dependents: parse_yes_no(&self.has_dependents, "HasDependents", line)?,
            has_cosigner: parse_yes_no(&self.has_cosigner, "HasCoSigner", line)?,
            default: parse_outcome(&self.default, line)?,
            loan_id: self.loan_id,
            age: self.age,
            income: self.income,
            loan_amount: self.loan_amount,
            credit_score: self.credit_score,
            months_employed: self.months_employed,
            num_credit_lines: self.num_credit_lines,
            interest_rate: self.interest_rate,
            loan_term: self.loan_term,
            dti_ratio: self.dti_ratio,
            education: self.education,
            employment_type: self.employment_type,
            marital_status: self.marital_status,
            loan_purpose: self.loan_purpose,
        })
    }
}

fn ensure_finite(value: f64, column: &'static str, line: u64) -> Result<(), DatasetError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DatasetError::InvalidNumber {
            line,
            column,
            value: value.to_string(),
        })
    }
}

fn parse_yes_no(value: &str, column: &'static str, line: u64) -> Result<bool, DatasetError> {
    match value.trim() {
        "Yes" => Ok(true),
        "No" => Ok(false),
        other => Err(DatasetError::InvalidFlag {
            line,
            column,
            value: other.to_string(),
        }),
    }
}

fn parse_outcome(value: &str, line: u64) -> Result<bool, DatasetError> {
    match value.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(DatasetError::InvalidFlag {
            line,
            column: "Default",
            value: other.to_string(),
        }),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
