//! Tabular export of the action list.

use super::domain::ScoredLoan;
use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

pub const XLSX_SHEET_NAME: &str = "ActionList";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write action list: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to build action list workbook: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("failed to flush action list: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported export format '{0}' (expected csv, tsv or xlsx)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Tsv,
    /// Excel workbook with a single sheet.
    Xlsx,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Tsv => "text/tab-separated-values; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            _ => Err(ExportError::UnknownFormat(value.to_string())),
        }
    }
}

pub const ACTION_LIST_COLUMNS: [&str; 26] = [
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
    "RiskScore",
    "DTIComponent",
    "CreditComponent",
    "InterestRateComponent",
    "RiskBand",
    "ValueAtRisk",
    "CriticalDTI",
    "Rank",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

/// Flat export row; field order matches [`ACTION_LIST_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionListRow<'a> {
    pub loan_id: &'a str,
    pub age: u32,
    pub income: f64,
    pub loan_amount: f64,
    pub credit_score: u32,
    pub months_employed: u32,
    pub num_credit_lines: u32,
    pub interest_rate: f64,
    pub loan_term: u32,
    pub dti_ratio: f64,
    pub education: Option<&'a str>,
    pub employment_type: Option<&'a str>,
    pub marital_status: Option<&'a str>,
    pub has_mortgage: u8,
    pub has_dependents: u8,
    pub loan_purpose: Option<&'a str>,
    pub has_cosigner: u8,
    pub default: u8,
    pub risk_score: f64,
    pub dti_component: f64,
    pub credit_component: f64,
    pub interest_rate_component: f64,
    pub risk_band: &'static str,
    pub value_at_risk: f64,
    pub critical_dti: u8,
    pub rank: usize,
}

impl<'a> ActionListRow<'a> {
    pub fn new(rank: usize, loan: &'a ScoredLoan) -> Self {
        let record = &loan.record;
        Self {
            loan_id: &record.loan_id,
            age: record.age,
            income: record.income,
            loan_amount: record.loan_amount,
            credit_score: record.credit_score,
            months_employed: record.months_employed,
            num_credit_lines: record.num_credit_lines,
            interest_rate: record.interest_rate,
            loan_term: record.loan_term,
            dti_ratio: record.dti_ratio,
            education: record.education.as_deref(),
            employment_type: record.employment_type.as_deref(),
            marital_status: record.marital_status.as_deref(),
            has_mortgage: u8::from(record.has_mortgage),
            has_dependents: u8::from(record.has_dependents),
            loan_purpose: record.loan_purpose.as_deref(),
            has_cosigner: u8::from(record.has_cosigner),
            default: u8::from(record.default),
            risk_score: loan.risk_score,
            dti_component: loan.components.dti,
            credit_component: loan.components.credit,
            interest_rate_component: loan.components.interest_rate,
            risk_band: loan.risk_band.label(),
            value_at_risk: loan.value_at_risk,
            critical_dti: u8::from(loan.critical_dti),
            rank,
        }
    }

    /// Typed cell values in [`ACTION_LIST_COLUMNS`] order, for writers that keep types.
    pub fn cells(&self) -> [Cell<'a>; 26] {
        let text = |value: Option<&'a str>| value.map_or(Cell::Empty, Cell::Text);
        [
            Cell::Text(self.loan_id),
            Cell::Number(f64::from(self.age)),
            Cell::Number(self.income),
            Cell::Number(self.loan_amount),
            Cell::Number(f64::from(self.credit_score)),
            Cell::Number(f64::from(self.months_employed)),
            Cell::Number(f64::from(self.num_credit_lines)),
            Cell::Number(self.interest_rate),
            Cell::Number(f64::from(self.loan_term)),
            Cell::Number(self.dti_ratio),
            text(self.education),
            text(self.employment_type),
            text(self.marital_status),
            Cell::Number(f64::from(self.has_mortgage)),
            Cell::Number(f64::from(self.has_dependents)),
            text(self.loan_purpose),
            Cell::Number(f64::from(self.has_cosigner)),
            Cell::Number(f64::from(self.default)),
            Cell::Number(self.risk_score),
            Cell::Number(self.dti_component),
            Cell::Number(self.credit_component),
            Cell::Number(self.interest_rate_component),
            Cell::Text(self.risk_band),
            Cell::Number(self.value_at_risk),
            Cell::Number(f64::from(self.critical_dti)),
            Cell::Number(self.rank as f64),
        ]
    }
}

/// Writes a header row plus one row per ranked loan, ranks starting at 1.
pub fn write_action_list<W: Write>(
    rows: &[ScoredLoan],
    mut writer: W,
    format: ExportFormat,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_delimited(rows, writer, b','),
        ExportFormat::Tsv => write_delimited(rows, writer, b'\t'),
        ExportFormat::Xlsx => {
            writer.write_all(&workbook_bytes(rows)?)?;
            writer.flush()?;
            Ok(())
        }
    }
}

fn write_delimited<W: Write>(
    rows: &[ScoredLoan],
    writer: W,
    delimiter: u8,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(ACTION_LIST_COLUMNS)?;
    for (index, loan) in rows.iter().enumerate() {
        csv_writer.serialize(ActionListRow::new(index + 1, loan))?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn workbook_bytes(rows: &[ScoredLoan]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(XLSX_SHEET_NAME)?;

    for (col, name) in (0u16..).zip(ACTION_LIST_COLUMNS) {
        worksheet.write_string(0, col, name)?;
    }
    for (row, (index, loan)) in (1u32..).zip(rows.iter().enumerate()) {
        let cells = ActionListRow::new(index + 1, loan).cells();
        for (col, cell) in (0u16..).zip(cells) {
            match cell {
                Cell::Text(value) => {
                    worksheet.write_string(row, col, value)?;
                }
                Cell::Number(value) => {
                    worksheet.write_number(row, col, value)?;
                }
                Cell::Empty => {}
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn action_list_bytes(rows: &[ScoredLoan], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    write_action_list(rows, &mut buffer, format)?;
    Ok(buffer)
}

/// `action_list_20251018T104300Z.csv`
pub fn export_filename(generated_at: DateTime<Utc>, format: ExportFormat) -> String {
    format!(
        "action_list_{}.{}",
        generated_at.format("%Y%m%dT%H%M%SZ"),
        format.extension()
    )
}
