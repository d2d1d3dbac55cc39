use super::domain::LoanRecord;

pub(crate) fn loan(
    id: &str,
    dti_ratio: f64,
    credit_score: u32,
    interest_rate: f64,
    loan_amount: f64,
    purpose: Option<&str>,
    default: bool,
) -> LoanRecord {
    LoanRecord {
        loan_id: id.to_string(),
        age: 40,
        income: 60_000.0,
        loan_amount,
        credit_score,
        months_employed: 24,
        num_credit_lines: 2,
        interest_rate,
        loan_term: 36,
        dti_ratio,
        education: Some("Bachelor's".to_string()),
        employment_type: Some("Full-time".to_string()),
        marital_status: Some("Married".to_string()),
        has_mortgage: false,
        has_dependents: false,
        loan_purpose: purpose.map(str::to_string),
        has_cosigner: false,
        default,
    }
}

/// Five loans, three sharing purpose "B", three defaulted, two above the DTI cut-off.
pub(crate) fn scenario_loans() -> Vec<LoanRecord> {
    vec![
        loan("1", 0.20, 700, 10.0, 1000.0, Some("A"), false),
        loan("2", 0.40, 600, 12.0, 2000.0, Some("A"), true),
        loan("3", 0.25, 720, 9.0, 1500.0, Some("B"), false),
        loan("4", 0.50, 580, 15.0, 3000.0, Some("B"), true),
        loan("5", 0.45, 610, 14.0, 2500.0, Some("B"), true),
    ]
}
