use loan_insight::config::AppConfig;
use loan_insight::error::AppError;
use loan_insight::portfolio::{
    ActionSortKey, DatasetLoader, ExportFormat, FilterSpec, LoanDataset, SegmentDimension,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the dataset from `override_path`, falling back to the configured location.
pub(crate) fn load_dataset(
    config: &AppConfig,
    override_path: Option<PathBuf>,
) -> Result<LoanDataset, AppError> {
    let path = override_path.unwrap_or_else(|| config.dataset.path.clone());
    Ok(DatasetLoader::new(path).load()?)
}

/// Reads a JSON filter specification; no file means no filters.
pub(crate) fn read_filters(path: Option<&Path>) -> Result<FilterSpec, AppError> {
    let Some(path) = path else {
        return Ok(FilterSpec::default());
    };
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub(crate) fn parse_sort_key(raw: &str) -> Result<ActionSortKey, String> {
    raw.parse().map_err(|err: loan_insight::portfolio::AnalysisError| err.to_string())
}

pub(crate) fn parse_dimension(raw: &str) -> Result<SegmentDimension, String> {
    raw.parse()
        .map_err(|err: loan_insight::portfolio::UnknownDimension| err.to_string())
}

pub(crate) fn parse_format(raw: &str) -> Result<ExportFormat, String> {
    raw.parse()
        .map_err(|err: loan_insight::portfolio::ExportError| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_parsers_accept_cli_spellings() {
        assert_eq!(
            parse_sort_key("value-at-risk").expect("sort key"),
            ActionSortKey::ValueAtRisk
        );
        assert_eq!(
            parse_dimension("employment_type").expect("dimension"),
            SegmentDimension::EmploymentType
        );
        assert_eq!(parse_format("tsv").expect("format"), ExportFormat::Tsv);
        assert!(parse_dimension("Income")
            .expect_err("unknown dimension")
            .contains("Income"));
    }

    #[test]
    fn missing_filter_file_means_no_filters() {
        assert_eq!(read_filters(None).expect("filters"), FilterSpec::default());
    }

    fn temp_filters(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "loan-insight-{}-{name}.json",
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("write filters");
        path
    }

    #[test]
    fn filter_file_is_parsed_as_json() {
        let path = temp_filters("valid", r#"{ "loan_purpose": ["Auto"], "default": [true] }"#);
        let filters = read_filters(Some(&path)).expect("filters");
        std::fs::remove_file(&path).ok();

        assert!(filters.loan_purpose.contains("Auto"));
        assert!(filters.default.contains(&true));
    }

    #[test]
    fn malformed_filter_file_reports_invalid_filters() {
        let path = temp_filters("malformed", r#"{ "loan_purpose": "Auto" "#);
        let error = read_filters(Some(&path)).expect_err("malformed json");
        std::fs::remove_file(&path).ok();

        assert!(matches!(error, AppError::Filters(_)));
        assert!(error.to_string().starts_with("invalid filter specification"));
    }
}
