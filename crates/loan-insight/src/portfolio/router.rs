use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::action::{ActionListRequest, ActionSortKey};
use super::dataset::LoanDataset;
use super::domain::{ScoredLoan, SegmentDimension};
use super::export::{self, ExportError, ExportFormat};
use super::filter::FilterSpec;
use super::report::{PortfolioAnalyzer, PortfolioReport, DEFAULT_REPORT_DIMENSIONS};
use super::segments::SegmentDefaultRate;
use super::AnalysisError;

/// Body accepted by the report and export endpoints. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportRequest {
    pub filters: FilterSpec,
    pub top_n: Option<usize>,
    pub critical_only: bool,
    pub sort_by: Option<String>,
    pub dimensions: Vec<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentsRequest {
    #[serde(default)]
    pub filters: FilterSpec,
    pub dimension: String,
    #[serde(default)]
    pub min_count: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum PortfolioServiceError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl PortfolioServiceError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Analysis(_) | Self::Export(ExportError::UnknownFormat(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Rendered action-list attachment.
#[derive(Debug, Clone)]
pub struct ActionListExport {
    pub format: ExportFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Shared, read-only analysis state: the dataset loaded once plus the analyzer.
#[derive(Debug, Clone)]
pub struct PortfolioService {
    dataset: LoanDataset,
    analyzer: PortfolioAnalyzer,
}

impl PortfolioService {
    pub fn new(dataset: LoanDataset, analyzer: PortfolioAnalyzer) -> Self {
        Self { dataset, analyzer }
    }

    pub fn dataset(&self) -> &LoanDataset {
        &self.dataset
    }

    pub fn analyzer(&self) -> &PortfolioAnalyzer {
        &self.analyzer
    }

    /// Resolves the optional request knobs against the configured defaults.
    pub fn action_request(&self, request: &ReportRequest) -> Result<ActionListRequest, AnalysisError> {
        let defaults = self.analyzer.default_request();
        let sort_key = match &request.sort_by {
            Some(value) => value.parse::<ActionSortKey>()?,
            None => defaults.sort_key,
        };
        ActionListRequest::new(
            sort_key,
            request.top_n.unwrap_or(defaults.top_n),
            request.critical_only,
        )
    }

    pub fn report(&self, request: &ReportRequest) -> Result<PortfolioReport, PortfolioServiceError> {
        let action_request = self.action_request(request)?;
        let dimensions = if request.dimensions.is_empty() {
            DEFAULT_REPORT_DIMENSIONS.to_vec()
        } else {
            request
                .dimensions
                .iter()
                .map(|name| name.parse::<SegmentDimension>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(AnalysisError::from)?
        };

        Ok(self.analyzer.report_for(
            &self.dataset,
            &request.filters,
            &action_request,
            &dimensions,
        )?)
    }

    pub fn segments(
        &self,
        request: &SegmentsRequest,
    ) -> Result<Vec<SegmentDefaultRate>, PortfolioServiceError> {
        let dimension = request
            .dimension
            .parse::<SegmentDimension>()
            .map_err(AnalysisError::from)?;
        Ok(self.analyzer.segment_ranking(
            &self.dataset,
            &request.filters,
            dimension,
            request.min_count,
        ))
    }

    pub fn action_list(&self, request: &ReportRequest) -> Result<Vec<ScoredLoan>, PortfolioServiceError> {
        let action_request = self.action_request(request)?;
        Ok(self
            .analyzer
            .action_list(&self.dataset, &request.filters, &action_request)?)
    }

    pub fn export(&self, request: &ReportRequest) -> Result<ActionListExport, PortfolioServiceError> {
        let format = match &request.format {
            Some(value) => value.parse::<ExportFormat>()?,
            None => ExportFormat::default(),
        };
        let rows = self.action_list(request)?;
        Ok(ActionListExport {
            format,
            filename: export::export_filename(Utc::now(), format),
            bytes: export::action_list_bytes(&rows, format)?,
        })
    }
}

/// Router builder exposing the portfolio analysis endpoints.
pub fn portfolio_router(service: Arc<PortfolioService>) -> Router {
    Router::new()
        .route("/api/v1/portfolio/report", post(report_handler))
        .route("/api/v1/portfolio/segments", post(segments_handler))
        .route("/api/v1/portfolio/actions/export", post(export_handler))
        .with_state(service)
}

fn error_response(error: PortfolioServiceError) -> Response {
    warn!(error = %error, "portfolio request rejected");
    let payload = json!({
        "error": error.to_string(),
    });
    (error.status(), axum::Json(payload)).into_response()
}

pub(crate) async fn report_handler(
    State(service): State<Arc<PortfolioService>>,
    axum::Json(request): axum::Json<ReportRequest>,
) -> Response {
    match service.report(&request) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn segments_handler(
    State(service): State<Arc<PortfolioService>>,
    axum::Json(request): axum::Json<SegmentsRequest>,
) -> Response {
    match service.segments(&request) {
        Ok(rows) => {
            let payload = json!({
                "dimension": request.dimension,
                "rows": rows,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn export_handler(
    State(service): State<Arc<PortfolioService>>,
    axum::Json(request): axum::Json<ReportRequest>,
) -> Response {
    match service.export(&request) {
        Ok(export) => {
            let headers = [
                (header::CONTENT_TYPE, export.format.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export.filename),
                ),
            ];
            (StatusCode::OK, headers, export.bytes).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::test_support::scenario_loans;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn service() -> Arc<PortfolioService> {
        Arc::new(PortfolioService::new(
            LoanDataset::new("scenario", scenario_loans()),
            PortfolioAnalyzer::default(),
        ))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn read_body(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec()
    }

    async fn read_json(response: Response) -> Value {
        serde_json::from_slice(&read_body(response).await).expect("json body")
    }

    #[tokio::test]
    async fn report_route_returns_full_report() {
        let response = portfolio_router(service())
            .oneshot(post_json("/api/v1/portfolio/report", json!({})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["filtered_count"], 5);
        assert_eq!(body["segments"][0]["dimension"], "loan_purpose");
        assert_eq!(body["action_list"].as_array().map(Vec::len), Some(5));
        assert!(body["headline"]
            .as_str()
            .expect("headline")
            .contains("LoanPurpose = B"));
    }

    #[tokio::test]
    async fn report_route_applies_filters_and_critical_only() {
        let request = json!({
            "filters": { "default": [true] },
            "critical_only": true,
            "sort_by": "value_at_risk",
            "top_n": 50,
        });
        let response = portfolio_router(service())
            .oneshot(post_json("/api/v1/portfolio/report", request))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["filtered_count"], 3);
        let actions = body["action_list"].as_array().expect("actions");
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|loan| loan["critical_dti"] == true));
    }

    #[tokio::test]
    async fn report_route_rejects_out_of_range_top_n() {
        let response = portfolio_router(service())
            .oneshot(post_json("/api/v1/portfolio/report", json!({ "top_n": 10 })))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["error"].as_str().expect("error").contains("top_n"));
    }

    #[tokio::test]
    async fn report_route_rejects_unknown_dimension() {
        let response = portfolio_router(service())
            .oneshot(post_json(
                "/api/v1/portfolio/report",
                json!({ "dimensions": ["Income"] }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn segments_route_applies_minimum_volume() {
        let response = portfolio_router(service())
            .oneshot(post_json(
                "/api/v1/portfolio/segments",
                json!({ "dimension": "LoanPurpose", "min_count": 3 }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        let rows = body["rows"].as_array().expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["segment"], "B");
    }

    #[tokio::test]
    async fn export_route_returns_attachment() {
        let response = portfolio_router(service())
            .oneshot(post_json(
                "/api/v1/portfolio/actions/export",
                json!({ "format": "tsv", "top_n": 50 }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/tab-separated-values"));
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.contains(".tsv"));

        let body = String::from_utf8(read_body(response).await).expect("utf8");
        assert_eq!(body.lines().count(), 6);
    }

    #[tokio::test]
    async fn export_route_serves_xlsx_workbooks() {
        let response = portfolio_router(service())
            .oneshot(post_json(
                "/api/v1/portfolio/actions/export",
                json!({ "format": "xlsx" }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.contains("spreadsheetml"));
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(disposition.ends_with(".xlsx\""));

        assert!(read_body(response).await.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn export_route_rejects_unknown_format() {
        let response = portfolio_router(service())
            .oneshot(post_json(
                "/api/v1/portfolio/actions/export",
                json!({ "format": "pdf" }),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
