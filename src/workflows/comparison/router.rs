use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ProposalId, RfpId};
use super::gateway::AnalysisGateway;
use super::matrix::to_csv;
use super::repository::{ComparisonStore, ProposalStore};
use super::service::{ComparisonService, ComparisonServiceError};

/// Router builder exposing the comparison workflow over HTTP.
pub fn comparison_router<P, C, G>(service: Arc<ComparisonService<P, C, G>>) -> Router
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    Router::new()
        .route("/api/v1/rfps", get(list_rfps_handler::<P, C, G>))
        .route(
            "/api/v1/rfps/:rfp_id/dimensions",
            get(dimensions_handler::<P, C, G>),
        )
        .route(
            "/api/v1/rfps/:rfp_id/comparison",
            get(report_handler::<P, C, G>),
        )
        .route(
            "/api/v1/rfps/:rfp_id/comparison/generate",
            post(generate_handler::<P, C, G>),
        )
        .route("/api/v1/comparisons", get(saved_handler::<P, C, G>))
        .route(
            "/api/v1/comparisons/:rfp_id",
            axum::routing::delete(delete_comparison_handler::<P, C, G>),
        )
        .route("/api/v1/rfps/:rfp_id/matrix", get(matrix_handler::<P, C, G>))
        .route(
            "/api/v1/rfps/:rfp_id/matrix.csv",
            get(matrix_csv_handler::<P, C, G>),
        )
        .route(
            "/api/v1/proposals/:proposal_id/approve",
            post(approve_handler::<P, C, G>),
        )
        .route(
            "/api/v1/proposals/:proposal_id/reject",
            post(reject_handler::<P, C, G>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(default)]
    pub(crate) accepted_only: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateRequest {
    pub(crate) dimension_ids: Vec<String>,
    #[serde(default)]
    pub(crate) accepted_only: bool,
}

fn error_response(error: ComparisonServiceError) -> Response {
    let status = match &error {
        ComparisonServiceError::RfpNotFound(_) | ComparisonServiceError::ProposalNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ComparisonServiceError::NoDimensionsSelected => StatusCode::UNPROCESSABLE_ENTITY,
        ComparisonServiceError::NoEligibleProposals(_) => StatusCode::BAD_REQUEST,
        ComparisonServiceError::Decision(_) => StatusCode::CONFLICT,
        ComparisonServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Json(json!({ "error": error.to_string() }));
    (status, body).into_response()
}

fn join_failure() -> Response {
    let body = Json(json!({ "error": "comparison task failed" }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

pub(crate) async fn list_rfps_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.list_rfps() {
        Ok(rfps) => (StatusCode::OK, Json(rfps)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dimensions_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(rfp_id): Path<String>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    // Discovery may hit the analysis backend; keep it off the async workers.
    let result =
        tokio::task::spawn_blocking(move || service.list_dimensions(&RfpId(rfp_id))).await;
    match result {
        Ok(Ok(dimensions)) => {
            (StatusCode::OK, Json(json!({ "dimensions": dimensions }))).into_response()
        }
        Ok(Err(error)) => error_response(error),
        Err(_) => join_failure(),
    }
}

pub(crate) async fn report_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(rfp_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.view_report(&RfpId(rfp_id), query.accepted_only) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn generate_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(rfp_id): Path<String>,
    Json(request): Json<GenerateRequest>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        service.generate_report(
            &RfpId(rfp_id),
            request.dimension_ids,
            request.accepted_only,
        )
    })
    .await;
    match result {
        Ok(Ok(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(Err(error)) => error_response(error),
        Err(_) => join_failure(),
    }
}

pub(crate) async fn saved_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.saved_comparisons() {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_comparison_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(rfp_id): Path<String>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.delete_comparison(&RfpId(rfp_id)) {
        Ok(true) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Ok(false) => {
            let body = Json(json!({ "error": "comparison not found" }));
            (StatusCode::NOT_FOUND, body).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn matrix_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(rfp_id): Path<String>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.matrix(&RfpId(rfp_id)) {
        Ok(matrix) => (StatusCode::OK, Json(matrix)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn matrix_csv_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(rfp_id): Path<String>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.matrix(&RfpId(rfp_id)) {
        Ok(matrix) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            to_csv(&matrix),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(proposal_id): Path<String>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.approve_proposal(&ProposalId(proposal_id)) {
        Ok(proposal) => (StatusCode::OK, Json(proposal)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_handler<P, C, G>(
    State(service): State<Arc<ComparisonService<P, C, G>>>,
    Path(proposal_id): Path<String>,
) -> Response
where
    P: ProposalStore + 'static,
    C: ComparisonStore + 'static,
    G: AnalysisGateway + 'static,
{
    match service.reject_proposal(&ProposalId(proposal_id)) {
        Ok(proposal) => (StatusCode::OK, Json(proposal)).into_response(),
        Err(error) => error_response(error),
    }
}
