//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{CandidateRecord, ErrorResponse, GridQuery, GridRecord, SummaryResponse};

/// `GET /summary` → 200 + `SummaryResponse` JSON
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<SummaryResponse> {
    Json(SummaryResponse::from(&state.output))
}

/// `GET /candidates` → 200 + `Vec<CandidateRecord>` JSON, in selection order
pub async fn get_candidates(State(state): State<Arc<AppState>>) -> Json<Vec<CandidateRecord>> {
    let out = &state.output;
    Json(
        out.selection
            .candidates
            .iter()
            .map(|pick| CandidateRecord::new(pick, out))
            .collect(),
    )
}

/// Returns evaluated configurations, optionally filtered by PV capacity.
///
/// `GET /grid` → 200 + `Vec<GridRecord>` JSON
/// `GET /grid?pv_min=A&pv_max=B` → filtered range (inclusive)
/// `GET /grid?pv_min=5&pv_max=2` → 400 + `ErrorResponse`
pub async fn get_grid(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GridQuery>,
) -> impl IntoResponse {
    let pv_min = query.pv_min.unwrap_or(f64::NEG_INFINITY);
    let pv_max = query.pv_max.unwrap_or(f64::INFINITY);

    if pv_min > pv_max {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`pv_min` ({pv_min}) must be <= `pv_max` ({pv_max})"),
            }),
        ));
    }

    let records: Vec<GridRecord> = state
        .output
        .grid
        .iter()
        .filter(|c| c.config.pv_kw >= pv_min && c.config.pv_kw <= pv_max)
        .map(GridRecord::from)
        .collect();

    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::catalog::ReferenceCatalog;
    use crate::config::EstimatorConfig;
    use crate::estimate::{Consumption, EstimateRequest, run_estimate};
    use crate::optimizer::RangeSpec;

    fn make_test_state() -> Arc<AppState> {
        let mut cfg = EstimatorConfig::ibaraki();
        cfg.search.pv = RangeSpec::new(1.0, 6.0, 0.5);
        let request = EstimateRequest::new(Consumption::AnnualKwh { kwh: 4_800.0 });
        let output = run_estimate(&cfg, &ReferenceCatalog::default(), &request)
            .expect("estimate should succeed");
        Arc::new(AppState { output })
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn summary_returns_200() {
        let (status, json) = get_json("/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("request").is_some());
        assert!(json.get("stats").is_some());
        assert_eq!(json["grid_size"], 11);
        assert_eq!(json["horizon_years"], 15);
    }

    #[tokio::test]
    async fn candidates_are_labelled() {
        let (status, json) = get_json("/candidates").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().cloned().unwrap_or_default();
        assert!(!rows.is_empty());
        assert_eq!(rows[0]["label"], "pv_only_max_profit");
        assert_eq!(rows[0]["title"], "PV only: max net profit");
    }

    #[tokio::test]
    async fn grid_returns_all_configurations() {
        let (status, json) = get_json("/grid").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(11));
    }

    #[tokio::test]
    async fn grid_range_query() {
        let (status, json) = get_json("/grid?pv_min=2&pv_max=3").await;
        assert_eq!(status, StatusCode::OK);
        let rows = json.as_array().cloned().unwrap_or_default();
        assert_eq!(rows.len(), 3); // 2.0, 2.5, 3.0
        assert_eq!(rows[0]["pv_kw"], 2.0);
        assert_eq!(rows[2]["pv_kw"], 3.0);
    }

    #[tokio::test]
    async fn grid_invalid_range_returns_400() {
        let (status, json) = get_json("/grid?pv_min=5&pv_max=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }
}
