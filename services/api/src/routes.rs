use crate::dashboard;
use crate::infra::{AppState, SearchQuery};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use conta_comigo::error::AppError;
use conta_comigo::vacancies::{self, Dataset, FilterState, VacancySearchView};
use serde_json::json;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_page))
        .route("/api/v1/vacancies", get(search_endpoint))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .layer(Extension(state))
}

fn search(dataset: &Dataset, filter: &FilterState, state: &AppState) -> VacancySearchView {
    let filtered = vacancies::apply(dataset, filter, state.dashboard.default_max_distance_km);
    VacancySearchView::build(dataset, filter, &filtered)
}

pub(crate) async fn dashboard_page(
    Extension(state): Extension<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let filter = FilterState::from(query);
    match state.dataset.get_or_load().await {
        Ok(dataset) => {
            let view = search(&dataset, &filter, &state);
            Html(dashboard::render(&filter, &view, &state.source_url)).into_response()
        }
        Err(err) => {
            let error = AppError::from(err);
            (error.status(), Html(dashboard::render_unavailable(&error))).into_response()
        }
    }
}

pub(crate) async fn search_endpoint(
    Extension(state): Extension<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<VacancySearchView>, AppError> {
    let dataset = state.dataset.get_or_load().await?;
    let filter = FilterState::from(query);
    Ok(Json(search(&dataset, &filter, &state)))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
