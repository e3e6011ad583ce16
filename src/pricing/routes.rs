//! HTTP handlers for the price matrix API.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use crate::error::Result;
use crate::AppState;

use super::export;
use super::matrix::MatrixLayout;
use super::requests::{CalculateRequest, FormValues};
use super::responses::{
    CalculationResponse, HistoryEntryResponse, PresetListResponse, RecordedCalculationResponse,
};
use super::services::{self, Calculation};

/// Routes mounted under `/api/price-matrix`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/layout", get(layout))
        .route("/calculate", post(calculate))
        .route("/calculations", post(record_calculation))
        .route("/state", get(load_state).put(save_state).delete(reset_state))
        .route("/presets", get(list_presets))
        .route(
            "/presets/:name",
            get(load_preset).put(save_preset).delete(delete_preset),
        )
        .route("/history", get(history))
        .route("/export.csv", post(export_csv))
        .route("/report", post(report))
}

fn run(state: &AppState, request: CalculateRequest) -> Calculation {
    let form = request.into_form(&state.layout);
    services::calculate(&state.layout, form)
}

async fn layout(State(state): State<AppState>) -> Json<MatrixLayout> {
    Json((*state.layout).clone())
}

async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Json<CalculationResponse> {
    let calculation = run(&state, request);
    Json(CalculationResponse::new(&calculation, &state.display))
}

/// Calculate, save the form as current state and add the result to history
async fn record_calculation(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<RecordedCalculationResponse>> {
    let now = Utc::now();
    let calculation = run(&state, request);

    let entry = services::history_entry(&calculation, &state.display, now);
    let saved =
        services::record_calculation(&state.db, &entry, calculation.form.clone(), now).await?;

    let history = services::list_history(&state.db)
        .await?
        .into_iter()
        .map(HistoryEntryResponse::from)
        .collect();

    Ok(Json(RecordedCalculationResponse {
        calculation: CalculationResponse::new(&calculation, &state.display),
        last_updated: saved.last_updated.unwrap_or(now),
        history,
    }))
}

async fn load_state(State(state): State<AppState>) -> Result<Json<FormValues>> {
    Ok(Json(services::load_state(&state.db).await?))
}

async fn save_state(
    State(state): State<AppState>,
    Json(form): Json<FormValues>,
) -> Result<Json<FormValues>> {
    Ok(Json(services::save_state(&state.db, form, Utc::now()).await?))
}

async fn reset_state(State(state): State<AppState>) -> Result<StatusCode> {
    services::reset_state(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_presets(State(state): State<AppState>) -> Result<Json<PresetListResponse>> {
    let names = services::list_presets(&state.db, &state.cache).await?;
    Ok(Json(PresetListResponse { names }))
}

async fn load_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FormValues>> {
    Ok(Json(services::load_preset(&state.db, &state.cache, &name).await?))
}

async fn save_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(form): Json<FormValues>,
) -> Result<StatusCode> {
    services::save_preset(&state.db, &state.cache, &name, form, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_preset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    services::delete_preset(&state.db, &state.cache, &name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn history(State(state): State<AppState>) -> Result<Json<Vec<HistoryEntryResponse>>> {
    let entries = services::list_history(&state.db)
        .await?
        .into_iter()
        .map(HistoryEntryResponse::from)
        .collect();
    Ok(Json(entries))
}

async fn export_csv(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Result<impl IntoResponse> {
    let calculation = run(&state, request);
    let rows = export::spreadsheet_rows(&calculation, &state.display, Utc::now());
    let body = export::write_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::SPREADSHEET_FILENAME),
            ),
        ],
        body,
    ))
}

async fn report(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Result<Html<String>> {
    let calculation = run(&state, request);
    let html = export::render_report(&calculation, &state.display, Utc::now())?;
    Ok(Html(html))
}
