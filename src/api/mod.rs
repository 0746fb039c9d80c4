use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query};
use axum::http::header::{self, HeaderName};
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use crate::aggregation::{AttendanceListing, DashboardSummary};
use crate::error::AppError;
use crate::models::*;
use crate::report::{ImportOutcome, Report};
use crate::services::Notice;
use crate::state::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Deserialize)]
struct DateQueryParams {
    date: Option<String>,
}

impl DateQueryParams {
    fn date_or_today(&self) -> Result<NaiveDate, AppError> {
        match self.date.as_deref() {
            Some(date) if !date.trim().is_empty() => parse_date(date),
            _ => Ok(Local::now().date_naive()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/labs", get(list_labs).post(create_lab))
        .route("/api/labs/{id}", put(update_lab).delete(delete_lab))
        .route("/api/classes", get(list_classes).post(create_class))
        .route("/api/classes/{id}", put(update_class).delete(delete_class))
        .route(
            "/api/lab-attendance",
            get(list_lab_attendance).post(create_lab_attendance),
        )
        .route(
            "/api/lab-attendance/{id}",
            put(update_lab_attendance).delete(delete_lab_attendance),
        )
        .route(
            "/api/class-attendance",
            get(list_class_attendance).post(create_class_attendance),
        )
        .route(
            "/api/class-attendance/{id}",
            put(update_class_attendance).delete(delete_class_attendance),
        )
        .route("/api/dashboard", get(dashboard))
        .route("/api/export/labs", get(export_labs))
        .route("/api/export/classes", get(export_classes))
        .route("/api/export/attendance", get(export_attendance))
        .route("/api/import", post(import_attendance))
        .route("/api/notifications", get(notifications))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.local.ping().await?;
    Ok(StatusCode::OK)
}

async fn list_labs(State(state): State<AppState>) -> Json<Vec<Lab>> {
    let dashboard = state.dashboard.lock().await;
    Json(dashboard.store().labs().to_vec())
}

async fn list_classes(State(state): State<AppState>) -> Json<Vec<ClassRoom>> {
    let dashboard = state.dashboard.lock().await;
    Json(dashboard.store().classes().to_vec())
}

async fn create_lab(
    State(state): State<AppState>,
    Json(req): Json<FacilityRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create_facility(state, EntityKind::Lab, req).await
}

async fn create_class(
    State(state): State<AppState>,
    Json(req): Json<FacilityRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create_facility(state, EntityKind::Class, req).await
}

async fn update_lab(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<FacilityRequest>,
) -> Result<Json<Value>, AppError> {
    update_facility(state, EntityKind::Lab, id, req).await
}

async fn update_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<FacilityRequest>,
) -> Result<Json<Value>, AppError> {
    update_facility(state, EntityKind::Class, id, req).await
}

async fn delete_lab(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.delete_facility(EntityKind::Lab, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_class(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.delete_facility(EntityKind::Class, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_facility(
    state: AppState,
    kind: EntityKind,
    req: FacilityRequest,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut dashboard = state.dashboard.lock().await;
    let id = dashboard.add_facility(kind, &req).await?;
    let body = dashboard
        .facility_json(kind, &id)
        .ok_or(AppError::InternalServerError)?;
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update_facility(
    state: AppState,
    kind: EntityKind,
    id: String,
    req: FacilityRequest,
) -> Result<Json<Value>, AppError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.edit_facility(kind, &id, &req).await?;
    let body = dashboard.facility_json(kind, &id).ok_or(AppError::NotFound)?;
    Ok(Json(body))
}

async fn list_lab_attendance(State(state): State<AppState>) -> Json<Vec<AttendanceListing>> {
    let dashboard = state.dashboard.lock().await;
    Json(dashboard.aggregator().attendance_listing(EntityKind::Lab))
}

async fn list_class_attendance(State(state): State<AppState>) -> Json<Vec<AttendanceListing>> {
    let dashboard = state.dashboard.lock().await;
    Json(dashboard.aggregator().attendance_listing(EntityKind::Class))
}

async fn create_lab_attendance(
    State(state): State<AppState>,
    Json(req): Json<AttendanceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create_attendance(state, EntityKind::Lab, req).await
}

async fn create_class_attendance(
    State(state): State<AppState>,
    Json(req): Json<AttendanceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    create_attendance(state, EntityKind::Class, req).await
}

async fn update_lab_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AttendanceRequest>,
) -> Result<Json<Value>, AppError> {
    update_attendance(state, EntityKind::Lab, id, req).await
}

async fn update_class_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AttendanceRequest>,
) -> Result<Json<Value>, AppError> {
    update_attendance(state, EntityKind::Class, id, req).await
}

async fn delete_lab_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.delete_attendance(EntityKind::Lab, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_class_attendance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.delete_attendance(EntityKind::Class, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_attendance(
    state: AppState,
    kind: EntityKind,
    req: AttendanceRequest,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mut dashboard = state.dashboard.lock().await;
    let id = dashboard.add_attendance(kind, &req).await?;
    let body = dashboard
        .attendance_json(kind, &id)
        .ok_or(AppError::InternalServerError)?;
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update_attendance(
    state: AppState,
    kind: EntityKind,
    id: String,
    req: AttendanceRequest,
) -> Result<Json<Value>, AppError> {
    let mut dashboard = state.dashboard.lock().await;
    dashboard.edit_attendance(kind, &id, &req).await?;
    let body = dashboard.attendance_json(kind, &id).ok_or(AppError::NotFound)?;
    Ok(Json(body))
}

async fn dashboard(
    State(state): State<AppState>,
    Query(params): Query<DateQueryParams>,
) -> Result<Json<DashboardSummary>, AppError> {
    let date = params.date_or_today()?;
    let dashboard = state.dashboard.lock().await;
    Ok(Json(dashboard.summary(date)))
}

async fn export_labs(
    State(state): State<AppState>,
    Query(params): Query<DateQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let date = params.date_or_today()?;
    let report = state.dashboard.lock().await.export_summary(EntityKind::Lab, date);
    xlsx_response(&report)
}

async fn export_classes(
    State(state): State<AppState>,
    Query(params): Query<DateQueryParams>,
) -> Result<impl IntoResponse, AppError> {
    let date = params.date_or_today()?;
    let report = state.dashboard.lock().await.export_summary(EntityKind::Class, date);
    xlsx_response(&report)
}

async fn export_attendance(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let today = Local::now().date_naive();
    let report = state.dashboard.lock().await.export_all(today);
    xlsx_response(&report)
}

fn xlsx_response(report: &Report) -> Result<([(HeaderName, String); 2], Vec<u8>), AppError> {
    let bytes = report.to_xlsx()?;
    let headers: [(HeaderName, String); 2] = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", report.file_name),
        ),
    ];
    Ok((headers, bytes))
}

async fn import_attendance(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportOutcome>, AppError> {
    let mut dashboard = state.dashboard.lock().await;
    let outcome = dashboard.import_workbook(&body).await?;
    Ok(Json(outcome))
}

async fn notifications(State(state): State<AppState>) -> Json<Vec<Notice>> {
    Json(state.notifier.recent())
}
