use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, AppointmentRecord};
use crate::errors::AppError;
use crate::models::AppointmentStatus;
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

#[derive(Serialize)]
pub struct AppointmentResponse {
    id: String,
    patient_name: Option<String>,
    patient_phone: String,
    date: String,
    start_time: String,
    end_time: String,
    service: String,
    status: String,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<AppointmentRecord> for AppointmentResponse {
    fn from(record: AppointmentRecord) -> Self {
        let a = record.appointment;
        Self {
            id: a.id,
            patient_name: record.patient_name,
            patient_phone: record.patient_phone,
            date: a.date.format("%Y-%m-%d").to_string(),
            start_time: a.start_time,
            end_time: a.end_time,
            service: a.service,
            status: a.status.as_str().to_string(),
            notes: a.notes,
            created_at: a.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: a.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

// GET /api/admin/appointments
#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50);
    let records = {
        let db = state.db.lock().unwrap();
        queries::get_all_appointments(&db, query.status.as_deref(), limit)?
    };

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

// GET /api/admin/appointments/range
#[derive(Deserialize)]
pub struct RangeQuery {
    pub start_date: String,
    pub end_date: String,
}

pub async fn get_appointments_range(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let start = parse_date(&query.start_date)?;
    let end = parse_date(&query.end_date)?;

    let records = {
        let db = state.db.lock().unwrap();
        queries::get_appointments_in_range(&db, start, end)?
    };

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date: {s}")))
}

// GET /api/admin/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appointment = {
        let db = state.db.lock().unwrap();
        queries::get_appointment_by_id(&db, &id)?
    };

    match appointment {
        Some(a) => Ok(Json(serde_json::json!({
            "id": a.id,
            "user_id": a.user_id,
            "date": a.date.format("%Y-%m-%d").to_string(),
            "start_time": a.start_time,
            "end_time": a.end_time,
            "service": a.service,
            "status": a.status.as_str(),
            "notes": a.notes,
        }))),
        None => Err(AppError::NotFound(format!("appointment {id}"))),
    }
}

// PATCH /api/admin/appointments/:id/status
#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub notes: Option<String>,
}

pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let status = AppointmentStatus::try_parse(&body.status)
        .ok_or_else(|| AppError::BadRequest(format!("invalid status: {}", body.status)))?;

    let updated = {
        let db = state.db.lock().unwrap();
        queries::update_appointment_status(&db, &id, status, body.notes.as_deref())?
    };

    if updated {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("appointment {id}")))
    }
}

// DELETE /api/admin/appointments/:id
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let removed = {
        let db = state.db.lock().unwrap();
        queries::delete_appointment(&db, &id)?
    };

    if removed {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("appointment {id}")))
    }
}

// GET /api/admin/users
#[derive(Serialize)]
pub struct UserResponse {
    id: i64,
    phone: String,
    name: Option<String>,
}

pub async fn get_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let users = {
        let db = state.db.lock().unwrap();
        queries::list_users(&db)?
    };

    Ok(Json(
        users
            .into_iter()
            .map(|u| UserResponse {
                id: u.id,
                phone: u.phone,
                name: u.name,
            })
            .collect(),
    ))
}

// GET /api/admin/users/:id/appointments
pub async fn get_user_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let appointments = {
        let db = state.db.lock().unwrap();
        queries::get_appointments_for_user(&db, user_id)?
    };

    let rows: Vec<serde_json::Value> = appointments
        .into_iter()
        .map(|a| {
            serde_json::json!({
                "id": a.id,
                "date": a.date.format("%Y-%m-%d").to_string(),
                "start_time": a.start_time,
                "end_time": a.end_time,
                "service": a.service,
                "status": a.status.as_str(),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "appointments": rows })))
}

// GET /api/admin/stats
#[derive(Serialize)]
pub struct StatsResponse {
    total_appointments: i64,
    today_appointments: i64,
    pending_appointments: i64,
    total_users: i64,
    recent: Vec<AppointmentResponse>,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<StatsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let stats = {
        let db = state.db.lock().unwrap();
        queries::get_dashboard_stats(&db)?
    };

    Ok(Json(StatsResponse {
        total_appointments: stats.total_appointments,
        today_appointments: stats.today_appointments,
        pending_appointments: stats.pending_appointments,
        total_users: stats.total_users,
        recent: stats.recent.into_iter().map(Into::into).collect(),
    }))
}
