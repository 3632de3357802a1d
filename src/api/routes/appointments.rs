//! Appointment Routes
//!
//! All routes require a bearer token and only see the caller's appointments.
//! Every committed mutation is published to the caller's WebSocket
//! connections.
//!
//! - GET /api/appointments - List
//! - POST /api/appointments - Create
//! - GET /api/appointments/:id - Get one
//! - PUT /api/appointments/:id - Partial update
//! - DELETE /api/appointments/:id - Delete

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::api::dto::{CreateAppointmentRequest, MessageResponse, UpdateAppointmentRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::AuthUser;
use crate::api::state::AppState;
use crate::store::{Appointment, AppointmentPatch, NewAppointment};
use crate::websocket::DomainEvent;

/// GET /api/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Json<Vec<Appointment>> {
    Json(state.appointments.list_for(&user_id).await)
}

/// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.appointments.get(&user_id, &id).await?))
}

/// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let (Some(start_time), Some(end_time)) = (req.start_time, req.end_time) else {
        return Err(ApiError::Validation(
            "Title, startTime, and endTime are required".to_string(),
        ));
    };
    if req.title.is_empty() {
        return Err(ApiError::Validation(
            "Title, startTime, and endTime are required".to_string(),
        ));
    }

    let appointment = state
        .appointments
        .create(
            &user_id,
            NewAppointment {
                title: req.title,
                description: req.description,
                start_time,
                end_time,
            },
        )
        .await?;

    state
        .broadcaster
        .publish(DomainEvent::created(user_id, json!(appointment)))
        .await;

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// PUT /api/appointments/:id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> ApiResult<Json<Appointment>> {
    let patch = AppointmentPatch {
        title: req.title,
        description: req.description,
        start_time: req.start_time,
        end_time: req.end_time,
    };

    let appointment = state.appointments.update(&user_id, &id, patch).await?;

    state
        .broadcaster
        .publish(DomainEvent::updated(user_id, json!(appointment)))
        .await;

    Ok(Json(appointment))
}

/// DELETE /api/appointments/:id
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state.appointments.delete(&user_id, &id).await?;

    let body = json!({ "id": id, "userId": user_id });
    state
        .broadcaster
        .publish(DomainEvent::deleted(user_id, body))
        .await;

    Ok(Json(MessageResponse {
        message: "Appointment deleted successfully".to_string(),
    }))
}
