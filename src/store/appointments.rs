//! Appointments
//!
//! Time-boxed entries owned by a single user. Lookups by another user behave
//! exactly like a missing record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::{StoreError, StoreResult};
use crate::auth::UserId;

/// A stored appointment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub user_id: UserId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating an appointment
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Partial update; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// In-memory appointment list
pub struct AppointmentStore {
    appointments: RwLock<Vec<Appointment>>,
}

impl AppointmentStore {
    pub fn new() -> Self {
        Self {
            appointments: RwLock::new(Vec::new()),
        }
    }

    /// All appointments owned by `owner`, in creation order
    pub async fn list_for(&self, owner: &UserId) -> Vec<Appointment> {
        self.appointments
            .read()
            .await
            .iter()
            .filter(|a| &a.user_id == owner)
            .cloned()
            .collect()
    }

    pub async fn get(&self, owner: &UserId, id: &str) -> StoreResult<Appointment> {
        self.appointments
            .read()
            .await
            .iter()
            .find(|a| a.id == id && &a.user_id == owner)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("Appointment".to_string()))
    }

    pub async fn create(&self, owner: &UserId, new: NewAppointment) -> StoreResult<Appointment> {
        validate_title(&new.title)?;
        validate_range(new.start_time, new.end_time)?;

        let appointment = Appointment {
            id: format!("appt-{}", Uuid::new_v4()),
            user_id: owner.clone(),
            title: new.title,
            description: new.description,
            start_time: new.start_time,
            end_time: new.end_time,
            created_at: Utc::now(),
        };

        self.appointments.write().await.push(appointment.clone());

        tracing::debug!(appointment_id = %appointment.id, user_id = %owner, "Appointment created");
        Ok(appointment)
    }

    pub async fn update(
        &self,
        owner: &UserId,
        id: &str,
        patch: AppointmentPatch,
    ) -> StoreResult<Appointment> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .iter_mut()
            .find(|a| a.id == id && &a.user_id == owner)
            .ok_or_else(|| StoreError::NotFound("Appointment".to_string()))?;

        let start_time = patch.start_time.unwrap_or(appointment.start_time);
        let end_time = patch.end_time.unwrap_or(appointment.end_time);
        validate_range(start_time, end_time)?;

        if let Some(title) = patch.title {
            validate_title(&title)?;
            appointment.title = title;
        }
        if patch.description.is_some() {
            appointment.description = patch.description;
        }
        appointment.start_time = start_time;
        appointment.end_time = end_time;

        tracing::debug!(appointment_id = %id, user_id = %owner, "Appointment updated");
        Ok(appointment.clone())
    }

    pub async fn delete(&self, owner: &UserId, id: &str) -> StoreResult<()> {
        let mut appointments = self.appointments.write().await;
        let before = appointments.len();
        appointments.retain(|a| !(a.id == id && &a.user_id == owner));

        if appointments.len() == before {
            return Err(StoreError::NotFound("Appointment".to_string()));
        }

        tracing::debug!(appointment_id = %id, user_id = %owner, "Appointment deleted");
        Ok(())
    }
}

impl Default for AppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_title(title: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::Validation("Title cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> StoreResult<()> {
    if start >= end {
        return Err(StoreError::InvalidTimeRange);
    }
    Ok(())
}
