//! Explore: the doctor personas a patient can chat with.

use axum::response::Json;

use crate::services::doctor::{DOCTORS, DoctorContext};

/// `GET /api/doctors`
pub async fn list_doctors() -> Json<&'static [DoctorContext]> {
    Json(DOCTORS)
}
