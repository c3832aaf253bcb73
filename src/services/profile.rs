//! Profile service — patient profile reads/updates and exercise progress.
//!
//! Profiles are keyed by the hosted auth user id. The row is created lazily
//! on first read so a freshly signed-up patient always has one.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::doctor;
use super::exercise::ExerciseDefinition;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("unknown doctor: {0}")]
    UnknownDoctor(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::error::ErrorCode for ProfileError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownDoctor(_) => "E_UNKNOWN_DOCTOR",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub injury_type: Option<String>,
    pub preferred_doctor: Option<String>,
    pub onboarding_completed: bool,
}

impl Profile {
    /// Subtitle shown under the patient's name.
    #[must_use]
    pub fn recovery_label(&self) -> String {
        match self.injury_type.as_deref().map(str::trim) {
            Some(injury) if !injury.is_empty() => format!("{injury} Recovery"),
            _ => "Recovery Journey".to_owned(),
        }
    }
}

/// Partial update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub injury_type: Option<String>,
    pub preferred_doctor: Option<String>,
    pub onboarding_completed: Option<bool>,
}

impl ProfileUpdate {
    /// Reject a preferred doctor that is not one of the known personas.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::UnknownDoctor`] for any id [`doctor::find`]
    /// does not resolve, blank ids included.
    pub fn validate(&self) -> Result<(), ProfileError> {
        match self.preferred_doctor.as_deref() {
            Some(id) if doctor::find(id).is_none() => Err(ProfileError::UnknownDoctor(id.to_owned())),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseCount {
    pub exercise: String,
    pub sessions: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub sessions_completed: i64,
    pub total_sets: i64,
    pub last_completed_at: Option<String>,
    pub by_exercise: Vec<ExerciseCount>,
}

// =============================================================================
// QUERIES
// =============================================================================

fn row_to_profile(row: &sqlx::postgres::PgRow) -> Profile {
    Profile {
        id: row.get("id"),
        name: row.get("name"),
        avatar_url: row.get("avatar_url"),
        injury_type: row.get("injury_type"),
        preferred_doctor: row.get("preferred_doctor"),
        onboarding_completed: row.get("onboarding_completed"),
    }
}

/// Fetch the caller's profile, inserting an empty one if absent.
pub async fn get_or_create(pool: &PgPool, user_id: Uuid, avatar_url: Option<&str>) -> Result<Profile, ProfileError> {
    let row = sqlx::query(
        r"INSERT INTO profiles (id, avatar_url) VALUES ($1, $2)
          ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
          RETURNING id, name, avatar_url, injury_type, preferred_doctor, onboarding_completed",
    )
    .bind(user_id)
    .bind(avatar_url)
    .fetch_one(pool)
    .await?;
    Ok(row_to_profile(&row))
}

/// Preferred doctor only; used by the feed's "my doctor" tab.
pub async fn preferred_doctor(pool: &PgPool, user_id: Uuid) -> Result<Option<String>, ProfileError> {
    let doctor: Option<Option<String>> =
        sqlx::query_scalar("SELECT preferred_doctor FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(doctor.flatten())
}

/// Apply a partial update and return the new row.
pub async fn update(pool: &PgPool, user_id: Uuid, patch: &ProfileUpdate) -> Result<Profile, ProfileError> {
    patch.validate()?;
    let row = sqlx::query(
        r"INSERT INTO profiles (id, name, avatar_url, injury_type, preferred_doctor, onboarding_completed)
          VALUES ($1, $2, $3, $4, $5, COALESCE($6, false))
          ON CONFLICT (id) DO UPDATE SET
              name = COALESCE($2, profiles.name),
              avatar_url = COALESCE($3, profiles.avatar_url),
              injury_type = COALESCE($4, profiles.injury_type),
              preferred_doctor = COALESCE($5, profiles.preferred_doctor),
              onboarding_completed = COALESCE($6, profiles.onboarding_completed),
              updated_at = now()
          RETURNING id, name, avatar_url, injury_type, preferred_doctor, onboarding_completed",
    )
    .bind(user_id)
    .bind(patch.name.as_deref())
    .bind(patch.avatar_url.as_deref())
    .bind(patch.injury_type.as_deref())
    .bind(patch.preferred_doctor.as_deref())
    .bind(patch.onboarding_completed)
    .fetch_one(pool)
    .await?;
    Ok(row_to_profile(&row))
}

/// Record one finished exercise session.
pub async fn record_completion(pool: &PgPool, user_id: Uuid, definition: &ExerciseDefinition) -> Result<(), ProfileError> {
    sqlx::query("INSERT INTO exercise_completions (user_id, exercise, sets, reps) VALUES ($1, $2, $3, $4)")
        .bind(user_id)
        .bind(&definition.name)
        .bind(i32::try_from(definition.sets).unwrap_or(i32::MAX))
        .bind(i32::try_from(definition.reps).unwrap_or(i32::MAX))
        .execute(pool)
        .await?;
    Ok(())
}

/// Aggregate completed sessions for the Progress view.
pub async fn progress(pool: &PgPool, user_id: Uuid) -> Result<Progress, ProfileError> {
    let totals = sqlx::query(
        r#"SELECT
               COUNT(*)                     AS sessions_completed,
               COALESCE(SUM(sets), 0)::BIGINT AS total_sets,
               to_char(MAX(completed_at) AT TIME ZONE 'UTC', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS last_completed_at
           FROM exercise_completions
           WHERE user_id = $1"#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let rows = sqlx::query(
        r"SELECT exercise, COUNT(*) AS cnt
          FROM exercise_completions
          WHERE user_id = $1
          GROUP BY exercise
          ORDER BY cnt DESC, exercise",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(Progress {
        sessions_completed: totals.get("sessions_completed"),
        total_sets: totals.get("total_sets"),
        last_completed_at: totals.get("last_completed_at"),
        by_exercise: rows
            .iter()
            .map(|r| ExerciseCount { exercise: r.get("exercise"), sessions: r.get("cnt") })
            .collect(),
    })
}

#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;
