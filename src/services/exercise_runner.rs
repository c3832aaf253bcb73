//! Exercise runner — one timer task per user session.
//!
//! DESIGN
//! ======
//! Sessions live in `AppState::exercises`, keyed by user id. While a session
//! is `Active` or `Resting`, a spawned task owns a one-second
//! `tokio::time::interval`, ticks the session under the write lock and, on
//! the feedback interval, draws a new simulated form signal. The task exits
//! on its own once the phase stops running; `pause`, `reset` and `end` abort
//! it directly.
//!
//! LIFECYCLE
//! =========
//! 1. First request creates an `Idle` session for the user
//! 2. `start` flips to `Active` and spawns the timer if none is alive
//! 3. Timer drives `Active ⇄ Resting` until `Complete`, then records the
//!    completion (best effort) and exits
//! 4. `end` (the patient navigating away) aborts the timer and drops all
//!    progress

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use super::exercise::{ExerciseDefinition, ExerciseSession, Phase, SessionSnapshot, TickOutcome};
use super::profile;
use crate::state::AppState;

/// A session plus the handle of its timer task, if one is running.
pub struct LiveExercise {
    pub session: ExerciseSession,
    timer: Option<JoinHandle<()>>,
}

impl LiveExercise {
    #[must_use]
    pub fn new(session: ExerciseSession) -> Self {
        Self { session, timer: None }
    }

    fn timer_alive(&self) -> bool {
        self.timer.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

impl Drop for LiveExercise {
    fn drop(&mut self) {
        self.stop_timer();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExerciseError {
    #[error("no exercise session for user {0}")]
    NotFound(Uuid),
}

impl crate::error::ErrorCode for ExerciseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_EXERCISE_NOT_FOUND",
        }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Current session view, creating an `Idle` session on first access.
pub async fn snapshot(state: &AppState, user_id: Uuid) -> SessionSnapshot {
    let mut sessions = state.exercises.write().await;
    sessions
        .entry(user_id)
        .or_insert_with(|| fresh(state))
        .session
        .snapshot()
}

pub async fn start(state: &AppState, user_id: Uuid) -> SessionSnapshot {
    let mut sessions = state.exercises.write().await;
    let live = sessions.entry(user_id).or_insert_with(|| fresh(state));
    if live.session.start() {
        info!(%user_id, exercise = %live.session.definition().name, "exercise: started");
    }
    if live.session.phase().is_running() && !live.timer_alive() {
        live.timer = Some(spawn_timer(state.clone(), user_id));
    }
    live.session.snapshot()
}

pub async fn pause(state: &AppState, user_id: Uuid) -> SessionSnapshot {
    let mut sessions = state.exercises.write().await;
    let live = sessions.entry(user_id).or_insert_with(|| fresh(state));
    if live.session.pause() {
        // A rest countdown keeps its timer; the pause lands when rest ends.
        if live.session.phase() == Phase::Paused {
            live.stop_timer();
        }
        info!(%user_id, set = live.session.current_set(), rep = live.session.current_rep(), "exercise: paused");
    }
    live.session.snapshot()
}

pub async fn reset(state: &AppState, user_id: Uuid) -> SessionSnapshot {
    let mut sessions = state.exercises.write().await;
    let live = sessions.entry(user_id).or_insert_with(|| fresh(state));
    live.stop_timer();
    live.session.reset();
    info!(%user_id, "exercise: reset");
    live.session.snapshot()
}

/// Drop the session and its timer.
///
/// # Errors
///
/// Returns [`ExerciseError::NotFound`] if the user has no session.
pub async fn end(state: &AppState, user_id: Uuid) -> Result<(), ExerciseError> {
    let removed = state.exercises.write().await.remove(&user_id);
    match removed {
        Some(_) => {
            info!(%user_id, "exercise: session ended");
            Ok(())
        }
        None => Err(ExerciseError::NotFound(user_id)),
    }
}

fn fresh(state: &AppState) -> LiveExercise {
    LiveExercise::new(ExerciseSession::new(ExerciseDefinition::wall_sit(), state.exercise_timings))
}

// =============================================================================
// TIMER
// =============================================================================

fn spawn_timer(state: AppState, user_id: Uuid) -> JoinHandle<()> {
    tokio::spawn(async move {
        let feedback_every = u64::from(state.exercise_timings.feedback_interval_secs.max(1));
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a full second elapses.
        interval.tick().await;

        let mut elapsed: u64 = 0;
        loop {
            interval.tick().await;
            elapsed += 1;

            let completed = {
                let mut sessions = state.exercises.write().await;
                let Some(live) = sessions.get_mut(&user_id) else {
                    return;
                };
                let outcome = live.session.tick();
                if elapsed % feedback_every == 0 {
                    live.session.sample_feedback(&mut rand::rng());
                }
                match outcome {
                    TickOutcome::SetCompleted => {
                        info!(%user_id, set = live.session.current_set(), "exercise: set complete, resting");
                    }
                    TickOutcome::RestFinished => {
                        info!(%user_id, paused = !live.session.phase().is_running(), "exercise: rest over");
                    }
                    _ => {}
                }
                if !live.session.phase().is_running() {
                    live.timer = None;
                    (outcome == TickOutcome::SessionCompleted).then(|| live.session.definition().clone())
                } else {
                    continue;
                }
            };

            if let Some(definition) = completed {
                info!(%user_id, exercise = %definition.name, "exercise: session complete");
                if let Err(e) = profile::record_completion(&state.pool, user_id, &definition).await {
                    warn!(%user_id, error = %e, "exercise: failed to record completion");
                }
            }
            return;
        }
    })
}

#[cfg(test)]
#[path = "exercise_runner_test.rs"]
mod tests;
