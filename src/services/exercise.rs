//! Exercise session — the sets × reps timer state machine.
//!
//! DESIGN
//! ======
//! Pure, synchronous state. The runner owns the clock and calls [`tick`]
//! once per second and [`sample_feedback`] on the feedback interval; this
//! module only decides what each event does to the counters.
//!
//! ```text
//!   Idle ──start──▶ Active ──rep target, sets left──▶ Resting
//!    ▲               │  ▲                                 │
//!    │            pause start                     rest hits zero
//!    │               ▼  │                                 │
//!    │             Paused        Active ◀─────────────────┘
//!    │
//!    └──reset── (any)            Active ──rep target, last set──▶ Complete
//! ```
//!
//! Form feedback is simulated. Nothing here reads a camera or a sensor.
//!
//! [`tick`]: ExerciseSession::tick
//! [`sample_feedback`]: ExerciseSession::sample_feedback

use rand::Rng;
use serde::Serialize;

use crate::rate_limit::env_parse;

const DEFAULT_REP_SECS: u32 = 30;
const DEFAULT_REST_SECS: u32 = 60;
const DEFAULT_FEEDBACK_INTERVAL_SECS: u32 = 2;

/// Weighted pool the simulated tracker draws from. `Error` is never drawn.
const FEEDBACK_POOL: [FormFeedback; 5] =
    [FormFeedback::Good, FormFeedback::Good, FormFeedback::Good, FormFeedback::Warning, FormFeedback::Good];

/// Probability threshold above which the tracker reports a detected pose.
const TRACKING_THRESHOLD: f64 = 0.3;

// =============================================================================
// DEFINITION + TIMINGS
// =============================================================================

/// What the patient is asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseDefinition {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub description: String,
    pub image_url: String,
}

impl ExerciseDefinition {
    #[must_use]
    pub fn wall_sit() -> Self {
        Self {
            name: "Wall Sit".into(),
            sets: 3,
            reps: 30,
            description: "Stand with your back against a wall, slide down until your thighs are parallel to the \
                          floor. Hold this position."
                .into(),
            image_url: "https://images.pexels.com/photos/7991579/pexels-photo-7991579.jpeg?auto=compress&cs=tinysrgb&w=800"
                .into(),
        }
    }
}

/// Durations in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub rep_secs: u32,
    pub rest_secs: u32,
    pub feedback_interval_secs: u32,
}

impl SessionTimings {
    /// Read `EXERCISE_REP_SECS`, `EXERCISE_REST_SECS` and
    /// `EXERCISE_FEEDBACK_INTERVAL_SECS`. Zero values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let nonzero = |key: &str, default: u32| match env_parse(key, default) {
            0 => default,
            v => v,
        };
        Self {
            rep_secs: nonzero("EXERCISE_REP_SECS", DEFAULT_REP_SECS),
            rest_secs: nonzero("EXERCISE_REST_SECS", DEFAULT_REST_SECS),
            feedback_interval_secs: nonzero("EXERCISE_FEEDBACK_INTERVAL_SECS", DEFAULT_FEEDBACK_INTERVAL_SECS),
        }
    }
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            rep_secs: DEFAULT_REP_SECS,
            rest_secs: DEFAULT_REST_SECS,
            feedback_interval_secs: DEFAULT_FEEDBACK_INTERVAL_SECS,
        }
    }
}

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Active,
    Paused,
    Resting,
    Complete,
}

impl Phase {
    /// Phases in which the one-second timer has work to do.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(self, Self::Active | Self::Resting)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFeedback {
    Good,
    Warning,
    Error,
}

impl FormFeedback {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Good => "Perfect form! Keep it up!",
            Self::Warning => "Straighten your back slightly",
            Self::Error => "Adjust your posture - too low!",
        }
    }
}

/// What a single tick did, so the runner can react to transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do in the current phase.
    Idle,
    /// A countdown moved but no counter changed.
    Counting,
    RepCompleted,
    /// A set finished and rest began.
    SetCompleted,
    RestFinished,
    /// The final rep of the final set finished.
    SessionCompleted,
}

#[derive(Debug, Clone)]
pub struct ExerciseSession {
    definition: ExerciseDefinition,
    timings: SessionTimings,
    phase: Phase,
    current_set: u32,
    current_rep: u32,
    time_remaining: u32,
    rest_remaining: u32,
    feedback: FormFeedback,
    tracking_detected: bool,
    /// Pause requested during rest; applied when the rest ends.
    pause_after_rest: bool,
}

impl ExerciseSession {
    #[must_use]
    pub fn new(definition: ExerciseDefinition, timings: SessionTimings) -> Self {
        Self {
            definition,
            timings,
            phase: Phase::Idle,
            current_set: 1,
            current_rep: 0,
            time_remaining: timings.rep_secs,
            rest_remaining: 0,
            feedback: FormFeedback::Good,
            tracking_detected: false,
            pause_after_rest: false,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    #[must_use]
    pub fn current_rep(&self) -> u32 {
        self.current_rep
    }

    #[must_use]
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    #[must_use]
    pub fn rest_remaining(&self) -> u32 {
        self.rest_remaining
    }

    #[must_use]
    pub fn definition(&self) -> &ExerciseDefinition {
        &self.definition
    }

    /// Begin or resume. During rest this cancels a pending pause.
    /// Returns `true` if anything changed.
    pub fn start(&mut self) -> bool {
        match self.phase {
            Phase::Idle | Phase::Paused => {
                self.phase = Phase::Active;
                self.tracking_detected = true;
                true
            }
            Phase::Resting => std::mem::take(&mut self.pause_after_rest),
            Phase::Active | Phase::Complete => false,
        }
    }

    /// Freeze the rep countdown. During rest the countdown keeps running and
    /// the session lands in `Paused` instead of `Active` when it ends.
    pub fn pause(&mut self) -> bool {
        match self.phase {
            Phase::Active => {
                self.phase = Phase::Paused;
                true
            }
            Phase::Resting if !self.pause_after_rest => {
                self.pause_after_rest = true;
                true
            }
            _ => false,
        }
    }

    /// Back to `Idle` with all counters zeroed, from any phase.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.current_set = 1;
        self.current_rep = 0;
        self.time_remaining = self.timings.rep_secs;
        self.rest_remaining = 0;
        self.feedback = FormFeedback::Good;
        self.tracking_detected = false;
        self.pause_after_rest = false;
    }

    /// Advance one second.
    pub fn tick(&mut self) -> TickOutcome {
        match self.phase {
            Phase::Active => self.tick_active(),
            Phase::Resting => self.tick_resting(),
            Phase::Idle | Phase::Paused | Phase::Complete => TickOutcome::Idle,
        }
    }

    fn tick_active(&mut self) -> TickOutcome {
        if self.time_remaining > 1 {
            self.time_remaining -= 1;
            return TickOutcome::Counting;
        }

        self.current_rep += 1;
        if self.current_rep < self.definition.reps {
            self.time_remaining = self.timings.rep_secs;
            return TickOutcome::RepCompleted;
        }

        if self.current_set < self.definition.sets {
            self.current_set += 1;
            self.current_rep = 0;
            self.rest_remaining = self.timings.rest_secs;
            self.time_remaining = self.timings.rep_secs;
            self.phase = Phase::Resting;
            TickOutcome::SetCompleted
        } else {
            self.time_remaining = 0;
            self.phase = Phase::Complete;
            TickOutcome::SessionCompleted
        }
    }

    fn tick_resting(&mut self) -> TickOutcome {
        self.rest_remaining = self.rest_remaining.saturating_sub(1);
        if self.rest_remaining > 0 {
            return TickOutcome::Counting;
        }
        self.time_remaining = self.timings.rep_secs;
        self.phase = if std::mem::take(&mut self.pause_after_rest) { Phase::Paused } else { Phase::Active };
        TickOutcome::RestFinished
    }

    /// Draw a new simulated feedback signal. No-op outside `Active`.
    pub fn sample_feedback(&mut self, rng: &mut impl Rng) {
        if self.phase != Phase::Active {
            return;
        }
        self.feedback = FEEDBACK_POOL[rng.random_range(0..FEEDBACK_POOL.len())];
        self.tracking_detected = rng.random::<f64>() > TRACKING_THRESHOLD;
    }

    /// Completed reps across all sets as a percentage of the whole session.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        let total = self.definition.sets * self.definition.reps;
        if total == 0 {
            return 100.0;
        }
        let done = (self.current_set - 1) * self.definition.reps + self.current_rep;
        f64::from(done) / f64::from(total) * 100.0
    }

    /// Serializable view for API responses.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let resting = self.phase == Phase::Resting;
        SessionSnapshot {
            exercise: self.definition.clone(),
            phase: self.phase,
            current_set: self.current_set,
            current_rep: self.current_rep,
            time_remaining: self.time_remaining,
            rest_remaining: self.rest_remaining,
            display_seconds: if resting { self.rest_remaining } else { self.time_remaining },
            display_label: if resting { "Rest Time" } else { "Seconds Remaining" },
            form_feedback: (self.phase == Phase::Active).then_some(self.feedback),
            feedback_message: (self.phase == Phase::Active).then(|| self.feedback.message()),
            tracking_detected: self.tracking_detected,
            pause_after_rest: self.pause_after_rest,
            progress_percent: self.progress_percent(),
            complete: self.phase == Phase::Complete,
        }
    }
}

/// Point-in-time session view.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub exercise: ExerciseDefinition,
    pub phase: Phase,
    pub current_set: u32,
    pub current_rep: u32,
    pub time_remaining: u32,
    pub rest_remaining: u32,
    pub display_seconds: u32,
    pub display_label: &'static str,
    pub form_feedback: Option<FormFeedback>,
    pub feedback_message: Option<&'static str>,
    pub tracking_detected: bool,
    pub pause_after_rest: bool,
    pub progress_percent: f64,
    pub complete: bool,
}

#[cfg(test)]
#[path = "exercise_test.rs"]
mod tests;
