//! Container lifecycle state.
//!
//! In memory the lifecycle is a tagged [`Lifecycle`] so that a ghost flag on
//! a stopped container cannot be expressed. On the wire it keeps the flat
//! `Running`/`Ghost` booleans older daemons wrote; combinations that have no
//! lifecycle equivalent are rejected when a record is loaded.
//!
//! ```text
//! Created --start--> Running --exit--> Exited --reset--> Created
//!                    |     ^             ^
//!          mark_ghost|     |confirm      |
//!                    v     |             |
//!               RunningUnverified ---exit+
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use dockyard_common::error::{DockyardError, Result};
use serde::{Deserialize, Serialize};

use crate::serde_helpers::timestamp;

/// Lifecycle phase of a container process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created, never started.
    Created,
    /// Process known to be running.
    Running {
        /// Process identifier.
        pid: i32,
        /// When the process started.
        started_at: DateTime<Utc>,
    },
    /// Marked running when the daemon restarted; not yet re-verified.
    RunningUnverified {
        /// Process identifier recorded before the restart.
        pid: i32,
        /// When the process started.
        started_at: DateTime<Utc>,
    },
    /// Process has exited.
    Exited {
        /// Exit status.
        exit_code: i32,
        /// When the last run started, if it was recorded.
        started_at: Option<DateTime<Utc>>,
        /// When the process exited.
        finished_at: DateTime<Utc>,
    },
}

impl Lifecycle {
    /// Short phase name used in messages.
    #[must_use]
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running { .. } => "running",
            Self::RunningUnverified { .. } => "unverified",
            Self::Exited { .. } => "exited",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phase())
    }
}

/// Lifecycle snapshot of a container, mutated only through transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StateRecord", into = "StateRecord")]
pub struct State {
    lifecycle: Lifecycle,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// A freshly created, never started state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Created,
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Whether the container is (believed to be) running, ghost or not.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(
            self.lifecycle,
            Lifecycle::Running { .. } | Lifecycle::RunningUnverified { .. }
        )
    }

    /// Whether the running status awaits re-verification.
    #[must_use]
    pub const fn is_ghost(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::RunningUnverified { .. })
    }

    /// Process identifier while running.
    #[must_use]
    pub const fn pid(&self) -> Option<i32> {
        match self.lifecycle {
            Lifecycle::Running { pid, .. } | Lifecycle::RunningUnverified { pid, .. } => Some(pid),
            _ => None,
        }
    }

    /// Exit status once exited.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self.lifecycle {
            Lifecycle::Exited { exit_code, .. } => Some(exit_code),
            _ => None,
        }
    }

    /// Start time of the current or last run.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        match self.lifecycle {
            Lifecycle::Running { started_at, .. } | Lifecycle::RunningUnverified { started_at, .. } => {
                Some(started_at)
            }
            Lifecycle::Exited { started_at, .. } => started_at,
            Lifecycle::Created => None,
        }
    }

    /// Exit time once exited.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        match self.lifecycle {
            Lifecycle::Exited { finished_at, .. } => Some(finished_at),
            _ => None,
        }
    }

    /// `Created -> Running`.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::InvalidTransition`] unless the state is
    /// `Created`.
    pub fn start(&mut self, pid: i32, started_at: DateTime<Utc>) -> Result<()> {
        self.transition("start", |lifecycle| match lifecycle {
            Lifecycle::Created => Some(Lifecycle::Running { pid, started_at }),
            _ => None,
        })
    }

    /// `Running -> RunningUnverified`, applied to containers found running
    /// when the daemon restarts.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::InvalidTransition`] unless the state is
    /// `Running`.
    pub fn mark_ghost(&mut self) -> Result<()> {
        self.transition("mark as ghost", |lifecycle| match lifecycle {
            Lifecycle::Running { pid, started_at } => {
                Some(Lifecycle::RunningUnverified { pid, started_at })
            }
            _ => None,
        })
    }

    /// `RunningUnverified -> Running`, once the process is found alive.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::InvalidTransition`] unless the state is
    /// `RunningUnverified`.
    pub fn confirm_running(&mut self) -> Result<()> {
        self.transition("confirm", |lifecycle| match lifecycle {
            Lifecycle::RunningUnverified { pid, started_at } => {
                Some(Lifecycle::Running { pid, started_at })
            }
            _ => None,
        })
    }

    /// `Running | RunningUnverified -> Exited` in a single step.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::InvalidTransition`] unless the container is
    /// running, verified or not.
    pub fn exit(&mut self, exit_code: i32, finished_at: DateTime<Utc>) -> Result<()> {
        self.transition("exit", |lifecycle| match lifecycle {
            Lifecycle::Running { started_at, .. } | Lifecycle::RunningUnverified { started_at, .. } => {
                Some(Lifecycle::Exited {
                    exit_code,
                    started_at: Some(started_at),
                    finished_at,
                })
            }
            _ => None,
        })
    }

    /// `Exited -> Created`, the first half of a restart.
    ///
    /// # Errors
    ///
    /// Returns [`DockyardError::InvalidTransition`] unless the state is
    /// `Exited`.
    pub fn reset(&mut self) -> Result<()> {
        self.transition("restart", |lifecycle| match lifecycle {
            Lifecycle::Exited { .. } => Some(Lifecycle::Created),
            _ => None,
        })
    }

    fn transition(
        &mut self,
        action: &'static str,
        next: impl FnOnce(Lifecycle) -> Option<Lifecycle>,
    ) -> Result<()> {
        let from = self.lifecycle;
        let to = next(from).ok_or(DockyardError::InvalidTransition {
            action,
            from: from.phase(),
        })?;
        tracing::debug!(%from, %to, action, "state transition");
        self.lifecycle = to;
        Ok(())
    }

    /// Status line shown in container listings.
    ///
    /// Empty for a created container, `Up <duration>` while running,
    /// `Ghost` while unverified and `Exit <code>` once exited.
    #[must_use]
    pub fn status_text(&self, now: DateTime<Utc>) -> String {
        match self.lifecycle {
            Lifecycle::Created => String::new(),
            Lifecycle::Running { started_at, .. } => {
                format!("Up {}", human_duration(now - started_at))
            }
            Lifecycle::RunningUnverified { .. } => "Ghost".to_string(),
            Lifecycle::Exited { exit_code, .. } => format!("Exit {exit_code}"),
        }
    }
}

/// Renders an elapsed duration the way listings show it, e.g. `3 hours`.
#[must_use]
pub fn human_duration(elapsed: chrono::TimeDelta) -> String {
    let seconds = elapsed.num_seconds();
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    if seconds < 1 {
        "Less than a second".to_string()
    } else if seconds < 60 {
        format!("{seconds} seconds")
    } else if minutes == 1 {
        "About a minute".to_string()
    } else if minutes < 60 {
        format!("{minutes} minutes")
    } else if hours == 1 {
        "About an hour".to_string()
    } else if hours < 48 {
        format!("{hours} hours")
    } else if hours < 24 * 7 * 2 {
        format!("{} days", hours / 24)
    } else if hours < 24 * 30 * 3 {
        format!("{} weeks", hours / 24 / 7)
    } else if hours < 24 * 365 * 2 {
        format!("{} months", hours / 24 / 30)
    } else {
        format!("{} years", hours / 24 / 365)
    }
}

/// Flat persisted form of [`State`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub(crate) struct StateRecord {
    running: bool,
    pid: i32,
    exit_code: i32,
    #[serde(with = "timestamp")]
    started_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    finished_at: Option<DateTime<Utc>>,
    ghost: bool,
}

impl From<State> for StateRecord {
    fn from(state: State) -> Self {
        match state.lifecycle {
            Lifecycle::Created => Self::default(),
            Lifecycle::Running { pid, started_at } => Self {
                running: true,
                pid,
                started_at: Some(started_at),
                ..Self::default()
            },
            Lifecycle::RunningUnverified { pid, started_at } => Self {
                running: true,
                pid,
                started_at: Some(started_at),
                ghost: true,
                ..Self::default()
            },
            Lifecycle::Exited {
                exit_code,
                started_at,
                finished_at,
            } => Self {
                exit_code,
                started_at,
                finished_at: Some(finished_at),
                ..Self::default()
            },
        }
    }
}

impl TryFrom<StateRecord> for State {
    type Error = DockyardError;

    fn try_from(record: StateRecord) -> Result<Self> {
        let lifecycle = match record {
            StateRecord { running: true, started_at: None, .. } => {
                return Err(DockyardError::schema("state", "running without StartedAt"));
            }
            StateRecord {
                running: true,
                exit_code,
                ..
            } if exit_code != 0 => {
                return Err(DockyardError::schema("state", "ExitCode set while Running"));
            }
            StateRecord {
                running: true,
                pid,
                started_at: Some(started_at),
                ghost,
                ..
            } => {
                if ghost {
                    Lifecycle::RunningUnverified { pid, started_at }
                } else {
                    Lifecycle::Running { pid, started_at }
                }
            }
            StateRecord { ghost: true, .. } => {
                return Err(DockyardError::schema("state", "Ghost set while not Running"));
            }
            StateRecord {
                exit_code,
                started_at,
                finished_at: Some(finished_at),
                ..
            } => Lifecycle::Exited {
                exit_code,
                started_at,
                finished_at,
            },
            StateRecord {
                pid: 0,
                exit_code: 0,
                started_at: None,
                ..
            } => Lifecycle::Created,
            StateRecord { .. } => {
                return Err(DockyardError::schema(
                    "state",
                    "stopped without FinishedAt but carries run details",
                ));
            }
        };
        Ok(Self { lifecycle })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid time")
    }

    fn assert_ghost_implies_running(state: &State) {
        let record = StateRecord::from(*state);
        assert!(!record.ghost || record.running, "ghost on stopped state: {record:?}");
    }

    #[test]
    fn new_state_is_created_and_zeroed() {
        let state = State::new();
        assert_eq!(state.lifecycle(), Lifecycle::Created);
        assert_eq!(state.pid(), None);
        assert_eq!(state.started_at(), None);
        let value = serde_json::to_value(state).expect("serialize");
        assert_eq!(value["Running"], false);
        assert_eq!(value["Pid"], 0);
        assert_eq!(value["StartedAt"], "0001-01-01T00:00:00Z");
    }

    #[test]
    fn full_lifecycle_keeps_ghost_only_while_running() {
        let mut state = State::new();
        state.start(42, at(0)).expect("start");
        assert_ghost_implies_running(&state);
        state.mark_ghost().expect("ghost");
        assert_ghost_implies_running(&state);
        state.confirm_running().expect("confirm");
        assert_ghost_implies_running(&state);
        state.exit(0, at(10)).expect("exit");
        assert_ghost_implies_running(&state);
        state.reset().expect("reset");
        assert_ghost_implies_running(&state);
        assert_eq!(state.lifecycle(), Lifecycle::Created);
    }

    #[test]
    fn ghost_exit_happens_in_one_step() {
        let mut state = State::new();
        state.start(7, at(0)).expect("start");
        state.mark_ghost().expect("ghost");
        state.exit(137, at(60)).expect("exit");

        let value = serde_json::to_value(state).expect("serialize");
        assert_eq!(value["Running"], false);
        assert_eq!(value["Ghost"], false);
        assert_eq!(value["ExitCode"], 137);
        assert_eq!(value["Pid"], 0);
        assert_eq!(state.finished_at(), Some(at(60)));
    }

    #[test]
    fn invalid_transitions_leave_state_untouched() {
        let mut state = State::new();
        assert!(matches!(
            state.mark_ghost(),
            Err(DockyardError::InvalidTransition { from: "created", .. })
        ));
        assert!(state.exit(1, at(1)).is_err());
        assert!(state.confirm_running().is_err());
        assert!(state.reset().is_err());

        state.start(1, at(0)).expect("start");
        assert!(state.start(2, at(1)).is_err());
        assert!(state.confirm_running().is_err());
        assert_eq!(state.pid(), Some(1));

        state.exit(0, at(5)).expect("exit");
        assert!(state.mark_ghost().is_err());
        assert!(state.start(3, at(6)).is_err());
        assert_eq!(state.exit_code(), Some(0));
    }

    #[test]
    fn ghost_record_loads_as_unverified() {
        let state: State = serde_json::from_value(json!({
            "Running": true, "Pid": 99, "ExitCode": 0,
            "StartedAt": "2013-11-20T10:00:00Z",
            "FinishedAt": "0001-01-01T00:00:00Z",
            "Ghost": true,
        }))
        .expect("parse");
        assert!(state.is_ghost());
        assert!(state.is_running());
        assert_eq!(state.pid(), Some(99));
    }

    #[test]
    fn ghost_on_stopped_record_is_rejected() {
        let result: std::result::Result<State, _> =
            serde_json::from_value(json!({"Running": false, "Ghost": true}));
        assert!(result.is_err());
    }

    #[test]
    fn running_record_without_start_time_is_rejected() {
        let result: std::result::Result<State, _> =
            serde_json::from_value(json!({"Running": true, "Pid": 5}));
        assert!(result.is_err());
    }

    #[test]
    fn running_record_with_exit_code_is_rejected() {
        let result: std::result::Result<State, _> = serde_json::from_value(json!({
            "Running": true, "Pid": 5, "ExitCode": 3,
            "StartedAt": "2013-11-20T10:00:00Z",
        }));
        let err = result.expect_err("must fail");
        assert!(err.to_string().contains("ExitCode set while Running"));
    }

    #[test]
    fn running_record_ignores_stale_finish_time() {
        let state: State = serde_json::from_value(json!({
            "Running": true, "Pid": 5,
            "StartedAt": "2013-11-20T10:00:00Z",
            "FinishedAt": "2013-11-19T10:00:00Z",
        }))
        .expect("parse");
        assert_eq!(state.finished_at(), None);
    }

    #[test]
    fn exited_record_round_trips() {
        let mut state = State::new();
        state.start(10, at(0)).expect("start");
        state.exit(2, at(30)).expect("exit");
        let json = serde_json::to_string(&state).expect("serialize");
        let back: State = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, state);
    }

    #[test]
    fn status_text_per_phase() {
        let mut state = State::new();
        assert_eq!(state.status_text(at(0)), "");
        state.start(1, at(0)).expect("start");
        assert_eq!(state.status_text(at(3 * 3600)), "Up 3 hours");
        state.mark_ghost().expect("ghost");
        assert_eq!(state.status_text(at(3 * 3600)), "Ghost");
        state.exit(3, at(4 * 3600)).expect("exit");
        assert_eq!(state.status_text(at(5 * 3600)), "Exit 3");
    }

    #[test]
    fn human_duration_thresholds() {
        let d = chrono::TimeDelta::seconds;
        assert_eq!(human_duration(d(0)), "Less than a second");
        assert_eq!(human_duration(d(-5)), "Less than a second");
        assert_eq!(human_duration(d(45)), "45 seconds");
        assert_eq!(human_duration(d(90)), "About a minute");
        assert_eq!(human_duration(d(30 * 60)), "30 minutes");
        assert_eq!(human_duration(d(3600)), "About an hour");
        assert_eq!(human_duration(d(5 * 3600)), "5 hours");
        assert_eq!(human_duration(d(3 * 86_400)), "3 days");
        assert_eq!(human_duration(d(21 * 86_400)), "3 weeks");
        assert_eq!(human_duration(d(120 * 86_400)), "4 months");
        assert_eq!(human_duration(d(800 * 86_400)), "2 years");
    }
}
