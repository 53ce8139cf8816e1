//! Tracks which dates have a run in flight so that at most one run per date
//! executes at a time. Runs for different dates do not block each other.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::DateKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running { started_at: DateTime<Utc> },
    Completed { finished_at: DateTime<Utc> },
}

/// Snapshot of the registry for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub is_processing: bool,
    pub running: Vec<DateKey>,
    pub last_processed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    runs: Arc<Mutex<HashMap<DateKey, RunState>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // the map stays consistent even if a holder panicked
    fn lock(&self) -> MutexGuard<'_, HashMap<DateKey, RunState>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `date` as running and returns a guard that releases it on drop,
    /// or `None` when a run for `date` is already in flight.
    pub fn try_begin(&self, date: &DateKey) -> Option<RunGuard> {
        self.acquire(date).map(|_| self.guard(date, Release::Complete))
    }

    /// Like [`RunRegistry::try_begin`], for maintenance work that keeps runs
    /// out without processing the date: the guard puts the previous state
    /// back on drop, so `last_processed` is left alone.
    pub fn try_hold(&self, date: &DateKey) -> Option<RunGuard> {
        self.acquire(date)
            .map(|previous| self.guard(date, Release::Restore(previous)))
    }

    /// Marks `date` as running and returns the state it replaced
    fn acquire(&self, date: &DateKey) -> Option<RunState> {
        let mut runs = self.lock();
        let previous = runs.get(date).copied().unwrap_or(RunState::Idle);
        if matches!(previous, RunState::Running { .. }) {
            return None;
        }
        runs.insert(
            *date,
            RunState::Running {
                started_at: Utc::now(),
            },
        );
        Some(previous)
    }

    fn guard(&self, date: &DateKey, release: Release) -> RunGuard {
        RunGuard {
            date: *date,
            registry: self.clone(),
            release,
        }
    }

    pub fn state(&self, date: &DateKey) -> RunState {
        self.lock().get(date).copied().unwrap_or(RunState::Idle)
    }

    pub fn is_running(&self, date: &DateKey) -> bool {
        matches!(self.state(date), RunState::Running { .. })
    }

    pub fn status(&self) -> PipelineStatus {
        let runs = self.lock();

        let mut running = runs
            .iter()
            .filter(|(_, state)| matches!(state, RunState::Running { .. }))
            .map(|(date, _)| *date)
            .collect::<Vec<_>>();
        running.sort();

        let last_processed = runs
            .values()
            .filter_map(|state| match state {
                RunState::Completed { finished_at } => Some(*finished_at),
                _ => None,
            })
            .max();

        PipelineStatus {
            is_processing: !running.is_empty(),
            running,
            last_processed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Release {
    Complete,
    Restore(RunState),
}

/// Held for the duration of one run. Dropping it, whether the run returned
/// or unwound, marks the date as completed, or restores the prior state for
/// a guard from [`RunRegistry::try_hold`].
#[derive(Debug)]
pub struct RunGuard {
    date: DateKey,
    registry: RunRegistry,
    release: Release,
}

impl RunGuard {
    pub fn date(&self) -> &DateKey {
        &self.date
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut runs = self.registry.lock();
        match self.release {
            Release::Complete => {
                runs.insert(
                    self.date,
                    RunState::Completed {
                        finished_at: Utc::now(),
                    },
                );
            }
            Release::Restore(RunState::Idle) => {
                runs.remove(&self.date);
            }
            Release::Restore(previous) => {
                runs.insert(self.date, previous);
            }
        }
    }
}
