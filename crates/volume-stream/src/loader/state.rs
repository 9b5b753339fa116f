//! Single-flight load state machine.

use std::fmt;

use tracing::{debug, warn};

use crate::types::{LoadRequest, LoadResult};

/// Externally observable loader status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderStatus {
    #[default]
    Idle,
    Loading,
    LoadingWithPendingSupersede,
}

impl fmt::Display for LoaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::LoadingWithPendingSupersede => "loading (superseded)",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Idle,
    Loading,
    LoadingWithPendingSupersede(LoadRequest),
}

/// What to do with a finished task's result.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The result belongs to the newest request: publish it.
    Publish(LoadResult),
    /// The result was superseded and is dropped; run this request next.
    Rerun(LoadRequest),
}

/// Tracks the single task slot of a loader.
///
/// The machine never launches anything itself; it tells its owner when a
/// request should start and what to do with each completed result.
#[derive(Debug, Default)]
pub struct LoadStateMachine {
    state: State,
}

impl LoadStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> LoaderStatus {
        match self.state {
            State::Idle => LoaderStatus::Idle,
            State::Loading => LoaderStatus::Loading,
            State::LoadingWithPendingSupersede(_) => LoaderStatus::LoadingWithPendingSupersede,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Accept a new request. Returns it back when it should be launched now;
    /// otherwise it replaces any pending request.
    pub fn request_load(&mut self, request: LoadRequest) -> Option<LoadRequest> {
        match std::mem::take(&mut self.state) {
            State::Idle => {
                self.state = State::Loading;
                Some(request)
            }
            State::Loading => {
                debug!(source = %request.source, "Task in flight, request pending");
                self.state = State::LoadingWithPendingSupersede(request);
                None
            }
            State::LoadingWithPendingSupersede(previous) => {
                debug!(
                    dropped = %previous.source,
                    source = %request.source,
                    "Replacing pending request"
                );
                self.state = State::LoadingWithPendingSupersede(request);
                None
            }
        }
    }

    /// Handle the result of the task in flight.
    pub fn on_task_complete(&mut self, result: LoadResult) -> Completion {
        match std::mem::take(&mut self.state) {
            State::LoadingWithPendingSupersede(pending) => {
                self.state = State::Loading;
                Completion::Rerun(pending)
            }
            State::Loading => Completion::Publish(result),
            State::Idle => {
                warn!(source = %result.source, "Task completed while idle");
                Completion::Publish(result)
            }
        }
    }
}
