//! Per-run mutable state, owned exclusively by the Runner.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{AgentActionResult, AgentBrain};

/// Mutable state for one run. Only the Runner mutates the plain fields;
/// `stopped` and `step_counter` are shared (via `Arc`) with the Control API
/// so a caller can request cancellation and poll progress from outside the
/// run's own task.
pub struct AgentState {
    pub task_id: String,
    pub n_steps: usize,
    pub consecutive_failures: usize,
    pub last_result: Option<AgentActionResult>,
    pub last_model_output: Option<AgentBrain>,
    stopped: Arc<AtomicBool>,
    step_counter: Arc<AtomicUsize>,
}

impl AgentState {
    pub fn new() -> Self {
        Self {
            task_id: generate_task_id(),
            n_steps: 0,
            consecutive_failures: 0,
            last_result: None,
            last_model_output: None,
            stopped: Arc::new(AtomicBool::new(false)),
            step_counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stopped.clone()
    }

    pub fn step_counter(&self) -> Arc<AtomicUsize> {
        self.step_counter.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Publishes `n_steps` to the shared counter for external status queries.
    pub fn publish_step(&self) {
        self.step_counter.store(self.n_steps, Ordering::SeqCst);
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_task_id() -> String {
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let random: u32 = rand::random();
    format!("agent_{epoch_ms}_{random:08x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_matches_documented_shape() {
        let state = AgentState::new();
        assert!(state.task_id.starts_with("agent_"));
        let rest = state.task_id.strip_prefix("agent_").unwrap();
        let mut parts = rest.splitn(2, '_');
        let epoch_ms: u128 = parts.next().unwrap().parse().unwrap();
        assert!(epoch_ms > 0);
        assert!(parts.next().is_some());
    }

    #[test]
    fn stop_flag_is_shared_with_is_stopped() {
        let state = AgentState::new();
        let flag = state.stop_flag();
        assert!(!state.is_stopped());
        flag.store(true, Ordering::SeqCst);
        assert!(state.is_stopped());
    }
}
