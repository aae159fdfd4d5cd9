//! Immutable agent configuration.

/// Parameters governing one agent run.
///
/// Constructed once per task and never mutated afterwards; every subsystem
/// borrows it rather than copying individual fields around.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// The natural-language task the agent is trying to accomplish.
    pub task: String,

    /// Model id passed through to the LLM backend (e.g. `"gpt-4o"`).
    pub model: String,

    /// Hard ceiling on the number of steps the run loop will execute.
    pub max_steps: usize,

    /// Maximum number of actions accepted from a single LLM turn.
    pub max_actions_per_step: usize,

    /// Number of consecutive failing steps before the run aborts.
    pub max_failures: usize,

    /// Whether to request and attach a screenshot each step.
    pub use_vision: bool,

    /// Truncation limit for the rendered element listing.
    pub max_elements_length: usize,

    /// Size of the loop detector's action-hash ring.
    pub loop_detection_window: usize,

    /// Whether history compaction is permitted at all.
    pub enable_compaction: bool,

    /// Minimum step delta between compactions.
    pub compact_every_n_steps: usize,

    /// Minimum accumulated history length (chars) before compaction fires.
    pub compact_trigger_chars: usize,
}

/// Error constructing an [`AgentConfig`].
#[derive(Debug, thiserror::Error)]
pub enum AgentConfigError {
    #[error("task must not be empty")]
    EmptyTask,
    #[error("max_steps must be greater than zero")]
    ZeroMaxSteps,
    #[error("max_actions_per_step must be greater than zero")]
    ZeroMaxActionsPerStep,
    #[error("max_failures must be greater than zero")]
    ZeroMaxFailures,
}

impl AgentConfig {
    /// Start from the documented defaults with a task and model id supplied.
    pub fn new(task: impl Into<String>, model: impl Into<String>) -> Result<Self, AgentConfigError> {
        let config = Self {
            task: task.into(),
            model: model.into(),
            ..Self::defaults()
        };
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Self {
        Self {
            task: String::new(),
            model: String::new(),
            max_steps: 50,
            max_actions_per_step: 5,
            max_failures: 5,
            use_vision: true,
            max_elements_length: 40_000,
            loop_detection_window: 20,
            enable_compaction: true,
            compact_every_n_steps: 15,
            compact_trigger_chars: 40_000,
        }
    }

    fn validate(&self) -> Result<(), AgentConfigError> {
        if self.task.trim().is_empty() {
            return Err(AgentConfigError::EmptyTask);
        }
        if self.max_steps == 0 {
            return Err(AgentConfigError::ZeroMaxSteps);
        }
        if self.max_actions_per_step == 0 {
            return Err(AgentConfigError::ZeroMaxActionsPerStep);
        }
        if self.max_failures == 0 {
            return Err(AgentConfigError::ZeroMaxFailures);
        }
        Ok(())
    }

    /// Fraction of the step budget consumed so far.
    pub fn budget_fraction(&self, n_steps: usize) -> f64 {
        n_steps as f64 / self.max_steps as f64
    }
}
