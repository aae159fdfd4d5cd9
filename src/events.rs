//! Events fanned out to UI listeners at each phase boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentActionResult;

/// One event in the lifecycle of a run.
///
/// Serialises to the `{action:'browserAgentEvent', event:{...}}` envelope
/// described in the external-interfaces section of the specification; the
/// envelope itself is applied by [`crate::agent::session::AgentSession`]
/// when forwarding to a listener, not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    #[serde(rename = "agent:step-start")]
    StepStart { task_id: String, step_number: usize },

    #[serde(rename = "agent:thinking")]
    Thinking {
        task_id: String,
        step_number: usize,
        thinking: String,
    },

    #[serde(rename = "agent:action-executed")]
    ActionExecuted {
        task_id: String,
        step_number: usize,
        result: AgentActionResult,
    },

    #[serde(rename = "agent:step-complete")]
    StepComplete { task_id: String, step_number: usize },

    #[serde(rename = "agent:done")]
    Done {
        task_id: String,
        step_number: usize,
        success: bool,
        text: String,
    },

    #[serde(rename = "agent:error")]
    Error {
        task_id: String,
        step_number: usize,
        message: String,
        fatal: bool,
        data: Option<Value>,
    },

    #[serde(rename = "agent:stopped")]
    Stopped { task_id: String, step_number: usize },
}

impl AgentEvent {
    pub fn task_id(&self) -> &str {
        match self {
            AgentEvent::StepStart { task_id, .. }
            | AgentEvent::Thinking { task_id, .. }
            | AgentEvent::ActionExecuted { task_id, .. }
            | AgentEvent::StepComplete { task_id, .. }
            | AgentEvent::Done { task_id, .. }
            | AgentEvent::Error { task_id, .. }
            | AgentEvent::Stopped { task_id, .. } => task_id,
        }
    }

    /// `true` for the three terminal event kinds.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentEvent::Done { .. } | AgentEvent::Error { .. } | AgentEvent::Stopped { .. }
        )
    }
}

/// Receives events as the run progresses.
///
/// Implemented with a plain trait (rather than a channel) so callers can
/// adapt it to whatever transport their UI surface uses; [`AgentSession`](crate::agent::session::AgentSession)
/// drives it from a background task.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: AgentEvent);
}

/// A listener that forwards events over a `tokio::sync::mpsc` channel.
///
/// This is the listener the reference [`crate::agent::session::AgentSession`]
/// installs by default.
pub struct ChannelEventListener {
    sender: tokio::sync::mpsc::UnboundedSender<AgentEvent>,
}

impl ChannelEventListener {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedReceiver<AgentEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventListener for ChannelEventListener {
    fn on_event(&self, event: AgentEvent) {
        // The receiver may have been dropped (e.g. caller stopped polling);
        // dropping the event is the correct behaviour, not a crash.
        let _ = self.sender.send(event);
    }
}
