//! Agent Runner: the control loop, failure accounting, event emission, and
//! termination logic tying the other three subsystems together.

pub mod registry;
pub mod runner;
pub mod session;
pub mod state;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The LLM's structured output for one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentBrain {
    pub thinking: String,
    pub evaluation_previous_goal: String,
    pub memory: String,
    pub next_goal: String,
    pub action: Vec<AgentAction>,
}

/// A single-key mapping from tool name to its parameters, as emitted by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentAction {
    pub call: Map<String, Value>,
}

impl AgentAction {
    /// The sole key of the mapping: the tool name.
    pub fn tool_name(&self) -> Option<&str> {
        self.call.keys().next().map(String::as_str)
    }

    /// The parameters mapped to the tool name, or an empty map if malformed.
    pub fn params(&self) -> &Map<String, Value> {
        static EMPTY: once_cell::sync::Lazy<Map<String, Value>> =
            once_cell::sync::Lazy::new(Map::new);
        self.call
            .values()
            .next()
            .and_then(Value::as_object)
            .unwrap_or(&EMPTY)
    }

    pub fn is_done(&self) -> bool {
        self.tool_name() == Some("done")
    }
}

/// The uniform result of one executed action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentActionResult {
    pub tool_name: String,
    pub description: Option<String>,
    pub extracted_content: Option<String>,
    pub extracted_image: Option<String>,
    pub error: Option<String>,
    pub is_done: bool,
    pub success: bool,
}

impl AgentActionResult {
    pub fn done(success: bool, text: impl Into<String>) -> Self {
        Self {
            tool_name: "done".to_string(),
            description: None,
            extracted_content: Some(text.into()),
            extracted_image: None,
            error: None,
            is_done: true,
            success,
        }
    }

    pub fn error(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            description: None,
            extracted_content: None,
            extracted_image: None,
            error: Some(message.into()),
            is_done: false,
            success: false,
        }
    }
}

/// The error taxonomy from 7.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("transient LLM failure: {0}")]
    TransientLlm(String),
    #[error("tool error: {0}")]
    Tool(String),
    #[error("step exception: {0}")]
    StepException(String),
    #[error("fatal error: {0}")]
    Fatal(String),
    #[error("state extraction failed: {0}")]
    Extractor(#[from] crate::state_extractor::StateExtractorError),
}
