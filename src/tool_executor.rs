//! The Tool Executor: performs individual browser actions. Out of the
//! core's scope per the specification — the core dispatches by name and
//! consumes a uniform result via the [`ToolExecutor`] trait.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// The closed set of tools the core advertises to the LLM.
pub const TOOL_CATALOGUE: &[&str] = &[
    "navigate",
    "go-back",
    "click-element",
    "type-text",
    "scroll",
    "send-keys",
    "wait-for-element",
    "wait-for-navigation",
    "search-page",
    "find-elements",
    "get-page-text",
    "get-elements",
    "get-dropdown-options",
    "select-dropdown-option",
    "evaluate-js",
    "capture-visible-tab",
    "extract-links",
    "get-page-metadata",
    "highlight-element",
    "fill-form",
    "done",
];

/// Tools known to replace the current URL or document, after which the
/// runner aborts the remainder of the step's action list.
pub const PAGE_CHANGING_TOOLS: &[&str] = &["navigate", "go-back", "click-element"];

pub fn is_page_changing(tool: &str) -> bool {
    PAGE_CHANGING_TOOLS.contains(&tool)
}

/// One tool invocation, as emitted by the LLM and dispatched by the runner.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub tool: String,
    pub params: Map<String, Value>,
}

/// The uniform result every tool produces.
#[derive(Debug, Clone)]
pub struct ToolCallOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ToolCallOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Executes a single tool call against the live browser.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: ToolCall) -> ToolCallOutcome;
}

/// A scriptable [`ToolExecutor`] for tests: pre-programmed outcomes keyed by
/// tool name, falling back to a generic success if the tool was not primed.
pub struct MockToolExecutor {
    responses: Mutex<HashMap<String, Vec<ToolCallOutcome>>>,
    pub calls: Mutex<Vec<ToolCall>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue an outcome to be returned the next time `tool` is called.
    /// Outcomes are consumed in FIFO order; once exhausted, calls to the
    /// same tool fall back to a generic success.
    pub fn queue(&self, tool: impl Into<String>, outcome: ToolCallOutcome) {
        self.responses
            .lock()
            .unwrap()
            .entry(tool.into())
            .or_default()
            .push(outcome);
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, call: ToolCall) -> ToolCallOutcome {
        self.calls.lock().unwrap().push(call.clone());
        let mut responses = self.responses.lock().unwrap();
        if let Some(queue) = responses.get_mut(&call.tool)
            && !queue.is_empty()
        {
            return queue.remove(0);
        }
        ToolCallOutcome::ok(Value::String("ok".into()))
    }
}
