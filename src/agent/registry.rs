//! The process-wide Control API: start, stop, and query runs by `taskId`.
//!
//! Mirrors the teacher's single global `BrowserManager`-style registry: one
//! `OnceLock`-initialised map, inserted into on start and cleaned up on
//! finish.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::browser_host::PageProvider;
use crate::config::AgentConfig;
use crate::events::EventListener;
use crate::llm_client::LlmClient;
use crate::tool_executor::ToolExecutor;

use super::session::{AgentSession, AgentStatus};

static REGISTRY: Lazy<DashMap<String, Arc<AgentSession>>> = Lazy::new(DashMap::new);

/// `startAgentTask(config) -> {taskId}`.
pub fn start_agent_task(
    config: AgentConfig,
    page_provider: Arc<dyn PageProvider>,
    tool_executor: Arc<dyn ToolExecutor>,
    llm: Arc<dyn LlmClient>,
    listener: Arc<dyn EventListener>,
) -> String {
    let session = AgentSession::spawn(config, page_provider, tool_executor, llm, listener);
    let task_id = session.task_id().to_string();
    REGISTRY.insert(task_id.clone(), session.clone());

    // Remove the entry once the run returns, mirroring the spec's
    // insert-on-start / delete-on-finish lifecycle.
    let cleanup_id = task_id.clone();
    tokio::spawn(async move {
        session.join().await;
        REGISTRY.remove(&cleanup_id);
    });

    task_id
}

/// `stopAgentTask(taskId) -> bool`.
pub fn stop_agent_task(task_id: &str) -> bool {
    match REGISTRY.get(task_id) {
        Some(session) => {
            session.stop();
            true
        }
        None => false,
    }
}

/// `getAgentStatus(taskId) -> {running, step} | null`.
pub fn get_agent_status(task_id: &str) -> Option<AgentStatus> {
    REGISTRY.get(task_id).map(|session| session.status())
}

/// `getActiveAgents() -> taskId[]`.
pub fn get_active_agents() -> Vec<String> {
    REGISTRY.iter().map(|entry| entry.key().clone()).collect()
}
