//! Wraps one spawned [`AgentRunner`] with a handle cheap enough to hand to
//! the Control API: stop it, poll its status, or await its outcome.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::browser_host::PageProvider;
use crate::config::AgentConfig;
use crate::events::EventListener;
use crate::llm_client::LlmClient;
use crate::tool_executor::ToolExecutor;

use super::runner::{AgentOutcome, AgentRunner};

#[derive(Debug, Clone, PartialEq)]
pub struct AgentStatus {
    pub running: bool,
    pub step: usize,
}

pub struct AgentSession {
    task_id: String,
    stop_flag: Arc<AtomicBool>,
    step_counter: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<AgentOutcome>>>,
}

impl AgentSession {
    /// Builds a runner from its dependencies and spawns it as a background
    /// task, returning a handle the registry can hold on to.
    pub fn spawn(
        config: AgentConfig,
        page_provider: Arc<dyn PageProvider>,
        tool_executor: Arc<dyn ToolExecutor>,
        llm: Arc<dyn LlmClient>,
        listener: Arc<dyn EventListener>,
    ) -> Arc<Self> {
        let runner = AgentRunner::new(config, page_provider, tool_executor, llm, listener);
        let task_id = runner.task_id().to_string();
        let stop_flag = runner.stop_flag();
        let step_counter = runner.step_counter();
        let running = Arc::new(AtomicBool::new(true));

        let running_for_task = running.clone();
        let handle = tokio::spawn(async move {
            let outcome = runner.run().await;
            running_for_task.store(false, Ordering::SeqCst);
            outcome
        });

        Arc::new(Self {
            task_id,
            stop_flag,
            step_counter,
            running,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            running: self.running.load(Ordering::SeqCst),
            step: self.step_counter.load(Ordering::SeqCst),
        }
    }

    /// Awaits the run to completion, consuming the stored join handle. Safe
    /// to call at most meaningfully once; subsequent calls return `None`.
    pub async fn join(&self) -> Option<AgentOutcome> {
        let handle = self.handle.lock().await.take()?;
        handle.await.ok()
    }
}
