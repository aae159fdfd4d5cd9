//! The control loop: observe, reason, act, record, check terminal conditions.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::browser_host::PageProvider;
use crate::config::AgentConfig;
use crate::events::{AgentEvent, EventListener};
use crate::llm_client::{CompletionRequest, LlmClient};
use crate::loop_detector::LoopDetector;
use crate::message_manager::MessageManager;
use crate::state_extractor;
use crate::tool_executor::{is_page_changing, ToolCall, ToolCallOutcome, ToolExecutor};

use super::{AgentAction, AgentActionResult, AgentBrain, AgentState};

/// How the run ended.
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    Done { success: bool, text: String },
    Error { message: String },
    Stopped,
}

pub struct AgentRunner {
    config: AgentConfig,
    state: AgentState,
    message_manager: MessageManager,
    loop_detector: LoopDetector,
    page_provider: Arc<dyn PageProvider>,
    tool_executor: Arc<dyn ToolExecutor>,
    llm: Arc<dyn LlmClient>,
    listener: Arc<dyn EventListener>,
}

const POST_NAVIGATION_DELAY: Duration = Duration::from_millis(500);
const ELEMENTS_HASH_SAMPLE: usize = 5000;

impl AgentRunner {
    pub fn new(
        config: AgentConfig,
        page_provider: Arc<dyn PageProvider>,
        tool_executor: Arc<dyn ToolExecutor>,
        llm: Arc<dyn LlmClient>,
        listener: Arc<dyn EventListener>,
    ) -> Self {
        let loop_detector = LoopDetector::new(config.loop_detection_window);
        let message_manager = MessageManager::new(config.max_actions_per_step);
        Self {
            state: AgentState::new(),
            config,
            message_manager,
            loop_detector,
            page_provider,
            tool_executor,
            llm,
            listener,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.state.task_id
    }

    pub fn stop_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.state.stop_flag()
    }

    pub fn step_counter(&self) -> Arc<std::sync::atomic::AtomicUsize> {
        self.state.step_counter()
    }

    fn emit(&self, event: AgentEvent) {
        self.listener.on_event(event);
    }

    /// Runs until the task completes, the failure budget is exhausted, the
    /// step budget is reached, or the run is cancelled.
    pub async fn run(mut self) -> AgentOutcome {
        tracing::info!(task_id = %self.state.task_id, task = %self.config.task, "agent run started");
        loop {
            if self.state.n_steps >= self.config.max_steps {
                break;
            }
            self.state.publish_step();
            if self.state.is_stopped() {
                tracing::info!(task_id = %self.state.task_id, step = self.state.n_steps, "agent run stopped");
                self.emit(AgentEvent::Stopped {
                    task_id: self.state.task_id.clone(),
                    step_number: self.state.n_steps,
                });
                return AgentOutcome::Stopped;
            }

            tracing::debug!(task_id = %self.state.task_id, step = self.state.n_steps, "step start");
            self.emit(AgentEvent::StepStart {
                task_id: self.state.task_id.clone(),
                step_number: self.state.n_steps,
            });

            if let Some(outcome) = self.run_step().await {
                return outcome;
            }
        }

        let text = "Agent reached maximum steps without completing the task.".to_string();
        tracing::info!(task_id = %self.state.task_id, "agent run exhausted step budget");
        self.emit(AgentEvent::Done {
            task_id: self.state.task_id.clone(),
            step_number: self.state.n_steps,
            success: false,
            text: text.clone(),
        });
        AgentOutcome::Done { success: false, text }
    }

    /// Runs one full step. Returns `Some(outcome)` when the run should end.
    async fn run_step(&mut self) -> Option<AgentOutcome> {
        let step = self.state.n_steps;

        // 1. Observe
        let browser_state =
            match state_extractor::extract(&*self.page_provider, self.config.max_elements_length, self.config.use_vision)
                .await
            {
                Ok(state) => state,
                Err(err) => {
                    tracing::warn!(task_id = %self.state.task_id, step, %err, "state extraction failed");
                    return self.fail_step(step, format!("extraction failed: {err}")).await;
                }
            };

        let sample: String = browser_state.elements_text.chars().take(ELEMENTS_HASH_SAMPLE).collect();
        self.loop_detector.record_page_state(
            &browser_state.url,
            &sample,
            browser_state.element_count,
        );

        // 2. Reason
        let nudge = self.loop_detector.get_nudge_message();
        let budget_warning = MessageManager::budget_warning(step, self.config.max_steps);
        let messages = self.message_manager.build_messages(
            &self.config.task,
            step,
            self.config.max_steps,
            today(),
            &browser_state,
            nudge.as_deref(),
            budget_warning.as_deref(),
        );

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: 0.3,
            max_tokens: 4096,
            json_mode: true,
        };

        let brain = match self.llm.complete(request).await {
            Ok(response) => parse_brain(&response.content),
            Err(err) => {
                tracing::warn!(task_id = %self.state.task_id, step, %err, "llm call failed");
                None
            }
        };

        let mut brain = match brain {
            Some(brain) => brain,
            None => {
                tracing::debug!(task_id = %self.state.task_id, step, "no usable brain from llm output");
                self.state.consecutive_failures += 1;
                self.message_manager.add_step_result(step, None, &[]);
                self.state.n_steps += 1;
                return self.check_failure_threshold();
            }
        };

        self.emit(AgentEvent::Thinking {
            task_id: self.state.task_id.clone(),
            step_number: step,
            thinking: brain.thinking.clone(),
        });

        // 3. Cap
        if brain.action.len() > self.config.max_actions_per_step {
            brain.action.truncate(self.config.max_actions_per_step);
        }

        // 5 (recording happens pre-execution, for every issued action).
        for action in &brain.action {
            if let Some(tool) = action.tool_name() {
                self.loop_detector.record_action(tool, action.params());
            }
        }

        // 4. Act
        let (results, done_outcome) = self.execute_actions(step, &brain.action).await;

        self.message_manager.add_step_result(step, Some(&brain), &results);
        self.state.last_model_output = Some(brain);
        self.state.last_result = results.last().cloned();

        self.emit(AgentEvent::StepComplete {
            task_id: self.state.task_id.clone(),
            step_number: step,
        });

        if let Some((success, text)) = done_outcome {
            self.state.n_steps += 1;
            tracing::info!(task_id = %self.state.task_id, success, "agent run done");
            self.emit(AgentEvent::Done {
                task_id: self.state.task_id.clone(),
                step_number: step,
                success,
                text: text.clone(),
            });
            return Some(AgentOutcome::Done { success, text });
        }

        // 6. Check terminal conditions
        let has_error = results.iter().any(|r| r.error.is_some());
        if has_error && results.len() == 1 {
            self.state.consecutive_failures += 1;
        } else if !has_error {
            self.state.consecutive_failures = 0;
        }
        // A multi-action step with at least one error neither increments nor
        // resets the counter (ambiguous in the source design; see DESIGN.md).

        if self.config.enable_compaction {
            self.message_manager
                .maybe_compact(
                    step,
                    self.config.compact_every_n_steps,
                    self.config.compact_trigger_chars,
                    &*self.llm,
                    &self.config.model,
                )
                .await;
        }

        self.state.n_steps += 1;
        self.check_failure_threshold()
    }

    async fn fail_step(&mut self, step: usize, message: String) -> Option<AgentOutcome> {
        self.state.consecutive_failures += 1;
        self.message_manager.add_step_error(step, message);
        self.state.n_steps += 1;
        self.check_failure_threshold()
    }

    fn check_failure_threshold(&mut self) -> Option<AgentOutcome> {
        if self.state.consecutive_failures >= self.config.max_failures {
            let message = format!(
                "Agent stopped after {} consecutive failing steps.",
                self.state.consecutive_failures
            );
            tracing::warn!(task_id = %self.state.task_id, %message, "agent run ended in failure");
            self.emit(AgentEvent::Error {
                task_id: self.state.task_id.clone(),
                step_number: self.state.n_steps,
                message: message.clone(),
                fatal: false,
                data: None,
            });
            return Some(AgentOutcome::Error { message });
        }
        None
    }

    /// Executes the capped action list in order, stopping after a
    /// page-changing tool per the suppression rule in the glossary.
    async fn execute_actions(
        &self,
        step: usize,
        actions: &[AgentAction],
    ) -> (Vec<AgentActionResult>, Option<(bool, String)>) {
        let mut results = Vec::new();
        let n_actions = actions.len();

        for (i, action) in actions.iter().enumerate() {
            let tool = action.tool_name().unwrap_or("").to_string();

            if tool == "done" {
                let text = action
                    .params()
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let success = action
                    .params()
                    .get("success")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let result = AgentActionResult::done(success, text.clone());
                self.emit(AgentEvent::ActionExecuted {
                    task_id: self.state.task_id.clone(),
                    step_number: step,
                    result: result.clone(),
                });
                results.push(result);
                return (results, Some((success, text)));
            }

            let outcome = self
                .tool_executor
                .execute(ToolCall {
                    tool: tool.clone(),
                    params: action.params().clone(),
                })
                .await;
            let result = map_outcome(&tool, outcome);
            if !result.success {
                tracing::warn!(
                    task_id = %self.state.task_id,
                    step,
                    tool = %tool,
                    error = result.error.as_deref().unwrap_or(""),
                    "tool call failed"
                );
            }
            self.emit(AgentEvent::ActionExecuted {
                task_id: self.state.task_id.clone(),
                step_number: step,
                result: result.clone(),
            });
            results.push(result);

            if is_page_changing(&tool) {
                if i + 1 < n_actions {
                    tokio::time::sleep(POST_NAVIGATION_DELAY).await;
                }
                break;
            }
        }

        (results, None)
    }
}

fn parse_brain(content: &str) -> Option<AgentBrain> {
    let brain: AgentBrain = serde_json::from_str(content).ok()?;
    if brain.action.is_empty() {
        None
    } else {
        Some(brain)
    }
}

fn map_outcome(tool: &str, outcome: ToolCallOutcome) -> AgentActionResult {
    if !outcome.success {
        return AgentActionResult::error(tool, outcome.error.unwrap_or_else(|| "tool failed".to_string()));
    }
    let mut result = AgentActionResult {
        tool_name: tool.to_string(),
        description: None,
        extracted_content: None,
        extracted_image: None,
        error: None,
        is_done: false,
        success: true,
    };
    match outcome.data {
        Some(Value::String(text)) => result.extracted_content = Some(text),
        Some(Value::Object(map)) => {
            if let Some(url) = map.get("imageUrl").and_then(Value::as_str) {
                result.extracted_image = Some(url.to_string());
            }
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                let truncated: String = text.chars().take(2000).collect();
                result.extracted_content = Some(truncated);
            }
            if let Some(description) = map.get("description").and_then(Value::as_str) {
                result.description = Some(description.to_string());
            }
        }
        _ => {}
    }
    result
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser_host::{MockPageHandle, SinglePageProvider};
    use crate::events::ChannelEventListener;
    use crate::llm_client::MockLlmClient;
    use crate::tool_executor::MockToolExecutor;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn page_with(elements_text: &str) -> Arc<dyn PageProvider> {
        let page = Arc::new(MockPageHandle {
            extraction_result: json!({
                "url": "https://example.com",
                "title": "Example",
                "stats": {"links": 1, "interactive": 1, "iframes": 0, "images": 0, "total_elements": 40},
                "scroll": {"pages_above": 0.0, "pages_below": 0.0, "pixels_above": 0, "pixels_below": 0},
                "elements_text": elements_text,
                "element_count": 1,
            }),
            screenshot: None,
            url: "https://example.com".into(),
        });
        Arc::new(SinglePageProvider::new(page))
    }

    fn runner_with(llm: MockLlmClient, elements_text: &str) -> AgentRunner {
        let config = AgentConfig::new("buy milk", "gpt-4o").unwrap();
        let (listener, _rx) = ChannelEventListener::new();
        AgentRunner::new(
            config,
            page_with(elements_text),
            Arc::new(MockToolExecutor::new()),
            Arc::new(llm),
            Arc::new(listener),
        )
    }

    #[tokio::test]
    async fn immediate_done_terminates_with_success() {
        let llm = MockLlmClient::new();
        llm.queue_text(
            r#"{"thinking":"t","evaluation_previous_goal":"none yet","memory":"m","next_goal":"finish","action":[{"done":{"text":"42","success":true}}]}"#,
        );
        let runner = runner_with(llm, "[1]<a>Home</a>");
        let outcome = runner.run().await;
        match outcome {
            AgentOutcome::Done { success, text } => {
                assert!(success);
                assert_eq!(text, "42");
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_llm_output_counts_as_failure_and_eventually_ends_the_run() {
        let llm = MockLlmClient::new();
        for _ in 0..5 {
            llm.queue_text("not json");
        }
        let runner = runner_with(llm, "[1]<a>Home</a>");
        let outcome = runner.run().await;
        assert!(matches!(outcome, AgentOutcome::Error { .. }));
    }

    #[tokio::test]
    async fn page_changing_action_suppresses_the_rest_of_the_step() {
        let llm = MockLlmClient::new();
        llm.queue_text(
            r#"{"thinking":"t","evaluation_previous_goal":"none yet","memory":"m","next_goal":"click then type","action":[{"click-element":{"index":3}},{"type-text":{"index":5,"text":"x"}}]}"#,
        );
        llm.queue_text(r#"{"thinking":"t","evaluation_previous_goal":"ok","memory":"m","next_goal":"finish","action":[{"done":{"text":"done","success":true}}]}"#);

        let config = AgentConfig::new("buy milk", "gpt-4o").unwrap();
        let (listener, mut rx) = ChannelEventListener::new();
        let tool_executor = Arc::new(MockToolExecutor::new());
        let runner = AgentRunner::new(
            config,
            page_with("[1]<a>Home</a>"),
            tool_executor.clone(),
            Arc::new(llm),
            Arc::new(listener),
        );
        let handle = tokio::spawn(runner.run());

        let mut action_executed_count = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, AgentEvent::ActionExecuted { .. }) {
                action_executed_count += 1;
            }
            if event.is_terminal() {
                break;
            }
        }
        handle.await.unwrap();
        // Step 0: only the click (page-changing) executes; the type-text is
        // suppressed. Step 1: the done action. Total = 2.
        assert_eq!(action_executed_count, 2);
        assert_eq!(tool_executor.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_flag_produces_exactly_one_stopped_event() {
        let llm = MockLlmClient::new();
        let runner = runner_with(llm, "[1]<a>Home</a>");
        let stop_flag = runner.stop_flag();
        stop_flag.store(true, Ordering::SeqCst);
        let outcome = runner.run().await;
        assert!(matches!(outcome, AgentOutcome::Stopped));
    }

    #[tokio::test]
    async fn disabling_compaction_skips_it_even_past_both_triggers() {
        let llm = MockLlmClient::new();
        for _ in 0..3 {
            llm.queue_text(r#"{"thinking":"t","evaluation_previous_goal":"ok","memory":"m","next_goal":"keep going","action":[{"scroll":{"direction":"down"}}]}"#);
        }
        let mut config = AgentConfig::new("buy milk", "gpt-4o").unwrap();
        config.max_steps = 3;
        config.enable_compaction = false;
        config.compact_every_n_steps = 1;
        config.compact_trigger_chars = 1;
        let (listener, _rx) = ChannelEventListener::new();
        let mut runner = AgentRunner::new(
            config,
            page_with("[1]<a>Home</a>"),
            Arc::new(MockToolExecutor::new()),
            Arc::new(llm),
            Arc::new(listener),
        );
        while runner.run_step().await.is_none() {}
        assert_eq!(runner.message_manager.compaction_count(), 0);
    }

    #[tokio::test]
    async fn max_steps_without_done_ends_with_unsuccessful_done_event() {
        let llm = MockLlmClient::new();
        let config_max_steps = 2;
        for _ in 0..config_max_steps {
            llm.queue_text(r#"{"thinking":"t","evaluation_previous_goal":"ok","memory":"m","next_goal":"keep going","action":[{"scroll":{"direction":"down"}}]}"#);
        }
        let mut config = AgentConfig::new("buy milk", "gpt-4o").unwrap();
        config.max_steps = config_max_steps;
        let (listener, _rx) = ChannelEventListener::new();
        let runner = AgentRunner::new(
            config,
            page_with("[1]<a>Home</a>"),
            Arc::new(MockToolExecutor::new()),
            Arc::new(llm),
            Arc::new(listener),
        );
        let outcome = runner.run().await;
        match outcome {
            AgentOutcome::Done { success, text } => {
                assert!(!success);
                assert!(text.contains("maximum steps"));
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }
}
