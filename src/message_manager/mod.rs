//! Message Manager: owns the full conversation context presented to the
//! LLM — history, prompt assembly, and LLM-driven compaction.

mod compaction;
mod history;
mod prompt;

pub use history::HistoryItem;
pub use prompt::{build_state_message, system_prompt, StateMessageInput};

use crate::agent::AgentActionResult;
use crate::llm_client::{ChatMessage, CompletionRequest, ContentPart, LlmClient};
use crate::state_extractor::BrowserStateSummary;
use chrono::NaiveDate;

/// Retained tail length after compaction: seed entry plus the last 6.
const RETAINED_AFTER_COMPACTION: usize = 6;

pub struct MessageManager {
    items: Vec<HistoryItem>,
    compacted_memory: Option<String>,
    compaction_count: usize,
    last_compaction_step: usize,
    max_actions_per_step: usize,
}

impl MessageManager {
    pub fn new(max_actions_per_step: usize) -> Self {
        Self {
            items: vec![HistoryItem::seed()],
            compacted_memory: None,
            compaction_count: 0,
            last_compaction_step: 0,
            max_actions_per_step,
        }
    }

    pub fn history_len(&self) -> usize {
        self.items.len()
    }

    pub fn compaction_count(&self) -> usize {
        self.compaction_count
    }

    pub fn compacted_memory(&self) -> Option<&str> {
        self.compacted_memory.as_deref()
    }

    /// Appends one step's result to history per the rules in 4.3.
    pub fn add_step_result(
        &mut self,
        step_number: usize,
        brain: Option<&crate::agent::AgentBrain>,
        results: &[AgentActionResult],
    ) {
        let item = match brain {
            None => HistoryItem::null_output(step_number),
            Some(brain) => {
                let (action_results, image_urls) = history::build_action_results(results);
                HistoryItem {
                    step_number,
                    evaluation: non_empty(&brain.evaluation_previous_goal),
                    memory: non_empty(&brain.memory),
                    next_goal: non_empty(&brain.next_goal),
                    action_results,
                    image_urls,
                    error: None,
                    system_message: None,
                }
            }
        };
        self.items.push(item);
    }

    pub fn add_step_error(&mut self, step_number: usize, message: impl Into<String>) {
        self.items.push(HistoryItem::step_error(step_number, message));
    }

    /// The system prompt sent once per LLM call.
    pub fn system_prompt(&self) -> String {
        prompt::system_prompt(self.max_actions_per_step)
    }

    /// Builds the full message list for one step's LLM call.
    pub fn build_messages(
        &self,
        task: &str,
        step_number: usize,
        max_steps: usize,
        today: NaiveDate,
        browser_state: &BrowserStateSummary,
        nudge: Option<&str>,
        budget_warning: Option<&str>,
    ) -> Vec<ChatMessage> {
        let state_parts = build_state_message(StateMessageInput {
            task,
            step_number,
            max_steps,
            today,
            browser_state,
            compacted_memory: self.compacted_memory.as_deref(),
            history_items: &self.items,
            nudge,
            budget_warning,
        });
        vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(state_parts),
        ]
    }

    /// Budget warning text, or `None` if under the 0.75 threshold.
    pub fn budget_warning(n_steps: usize, max_steps: usize) -> Option<String> {
        if max_steps == 0 {
            return None;
        }
        let fraction = n_steps as f64 / max_steps as f64;
        if fraction >= 0.75 {
            Some(format!(
                "You have used {:.0}% of your step budget ({n_steps}/{max_steps}). Wrap up the task soon.",
                fraction * 100.0
            ))
        } else {
            None
        }
    }

    fn history_text(&self) -> String {
        self.items
            .iter()
            .map(HistoryItem::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Fires compaction if both gating conditions hold. Never raises;
    /// failures leave state untouched and return `false`.
    pub async fn maybe_compact(
        &mut self,
        n_steps: usize,
        compact_every_n_steps: usize,
        compact_trigger_chars: usize,
        llm: &dyn LlmClient,
        model: &str,
    ) -> bool {
        if n_steps.saturating_sub(self.last_compaction_step) < compact_every_n_steps {
            return false;
        }
        let history_text = self.history_text();
        if history_text.len() < compact_trigger_chars {
            return false;
        }

        let input = compaction::build_compaction_input(self.compacted_memory.as_deref(), &history_text);
        let request = CompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(compaction::COMPACTION_SYSTEM_PROMPT),
                ChatMessage::user(vec![ContentPart::Text(input)]),
            ],
            temperature: 0.3,
            max_tokens: 1024,
            json_mode: false,
        };

        let response = match llm.complete(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%err, n_steps, "history compaction call failed");
                return false;
            }
        };
        if response.content.trim().is_empty() {
            tracing::warn!(n_steps, "history compaction returned empty content");
            return false;
        }

        self.compacted_memory = Some(compaction::truncate_summary(&response.content));
        self.compaction_count += 1;
        self.last_compaction_step = n_steps;

        let seed = self.items[0].clone();
        let tail_start = self.items.len().saturating_sub(RETAINED_AFTER_COMPACTION);
        let mut retained: Vec<HistoryItem> = self.items[tail_start..].to_vec();
        let mut rebuilt = vec![seed];
        rebuilt.append(&mut retained);
        self.items = rebuilt;

        true
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
