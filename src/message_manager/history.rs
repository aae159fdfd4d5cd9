//! History items and the per-action-result formatting rules.

use crate::agent::AgentActionResult;

/// One entry in the conversation history. Append-only except during
/// compaction, which may replace a prefix with a single summarised entry.
#[derive(Debug, Clone)]
pub struct HistoryItem {
    pub step_number: usize,
    pub evaluation: Option<String>,
    pub memory: Option<String>,
    pub next_goal: Option<String>,
    /// Pre-formatted block built from this step's action results.
    pub action_results: Option<String>,
    pub image_urls: Vec<String>,
    /// Exclusive with the structured fields above.
    pub error: Option<String>,
    /// Exclusive with the structured fields above.
    pub system_message: Option<String>,
}

impl HistoryItem {
    pub fn seed() -> Self {
        Self {
            step_number: 0,
            evaluation: None,
            memory: None,
            next_goal: None,
            action_results: None,
            image_urls: Vec::new(),
            error: None,
            system_message: Some("Agent initialized".to_string()),
        }
    }

    pub fn null_output(step_number: usize) -> Self {
        Self {
            step_number,
            evaluation: None,
            memory: None,
            next_goal: None,
            action_results: None,
            image_urls: Vec::new(),
            error: Some("Agent failed to output valid JSON.".to_string()),
            system_message: None,
        }
    }

    pub fn step_error(step_number: usize, message: impl Into<String>) -> Self {
        Self {
            step_number,
            evaluation: None,
            memory: None,
            next_goal: None,
            action_results: None,
            image_urls: Vec::new(),
            error: Some(format!("[step-error] {}", message.into())),
            system_message: None,
        }
    }

    /// Renders this item as `<step_K>\n<evaluation>\n<memory>\n<nextGoal>\n<actionResults>`,
    /// omitting empty fields.
    pub fn render(&self) -> String {
        if let Some(system_message) = &self.system_message {
            return format!("<step_{}>\n{}", self.step_number, system_message);
        }
        if let Some(error) = &self.error {
            return format!("<step_{}>\n{}", self.step_number, error);
        }
        let mut lines = Vec::new();
        if let Some(evaluation) = &self.evaluation {
            lines.push(evaluation.clone());
        }
        if let Some(memory) = &self.memory {
            lines.push(memory.clone());
        }
        if let Some(next_goal) = &self.next_goal {
            lines.push(next_goal.clone());
        }
        if let Some(action_results) = &self.action_results {
            lines.push(action_results.clone());
        }
        format!("<step_{}>\n{}", self.step_number, lines.join("\n"))
    }
}

fn truncate_middle(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let half = max_len / 2;
    let chars: Vec<char> = text.chars().collect();
    let first: String = chars[..half].iter().collect();
    let last: String = chars[chars.len() - half..].iter().collect();
    format!("{first}...{last}")
}

fn truncate_end(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

/// Formats one executed action's result per the rules in 4.3, in priority
/// order: error, then done, then image, then description-only, then text,
/// then a generic "OK".
pub fn format_action_result(result: &AgentActionResult) -> String {
    if let Some(error) = &result.error {
        return format!("[{}] Error: {}", result.tool_name, truncate_middle(error, 200));
    }
    if result.is_done {
        return format!(
            "[done] Task completed. Success: {}\nResult: {}",
            result.success,
            truncate_end(result.extracted_content.as_deref().unwrap_or(""), 500)
        );
    }
    if result.extracted_image.is_some() {
        let description = result.description.as_deref().unwrap_or("");
        return format!("[{}] {}\n", result.tool_name, description);
    }
    if let Some(description) = &result.description {
        if result.extracted_content.is_none() {
            return format!("[{}] {}", result.tool_name, description);
        }
    }
    if let Some(text) = &result.extracted_content {
        return format!("[{}] {}", result.tool_name, truncate_end(text, 300));
    }
    format!("[{}] OK", result.tool_name)
}

/// Joins all of a step's per-action blocks, producing `actionResults`
/// prefixed with `"Result:\n"` and trimmed, plus the image URLs to retain.
pub fn build_action_results(results: &[AgentActionResult]) -> (Option<String>, Vec<String>) {
    if results.is_empty() {
        return (None, Vec::new());
    }
    let mut images = Vec::new();
    let lines: Vec<String> = results
        .iter()
        .map(|r| {
            if let Some(image) = &r.extracted_image {
                images.push(image.clone());
            }
            format_action_result(r)
        })
        .collect();
    let block = format!("Result:\n{}", lines.join("\n")).trim().to_string();
    (Some(block), images)
}
