//! LLM-assisted history compaction.

pub const COMPACTION_SYSTEM_PROMPT: &str = "Summarise for prompt compaction: capture task \
requirements, key facts, decisions, partial progress, errors, and next steps. Preserve \
entities, values, URLs, and file paths. Respond in plain text, at most 6000 characters.";

pub const COMPACTION_MAX_CHARS: usize = 6000;

/// Builds the user-message content for the compaction call: the previous
/// compacted memory (if any) wrapped in `<previous_compacted_memory>`, plus
/// the full history text wrapped in `<agent_history>`.
pub fn build_compaction_input(previous_memory: Option<&str>, history_text: &str) -> String {
    let mut input = String::new();
    if let Some(memory) = previous_memory {
        input.push_str("<previous_compacted_memory>\n");
        input.push_str(memory);
        input.push_str("\n</previous_compacted_memory>\n\n");
    }
    input.push_str("<agent_history>\n");
    input.push_str(history_text);
    input.push_str("\n</agent_history>");
    input
}

/// Hard-truncates a compaction summary to [`COMPACTION_MAX_CHARS`], appending
/// an ellipsis when truncated.
pub fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= COMPACTION_MAX_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(COMPACTION_MAX_CHARS).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_input_includes_previous_memory_when_present() {
        let input = build_compaction_input(Some("earlier facts"), "step history");
        assert!(input.contains("<previous_compacted_memory>"));
        assert!(input.contains("earlier facts"));
        assert!(input.contains("<agent_history>"));
    }

    #[test]
    fn build_input_omits_previous_memory_block_when_absent() {
        let input = build_compaction_input(None, "step history");
        assert!(!input.contains("previous_compacted_memory"));
    }

    #[test]
    fn truncate_summary_appends_ellipsis_past_limit() {
        let long = "a".repeat(COMPACTION_MAX_CHARS + 10);
        let truncated = truncate_summary(&long);
        assert_eq!(truncated.chars().count(), COMPACTION_MAX_CHARS + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn short_summary_is_untouched() {
        assert_eq!(truncate_summary("short"), "short");
    }
}
