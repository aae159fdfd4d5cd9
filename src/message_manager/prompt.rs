//! The fixed system prompt and per-step state message assembly.

use super::history::HistoryItem;
use crate::llm_client::ContentPart;
use crate::state_extractor::BrowserStateSummary;
use crate::tool_executor::TOOL_CATALOGUE;
use chrono::NaiveDate;

/// The fixed system prompt, parameterised only by `max_actions_per_step`.
pub fn system_prompt(max_actions_per_step: usize) -> String {
    let tool_list = TOOL_CATALOGUE.join(", ");
    format!(
        "You are a browser-automation agent. You observe a page, reason about \
it, then act, repeating this loop until the task is complete.\n\n\
Each turn you receive an <input> block made of <agent_history>, <agent_state>, \
<browser_state>, and optionally a screenshot and a <system_nudge>.\n\n\
Available tools: {tool_list}.\n\n\
Action rules: issue up to {max_actions_per_step} actions per step, executed \
sequentially. Any page-changing action (navigate, go-back, click-element) must \
be the last action in the list, because the executor stops running further \
actions once the page changes. Do not repeat a failing action more than 2-3 \
times.\n\n\
Done rules: `done` must be the only action in a step that uses it. Set \
`success` to true only when the task is fully complete. Put all findings in \
`text`.\n\n\
Output rules: respond with a JSON object with exactly the fields `thinking`, \
`evaluation_previous_goal`, `memory`, `next_goal`, and `action` (a non-empty \
array of single-key tool-name to parameters mappings)."
    )
}

pub struct StateMessageInput<'a> {
    pub task: &'a str,
    pub step_number: usize,
    pub max_steps: usize,
    pub today: NaiveDate,
    pub browser_state: &'a BrowserStateSummary,
    pub compacted_memory: Option<&'a str>,
    pub history_items: &'a [HistoryItem],
    pub nudge: Option<&'a str>,
    pub budget_warning: Option<&'a str>,
}

/// Assembles the per-step user message as a mixed text/image content
/// sequence, per 4.3.
pub fn build_state_message(input: StateMessageInput) -> Vec<ContentPart> {
    let mut parts = Vec::new();
    let mut buffer = String::from("<agent_history>\n");

    if let Some(memory) = input.compacted_memory {
        buffer.push_str("<compacted_memory>\n");
        buffer.push_str(memory);
        buffer.push_str("\n</compacted_memory>\n");
    }

    for item in input.history_items {
        buffer.push_str(&item.render());
        buffer.push('\n');
        if !item.image_urls.is_empty() {
            parts.push(ContentPart::Text(std::mem::take(&mut buffer)));
            for url in &item.image_urls {
                parts.push(ContentPart::ImageUrl(url.clone()));
            }
        }
    }
    buffer.push_str("</agent_history>\n\n");

    buffer.push_str("<agent_state>\n");
    buffer.push_str(input.task);
    buffer.push('\n');
    buffer.push_str(&format!(
        "<step_info>Step {} of {}. Today: {}</step_info>\n",
        input.step_number + 1,
        input.max_steps,
        input.today.format("%Y-%m-%d")
    ));
    buffer.push_str("</agent_state>\n\n");

    buffer.push_str(&render_browser_state(input.browser_state));

    if let Some(nudge) = input.nudge {
        buffer.push_str("\n\n<system_nudge>\n");
        buffer.push_str(nudge);
        if let Some(warning) = input.budget_warning {
            buffer.push_str("\n\n");
            buffer.push_str(warning);
        }
        buffer.push_str("\n</system_nudge>");
    } else if let Some(warning) = input.budget_warning {
        buffer.push_str("\n\n<system_nudge>\n");
        buffer.push_str(warning);
        buffer.push_str("\n</system_nudge>");
    }

    parts.push(ContentPart::Text(buffer));

    if let Some(screenshot) = &input.browser_state.screenshot {
        parts.push(ContentPart::Text("Current screenshot:".to_string()));
        parts.push(ContentPart::ImageUrl(screenshot.clone()));
    }

    parts
}

/// Renders `<browser_state>` per 4.3 point 3.
fn render_browser_state(state: &BrowserStateSummary) -> String {
    let mut out = String::from("<browser_state>\n<page_stats>\n");
    if state.stats.total_elements < 10 {
        out.push_str("Page appears empty (SPA not loaded?) - ");
    }
    out.push_str(&format!(
        "{} links, {} interactive, {} iframes, {} images, {} total elements\n</page_stats>\n",
        state.stats.links, state.stats.interactive, state.stats.iframes, state.stats.images, state.stats.total_elements
    ));
    out.push_str(&format!("URL: {}\nTitle: {}\n", state.url, state.title));
    out.push_str(&format!(
        "<page_info>\n{:.1} pages above, {:.1} pages below ({} px above, {} px below)\n</page_info>\n",
        state.scroll.pages_above, state.scroll.pages_below, state.scroll.pixels_above, state.scroll.pixels_below
    ));

    let mut listing = if state.elements_text.is_empty() {
        "empty page".to_string()
    } else {
        state.elements_text.clone()
    };
    if state.scroll.pages_above <= 0.0 {
        listing = format!("[Start of page]\n{listing}");
    }
    if state.scroll.pages_below <= 0.0 {
        listing = format!("{listing}\n[End of page]");
    }
    out.push_str(&listing);
    out.push_str("\n</browser_state>");
    out
}
