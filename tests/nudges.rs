//! Verifies that the Loop Detector's nudges actually reach the LLM via the
//! Message Manager's assembled prompt, per spec scenarios 3 and 4.

use std::sync::Arc;

use browser_agent_core::agent::runner::{AgentOutcome, AgentRunner};
use browser_agent_core::browser_host::{MockPageHandle, SinglePageProvider};
use browser_agent_core::events::ChannelEventListener;
use browser_agent_core::llm_client::{ContentPart, MockLlmClient};
use browser_agent_core::tool_executor::MockToolExecutor;
use browser_agent_core::AgentConfig;
use serde_json::json;

fn page_provider() -> Arc<SinglePageProvider> {
    let page = Arc::new(MockPageHandle {
        extraction_result: json!({
            "url": "https://example.com",
            "title": "Example",
            "stats": {"links": 1, "interactive": 1, "iframes": 0, "images": 0, "total_elements": 40},
            "scroll": {"pages_above": 0.0, "pages_below": 0.0, "pixels_above": 0, "pixels_below": 0},
            "elements_text": "[1]<a>Home</a>[2]<button>Go</button>",
            "element_count": 2,
        }),
        screenshot: None,
        url: "https://example.com".into(),
    });
    Arc::new(SinglePageProvider::new(page))
}

fn click_action() -> String {
    r#"{"thinking":"t","evaluation_previous_goal":"ok","memory":"m","next_goal":"click again","action":[{"click-element":{"index":2}}]}"#.to_string()
}

fn flatten_text(parts: &[ContentPart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::Text(t) => Some(t.as_str()),
            ContentPart::ImageUrl(_) => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

#[tokio::test]
async fn six_identical_clicks_inject_a_repetition_nudge_on_the_next_request() {
    let llm = Arc::new(MockLlmClient::new());
    for _ in 0..7 {
        llm.queue_text(click_action());
    }

    let mut config = AgentConfig::new("click the button repeatedly", "gpt-4o").unwrap();
    config.max_steps = 7;
    let (listener, _rx) = ChannelEventListener::new();
    let runner = AgentRunner::new(
        config,
        page_provider(),
        Arc::new(MockToolExecutor::new()),
        llm.clone(),
        Arc::new(listener),
    );

    let outcome = runner.run().await;
    assert!(matches!(outcome, AgentOutcome::Done { .. }));

    let requests = llm.requests.lock().unwrap();
    // The 7th request (index 6) is built after 6 prior identical clicks have
    // already been recorded by the Loop Detector.
    let seventh_request_text = flatten_text(&requests[6].messages[1].content);
    assert!(seventh_request_text.contains("<system_nudge>"));
    assert!(seventh_request_text.contains("repeated a similar action 6 times"));
}
