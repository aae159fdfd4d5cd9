//! A small CLI that runs one agent task against the reference mock
//! drivers — a real `Browser Host` and `Tool Executor` are out of scope for
//! this crate, so this binary demonstrates the control loop rather than
//! driving an actual browser.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use browser_agent_core::browser_host::{MockPageHandle, SinglePageProvider};
use browser_agent_core::events::{AgentEvent, ChannelEventListener};
use browser_agent_core::llm_client::OpenAiCompatibleClient;
use browser_agent_core::tool_executor::MockToolExecutor;
use browser_agent_core::AgentConfig;

#[derive(Parser, Debug)]
#[command(name = "browser-agent", about = "Run one browser-automation agent task")]
struct Cli {
    /// The natural-language task for the agent to accomplish.
    task: String,

    /// Model id passed to the LLM backend.
    #[arg(long, default_value = "gpt-4o")]
    model: String,

    /// Base URL of an OpenAI-compatible chat-completions endpoint.
    #[arg(long, default_value = "https://api.openai.com/v1")]
    llm_base_url: String,

    /// API key for the LLM backend. Falls back to `OPENAI_API_KEY`.
    #[arg(long)]
    api_key: Option<String>,

    /// The page URL reported by the mock page handle.
    #[arg(long, default_value = "https://example.com")]
    start_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let api_key = cli
        .api_key
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .context("no API key given (pass --api-key or set OPENAI_API_KEY)")?;

    let config = AgentConfig::new(cli.task, cli.model)?;

    let page = Arc::new(MockPageHandle {
        extraction_result: json!({
            "url": cli.start_url.clone(),
            "title": "Demo Page",
            "stats": {"links": 0, "interactive": 0, "iframes": 0, "images": 0, "total_elements": 1},
            "scroll": {"pages_above": 0.0, "pages_below": 0.0, "pixels_above": 0, "pixels_below": 0},
            "elements_text": "",
            "element_count": 0,
        }),
        screenshot: None,
        url: cli.start_url,
    });
    let page_provider = Arc::new(SinglePageProvider::new(page));
    let tool_executor = Arc::new(MockToolExecutor::new());
    let llm = Arc::new(OpenAiCompatibleClient::new(cli.llm_base_url, api_key, Duration::from_secs(60)));
    let (listener, mut events) = ChannelEventListener::new();

    let task_id =
        browser_agent_core::start_agent_task(config, page_provider, tool_executor, llm, Arc::new(listener));
    tracing::info!(%task_id, "agent task started");

    while let Some(event) = events.recv().await {
        match &event {
            AgentEvent::StepStart { step_number, .. } => tracing::info!(step_number, "step start"),
            AgentEvent::Thinking { thinking, .. } => tracing::info!(%thinking, "thinking"),
            AgentEvent::ActionExecuted { result, .. } => {
                tracing::info!(tool = %result.tool_name, success = result.success, "action executed")
            }
            AgentEvent::Done { success, text, .. } => {
                println!("done: success={success} text={text}");
            }
            AgentEvent::Error { message, .. } => println!("error: {message}"),
            AgentEvent::Stopped { .. } => println!("stopped"),
            AgentEvent::StepComplete { .. } => {}
        }
        if event.is_terminal() {
            break;
        }
    }

    Ok(())
}
