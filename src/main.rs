//! agentic - 对单个任务运行执行引擎
//!
//! 用法：`agentic <task...>`，结果（RunResult）以 JSON 打印到 stdout，日志写 stderr。

use anyhow::{bail, Context};
use agentic::{agent::create_agent_components, config::load_config, observability};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let task = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if task.trim().is_empty() {
        bail!("usage: agentic <task...>");
    }

    let cfg = load_config(None).context("Failed to load config")?;
    let components = create_agent_components(&cfg)
        .await
        .context("Failed to create agent")?;

    let outcome = components.engine.execute(&task, None, None).await;
    components.dispatcher.stop().await;

    let run = outcome.context("Agent execution failed")?;
    println!("{}", serde_json::to_string_pretty(&run)?);
    if !run.success {
        std::process::exit(1);
    }
    Ok(())
}
