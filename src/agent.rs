//! 组件装配
//!
//! create_agent_components 按配置构建已启动的 Dispatcher（注册全部内置工具）
//! 与使用所配置规划器的 ExecutionEngine，供 CLI 与集成测试共用。

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{AppConfig, PlannerKind};
use crate::core::AgentError;
use crate::dispatcher::Dispatcher;
use crate::llm::{LlmClient, OpenAiClient};
use crate::react::{ExecutionEngine, KeywordPlanner, LlmPlanner, Planner};
use crate::tools::{CalculatorTool, EchoTool, FileTool, HttpTool, JsonProcessorTool};

/// 预构建的组件：Dispatcher 可被多个引擎共享
pub struct AgentComponents {
    pub dispatcher: Arc<Dispatcher>,
    pub engine: ExecutionEngine,
}

/// file_tool 的沙箱根目录：配置优先，否则 ./workspace（不存在则创建）
pub fn workspace_root(cfg: &AppConfig) -> Result<PathBuf, AgentError> {
    let root = cfg
        .tools
        .filesystem_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("workspace"));
    std::fs::create_dir_all(&root)
        .map_err(|e| AgentError::ConfigError(format!("workspace {}: {}", root.display(), e)))?;
    Ok(root)
}

/// 注册内置工具：calculator、echo、json_processor、file_tool、http_client
pub async fn register_builtin_tools(
    dispatcher: &Dispatcher,
    cfg: &AppConfig,
) -> Result<(), AgentError> {
    let root = workspace_root(cfg)?;
    dispatcher.register(CalculatorTool::new()).await?;
    dispatcher.register(EchoTool::new()).await?;
    dispatcher.register(JsonProcessorTool::new()).await?;
    dispatcher.register(FileTool::new(&root)).await?;
    dispatcher
        .register(HttpTool::new(
            cfg.tools.http.allowed_domains.clone(),
            cfg.tools.http.timeout_secs,
        ))
        .await?;
    Ok(())
}

/// 按 [agent].planner 选择规划器；llm 但没有 OPENAI_API_KEY 时退回关键词规划
pub fn create_planner(cfg: &AppConfig) -> Arc<dyn Planner> {
    match cfg.agent.planner {
        PlannerKind::Llm if std::env::var("OPENAI_API_KEY").is_ok() => {
            tracing::info!(model = %cfg.llm.model, provider = %cfg.llm.provider, "Using LLM planner");
            let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::from_config(&cfg.llm));
            Arc::new(LlmPlanner::new(llm))
        }
        PlannerKind::Llm => {
            tracing::warn!("No API key set, using keyword planner");
            Arc::new(KeywordPlanner::new())
        }
        PlannerKind::Keyword => Arc::new(KeywordPlanner::new()),
    }
}

/// 创建组件：Dispatcher 已注册内置工具并启动健康巡检
pub async fn create_agent_components(cfg: &AppConfig) -> Result<AgentComponents, AgentError> {
    let dispatcher = Arc::new(Dispatcher::new(cfg.dispatcher.clone()));
    register_builtin_tools(&dispatcher, cfg).await?;
    dispatcher.start();

    let engine = ExecutionEngine::new(cfg.agent.clone(), dispatcher.clone(), create_planner(cfg));
    Ok(AgentComponents { dispatcher, engine })
}
