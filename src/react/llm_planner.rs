//! LLM 规划器：把工具目录与任务交给 LlmClient，解析返回的 JSON 步骤数组

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::{LlmClient, Message};
use crate::react::planner::{parse_plan, Plan, Planner};
use crate::tools::{catalog_schema_json, ToolSummary};

const SYSTEM_PROMPT: &str = "You are an AI agent planner. Create a step-by-step execution plan \
using only the available tools. Each step is an object with \"tool\", \"params\" and \
\"description\". Parameter names and types must follow each tool's parameter schema. \
Return ONLY a JSON array, no other text. If the task cannot be done with the available \
tools, return [].";

pub struct LlmPlanner {
    llm: Arc<dyn LlmClient>,
}

impl LlmPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn build_prompt(task: &str, catalog: &[ToolSummary]) -> Vec<Message> {
        let user = format!(
            "Available tools:\n{}\n\nTask: {}\n\nExample valid response:\n\
             [{{\"tool\": \"calculator\", \"params\": {{\"operation\": \"add\", \"a\": 150, \"b\": 250}}, \"description\": \"Add 150 and 250\"}}]",
            catalog_schema_json(catalog),
            task
        );
        vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn create_plan(&self, task: &str, catalog: &[ToolSummary]) -> Result<Plan, AgentError> {
        tracing::debug!(task, tools = catalog.len(), "llm planning request");
        let reply = self
            .llm
            .complete(&Self::build_prompt(task, catalog))
            .await
            .map_err(AgentError::LlmError)?;

        let plan = parse_plan(&reply).map_err(|e| {
            tracing::error!(error = %e, "llm plan parse error");
            e
        })?;

        if let Some(step) = plan
            .iter()
            .find(|s| !catalog.iter().any(|t| t.name == s.tool))
        {
            return Err(AgentError::Planning(format!(
                "plan references unknown tool: {}",
                step.tool
            )));
        }

        tracing::info!(steps = plan.len(), task, "llm plan created");
        Ok(plan)
    }
}
