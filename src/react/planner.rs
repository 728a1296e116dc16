//! Planner：把任务文本变成有序的工具调用步骤
//!
//! 执行引擎只依赖 Planner trait，不关心规划是关键词匹配还是 LLM 推理；
//! 空计划表示"无可执行方案"。parse_plan 从 LLM 文本中提取 JSON 数组并解析为 Plan。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::ToolSummary;

/// 计划中的一步：{"tool": "calculator", "params": {...}, "description": "..."}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub tool: String,
    #[serde(default = "empty_params", alias = "args")]
    pub params: Value,
    #[serde(default)]
    pub description: String,
}

fn empty_params() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Step {
    pub fn new(tool: impl Into<String>, params: Value, description: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            params,
            description: description.into(),
        }
    }
}

/// 有序步骤列表，可以为空
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }
}

impl From<Vec<Step>> for Plan {
    fn from(steps: Vec<Step>) -> Self {
        Self::new(steps)
    }
}

impl IntoIterator for Plan {
    type Item = Step;
    type IntoIter = std::vec::IntoIter<Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// 规划器 trait；只能引用 catalog 中存在的工具
#[async_trait]
pub trait Planner: Send + Sync {
    async fn create_plan(&self, task: &str, catalog: &[ToolSummary]) -> Result<Plan, AgentError>;
}

/// 固定计划：忽略任务文本，总是返回同一计划（评测与回放场景）
#[derive(Debug, Clone, Default)]
pub struct StaticPlanner {
    plan: Plan,
}

impl StaticPlanner {
    pub fn new(plan: impl Into<Plan>) -> Self {
        Self { plan: plan.into() }
    }
}

#[async_trait]
impl Planner for StaticPlanner {
    async fn create_plan(&self, _task: &str, _catalog: &[ToolSummary]) -> Result<Plan, AgentError> {
        Ok(self.plan.clone())
    }
}

/// 解析 LLM 输出：支持 ```json ... ``` 代码块或夹杂文字的裸 JSON 数组
pub fn parse_plan(output: &str) -> Result<Plan, AgentError> {
    let trimmed = output.trim();

    let body = if let Some(start) = trimmed.find("```") {
        let rest = &trimmed[start + 3..];
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.find("```").map(|end| &rest[..end]).unwrap_or(rest).trim()
    } else {
        trimmed
    };

    let json_str = match (body.find('['), body.rfind(']')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => {
            return Err(AgentError::Planning(format!(
                "no JSON array in planner output: {}",
                preview(trimmed)
            )))
        }
    };

    let steps: Vec<Step> = serde_json::from_str(json_str)
        .map_err(|e| AgentError::Planning(format!("{}: {}", e, preview(json_str))))?;
    Ok(Plan::new(steps))
}

fn preview(s: &str) -> String {
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s.to_string()
    }
}
