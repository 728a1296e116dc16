//! 关键词规划器：不依赖 LLM 的确定性规划
//!
//! 读文件任务（含 read + file 且提到 .txt/.md/.py 文件）→ file_tool；
//! 含算术关键词且至少两个数字 → calculator。只为 catalog 中存在的工具生成步骤。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use crate::core::AgentError;
use crate::react::planner::{Plan, Planner, Step};
use crate::tools::calculator::Operation;
use crate::tools::ToolSummary;

static NUMBER_RE: OnceLock<Regex> = OnceLock::new();

const MATH_KEYWORDS: [&str; 5] = ["add", "subtract", "multiply", "divide", "calculate"];
const FILE_EXTENSIONS: [&str; 3] = [".txt", ".md", ".py"];

#[derive(Debug, Clone, Default)]
pub struct KeywordPlanner;

impl KeywordPlanner {
    pub fn new() -> Self {
        Self
    }

    fn file_step(task: &str) -> Option<Step> {
        let lower = task.to_lowercase();
        if !(lower.contains("read") && lower.contains("file")) {
            return None;
        }
        let word = task
            .split_whitespace()
            .find(|w| FILE_EXTENSIONS.iter().any(|ext| w.contains(ext)))?;
        Some(Step::new(
            "file_tool",
            json!({ "file_path": word }),
            format!("Read {}", word),
        ))
    }

    fn math_step(task: &str) -> Option<Step> {
        let lower = task.to_lowercase();
        if !MATH_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return None;
        }
        let re = NUMBER_RE.get_or_init(|| Regex::new(r"\d+\.?\d*").unwrap());
        let numbers: Vec<&str> = re.find_iter(task).map(|m| m.as_str()).collect();
        if numbers.len() < 2 {
            return None;
        }
        let a: f64 = numbers[0].parse().ok()?;
        let b: f64 = numbers[1].parse().ok()?;
        let op = infer_operation(task, &lower);
        Some(Step::new(
            "calculator",
            json!({ "operation": op.as_str(), "a": a, "b": b }),
            format!("{} {} and {}", op.as_str(), numbers[0], numbers[1]),
        ))
    }
}

fn infer_operation(task: &str, lower: &str) -> Operation {
    if lower.contains("subtract") || task.contains('-') {
        Operation::Subtract
    } else if lower.contains("multiply") || task.contains('*') || lower.contains("times") {
        Operation::Multiply
    } else if lower.contains("divide") || task.contains('/') {
        Operation::Divide
    } else {
        Operation::Add
    }
}

#[async_trait]
impl Planner for KeywordPlanner {
    async fn create_plan(&self, task: &str, catalog: &[ToolSummary]) -> Result<Plan, AgentError> {
        let steps: Vec<Step> = [Self::file_step(task), Self::math_step(task)]
            .into_iter()
            .flatten()
            .filter(|step| catalog.iter().any(|t| t.name == step.tool))
            .collect();

        if steps.is_empty() {
            tracing::warn!(task, available_tools = catalog.len(), "no plan created");
        } else {
            tracing::debug!(task, steps = steps.len(), "keyword plan created");
        }
        Ok(Plan::new(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{CalculatorTool, EchoTool, FileTool, Tool};

    fn catalog() -> Vec<ToolSummary> {
        let dir = std::env::temp_dir();
        vec![
            ToolSummary::from(CalculatorTool::new().schema()),
            ToolSummary::from(FileTool::new(dir).schema()),
            ToolSummary::from(EchoTool::new().schema()),
        ]
    }

    #[tokio::test]
    async fn test_add_numbers() {
        let plan = KeywordPlanner::new()
            .create_plan("Add 10 and 5", &catalog())
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        let step = &plan.steps()[0];
        assert_eq!(step.tool, "calculator");
        assert_eq!(step.params, json!({"operation": "add", "a": 10.0, "b": 5.0}));
    }

    #[tokio::test]
    async fn test_operation_inference() {
        let planner = KeywordPlanner::new();
        let cases = [
            ("calculate 8 times 3", "multiply"),
            ("please divide 9 by 3", "divide"),
            ("subtract 2 from 7", "subtract"),
            ("calculate 6 / 2", "divide"),
        ];
        for (task, expected) in cases {
            let plan = planner.create_plan(task, &catalog()).await.unwrap();
            assert_eq!(plan.steps()[0].params["operation"], expected, "{}", task);
        }
    }

    #[tokio::test]
    async fn test_read_file_task() {
        let plan = KeywordPlanner::new()
            .create_plan("read the file notes.md please", &catalog())
            .await
            .unwrap();
        assert_eq!(plan.steps()[0].tool, "file_tool");
        assert_eq!(plan.steps()[0].params["file_path"], "notes.md");
    }

    #[tokio::test]
    async fn test_nothing_matches_is_empty() {
        let planner = KeywordPlanner::new();
        assert!(planner.create_plan("write a poem", &catalog()).await.unwrap().is_empty());
        assert!(planner.create_plan("add 3", &catalog()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_steps_limited_to_catalog() {
        let only_echo = vec![ToolSummary::from(EchoTool::new().schema())];
        let plan = KeywordPlanner::new()
            .create_plan("Add 10 and 5", &only_echo)
            .await
            .unwrap();
        assert!(plan.is_empty());
    }
}
