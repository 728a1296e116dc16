//! 工具 trait 与目录摘要
//!
//! 所有工具实现 Tool trait（schema / validate_input / execute / health_check / dependencies），
//! 由 Dispatcher 按 `name:version` 注册与调度；工具从不被 Agent 直接调用。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::tools::{ExecutionContext, ToolSchema};

/// 工具 trait：Schema、参数校验、异步执行、健康检查、依赖声明
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具 Schema（注册后不可变）
    fn schema(&self) -> &ToolSchema;

    /// 校验参数；返回 false 时控制平面直接返回 ValidationFailed，不进入执行
    async fn validate_input(&self, params: &Value) -> bool;

    /// 执行工具；Err 中的文本作为 ExecutionResult.error 返回给调用方
    async fn execute(&self, params: Value, context: &ExecutionContext) -> Result<Value, String>;

    /// 健康探测：Ok(true) 健康，Ok(false) 不健康，Err 表示探测本身出错
    async fn health_check(&self) -> Result<bool, String> {
        Ok(true)
    }

    /// 工具依赖的外部资源（仅用于注册日志）
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}

/// list_tools 返回的目录条目，也是传给 Planner 的工具目录
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub version: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub input_schema: Value,
}

impl From<&ToolSchema> for ToolSummary {
    fn from(schema: &ToolSchema) -> Self {
        Self {
            name: schema.name.clone(),
            version: schema.version.clone(),
            description: schema.description.clone(),
            category: schema.category.clone(),
            tags: schema.tags.clone(),
            input_schema: schema.input_schema.clone(),
        }
    }
}

/// 解析参数为强类型输入；供各工具的 validate_input / execute 共用
pub fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|e| format!("Invalid parameters: {}", e))
}

/// 动态生成目录的 schema JSON，拼入 LLM 规划提示
pub fn catalog_schema_json(catalog: &[ToolSummary]) -> String {
    let tools: Vec<Value> = catalog
        .iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.input_schema
            })
        })
        .collect();
    serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
}
