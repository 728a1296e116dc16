//! JSON 处理工具：parse / format / validate / query
//!
//! query 使用点分路径（如 `items.0.name`），数字段按数组下标处理。非法 JSON 视为执行失败。

use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::{parse_params, ExecutionContext, Tool, ToolSchema};

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum JsonOperation {
    Parse,
    Format,
    Validate,
    Query,
}

#[derive(Deserialize, JsonSchema)]
struct JsonInput {
    /// 操作：parse, format, validate, query
    operation: JsonOperation,
    /// 待处理的 JSON 字符串
    data: String,
    /// 点分路径（仅 query 使用）
    #[serde(default)]
    query: Option<String>,
}

/// JSON 处理工具
pub struct JsonProcessorTool {
    schema: ToolSchema,
}

impl JsonProcessorTool {
    pub fn new() -> Self {
        Self {
            schema: ToolSchema::new(
                "json_processor",
                "1.0.0",
                "Parse, query, and manipulate JSON data",
            )
            .input::<JsonInput>()
            .category("data")
            .tags(["json", "data", "parser"])
            .rate_limit(1000)
            .timeout(Duration::from_secs(10))
            .idempotent(true),
        }
    }
}

impl Default for JsonProcessorTool {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_data(data: &str) -> Result<Value, String> {
    serde_json::from_str(data).map_err(|e| format!("Invalid JSON: {}", e))
}

/// 按点分路径取值；空路径返回整个文档
fn query_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|seg| !seg.is_empty())
        .try_fold(doc, |cur, seg| match cur {
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(seg),
            _ => None,
        })
}

#[async_trait]
impl Tool for JsonProcessorTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn validate_input(&self, params: &Value) -> bool {
        parse_params::<JsonInput>(params).is_ok()
    }

    async fn execute(&self, params: Value, _context: &ExecutionContext) -> Result<Value, String> {
        let input: JsonInput = parse_params(&params)?;
        let doc = parse_data(&input.data)?;
        let output = match input.operation {
            JsonOperation::Parse => serde_json::json!({
                "result": doc,
                "message": "JSON parsed successfully",
            }),
            JsonOperation::Format => {
                // serde_json::Map 默认按键排序
                let formatted = serde_json::to_string_pretty(&doc).map_err(|e| e.to_string())?;
                serde_json::json!({
                    "result": formatted,
                    "message": "JSON formatted successfully",
                })
            }
            JsonOperation::Validate => serde_json::json!({
                "result": true,
                "message": "JSON is valid",
            }),
            JsonOperation::Query => {
                let path = input.query.unwrap_or_default();
                let found = query_path(&doc, &path)
                    .ok_or_else(|| format!("Path not found: {}", path))?;
                serde_json::json!({
                    "result": found,
                    "message": format!("Query '{}' matched", path),
                })
            }
        };
        Ok(output)
    }
}
