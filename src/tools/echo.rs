//! Echo 工具（测试用）

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::{parse_params, ExecutionContext, Tool, ToolSchema};

#[allow(dead_code)]
#[derive(Deserialize, JsonSchema)]
struct EchoInput {
    /// 要回显的文本
    text: String,
}

/// Echo 工具：回显文本
pub struct EchoTool {
    schema: ToolSchema,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            schema: ToolSchema::new("echo", "1.0.0", "Echo text back (for testing)")
                .input::<EchoInput>()
                .category("testing")
                .tags(["echo", "debug"])
                .idempotent(true),
        }
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn validate_input(&self, params: &Value) -> bool {
        parse_params::<EchoInput>(params).is_ok()
    }

    async fn execute(&self, params: Value, _context: &ExecutionContext) -> Result<Value, String> {
        let input: EchoInput = parse_params(&params)?;
        Ok(serde_json::json!({ "text": input.text }))
    }
}
