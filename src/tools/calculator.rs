//! 计算器工具：加减乘除
//!
//! 除零等领域错误以 Err 返回，由控制平面转为 success=false 的结果。

use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::{parse_params, ExecutionContext, Tool, ToolSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }
}

#[derive(Deserialize, JsonSchema)]
struct CalculatorInput {
    /// 运算：add, subtract, multiply, divide
    operation: Operation,
    /// 第一个操作数
    a: f64,
    /// 第二个操作数
    b: f64,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
struct CalculatorOutput {
    /// 计算结果
    result: f64,
}

/// 计算器工具
pub struct CalculatorTool {
    schema: ToolSchema,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self {
            schema: ToolSchema::new("calculator", "1.0.0", "Perform basic arithmetic operations")
                .input::<CalculatorInput>()
                .output::<CalculatorOutput>()
                .category("math")
                .tags(["calculator", "arithmetic"])
                .rate_limit(1000)
                .timeout(Duration::from_secs(5))
                .idempotent(true),
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

fn compute(op: Operation, a: f64, b: f64) -> Result<f64, String> {
    match op {
        Operation::Add => Ok(a + b),
        Operation::Subtract => Ok(a - b),
        Operation::Multiply => Ok(a * b),
        Operation::Divide if b == 0.0 => Err("Division by zero".to_string()),
        Operation::Divide => Ok(a / b),
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn validate_input(&self, params: &Value) -> bool {
        parse_params::<CalculatorInput>(params).is_ok()
    }

    async fn execute(&self, params: Value, _context: &ExecutionContext) -> Result<Value, String> {
        let input: CalculatorInput = parse_params(&params)?;
        let result = compute(input.operation, input.a, input.b)?;
        Ok(serde_json::json!({ "result": result }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_add() {
        let tool = CalculatorTool::new();
        let ctx = ExecutionContext::detached();
        let out = tool
            .execute(json!({"operation": "add", "a": 10, "b": 5}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["result"], 15.0);
    }

    #[tokio::test]
    async fn test_divide_by_zero() {
        let tool = CalculatorTool::new();
        let ctx = ExecutionContext::detached();
        let err = tool
            .execute(json!({"operation": "divide", "a": 1, "b": 0}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, "Division by zero");
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_operation() {
        let tool = CalculatorTool::new();
        assert!(tool.validate_input(&json!({"operation": "add", "a": 1, "b": 2})).await);
        assert!(!tool.validate_input(&json!({"operation": "modulo", "a": 1, "b": 2})).await);
        assert!(!tool.validate_input(&json!({"operation": "add", "a": "1"})).await);
    }
}
