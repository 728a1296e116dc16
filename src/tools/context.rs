//! 单次工具调用的上下文与结果
//!
//! ExecutionContext 由执行引擎为每次调用创建，工具只读；
//! ExecutionResult 由控制平面统一构造：成功、参数非法、超时、执行出错都落在同一结构里，
//! 引擎只需检查 success / error，无需基于错误的控制流。

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// 单次工具调用的关联信息
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionContext {
    pub execution_id: Uuid,
    pub agent_id: Uuid,
    pub session_id: Uuid,
    pub user_id: Option<String>,
    pub trace_id: String,
    pub span_id: String,
}

impl ExecutionContext {
    pub fn new(
        agent_id: Uuid,
        session_id: Uuid,
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            agent_id,
            session_id,
            user_id: None,
            trace_id: trace_id.into(),
            span_id: span_id.into(),
        }
    }

    /// 不隶属任何 Agent 的独立调用（测试、管理接口直接调用工具时使用）
    pub fn detached() -> Self {
        Self::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            format!("trace-{}", Uuid::new_v4()),
            "span-0",
        )
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// 调用失败的类别（success 为 false 时必有）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 参数未通过工具校验，未进入执行
    ValidationFailed,
    /// 超过工具声明的超时
    ExecutionTimeout,
    /// 工具执行返回错误或 panic
    ExecutionError,
}

/// 单次工具调用的结果（构造后不可变）
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub tool_name: String,
    pub tool_version: String,
    pub execution_id: Uuid,
    pub success: bool,
    pub output: Value,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn succeeded(
        tool_name: impl Into<String>,
        tool_version: impl Into<String>,
        execution_id: Uuid,
        output: Value,
        duration: Duration,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_version: tool_version.into(),
            execution_id,
            success: true,
            output,
            error: None,
            failure: None,
            duration,
        }
    }

    pub fn failed(
        tool_name: impl Into<String>,
        tool_version: impl Into<String>,
        execution_id: Uuid,
        failure: FailureKind,
        error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_version: tool_version.into(),
            execution_id,
            success: false,
            output: Value::Null,
            error: Some(error.into()),
            failure: Some(failure),
            duration,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
