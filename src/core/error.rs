//! 错误类型
//!
//! DispatchError 表示工具目录完整性错误（重复注册、健康检查失败、工具不存在），直接抛给调用方；
//! 单次工具调用的失败（参数非法、超时、执行出错）不走错误通道，而是记录在 ExecutionResult 中。
//! AgentError 为执行引擎层错误。

use thiserror::Error;

/// 控制平面错误：均表示配置或编程问题，而非运行时瞬态故障
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Tool {0} is already registered")]
    RegistrationConflict(String),

    #[error("Tool {0} failed health check")]
    HealthCheckFailed(String),

    #[error("Tool {0} health check timed out")]
    HealthCheckTimedOut(String),

    #[error("Tool {0} not found")]
    ToolNotFound(String),
}

/// 执行引擎错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// 规划器没有给出任何步骤
    #[error("No plan could be created for this task with available tools")]
    PlanningEmpty,

    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}
