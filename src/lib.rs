//! agentic - 智能体工具控制平面与计划驱动执行引擎
//!
//! 模块划分：
//! - **agent**: 按配置装配 Dispatcher 与 ExecutionEngine
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **dispatcher**: 工具注册、版本解析、受限并发调用、健康巡检
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: 日志初始化
//! - **react**: Planner（关键词 / LLM）与执行引擎
//! - **tools**: Tool trait、Schema 与内置工具（calculator、echo、json_processor、file_tool、http_client）

pub mod agent;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod llm;
pub mod observability;
pub mod react;
pub mod tools;

pub use crate::core::{AgentError, DispatchError};
pub use dispatcher::Dispatcher;
pub use react::{ExecutionEngine, RunResult};
