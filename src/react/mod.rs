//! 规划与执行：Planner 给出步骤，ExecutionEngine 逐步调用工具

pub mod engine;
pub mod keyword;
pub mod llm_planner;
pub mod planner;

pub use engine::{AgentContext, ExecutionEngine, RunResult};
pub use keyword::KeywordPlanner;
pub use llm_planner::LlmPlanner;
pub use planner::{parse_plan, Plan, Planner, StaticPlanner, Step};
