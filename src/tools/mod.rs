pub mod calculator;
pub mod context;
pub mod echo;
pub mod filesystem;
pub mod http;
pub mod json_processor;
pub mod registry;
pub mod schema;

pub use calculator::CalculatorTool;
pub use context::{ExecutionContext, ExecutionResult, FailureKind};
pub use echo::EchoTool;
pub use filesystem::{FileTool, SafeFs};
pub use http::HttpTool;
pub use json_processor::JsonProcessorTool;
pub use registry::{catalog_schema_json, parse_params, Tool, ToolSummary};
pub use schema::{json_schema_of, ToolSchema, DEFAULT_TOOL_TIMEOUT};
