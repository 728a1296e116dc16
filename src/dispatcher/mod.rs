//! 控制平面：工具注册、版本解析、受限并发调度与健康巡检

pub mod registration;
pub mod server;
pub mod version;

pub use registration::{HealthStatus, ToolRegistration};
pub use server::Dispatcher;
pub use version::LATEST;
