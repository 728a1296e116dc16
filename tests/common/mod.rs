//! 集成测试共用的脚本化工具

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use agentic::tools::{ExecutionContext, Tool, ToolSchema};
use async_trait::async_trait;
use serde_json::{json, Value};

pub enum Behavior {
    Return(Value),
    Fail(String),
    Panic(&'static str),
    /// 睡眠后返回
    Sleep(Duration),
}

/// 行为可配置、可观测的测试工具：记录调用次数、并发峰值与收到的上下文
pub struct ScriptedTool {
    schema: ToolSchema,
    behavior: Behavior,
    health: Mutex<Result<bool, String>>,
    health_delay: Mutex<Option<Duration>>,
    panic_on_validate: bool,
    pub calls: AtomicUsize,
    current: AtomicUsize,
    pub peak: AtomicUsize,
    health_checks: AtomicUsize,
    contexts: Mutex<Vec<ExecutionContext>>,
}

impl ScriptedTool {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            schema: ToolSchema::new(name, version, format!("scripted {}", name)),
            behavior: Behavior::Return(json!({ "tool": name, "version": version })),
            health: Mutex::new(Ok(true)),
            health_delay: Mutex::new(None),
            panic_on_validate: false,
            calls: AtomicUsize::new(0),
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            health_checks: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn schema_with(mut self, f: impl FnOnce(ToolSchema) -> ToolSchema) -> Self {
        self.schema = f(self.schema);
        self
    }

    pub fn health(self, health: Result<bool, String>) -> Self {
        self.set_health(health);
        self
    }

    pub fn health_delay(self, delay: Duration) -> Self {
        self.set_health_delay(delay);
        self
    }

    pub fn set_health_delay(&self, delay: Duration) {
        *self.health_delay.lock().unwrap() = Some(delay);
    }

    /// validate_input 直接 panic
    pub fn panicking_validator(mut self) -> Self {
        self.panic_on_validate = true;
        self
    }

    pub fn set_health(&self, health: Result<bool, String>) {
        *self.health.lock().unwrap() = health;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// health_check 被调用的次数（含注册时的探测）
    pub fn health_check_count(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<ExecutionContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for ScriptedTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// 带 "reject" 字段的参数视为非法
    async fn validate_input(&self, params: &Value) -> bool {
        if self.panic_on_validate {
            panic!("validator blew up");
        }
        params.get("reject").is_none()
    }

    async fn execute(&self, _params: Value, context: &ExecutionContext) -> Result<Value, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.clone());
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = match &self.behavior {
            Behavior::Return(v) => Ok(v.clone()),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::Panic(msg) => {
                self.current.fetch_sub(1, Ordering::SeqCst);
                panic!("{}", msg)
            }
            Behavior::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok(json!("slept"))
            }
        };
        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn health_check(&self) -> Result<bool, String> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        let delay = *self.health_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.health.lock().unwrap().clone()
    }
}
