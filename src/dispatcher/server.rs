//! 控制平面：工具目录、受限并发调用与周期健康巡检
//!
//! 所有工具执行都经过 Dispatcher：按 `name:version` 解析工具，占用一个并发槽位（Semaphore），
//! 先校验参数，再在工具声明的超时内执行；成功、参数非法、超时、执行出错都转为 ExecutionResult，
//! 槽位随 permit 释放；每次调用输出结构化审计日志（JSON）。

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::FutureExt;
use serde_json::Value;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::DispatcherSection;
use crate::core::DispatchError;
use crate::dispatcher::registration::{HealthStatus, RegistrationRecord, ToolRegistration};
use crate::dispatcher::version::{self, LATEST};
use crate::tools::{ExecutionContext, ExecutionResult, FailureKind, Tool, ToolSummary};

/// 审计日志中参数预览的最大字符数
const ARGS_PREVIEW_CHARS: usize = 200;

struct CatalogEntry {
    tool: Arc<dyn Tool>,
    record: RegistrationRecord,
}

struct SweepHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

enum HealthOutcome {
    Healthy,
    Unhealthy,
    Failed(String),
    TimedOut,
}

enum Outcome {
    Ok(Value),
    Invalid,
    Failed(String),
    TimedOut,
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Ok(_) => "ok",
            Outcome::Invalid => "invalid",
            Outcome::Failed(_) => "error",
            Outcome::TimedOut => "timeout",
        }
    }
}

/// 控制平面：持有工具目录与全局并发限制，生命周期由 start / stop 显式管理
pub struct Dispatcher {
    server_id: String,
    config: DispatcherSection,
    catalog: RwLock<BTreeMap<String, Arc<CatalogEntry>>>,
    limiter: Arc<Semaphore>,
    max_concurrent: usize,
    running: AtomicBool,
    sweep: Mutex<Option<SweepHandle>>,
}

impl Dispatcher {
    pub fn new(config: DispatcherSection) -> Self {
        let server_id = config
            .server_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let max_concurrent = config.max_concurrent_executions.max(1);
        tracing::info!(
            server_id = %server_id,
            max_concurrent = max_concurrent,
            "dispatcher initialized"
        );
        Self {
            server_id,
            config,
            catalog: RwLock::new(BTreeMap::new()),
            limiter: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            running: AtomicBool::new(false),
            sweep: Mutex::new(None),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 当前占用的并发槽位数
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.limiter.available_permits()
    }

    /// 启动周期健康巡检；重复调用只记录警告
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!(server_id = %self.server_id, "dispatcher already running");
            return;
        }
        let token = CancellationToken::new();
        let handle = tokio::spawn(health_loop(
            Arc::downgrade(self),
            self.config.health_check_interval(),
            token.clone(),
        ));
        *self.sweep.lock().unwrap_or_else(|e| e.into_inner()) = Some(SweepHandle { token, handle });
        tracing::info!(server_id = %self.server_id, "dispatcher started");
    }

    /// 停止健康巡检并注销全部工具
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let sweep = self.sweep.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(sweep) = sweep {
            sweep.token.cancel();
            let _ = sweep.handle.await;
        }
        let mut catalog = self.catalog.write().await;
        for key in std::mem::take(&mut *catalog).into_keys() {
            tracing::info!(tool = %key, "tool unregistered");
        }
        tracing::info!(server_id = %self.server_id, "dispatcher stopped");
    }

    pub async fn register<T: Tool + 'static>(&self, tool: T) -> Result<ToolRegistration, DispatchError> {
        self.register_arc(Arc::new(tool)).await
    }

    /// 注册工具：键冲突直接拒绝；健康探测通过后才写入目录，对 list / invoke 可见
    pub async fn register_arc(&self, tool: Arc<dyn Tool>) -> Result<ToolRegistration, DispatchError> {
        let (name, version, key) = {
            let schema = tool.schema();
            (schema.name.clone(), schema.version.clone(), schema.key())
        };

        if self.catalog.read().await.contains_key(&key) {
            return Err(DispatchError::RegistrationConflict(key));
        }

        tracing::info!(
            tool = %name,
            version = %version,
            dependencies = ?tool.dependencies(),
            "tool registration started"
        );

        match self.run_health_check(tool.as_ref()).await {
            HealthOutcome::Healthy => {}
            HealthOutcome::Unhealthy => return Err(DispatchError::HealthCheckFailed(key)),
            HealthOutcome::Failed(e) => {
                tracing::warn!(tool = %key, error = %e, "health check raised during registration");
                return Err(DispatchError::HealthCheckFailed(key));
            }
            HealthOutcome::TimedOut => return Err(DispatchError::HealthCheckTimedOut(key)),
        }

        let record = RegistrationRecord::new(&name, &version);
        record.record_health(HealthStatus::Healthy);
        let snapshot = record.snapshot();

        let mut catalog = self.catalog.write().await;
        // 探测期间可能有同键注册完成
        if catalog.contains_key(&key) {
            return Err(DispatchError::RegistrationConflict(key));
        }
        catalog.insert(key, Arc::new(CatalogEntry { tool, record }));

        tracing::info!(
            tool = %name,
            version = %version,
            tool_id = %snapshot.tool_id,
            "tool registered"
        );
        Ok(snapshot)
    }

    /// 注销工具；version 为 "latest" 时解析为该名称下的最新版本。无匹配时为空操作
    pub async fn unregister(&self, name: &str, version: &str) -> Option<ToolRegistration> {
        let mut catalog = self.catalog.write().await;
        let removed = self
            .resolve_key(&catalog, name, version)
            .and_then(|key| catalog.remove(&key).map(|entry| (key, entry)));
        match removed {
            Some((key, entry)) => {
                tracing::info!(tool = %key, "tool unregistered");
                Some(entry.record.snapshot())
            }
            None => {
                tracing::warn!(tool = %name, version = %version, "tool not found for unregister");
                None
            }
        }
    }

    /// 列出目录；category 精确匹配，tags 与工具标签有交集即命中（为空不过滤）
    pub async fn list(&self, category: Option<&str>, tags: &[String]) -> Vec<ToolSummary> {
        self.catalog
            .read()
            .await
            .values()
            .map(|entry| entry.tool.schema())
            .filter(|schema| category.map_or(true, |c| schema.category == c))
            .filter(|schema| tags.is_empty() || tags.iter().any(|t| schema.tags.contains(t)))
            .map(ToolSummary::from)
            .collect()
    }

    pub async fn registration(&self, name: &str, version: &str) -> Option<ToolRegistration> {
        let catalog = self.catalog.read().await;
        let key = self.resolve_key(&catalog, name, version)?;
        catalog.get(&key).map(|entry| entry.record.snapshot())
    }

    pub async fn registrations(&self) -> Vec<ToolRegistration> {
        self.catalog
            .read()
            .await
            .values()
            .map(|entry| entry.record.snapshot())
            .collect()
    }

    /// 调用工具。仅 ToolNotFound 以 Err 返回；其余结果（含失败）均为 ExecutionResult
    pub async fn invoke(
        &self,
        name: &str,
        params: Value,
        context: &ExecutionContext,
        version: &str,
    ) -> Result<ExecutionResult, DispatchError> {
        let entry = {
            let catalog = self.catalog.read().await;
            self.resolve_key(&catalog, name, version)
                .and_then(|key| catalog.get(&key).cloned())
                .ok_or_else(|| {
                    DispatchError::ToolNotFound(if version == LATEST {
                        name.to_string()
                    } else {
                        format!("{}:{}", name, version)
                    })
                })?
        };
        let schema = entry.tool.schema();
        let key = schema.key();
        let args_preview = args_preview(&params);

        // 槽位在本函数任一返回路径上随 permit drop 释放
        let _permit = match self.limiter.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                entry.record.record_error();
                return Ok(ExecutionResult::failed(
                    &schema.name,
                    &schema.version,
                    context.execution_id,
                    FailureKind::ExecutionError,
                    "Dispatcher limiter closed",
                    Duration::ZERO,
                ));
            }
        };

        let start = Instant::now();
        let valid = AssertUnwindSafe(entry.tool.validate_input(&params))
            .catch_unwind()
            .await;
        let outcome = match valid {
            Err(panic) => Outcome::Failed(panic_message(panic)),
            Ok(false) => Outcome::Invalid,
            Ok(true) => {
                tracing::info!(
                    tool = %key,
                    execution_id = %context.execution_id,
                    "tool execution started"
                );
                let run = AssertUnwindSafe(entry.tool.execute(params, context)).catch_unwind();
                match timeout(schema.timeout, run).await {
                    Ok(Ok(Ok(output))) => Outcome::Ok(output),
                    Ok(Ok(Err(message))) => Outcome::Failed(message),
                    Ok(Err(panic)) => Outcome::Failed(panic_message(panic)),
                    Err(_) => Outcome::TimedOut,
                }
            }
        };
        let duration = start.elapsed();
        let label = outcome.label();

        let result = match outcome {
            Outcome::Ok(output) => {
                entry.record.record_success();
                tracing::info!(
                    tool = %key,
                    execution_id = %context.execution_id,
                    duration_ms = duration.as_millis() as u64,
                    "tool execution completed"
                );
                ExecutionResult::succeeded(
                    &schema.name,
                    &schema.version,
                    context.execution_id,
                    output,
                    duration,
                )
            }
            Outcome::Invalid => {
                entry.record.record_error();
                tracing::warn!(tool = %key, execution_id = %context.execution_id, "invalid parameters");
                ExecutionResult::failed(
                    &schema.name,
                    &schema.version,
                    context.execution_id,
                    FailureKind::ValidationFailed,
                    format!("Invalid parameters for tool {}", key),
                    duration,
                )
            }
            Outcome::Failed(message) => {
                entry.record.record_error();
                tracing::error!(
                    tool = %key,
                    execution_id = %context.execution_id,
                    error = %message,
                    "tool execution failed"
                );
                ExecutionResult::failed(
                    &schema.name,
                    &schema.version,
                    context.execution_id,
                    FailureKind::ExecutionError,
                    message,
                    duration,
                )
            }
            Outcome::TimedOut => {
                entry.record.record_error();
                tracing::error!(
                    tool = %key,
                    execution_id = %context.execution_id,
                    timeout_ms = schema.timeout.as_millis() as u64,
                    "tool execution timeout"
                );
                ExecutionResult::failed(
                    &schema.name,
                    &schema.version,
                    context.execution_id,
                    FailureKind::ExecutionTimeout,
                    format!("Execution timed out after {:.3}s", schema.timeout.as_secs_f64()),
                    duration,
                )
            }
        };

        if self.config.enable_audit_logging {
            let audit = serde_json::json!({
                "event": "tool_audit",
                "tool": key,
                "execution_id": context.execution_id.to_string(),
                "agent_id": context.agent_id.to_string(),
                "trace_id": context.trace_id,
                "span_id": context.span_id,
                "ok": result.success,
                "outcome": label,
                "duration_ms": duration.as_millis() as u64,
                "args_preview": args_preview,
            });
            tracing::info!(audit = %audit.to_string(), "tool");
        }

        Ok(result)
    }

    /// 对目录内全部工具执行一轮健康探测；探测失败只改变状态，不移除工具
    pub async fn check_health(&self) {
        let entries: Vec<(String, Arc<CatalogEntry>)> = self
            .catalog
            .read()
            .await
            .iter()
            .map(|(key, entry)| (key.clone(), Arc::clone(entry)))
            .collect();

        let checks = entries.iter().map(|(key, entry)| async move {
            let status = match self.run_health_check(entry.tool.as_ref()).await {
                HealthOutcome::Healthy => HealthStatus::Healthy,
                HealthOutcome::Unhealthy => {
                    tracing::warn!(tool = %key, "tool unhealthy");
                    HealthStatus::Unhealthy
                }
                HealthOutcome::Failed(e) => {
                    tracing::error!(tool = %key, error = %e, "tool health check failed");
                    HealthStatus::Error
                }
                HealthOutcome::TimedOut => {
                    tracing::error!(tool = %key, error = "timed out", "tool health check failed");
                    HealthStatus::Error
                }
            };
            let previous = entry.record.record_health(status);
            if previous != status {
                tracing::info!(tool = %key, from = ?previous, to = ?status, "tool health changed");
            }
        });
        join_all(checks).await;
    }

    async fn run_health_check(&self, tool: &dyn Tool) -> HealthOutcome {
        let check = AssertUnwindSafe(tool.health_check()).catch_unwind();
        match timeout(self.config.health_check_timeout(), check).await {
            Ok(Ok(Ok(true))) => HealthOutcome::Healthy,
            Ok(Ok(Ok(false))) => HealthOutcome::Unhealthy,
            Ok(Ok(Err(e))) => HealthOutcome::Failed(e),
            Ok(Err(panic)) => HealthOutcome::Failed(panic_message(panic)),
            Err(_) => HealthOutcome::TimedOut,
        }
    }

    fn resolve_key(
        &self,
        catalog: &BTreeMap<String, Arc<CatalogEntry>>,
        name: &str,
        version: &str,
    ) -> Option<String> {
        if version == LATEST {
            let versions = catalog
                .values()
                .map(|entry| entry.tool.schema())
                .filter(|schema| schema.name == name)
                .map(|schema| schema.version.as_str());
            version::latest(versions, self.config.version_ordering)
                .map(|v| format!("{}:{}", name, v))
        } else {
            let key = format!("{}:{}", name, version);
            catalog.contains_key(&key).then_some(key)
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherSection::default())
    }
}

async fn health_loop(dispatcher: Weak<Dispatcher>, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    // 巡检耗时超过周期时顺延，不补发
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(strong) = dispatcher.upgrade() else { break };
                strong.check_health().await;
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.chars().count() > ARGS_PREVIEW_CHARS {
        format!("{}...", s.chars().take(ARGS_PREVIEW_CHARS).collect::<String>())
    } else {
        s
    }
}
