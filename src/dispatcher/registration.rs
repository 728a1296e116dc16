//! 工具注册记录：`name:version` 对应的运行时状态
//!
//! 计数器为原子量，生命周期内单调不减；健康状态只由控制平面更新：
//! `unknown → healthy`（首次探测通过），`healthy ↔ unhealthy`，`* → error`（探测出错，直到下次探测通过）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// 健康状态（仅供观测，不阻止调用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
    Error,
}

/// 注册记录快照（register / registration 返回）
#[derive(Debug, Clone, Serialize)]
pub struct ToolRegistration {
    pub tool_id: Uuid,
    pub tool_name: String,
    pub tool_version: String,
    pub registered_at: DateTime<Utc>,
    pub last_health_check: Option<DateTime<Utc>>,
    pub health_status: HealthStatus,
    pub invocation_count: u64,
    pub error_count: u64,
}

impl ToolRegistration {
    pub fn key(&self) -> String {
        format!("{}:{}", self.tool_name, self.tool_version)
    }
}

#[derive(Debug, Default)]
struct HealthState {
    status: HealthStatus,
    last_check: Option<DateTime<Utc>>,
}

/// 目录内的活记录，invoke 与健康巡检可并发更新
#[derive(Debug)]
pub(crate) struct RegistrationRecord {
    tool_id: Uuid,
    tool_name: String,
    tool_version: String,
    registered_at: DateTime<Utc>,
    health: Mutex<HealthState>,
    invocation_count: AtomicU64,
    error_count: AtomicU64,
}

impl RegistrationRecord {
    pub(crate) fn new(tool_name: &str, tool_version: &str) -> Self {
        Self {
            tool_id: Uuid::new_v4(),
            tool_name: tool_name.to_string(),
            tool_version: tool_version.to_string(),
            registered_at: Utc::now(),
            health: Mutex::new(HealthState::default()),
            invocation_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        }
    }

    /// 记录一次探测结果，返回之前的状态
    pub(crate) fn record_health(&self, status: HealthStatus) -> HealthStatus {
        let mut health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        let previous = health.status;
        health.status = status;
        health.last_check = Some(Utc::now());
        previous
    }

    pub(crate) fn record_success(&self) {
        self.invocation_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ToolRegistration {
        let health = self.health.lock().unwrap_or_else(|e| e.into_inner());
        ToolRegistration {
            tool_id: self.tool_id,
            tool_name: self.tool_name.clone(),
            tool_version: self.tool_version.clone(),
            registered_at: self.registered_at,
            last_health_check: health.last_check,
            health_status: health.status,
            invocation_count: self.invocation_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
        }
    }
}
