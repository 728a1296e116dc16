//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AGENTIC__*` 覆盖（双下划线表示嵌套，如 `AGENTIC__AGENT__PLANNER=llm`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub dispatcher: DispatcherSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [dispatcher] 段：控制平面的并发上限、健康检查与审计
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherSection {
    /// 控制平面实例 ID，未设置时启动时随机生成
    pub server_id: Option<String>,
    #[serde(default = "default_max_concurrent_executions")]
    pub max_concurrent_executions: usize,
    /// 单次健康探测的截止时间（毫秒）
    #[serde(default = "default_health_check_timeout_ms")]
    pub health_check_timeout_ms: u64,
    /// 周期性健康巡检间隔（秒）
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_true")]
    pub enable_audit_logging: bool,
    #[serde(default)]
    pub version_ordering: VersionOrdering,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            server_id: None,
            max_concurrent_executions: default_max_concurrent_executions(),
            health_check_timeout_ms: default_health_check_timeout_ms(),
            health_check_interval_secs: default_health_check_interval_secs(),
            enable_audit_logging: true,
            version_ordering: VersionOrdering::default(),
        }
    }
}

impl DispatcherSection {
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }
}

fn default_max_concurrent_executions() -> usize {
    100
}

fn default_health_check_timeout_ms() -> u64 {
    5000
}

fn default_health_check_interval_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// "latest" 版本解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionOrdering {
    /// 语义化版本比较（10.0.0 > 9.0.0），非法版本串退化为字符串比较
    #[default]
    Semantic,
    /// 纯字符串字典序
    Lexicographic,
}

/// [agent] 段：执行引擎名称、最大步数、规划器选择
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub planner: PlannerKind,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_iterations: default_max_iterations(),
            planner: PlannerKind::default(),
        }
    }
}

fn default_agent_name() -> String {
    "agentic".to_string()
}

fn default_max_iterations() -> usize {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlannerKind {
    #[default]
    Keyword,
    Llm,
}

/// [llm] 段：LLM 规划器使用的后端
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [tools] 段：内置工具的沙箱根目录与 HTTP 限制
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolsSection {
    /// file_tool 的沙箱根目录，未设置时用 ./workspace
    pub filesystem_root: Option<PathBuf>,
    #[serde(default)]
    pub http: HttpSection,
}

/// [tools.http] 段：请求超时与域名白名单（为空表示不限制）
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            allowed_domains: Vec::new(),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    30
}

/// 从 config 目录加载配置，环境变量 AGENTIC__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 AGENTIC__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AGENTIC")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
