//! 工具 Schema：名称、版本、描述、输入/输出 JSON Schema、分类、标签、超时等
//!
//! 输入/输出描述由 schemars 从参数结构体自动生成，注册后不可变。

use std::time::Duration;

use schemars::{schema_for, JsonSchema};
use serde::Serialize;
use serde_json::Value;

/// 工具默认执行超时
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// 工具 Schema（注册后不可变）
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub version: String,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub category: String,
    pub tags: Vec<String>,
    pub requires_auth: bool,
    /// 每分钟调用上限（仅声明，控制平面不强制）
    pub rate_limit: Option<u32>,
    pub timeout: Duration,
    pub idempotent: bool,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
            output_schema: empty_object_schema(),
            category: "general".to_string(),
            tags: Vec::new(),
            requires_auth: false,
            rate_limit: None,
            timeout: DEFAULT_TOOL_TIMEOUT,
            idempotent: false,
        }
    }

    /// 目录键 `name:version`
    pub fn key(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }

    pub fn input<T: JsonSchema>(mut self) -> Self {
        self.input_schema = json_schema_of::<T>();
        self
    }

    pub fn output<T: JsonSchema>(mut self) -> Self {
        self.output_schema = json_schema_of::<T>();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit = Some(per_minute);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }
}

/// 由参数结构体生成 JSON Schema 值
pub fn json_schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| empty_object_schema())
}

fn empty_object_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}
