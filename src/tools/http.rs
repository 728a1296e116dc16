//! HTTP 客户端工具：GET / POST / PUT / DELETE
//!
//! 可选域名白名单（按后缀匹配，如 `example.com` 允许 `api.example.com`），为空则不限制；
//! 请求超时由配置决定，响应体超过 MAX_BODY_CHARS 时截断并追加 ...[truncated]。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::{parse_params, ExecutionContext, Tool, ToolSchema};

const MAX_BODY_CHARS: usize = 8000;

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[derive(Deserialize, JsonSchema)]
struct HttpRequestInput {
    /// 请求 URL
    url: String,
    /// HTTP 方法：GET, POST, PUT, DELETE
    #[serde(default)]
    method: HttpMethod,
    /// 请求头
    #[serde(default)]
    headers: Option<HashMap<String, String>>,
    /// JSON 请求体（POST / PUT）
    #[serde(default)]
    body: Option<Value>,
}

/// 从 URL 中提取 host（不含端口）
fn extract_domain(url: &str) -> Option<String> {
    let url = url.trim();
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = url.split('/').next()?;
    let host = host.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// HTTP 工具
pub struct HttpTool {
    client: Client,
    allowed_domains: Vec<String>,
    schema: ToolSchema,
}

impl HttpTool {
    pub fn new(allowed_domains: Vec<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("agentic/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            allowed_domains: allowed_domains
                .into_iter()
                .map(|d| d.to_lowercase())
                .collect(),
            schema: ToolSchema::new(
                "http_client",
                "1.0.0",
                "Make HTTP requests (GET, POST, PUT, DELETE)",
            )
            .input::<HttpRequestInput>()
            .category("network")
            .tags(["http", "api", "web"])
            .rate_limit(60)
            .timeout(Duration::from_secs(60)),
        }
    }

    fn is_allowed(&self, url: &str) -> Result<(), String> {
        let domain = extract_domain(url).ok_or_else(|| "Invalid or missing URL".to_string())?;
        if self.allowed_domains.is_empty()
            || self
                .allowed_domains
                .iter()
                .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)))
        {
            return Ok(());
        }
        Err(format!("Domain {} not in allowed list", domain))
    }
}

#[async_trait]
impl Tool for HttpTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn validate_input(&self, params: &Value) -> bool {
        match parse_params::<HttpRequestInput>(params) {
            Ok(input) => extract_domain(&input.url).is_some(),
            Err(_) => false,
        }
    }

    async fn execute(&self, params: Value, _context: &ExecutionContext) -> Result<Value, String> {
        let input: HttpRequestInput = parse_params(&params)?;
        self.is_allowed(&input.url)?;

        let mut req = self.client.request(input.method.into(), &input.url);
        for (k, v) in input.headers.iter().flatten() {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(body) = &input.body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let status = resp.status();
        let headers: HashMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let mut text = resp
            .text()
            .await
            .map_err(|e| format!("Read body failed: {}", e))?;
        if text.chars().count() > MAX_BODY_CHARS {
            text = text.chars().take(MAX_BODY_CHARS).collect::<String>() + "...[truncated]";
        }

        Ok(serde_json::json!({
            "status_code": status.as_u16(),
            "headers": headers,
            "body": text,
            "success": status.is_success(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://API.example.com:8443/v1"),
            Some("api.example.com".to_string())
        );
        assert_eq!(extract_domain("ftp://example.com"), None);
        assert_eq!(extract_domain("http:///path"), None);
    }

    #[test]
    fn test_allowlist_suffix_match() {
        let tool = HttpTool::new(vec!["example.com".into()], 5);
        assert!(tool.is_allowed("https://api.example.com/x").is_ok());
        assert!(tool.is_allowed("https://example.com/").is_ok());
        assert!(tool.is_allowed("https://evil.org/").is_err());
        // 只按标签边界匹配
        assert!(tool.is_allowed("https://evilexample.com/steal").is_err());

        let open = HttpTool::new(Vec::new(), 5);
        assert!(open.is_allowed("https://anything.org/").is_ok());
    }

    #[tokio::test]
    async fn test_validate_input() {
        let tool = HttpTool::new(Vec::new(), 5);
        assert!(tool.validate_input(&json!({"url": "https://example.com"})).await);
        assert!(tool.validate_input(&json!({"url": "https://example.com", "method": "POST", "body": {"a": 1}})).await);
        assert!(!tool.validate_input(&json!({"url": "example.com"})).await);
        assert!(!tool.validate_input(&json!({"url": "https://example.com", "method": "PATCH"})).await);
    }
}
