//! 沙箱文件读写工具
//!
//! SafeFs 绑定 root_dir，所有路径经 resolve 校验必须在 root 下（禁止 ../ 逃逸）；
//! FileTool 基于 SafeFs 提供读取、覆盖写入与追加写入。带 content 参数即为写操作。

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::tools::{parse_params, ExecutionContext, Tool, ToolSchema};

/// 单次读取的默认大小上限
const DEFAULT_MAX_SIZE_BYTES: u64 = 10_000_000;

/// 沙箱文件系统：绑定根目录，resolve 校验路径在根下，防止路径逃逸
#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

impl SafeFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// 解析已存在的路径并检查其在沙箱内
    pub fn resolve(&self, path: &str) -> Result<PathBuf, String> {
        let full = self.join(path)?;
        let canonical = full
            .canonicalize()
            .map_err(|_| format!("Path not found: {}", path))?;
        self.ensure_inside(canonical, path)
    }

    /// 解析写入目标：文件可以不存在，但父目录必须存在且在沙箱内
    pub fn resolve_for_write(&self, path: &str) -> Result<PathBuf, String> {
        let full = self.join(path)?;
        let file_name = full
            .file_name()
            .ok_or_else(|| format!("Not a file path: {}", path))?
            .to_owned();
        let parent = full
            .parent()
            .ok_or_else(|| format!("Not a file path: {}", path))?
            .canonicalize()
            .map_err(|_| format!("Directory not found for: {}", path))?;
        let parent = self.ensure_inside(parent, path)?;
        Ok(parent.join(file_name))
    }

    fn join(&self, path: &str) -> Result<PathBuf, String> {
        let p = Path::new(path.trim_start_matches("./"));
        if p.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(format!("Access denied: {} escapes the workspace", path)); // 如 ../../etc/passwd
        }
        if p.is_absolute() {
            Ok(p.to_path_buf())
        } else {
            Ok(self.root_dir.join(p))
        }
    }

    fn ensure_inside(&self, canonical: PathBuf, original: &str) -> Result<PathBuf, String> {
        if canonical.starts_with(&self.root_dir) {
            Ok(canonical)
        } else {
            Err(format!("Access denied: {} escapes the workspace", original))
        }
    }
}

#[derive(Deserialize, JsonSchema)]
struct FileInput {
    /// 文件路径（相对工作区或工作区内的绝对路径）
    file_path: String,
    /// 要写入的内容；缺省时为读取
    #[serde(default)]
    content: Option<String>,
    /// 追加而非覆盖（仅写入时有效）
    #[serde(default)]
    append: bool,
    /// 读取大小上限（字节）
    #[serde(default = "default_max_size")]
    max_size_bytes: u64,
}

fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

/// 文件读写工具
pub struct FileTool {
    fs: SafeFs,
    schema: ToolSchema,
}

impl FileTool {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            fs: SafeFs::new(root_dir),
            schema: ToolSchema::new(
                "file_tool",
                "1.0.0",
                "Read and write text files inside the workspace",
            )
            .input::<FileInput>()
            .category("filesystem")
            .tags(["file", "io", "read", "write"])
            .requires_auth(true)
            .rate_limit(100),
        }
    }

    async fn read(&self, input: &FileInput) -> Result<Value, String> {
        let path = self.fs.resolve(&input.file_path)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| format!("Read failed: {}", e))?;
        if meta.len() > input.max_size_bytes {
            return Err(format!(
                "File too large: {} bytes (max {})",
                meta.len(),
                input.max_size_bytes
            ));
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Read failed: {}", e))?;
        Ok(serde_json::json!({
            "message": format!("Read {}", input.file_path),
            "content": content,
            "size_bytes": meta.len(),
        }))
    }

    async fn write(&self, input: &FileInput, content: &str) -> Result<Value, String> {
        let path = self.fs.resolve_for_write(&input.file_path)?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(input.append)
            .truncate(!input.append)
            .open(&path)
            .await
            .map_err(|e| format!("Write failed: {}", e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| format!("Write failed: {}", e))?;
        file.flush().await.map_err(|e| format!("Write failed: {}", e))?;
        let verb = if input.append { "Appended" } else { "Wrote" };
        Ok(serde_json::json!({
            "message": format!("{} {} bytes to {}", verb, content.len(), input.file_path),
            "size_bytes": content.len(),
        }))
    }
}

#[async_trait]
impl Tool for FileTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn validate_input(&self, params: &Value) -> bool {
        parse_params::<FileInput>(params).is_ok()
    }

    async fn execute(&self, params: Value, _context: &ExecutionContext) -> Result<Value, String> {
        let input: FileInput = parse_params(&params)?;
        tracing::info!(path = %input.file_path, write = input.content.is_some(), "file tool execute");
        match input.content.as_deref() {
            Some(content) => self.write(&input, content).await,
            None => self.read(&input).await,
        }
    }

    async fn health_check(&self) -> Result<bool, String> {
        Ok(self.fs.root().is_dir())
    }

    fn dependencies(&self) -> Vec<String> {
        vec![format!("fs:{}", self.fs.root().display())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_append_read() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileTool::new(dir.path());
        let ctx = ExecutionContext::detached();

        tool.execute(json!({"file_path": "notes.txt", "content": "hello"}), &ctx)
            .await
            .unwrap();
        tool.execute(
            json!({"file_path": "notes.txt", "content": " world", "append": true}),
            &ctx,
        )
        .await
        .unwrap();

        let out = tool
            .execute(json!({"file_path": "notes.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["content"], "hello world");
        assert_eq!(out["size_bytes"], 11);
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileTool::new(dir.path());
        let ctx = ExecutionContext::detached();
        let err = tool
            .execute(json!({"file_path": "../../etc/passwd"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.contains("Access denied"));

        let err = tool
            .execute(json!({"file_path": "/etc/hosts"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.contains("Access denied") || err.contains("Path not found"));
    }

    #[tokio::test]
    async fn test_max_size_enforced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("big.txt"), "0123456789").unwrap();
        let tool = FileTool::new(dir.path());
        let ctx = ExecutionContext::detached();
        let err = tool
            .execute(json!({"file_path": "big.txt", "max_size_bytes": 4}), &ctx)
            .await
            .unwrap_err();
        assert!(err.starts_with("File too large"));
    }

    #[tokio::test]
    async fn test_health_reflects_root() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FileTool::new(dir.path().join("missing"));
        assert_eq!(tool.health_check().await, Ok(false));
        let tool = FileTool::new(dir.path());
        assert_eq!(tool.health_check().await, Ok(true));
    }
}
