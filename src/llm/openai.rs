//! OpenAI 兼容后端，供 LlmPlanner 使用
//!
//! 端点与模型来自 [llm] 配置段，密钥只从 OPENAI_API_KEY 读取。规划请求用 temperature 0，
//! 让同一任务与目录尽量得到同一计划。

use std::sync::atomic::{AtomicU64, Ordering};

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::LlmSection;
use crate::llm::{LlmClient, Message, Role};

const PLANNING_TEMPERATURE: f32 = 0.0;

/// 累计 token 用量快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Default)]
struct UsageCounters {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl UsageCounters {
    fn record(&self, prompt: u64, completion: u64) {
        self.prompt.fetch_add(prompt, Ordering::Relaxed);
        self.completion.fetch_add(completion, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TokenUsage {
        let prompt_tokens = self.prompt.load(Ordering::Relaxed);
        let completion_tokens = self.completion.load(Ordering::Relaxed);
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    usage: UsageCounters,
}

impl OpenAiClient {
    pub fn from_config(llm: &LlmSection) -> Self {
        let mut config = OpenAIConfig::new()
            .with_api_key(std::env::var("OPENAI_API_KEY").unwrap_or_default());
        if let Some(base) = llm.base_url.as_deref() {
            config = config.with_api_base(base);
        }
        Self {
            client: Client::with_config(config),
            model: llm.model.clone(),
            usage: UsageCounters::default(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn usage(&self) -> TokenUsage {
        self.usage.snapshot()
    }
}

fn request_message(message: &Message) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let content = message.content.clone();
    Ok(match message.role {
        Role::System => ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()?,
        ),
        Role::User => ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()?,
        ),
        Role::Assistant => ChatCompletionRequestMessage::Assistant(
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()?,
        ),
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let history = messages
            .iter()
            .map(request_message)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid request message: {}", e))?;
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(PLANNING_TEMPERATURE)
            .messages(history)
            .build()
            .map_err(|e| format!("invalid request: {}", e))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| format!("{} request failed: {}", self.model, e))?;

        if let Some(usage) = &response.usage {
            self.usage
                .record(usage.prompt_tokens as u64, usage.completion_tokens as u64);
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "llm usage"
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| format!("{} returned an empty completion", self.model))
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        let u = self.usage();
        (u.prompt_tokens, u.completion_tokens, u.total_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_map_to_request_variants() {
        let system = request_message(&Message::system("plan")).unwrap();
        let user = request_message(&Message::user("Add 1 and 2")).unwrap();
        let assistant = request_message(&Message::assistant("[]")).unwrap();
        assert!(matches!(system, ChatCompletionRequestMessage::System(_)));
        assert!(matches!(user, ChatCompletionRequestMessage::User(_)));
        assert!(matches!(assistant, ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_usage_accumulates() {
        let client = OpenAiClient::from_config(&LlmSection::default());
        assert_eq!(client.model(), "gpt-4o-mini");
        assert_eq!(client.usage(), TokenUsage::default());

        client.usage.record(120, 30);
        client.usage.record(80, 20);
        assert_eq!(
            client.usage(),
            TokenUsage {
                prompt_tokens: 200,
                completion_tokens: 50,
                total_tokens: 250,
            }
        );
        assert_eq!(client.token_usage(), (200, 50, 250));
    }
}
