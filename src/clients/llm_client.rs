/// LLM API 客户端
///
/// 使用 `async-openai` 调用 OpenAI 兼容接口（OpenAI / Anthropic / Google 都提供兼容端点），
/// 并把调用失败归类为 `LLMUnavailable` / `LLMRateLimited` / `LLMRefused`。
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, FinishReason,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::LlmSettings;
use crate::error::{ConfigError, SummarizeError};
use crate::models::FailureKind;

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate_limit",
    "rate limit",
    "too many requests",
    "429",
    "quota",
    "resource_exhausted",
];

const REFUSAL_MARKERS: &[&str] = &[
    "content_policy",
    "content policy",
    "content_filter",
    "content management policy",
    "safety",
    "refus",
    "invalid_prompt",
];

/// LLM 客户端
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    provider: String,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
    has_api_key: bool,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(settings: &LlmSettings) -> Result<Self, ConfigError> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(settings.api_key.clone().unwrap_or_default())
            .with_api_base(settings.base_url()?);

        Ok(Self {
            client: Client::with_config(openai_config),
            provider: settings.provider.clone(),
            model_name: settings.model()?,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            has_api_key: settings.has_api_key(),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 发送聊天请求
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（已去除首尾空白）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, SummarizeError> {
        if !self.has_api_key {
            return Err(SummarizeError::llm_unavailable(format!(
                "{} 未配置 API key",
                self.provider
            )));
        }

        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let request = self
            .build_request(user_message, system_message)
            .map_err(|e| SummarizeError::llm_unavailable(format!("构建请求失败: {}", e)))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            let kind = classify_error(&e);
            warn!("LLM API 调用失败 ({}): {}", kind, e);
            SummarizeError::new(kind, format!("{} ({}): {}", self.provider, self.model_name, e))
        })?;

        debug!("LLM API 调用成功");

        let choice = response
            .choices
            .first()
            .ok_or_else(|| SummarizeError::llm_unavailable("LLM 返回结果为空"))?;

        if let Some(refusal) = choice.message.refusal.as_deref() {
            return Err(SummarizeError::refused(refusal.to_string()));
        }
        if matches!(choice.finish_reason, Some(FinishReason::ContentFilter)) {
            return Err(SummarizeError::refused("输出被内容过滤拦截"));
        }

        let content = choice
            .message
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| SummarizeError::llm_unavailable("LLM 返回内容为空"))?;

        Ok(content.to_string())
    }

    #[allow(deprecated)]
    fn build_request(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<async_openai::types::chat::CreateChatCompletionRequest, OpenAIError> {
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
    }
}

/// 把 API 错误归类为失败类型
fn classify_error(err: &OpenAIError) -> FailureKind {
    if let OpenAIError::Reqwest(e) = err {
        return match e.status().map(|s| s.as_u16()) {
            Some(429) => FailureKind::LlmRateLimited,
            _ => FailureKind::LlmUnavailable,
        };
    }
    classify_message(&err.to_string())
}

/// 按错误信息归类：限流优先于拒绝，其余都视为服务不可用
pub(crate) fn classify_message(message: &str) -> FailureKind {
    let lower = message.to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureKind::LlmRateLimited
    } else if REFUSAL_MARKERS.iter().any(|m| lower.contains(m)) {
        FailureKind::LlmRefused
    } else {
        FailureKind::LlmUnavailable
    }
}
