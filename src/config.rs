//! 程序配置
//!
//! 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量。
//! 凭据只保存在这里，编排层只拿到 `PipelineOptions`。

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use phf::phf_map;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::orchestrator::PipelineOptions;
use crate::policy::RetryPolicy;

/// LLM 提供方的静态信息
#[derive(Debug)]
pub struct ProviderSpec {
    /// 存放 API key 的环境变量
    pub api_key_var: &'static str,
    /// 覆盖模型名称的环境变量
    pub model_var: &'static str,
    pub default_model: &'static str,
    /// OpenAI 兼容接口地址
    pub default_base_url: &'static str,
}

static PROVIDERS: phf::Map<&'static str, ProviderSpec> = phf_map! {
    "openai" => ProviderSpec {
        api_key_var: "OPENAI_API_KEY",
        model_var: "OPENAI_MODEL_NAME",
        default_model: "gpt-3.5-turbo",
        default_base_url: "https://api.openai.com/v1",
    },
    "anthropic" => ProviderSpec {
        api_key_var: "ANTHROPIC_API_KEY",
        model_var: "ANTHROPIC_MODEL_NAME",
        default_model: "claude-3-sonnet-20240229",
        default_base_url: "https://api.anthropic.com/v1",
    },
    "google" => ProviderSpec {
        api_key_var: "GOOGLE_API_KEY",
        model_var: "GOOGLE_MODEL_NAME",
        default_model: "gemini-pro",
        default_base_url: "https://generativelanguage.googleapis.com/v1beta/openai",
    },
};

/// 按名称查找提供方（不区分大小写）
pub fn provider_spec(name: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.get(name.trim().to_lowercase().as_str())
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 每次检索的最大论文数
    pub max_results: usize,
    /// 同时处理的论文数量
    pub concurrency: usize,
    /// 单次摘要尝试的超时（秒）
    pub per_paper_timeout_secs: u64,
    /// 单篇论文最多尝试次数（包含第一次）
    pub retry_max_attempts: u32,
    /// 退避基准时间（毫秒）
    pub retry_backoff_base_ms: u64,
    // --- arXiv ---
    pub arxiv_api_url: String,
    pub search_timeout_secs: u64,
    // --- PDF ---
    pub download_timeout_secs: u64,
    pub max_pdf_bytes: usize,
    /// 送入 LLM 的最大字符数
    pub max_input_chars: usize,
    // --- LLM ---
    pub llm: LlmSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_results: 10,
            concurrency: 4,
            per_paper_timeout_secs: 120,
            retry_max_attempts: 3,
            retry_backoff_base_ms: 1000,
            arxiv_api_url: "https://export.arxiv.org/api/query".to_string(),
            search_timeout_secs: 30,
            download_timeout_secs: 60,
            max_pdf_bytes: 20 * 1024 * 1024,
            max_input_chars: 60_000,
            llm: LlmSettings::default(),
        }
    }
}

/// LLM 配置
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: String,
    pub api_key: Option<String>,
    /// 为空时使用提供方的默认模型
    pub model_name: Option<String>,
    /// 为空时使用提供方的默认地址
    pub api_base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            model_name: None,
            api_base_url: None,
            temperature: 0.1,
            max_tokens: 250,
        }
    }
}

impl fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSettings")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model_name", &self.model_name)
            .field("api_base_url", &self.api_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LlmSettings {
    pub fn spec(&self) -> Result<&'static ProviderSpec, ConfigError> {
        provider_spec(&self.provider).ok_or_else(|| ConfigError::UnknownProvider(self.provider.clone()))
    }

    pub fn model(&self) -> Result<String, ConfigError> {
        match &self.model_name {
            Some(model) => Ok(model.clone()),
            None => Ok(self.spec()?.default_model.to_string()),
        }
    }

    pub fn base_url(&self) -> Result<String, ConfigError> {
        match &self.api_base_url {
            Some(url) => Ok(url.clone()),
            None => Ok(self.spec()?.default_base_url.to_string()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Config {
    /// 加载配置：默认值或配置文件，然后用环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.llm.spec()?;
        Ok(config)
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_parse("MAX_RESULTS")? {
            self.max_results = v;
        }
        if let Some(v) = env_parse("MAX_CONCURRENCY")? {
            self.concurrency = v;
        }
        if let Some(v) = env_parse("PER_PAPER_TIMEOUT_SECS")? {
            self.per_paper_timeout_secs = v;
        }
        if let Some(v) = env_parse("RETRY_MAX_ATTEMPTS")? {
            self.retry_max_attempts = v;
        }
        if let Some(v) = env_parse("RETRY_BACKOFF_BASE_MS")? {
            self.retry_backoff_base_ms = v;
        }
        if let Some(v) = env_string("ARXIV_API_URL") {
            self.arxiv_api_url = v;
        }
        if let Some(v) = env_parse("SEARCH_TIMEOUT_SECS")? {
            self.search_timeout_secs = v;
        }
        if let Some(v) = env_parse("DOWNLOAD_TIMEOUT_SECS")? {
            self.download_timeout_secs = v;
        }
        if let Some(v) = env_parse("MAX_PDF_BYTES")? {
            self.max_pdf_bytes = v;
        }
        if let Some(v) = env_parse("MAX_INPUT_CHARS")? {
            self.max_input_chars = v;
        }

        // --- LLM ---
        if let Some(provider) = env_string("LLM_PROVIDER") {
            self.llm.provider = provider.to_lowercase();
        }
        let spec = self.llm.spec()?;
        if let Some(key) = env_string(spec.api_key_var) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = env_string(spec.model_var) {
            self.llm.model_name = Some(model);
        }
        if let Some(url) = env_string("LLM_API_BASE_URL") {
            self.llm.api_base_url = Some(url);
        }
        if let Some(v) = env_parse("LLM_TEMPERATURE")? {
            self.llm.temperature = v;
        }
        if let Some(v) = env_parse("SUMMARY_MAX_TOKENS")? {
            self.llm.max_tokens = v;
        }

        Ok(())
    }

    /// 编排层参数
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_results: self.max_results,
            concurrency: self.concurrency,
            per_paper_timeout: Duration::from_secs(self.per_paper_timeout_secs),
            retry: RetryPolicy::exponential(
                self.retry_max_attempts,
                Duration::from_millis(self.retry_backoff_base_ms),
            ),
        }
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_results, 10);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.llm.model().unwrap(), "gpt-3.5-turbo");
        assert_eq!(config.llm.base_url().unwrap(), "https://api.openai.com/v1");
        assert!(!config.llm.has_api_key());
    }

    #[test]
    fn test_provider_lookup_is_case_insensitive() {
        let spec = provider_spec("Anthropic").unwrap();
        assert_eq!(spec.api_key_var, "ANTHROPIC_API_KEY");
        assert!(provider_spec("cohere").is_none());
    }

    #[test]
    fn test_toml_partial_override() {
        let content = r#"
            max_results = 5
            concurrency = 2

            [llm]
            provider = "google"
            max_tokens = 400
        "#;
        let config = Config::from_toml_str(content, "test.toml").unwrap();

        assert_eq!(config.max_results, 5);
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.per_paper_timeout_secs, 120);
        assert_eq!(config.llm.max_tokens, 400);
        assert_eq!(config.llm.model().unwrap(), "gemini-pro");
    }

    #[test]
    fn test_toml_unknown_provider_is_reported() {
        let config = Config::from_toml_str("[llm]\nprovider = \"cohere\"\n", "test.toml").unwrap();
        assert!(matches!(
            config.llm.spec(),
            Err(ConfigError::UnknownProvider(p)) if p == "cohere"
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml_str("max_results = \"many\"", "bad.toml");
        assert!(matches!(result, Err(ConfigError::TomlParseFailed { .. })));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let settings = LlmSettings {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_pipeline_options_from_config() {
        let config = Config {
            retry_max_attempts: 5,
            per_paper_timeout_secs: 30,
            ..Default::default()
        };
        let options = config.pipeline_options();
        assert_eq!(options.retry.max_attempts(), 5);
        assert_eq!(options.per_paper_timeout, Duration::from_secs(30));
    }
}
