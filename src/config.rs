use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub completion: Completion,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub ocr: Ocr,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub text: Text,
    #[serde(default)]
    pub chat: Chat,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Completion {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for Completion {
    fn default() -> Self {
        Self {
            endpoint: "https://api.deepseek.com/v1/chat/completions".into(),
            model: "deepseek-chat".into(),
            api_key_env: "DEEPSEEK_API_KEY".into(),
            temperature: 0.7,
            max_tokens: 800,
            timeout_seconds: 30,
            user_agent: concat!("doc-analyst/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}
impl Completion {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Retry {
    pub max_attempts: u32,
    pub multiplier: f64,
    pub min_backoff_seconds: u64,
    pub max_backoff_seconds: u64,
    /// Upper bound on a whole completion call, retries included. 0 disables it.
    pub overall_deadline_seconds: u64,
}
impl Default for Retry {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: 1.0,
            min_backoff_seconds: 4,
            max_backoff_seconds: 10,
            overall_deadline_seconds: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocr {
    pub endpoint: String,
    pub token_endpoint: String,
    pub api_key_env: String,
    pub secret_key_env: String,
    /// When this variable is set, its value is used as the access token and the
    /// token exchange is skipped.
    pub access_token_env: String,
    pub language_type: String,
    pub detect_direction: bool,
    pub detect_language: bool,
    pub probability: bool,
    pub timeout_seconds: u64,
}
impl Default for Ocr {
    fn default() -> Self {
        Self {
            endpoint: "https://aip.baidubce.com/rest/2.0/ocr/v1/general_basic".into(),
            token_endpoint: "https://aip.baidubce.com/oauth/2.0/token".into(),
            api_key_env: "BAIDU_OCR_API_KEY".into(),
            secret_key_env: "BAIDU_OCR_SECRET_KEY".into(),
            access_token_env: "BAIDU_OCR_ACCESS_TOKEN".into(),
            language_type: "CHN_ENG".into(),
            detect_direction: true,
            detect_language: true,
            probability: true,
            timeout_seconds: 30,
        }
    }
}
impl Ocr {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_upload_bytes: u64,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Text {
    pub normalize_unicode: bool,
    pub normalize_newlines: bool,
    pub trim_trailing_whitespace: bool,
    pub collapse_blank_lines: bool,
    pub max_consecutive_blank_lines: u32,
    pub control_chars_to_sanitize: Vec<u8>,
}
impl Default for Text {
    fn default() -> Self {
        Self {
            normalize_unicode: true,
            normalize_newlines: true,
            trim_trailing_whitespace: true,
            collapse_blank_lines: true,
            max_consecutive_blank_lines: 2,
            // C0 controls minus \t \n \r, plus DEL.
            control_chars_to_sanitize: (0u8..32)
                .filter(|c| !matches!(c, 9 | 10 | 13))
                .chain(std::iter::once(127))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Chat {
    pub system_prompt: String,
    pub max_context_messages: usize,
    pub fallback_reply: String,
}
impl Default for Chat {
    fn default() -> Self {
        Self {
            system_prompt: "You are a friendly assistant. Answer briefly, in no more than 50 words."
                .into(),
            max_context_messages: 5,
            fallback_reply: "Sorry, I can't reply right now. Please try again later.".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "logs/doc-analyst.log".into(),
        }
    }
}
