//! Image text recognition through a remote OCR service (Baidu `general_basic`).

use crate::{
    config::Ocr as OcrConfig,
    document::{ErrorKind, ExtractionResult, Failure},
    http::{ApiKey, HttpRequest, Transport},
};
use base64::Engine as _;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Anything that turns image bytes into text.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> ExtractionResult;
}

impl<R: Recognizer + ?Sized> Recognizer for std::sync::Arc<R> {
    fn recognize(&self, image: &[u8]) -> ExtractionResult {
        (**self).recognize(image)
    }
}

/// Credentials for the OCR service.
#[derive(Debug, Clone)]
pub enum OcrCredentials {
    /// A ready access token.
    AccessToken(ApiKey),
    /// Key pair exchanged for an access token on every call.
    KeyPair { api_key: ApiKey, secret_key: ApiKey },
}

impl OcrCredentials {
    /// Resolves credentials from the environment variables named in the config.
    pub fn from_env(cfg: &OcrConfig) -> Option<Self> {
        if let Some(token) = ApiKey::from_env(&cfg.access_token_env) {
            return Some(OcrCredentials::AccessToken(token));
        }
        let api_key = ApiKey::from_env(&cfg.api_key_env)?;
        let secret_key = ApiKey::from_env(&cfg.secret_key_env)?;
        Some(OcrCredentials::KeyPair {
            api_key,
            secret_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    words_result: Option<Vec<WordsLine>>,
    error_code: Option<serde_json::Value>,
    error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WordsLine {
    #[serde(default)]
    words: String,
}

pub struct OcrClient<T: Transport> {
    cfg: OcrConfig,
    credentials: Option<OcrCredentials>,
    transport: T,
}

impl<T: Transport> OcrClient<T> {
    pub fn new(cfg: &OcrConfig, credentials: Option<OcrCredentials>, transport: T) -> Self {
        Self {
            cfg: cfg.clone(),
            credentials,
            transport,
        }
    }

    fn access_token(&self) -> Result<ApiKey, Failure> {
        let creds = self.credentials.as_ref().ok_or_else(|| {
            ocr_failure(format!(
                "no OCR credentials configured (set {} or {} and {})",
                self.cfg.access_token_env, self.cfg.api_key_env, self.cfg.secret_key_env
            ))
        })?;

        let (api_key, secret_key) = match creds {
            OcrCredentials::AccessToken(token) => return Ok(token.clone()),
            OcrCredentials::KeyPair {
                api_key,
                secret_key,
            } => (api_key, secret_key),
        };

        let req = HttpRequest::post_form(
            &self.cfg.token_endpoint,
            vec![
                ("grant_type".into(), "client_credentials".into()),
                ("client_id".into(), api_key.expose().to_string()),
                ("client_secret".into(), secret_key.expose().to_string()),
            ],
            self.cfg.timeout(),
        );
        let reply = self
            .transport
            .send(&req)
            .map_err(|e| ocr_failure(format!("token request failed: {e}")))?;
        if !reply.is_success() {
            return Err(ocr_failure(format!("token request failed: HTTP {}", reply.status)));
        }

        let parsed: TokenResponse = serde_json::from_str(&reply.body)
            .map_err(|_| ocr_failure("token response was not valid JSON"))?;
        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok(ApiKey::new(token)),
            _ => Err(ocr_failure(format!(
                "token request rejected: {}",
                parsed
                    .error_description
                    .or(parsed.error)
                    .unwrap_or_else(|| "no access_token in response".into())
            ))),
        }
    }

    fn options(&self) -> Vec<(String, String)> {
        vec![
            ("language_type".into(), self.cfg.language_type.clone()),
            ("detect_direction".into(), self.cfg.detect_direction.to_string()),
            ("detect_language".into(), self.cfg.detect_language.to_string()),
            ("probability".into(), self.cfg.probability.to_string()),
        ]
    }
}

impl<T: Transport> Recognizer for OcrClient<T> {
    fn recognize(&self, image: &[u8]) -> ExtractionResult {
        let token = self.access_token()?;

        let mut form = vec![(
            "image".to_string(),
            base64::engine::general_purpose::STANDARD.encode(image),
        )];
        form.extend(self.options());

        debug!(image_bytes = image.len(), "ocr request");
        let req = HttpRequest::post_form(&self.cfg.endpoint, form, self.cfg.timeout())
            .query("access_token", token.expose());
        let reply = self
            .transport
            .send(&req)
            .map_err(|e| ocr_failure(e.to_string()))?;
        if !reply.is_success() {
            warn!(status = reply.status, "ocr service returned an error status");
            return Err(ocr_failure(format!("OCR service returned HTTP {}", reply.status)));
        }

        let text = parse_ocr_response(&reply.body)?;
        info!(chars = text.chars().count(), "ocr recognized text");
        Ok(text)
    }
}

/// Joins the recognized lines in the order the service returned them.
///
/// A body without `words_result` (and without an error code) means no text was
/// found and yields an empty string.
pub fn parse_ocr_response(body: &str) -> ExtractionResult {
    let parsed: OcrResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(_) => {
            warn!("ocr response was not valid JSON; treating as no text");
            return Ok(String::new());
        }
    };

    if let Some(code) = parsed.error_code {
        return Err(ocr_failure(format!(
            "service error {}: {}",
            code,
            parsed.error_msg.unwrap_or_default()
        )));
    }

    Ok(parsed
        .words_result
        .unwrap_or_default()
        .into_iter()
        .map(|l| l.words)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn ocr_failure(detail: impl AsRef<str>) -> Failure {
    Failure::new(
        ErrorKind::OcrError,
        format!("image OCR error: {}", detail.as_ref()),
    )
}
