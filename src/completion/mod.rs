//! Chat-completion client with bounded retries.
//!
//! One POST per attempt, at most `retry.max_attempts` attempts, exponential
//! backoff between them and an overall deadline across the whole call.
//! 401, 429 and malformed 2xx bodies end the call immediately.

pub mod retry;

use crate::{
    config::Config,
    document::{AnalysisRequest, AnalysisResult, ErrorKind, Failure},
    http::{ApiKey, HttpReply, HttpRequest, Transport, TransportError},
    normalize,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use retry::{CancelToken, Clock, RetryPolicy, RetryState, SystemClock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct CompletionClient<T: Transport> {
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    api_key: ApiKey,
    policy: RetryPolicy,
    transport: T,
    clock: Arc<dyn Clock>,
}

impl<T: Transport> CompletionClient<T> {
    pub fn new(cfg: &Config, api_key: ApiKey, transport: T) -> Self {
        Self {
            endpoint: cfg.completion.endpoint.clone(),
            model: cfg.completion.model.clone(),
            temperature: cfg.completion.temperature,
            max_tokens: cfg.completion.max_tokens,
            timeout: cfg.completion.timeout(),
            api_key,
            policy: RetryPolicy::from_config(&cfg.retry),
            transport,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn complete(&self, req: &AnalysisRequest) -> AnalysisResult {
        self.complete_with_cancel(req, &CancelToken::new())
    }

    pub fn complete_with_cancel(&self, req: &AnalysisRequest, cancel: &CancelToken) -> AnalysisResult {
        let messages = [ChatMessage::user(req.message_text())];
        self.complete_messages_with_cancel(&messages, cancel)
    }

    pub fn complete_messages(&self, messages: &[ChatMessage]) -> AnalysisResult {
        self.complete_messages_with_cancel(messages, &CancelToken::new())
    }

    pub fn complete_messages_with_cancel(
        &self,
        messages: &[ChatMessage],
        cancel: &CancelToken,
    ) -> AnalysisResult {
        let messages: Vec<ChatMessage> = messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.clone(),
                content: normalize::canonicalize(&m.content),
            })
            .collect();
        let body = serde_json::to_value(CompletionBody {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
        .map_err(|e| Failure::new(ErrorKind::MalformedResponse, format!("encoding request: {e}")))?;

        debug!(
            messages = messages.len(),
            chars = messages.iter().map(|m| m.content.chars().count()).sum::<usize>(),
            "completion request"
        );

        let mut state = RetryState::new(&self.policy, self.clock.now());
        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let timeout = match state.remaining(self.clock.now()) {
                Some(remaining) if remaining.is_zero() => return Err(state.into_failure()),
                Some(remaining) => self.timeout.min(remaining),
                None => self.timeout,
            };

            state.attempt += 1;
            let req = HttpRequest::post_json(&self.endpoint, body.clone(), timeout).bearer(&self.api_key);
            let failure = match self.transport.send(&req) {
                Ok(reply) => match classify(reply) {
                    Ok(content) => {
                        info!(attempt = state.attempt, "completion succeeded");
                        return Ok(content);
                    }
                    Err(f) => f,
                },
                Err(err) => network_failure(&err),
            };

            if !failure.kind.is_retryable() {
                warn!(attempt = state.attempt, kind = %failure.kind, "completion failed: {}", failure);
                return Err(failure);
            }

            state.next_backoff = self.policy.backoff(state.attempt);
            state.last_error = Some(failure);

            if state.attempt >= self.policy.max_attempts {
                warn!(attempts = state.attempt, "completion retries exhausted");
                return Err(state.into_failure());
            }
            if state.backoff_crosses_deadline(self.clock.now()) {
                warn!(attempt = state.attempt, "completion deadline reached; not retrying");
                return Err(state.into_failure());
            }

            warn!(
                attempt = state.attempt,
                backoff_ms = state.next_backoff.as_millis() as u64,
                "completion attempt failed: {}",
                state.last_error.as_ref().map(|f| f.message.as_str()).unwrap_or_default()
            );
            self.clock.sleep(state.next_backoff);
        }
    }
}

fn cancelled() -> Failure {
    Failure::new(ErrorKind::Cancelled, "request cancelled")
}

fn network_failure(err: &TransportError) -> Failure {
    Failure::new(ErrorKind::NetworkError, format!("network request error: {err}"))
}

/// Maps one HTTP reply onto the content string or a classified failure.
fn classify(reply: HttpReply) -> AnalysisResult {
    match reply.status {
        401 => {
            return Err(Failure::new(
                ErrorKind::InvalidCredential,
                "API key is invalid or expired (HTTP 401)",
            ));
        }
        429 => {
            return Err(Failure::new(
                ErrorKind::RateLimited,
                "API rate limit exceeded (HTTP 429); try again later",
            ));
        }
        _ if !reply.is_success() => {
            return Err(Failure::new(
                ErrorKind::HttpStatus,
                format!("API call failed: HTTP {}", reply.status),
            ));
        }
        _ => {}
    }

    let malformed = || {
        Failure::new(
            ErrorKind::MalformedResponse,
            "API returned an unexpected response format",
        )
    };
    let parsed: CompletionResponse = serde_json::from_str(&reply.body).map_err(|_| malformed())?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(malformed)
}
