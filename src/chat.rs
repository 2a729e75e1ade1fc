use crate::{
    completion::{ChatMessage, CompletionClient},
    config::Chat as ChatConfig,
    http::Transport,
};
use std::collections::VecDeque;
use tracing::{info, warn};

/// Short rolling conversation for one chat user. Lives only in memory.
#[derive(Debug, Clone)]
pub struct ChatSession {
    user: String,
    system_prompt: String,
    max_context: usize,
    fallback_reply: String,
    history: VecDeque<ChatMessage>,
}

impl ChatSession {
    pub fn new(cfg: &ChatConfig, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            system_prompt: cfg.system_prompt.clone(),
            max_context: cfg.max_context_messages.max(1),
            fallback_reply: cfg.fallback_reply.clone(),
            history: VecDeque::new(),
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.history.iter()
    }

    /// Sends `text` with the recent context and returns the model's reply, or
    /// the fallback reply if the call failed.
    pub fn reply<T: Transport>(&mut self, client: &CompletionClient<T>, text: &str) -> String {
        info!(user = %self.user, chars = text.chars().count(), "chat message received");

        self.history.push_back(ChatMessage::user(text));
        while self.history.len() > self.max_context {
            self.history.pop_front();
        }

        let mut messages = Vec::with_capacity(self.history.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.as_str()));
        }
        messages.extend(self.history.iter().cloned());

        match client.complete_messages(&messages) {
            Ok(reply) => {
                self.history.push_back(ChatMessage::assistant(reply.as_str()));
                reply
            }
            Err(failure) => {
                warn!(user = %self.user, kind = %failure.kind, "chat completion failed: {failure}");
                self.fallback_reply.clone()
            }
        }
    }
}
