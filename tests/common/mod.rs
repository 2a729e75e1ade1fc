#![allow(dead_code)]

use doc_analyst::{
    completion::Clock,
    document::ExtractionResult,
    extract::Extractor,
    http::{HttpReply, HttpRequest, Transport, TransportError},
    ocr::Recognizer,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Replays scripted replies in order and records every request.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new(replies: Vec<Result<HttpReply, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for FakeTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpReply, TransportError> {
        self.requests.lock().unwrap().push(req.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted reply".into())))
    }
}

pub fn reply(status: u16, body: &str) -> Result<HttpReply, TransportError> {
    Ok(HttpReply {
        status,
        body: body.to_string(),
    })
}

pub fn completion_reply(content: &str) -> Result<HttpReply, TransportError> {
    let body = serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    });
    reply(200, &body.to_string())
}

/// Virtual clock: `sleep` advances time instantly and is recorded.
pub struct FakeClock {
    start: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock().unwrap()
    }

    fn sleep(&self, dur: Duration) {
        *self.elapsed.lock().unwrap() += dur;
        self.sleeps.lock().unwrap().push(dur);
    }
}

/// Reads the file as UTF-8, standing in for a real document parser.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn extract(&self, path: &Path) -> anyhow::Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }
}

pub struct PanickingExtractor;

impl Extractor for PanickingExtractor {
    fn name(&self) -> &'static str {
        "PDF"
    }

    fn extract(&self, _path: &Path) -> anyhow::Result<String> {
        panic!("corrupt cross-reference table")
    }
}

/// OCR stand-in returning a fixed outcome and counting calls.
pub struct StaticRecognizer {
    outcome: ExtractionResult,
    calls: Mutex<usize>,
}

impl StaticRecognizer {
    pub fn new(outcome: ExtractionResult) -> Self {
        Self {
            outcome,
            calls: Mutex::new(0),
        }
    }
}

impl Recognizer for StaticRecognizer {
    fn recognize(&self, _image: &[u8]) -> ExtractionResult {
        *self.calls.lock().unwrap() += 1;
        self.outcome.clone()
    }
}

impl StaticRecognizer {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}
