use crate::{
    completion::{CancelToken, CompletionClient},
    config::Config,
    dispatch::Dispatcher,
    document::{AnalysisRequest, Document},
    http::Transport,
    normalize,
};
use std::time::Instant;
use tracing::{info, warn};

pub const MISSING_DOCUMENT: &str = "please upload a file";
pub const NO_TEXT_FOUND: &str = "no text could be extracted from the document";

/// Extraction followed by analysis. Holds no per-request state, so one
/// pipeline can serve concurrent callers.
pub struct Pipeline<T: Transport> {
    cfg: Config,
    dispatcher: Dispatcher,
    completion: CompletionClient<T>,
}

/// What the pipeline hands back to its caller: both fields are always
/// displayable, failures included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub extracted_text: String,
    pub analysis: String,
}

impl PipelineOutput {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            extracted_text: message.into(),
            analysis: String::new(),
        }
    }

    pub fn into_pair(self) -> (String, String) {
        (self.extracted_text, self.analysis)
    }
}

impl<T: Transport> Pipeline<T> {
    pub fn new(cfg: &Config, dispatcher: Dispatcher, completion: CompletionClient<T>) -> Self {
        Self {
            cfg: cfg.clone(),
            dispatcher,
            completion,
        }
    }

    /// Returns `(extracted_text, analysis)`. Never fails: every error becomes
    /// a message in the first slot with an empty analysis, or a message in the
    /// analysis slot when only the model call failed.
    pub fn analyze(&self, document: Option<&Document>, prompt: Option<&str>) -> (String, String) {
        self.run(document, prompt, &CancelToken::new()).into_pair()
    }

    pub fn analyze_with_cancel(
        &self,
        document: Option<&Document>,
        prompt: Option<&str>,
        cancel: &CancelToken,
    ) -> (String, String) {
        self.run(document, prompt, cancel).into_pair()
    }

    pub fn run(&self, document: Option<&Document>, prompt: Option<&str>, cancel: &CancelToken) -> PipelineOutput {
        let Some(doc) = document.filter(|d| !d.extension.is_empty()) else {
            return PipelineOutput::failed(MISSING_DOCUMENT);
        };

        let started = Instant::now();
        info!(path = %doc.path.display(), ext = %doc.extension, bytes = doc.size_bytes, "analyzing document");

        let raw = match self.dispatcher.dispatch(doc) {
            Ok(text) => text,
            Err(failure) => {
                warn!(kind = %failure.kind, "extraction failed: {failure}");
                return PipelineOutput::failed(failure.message);
            }
        };

        let text = match normalize::tidy_extracted(&self.cfg.text, &raw) {
            Ok(t) => t,
            Err(err) => {
                warn!("text cleanup failed, using raw extraction: {err:#}");
                raw
            }
        };
        if text.trim().is_empty() {
            info!("document contained no text; skipping analysis");
            return PipelineOutput::failed(NO_TEXT_FOUND);
        }

        let request = AnalysisRequest::new(prompt, text.clone());
        let analysis = match self.completion.complete_with_cancel(&request, cancel) {
            Ok(content) => content,
            Err(failure) => failure.message,
        };

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            extracted_chars = text.chars().count(),
            "analysis finished"
        );
        PipelineOutput {
            extracted_text: text,
            analysis,
        }
    }
}
