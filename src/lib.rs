pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod extract;
pub mod http;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod util;

pub use document::{AnalysisRequest, AnalysisResult, Document, ErrorKind, ExtractionResult, Failure};
pub use pipeline::Pipeline;
