mod common;

use common::{FakeClock, FakeTransport, PlainTextExtractor, StaticRecognizer, completion_reply, reply};
use doc_analyst::{
    Document, Pipeline,
    completion::{CancelToken, CompletionClient},
    config::Config,
    dispatch::{Dispatcher, Format},
    http::{ApiKey, RequestBody},
    pipeline::{MISSING_DOCUMENT, NO_TEXT_FOUND},
};
use std::sync::Arc;
use tempfile::TempDir;

fn pipeline(
    replies: Vec<Result<doc_analyst::http::HttpReply, doc_analyst::http::TransportError>>,
    ocr_text: &str,
) -> (Pipeline<Arc<FakeTransport>>, Arc<FakeTransport>) {
    let cfg = Config::default();
    let transport = Arc::new(FakeTransport::new(replies));
    let dispatcher = Dispatcher::new(&cfg.limits, Box::new(StaticRecognizer::new(Ok(ocr_text.to_string()))))
        .with_extractor(Format::Pdf, Box::new(PlainTextExtractor));
    let completion = CompletionClient::new(&cfg, ApiKey::new("sk-test"), Arc::clone(&transport))
        .with_clock(Arc::new(FakeClock::new()));
    (Pipeline::new(&cfg, dispatcher, completion), transport)
}

fn write(dir: &TempDir, name: &str, contents: &[u8]) -> Document {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    Document::from_path(&path)
}

#[test]
fn end_to_end_prompt_and_summary() {
    let dir = TempDir::new().unwrap();
    let doc = write(&dir, "q3.pdf", b"Q3 revenue rose 12%.");
    let (pipeline, transport) = pipeline(vec![completion_reply("<mocked model summary>")], "");

    let (text, analysis) = pipeline.analyze(Some(&doc), Some("summarize"));

    assert_eq!(text, "Q3 revenue rose 12%.");
    assert_eq!(analysis, "<mocked model summary>");
    let requests = transport.requests();
    let RequestBody::Json(body) = &requests[0].body else {
        panic!("expected JSON body");
    };
    assert_eq!(body["messages"][0]["content"], "summarize\n\nQ3 revenue rose 12%.");
}

#[test]
fn missing_document_asks_for_upload() {
    let (pipeline, transport) = pipeline(vec![], "");
    assert_eq!(
        pipeline.analyze(None, Some("summarize")),
        (MISSING_DOCUMENT.to_string(), String::new())
    );
    let no_ext = Document::new("/tmp/README", "", 10);
    assert_eq!(pipeline.analyze(Some(&no_ext), None).0, MISSING_DOCUMENT);
    assert_eq!(transport.calls(), 0);
}

#[test]
fn zero_byte_file_short_circuits() {
    let dir = TempDir::new().unwrap();
    let doc = write(&dir, "empty.pdf", b"");
    let (pipeline, transport) = pipeline(vec![completion_reply("never")], "");
    let (text, analysis) = pipeline.analyze(Some(&doc), None);
    assert!(!text.is_empty());
    assert_eq!(analysis, "");
    assert_eq!(transport.calls(), 0);
}

#[test]
fn unsupported_extension_names_the_extension() {
    let dir = TempDir::new().unwrap();
    let doc = write(&dir, "notes.txt", b"hello");
    let (pipeline, transport) = pipeline(vec![], "");
    let (text, analysis) = pipeline.analyze(Some(&doc), None);
    assert!(text.contains(".txt"));
    assert_eq!(analysis, "");
    assert_eq!(transport.calls(), 0);
}

#[test]
fn missing_file_is_reported() {
    let (pipeline, _) = pipeline(vec![], "");
    let doc = Document::new("/definitely/not/here.pdf", "pdf", 0);
    let (text, analysis) = pipeline.analyze(Some(&doc), None);
    assert!(text.contains("not found"));
    assert_eq!(analysis, "");
}

#[test]
fn image_without_text_skips_analysis() {
    let dir = TempDir::new().unwrap();
    let doc = write(&dir, "blank.PNG", b"\x89PNG\r\n\x1a\n");
    let (pipeline, transport) = pipeline(vec![completion_reply("never")], "");
    assert_eq!(
        pipeline.analyze(Some(&doc), None),
        (NO_TEXT_FOUND.to_string(), String::new())
    );
    assert_eq!(transport.calls(), 0);
}

#[test]
fn model_failure_lands_in_analysis_slot() {
    let dir = TempDir::new().unwrap();
    let doc = write(&dir, "scan.jpg", b"\xff\xd8\xff");
    let (pipeline, _) = pipeline(vec![reply(401, "")], "发票 No. 42");
    let (text, analysis) = pipeline.analyze(Some(&doc), Some("translate"));
    assert_eq!(text, "发票 No. 42");
    assert!(analysis.contains("401"));
}

#[test]
fn cancelled_request_keeps_extracted_text() {
    let dir = TempDir::new().unwrap();
    let doc = write(&dir, "memo.pdf", b"keep me");
    let (pipeline, transport) = pipeline(vec![completion_reply("never")], "");
    let cancel = CancelToken::new();
    cancel.cancel();
    let (text, analysis) = pipeline.analyze_with_cancel(Some(&doc), None, &cancel);
    assert_eq!(text, "keep me");
    assert_eq!(analysis, "request cancelled");
    assert_eq!(transport.calls(), 0);
}

#[test]
fn concurrent_callers_share_one_pipeline() {
    let dir = TempDir::new().unwrap();
    let docs: Vec<Document> = (0..4)
        .map(|i| write(&dir, &format!("doc{i}.pdf"), format!("body {i}").as_bytes()))
        .collect();
    let (pipeline, transport) = pipeline((0..4).map(|_| completion_reply("done")).collect(), "");

    std::thread::scope(|s| {
        for doc in &docs {
            let pipeline = &pipeline;
            s.spawn(move || {
                let (text, analysis) = pipeline.analyze(Some(doc), None);
                assert!(text.starts_with("body "));
                assert_eq!(analysis, "done");
            });
        }
    });
    assert_eq!(transport.calls(), 4);
}
