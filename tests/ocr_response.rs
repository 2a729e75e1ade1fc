mod common;

use common::{FakeTransport, reply};
use doc_analyst::{
    config::Config,
    document::ErrorKind,
    http::{ApiKey, RequestBody},
    ocr::{OcrClient, OcrCredentials, Recognizer, parse_ocr_response},
};
use std::sync::Arc;

#[test]
fn lines_are_joined_in_service_order() {
    let body = r#"{"log_id": 1, "words_result_num": 3,
        "words_result": [{"words": "第三季度"}, {"words": "Revenue"}, {"words": "rose 12%"}]}"#;
    assert_eq!(parse_ocr_response(body).unwrap(), "第三季度\nRevenue\nrose 12%");
}

#[test]
fn missing_results_is_empty_text() {
    assert_eq!(parse_ocr_response(r#"{"log_id": 7}"#).unwrap(), "");
    assert_eq!(parse_ocr_response(r#"{"words_result": []}"#).unwrap(), "");
    assert_eq!(parse_ocr_response("").unwrap(), "");
    assert_eq!(parse_ocr_response("<html>oops</html>").unwrap(), "");
}

#[test]
fn service_error_code_is_ocr_error() {
    let err = parse_ocr_response(r#"{"error_code": 110, "error_msg": "Access token invalid"}"#)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::OcrError);
    assert!(err.message.contains("110"));
    assert!(err.message.contains("Access token invalid"));
}

#[test]
fn exchanges_key_pair_for_token_then_recognizes() {
    let cfg = Config::default();
    let transport = Arc::new(FakeTransport::new(vec![
        reply(200, r#"{"access_token": "tok-123", "expires_in": 2592000}"#),
        reply(200, r#"{"words_result": [{"words": "hello"}]}"#),
    ]));
    let client = OcrClient::new(
        &cfg.ocr,
        Some(OcrCredentials::KeyPair {
            api_key: ApiKey::new("ak"),
            secret_key: ApiKey::new("sk"),
        }),
        Arc::clone(&transport),
    );

    assert_eq!(client.recognize(b"\x89PNG fake").unwrap(), "hello");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, cfg.ocr.token_endpoint);
    assert_eq!(requests[1].url, cfg.ocr.endpoint);
    assert!(requests[1].query.contains(&("access_token".to_string(), "tok-123".to_string())));
    let RequestBody::Form(fields) = &requests[1].body else {
        panic!("expected a form body");
    };
    assert!(fields.contains(&("language_type".to_string(), "CHN_ENG".to_string())));
    assert!(fields.contains(&("detect_direction".to_string(), "true".to_string())));
    assert!(fields.contains(&("probability".to_string(), "true".to_string())));
    assert!(fields.iter().any(|(k, v)| k == "image" && !v.is_empty()));
}

#[test]
fn network_failure_is_ocr_error() {
    let cfg = Config::default();
    let transport = FakeTransport::new(vec![]);
    let client = OcrClient::new(
        &cfg.ocr,
        Some(OcrCredentials::AccessToken(ApiKey::new("tok"))),
        transport,
    );
    let err = client.recognize(b"img").unwrap_err();
    assert_eq!(err.kind, ErrorKind::OcrError);
}

#[test]
fn missing_credentials_is_ocr_error() {
    let cfg = Config::default();
    let client = OcrClient::new(&cfg.ocr, None, FakeTransport::new(vec![]));
    let err = client.recognize(b"img").unwrap_err();
    assert_eq!(err.kind, ErrorKind::OcrError);
    assert!(err.message.contains(&cfg.ocr.api_key_env));
}
