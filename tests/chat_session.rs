mod common;

use common::{FakeClock, FakeTransport, completion_reply, reply};
use doc_analyst::{
    chat::ChatSession,
    completion::CompletionClient,
    config::Config,
    http::{ApiKey, RequestBody},
};
use std::sync::Arc;

fn sent_messages(transport: &FakeTransport, index: usize) -> Vec<serde_json::Value> {
    match &transport.requests()[index].body {
        RequestBody::Json(v) => v["messages"].as_array().unwrap().clone(),
        other => panic!("expected JSON body, got {other:?}"),
    }
}

#[test]
fn context_is_trimmed_and_system_prompt_leads() {
    let cfg = Config::default();
    let replies = (0..4).map(|i| completion_reply(&format!("reply {i}"))).collect();
    let transport = Arc::new(FakeTransport::new(replies));
    let client = CompletionClient::new(&cfg, ApiKey::new("k"), Arc::clone(&transport))
        .with_clock(Arc::new(FakeClock::new()));
    let mut session = ChatSession::new(&cfg.chat, "wxid_alice");

    for i in 0..4 {
        assert_eq!(session.reply(&client, &format!("msg {i}")), format!("reply {i}"));
    }

    let last = sent_messages(&transport, 3);
    assert_eq!(last[0]["role"], "system");
    assert_eq!(last[0]["content"], cfg.chat.system_prompt);
    // Seven messages were queued before trimming to the five most recent.
    assert_eq!(last.len(), 1 + cfg.chat.max_context_messages);
    assert_eq!(last.last().unwrap()["content"], "msg 3");
    assert_eq!(last[1]["content"], "msg 1");
    assert_eq!(last[2]["content"], "reply 1");
}

#[test]
fn failure_returns_fallback_reply() {
    let cfg = Config::default();
    let transport = Arc::new(FakeTransport::new(vec![reply(401, "")]));
    let client = CompletionClient::new(&cfg, ApiKey::new("k"), Arc::clone(&transport))
        .with_clock(Arc::new(FakeClock::new()));
    let mut session = ChatSession::new(&cfg.chat, "wxid_bob");

    assert_eq!(session.reply(&client, "hello?"), cfg.chat.fallback_reply);
    assert_eq!(session.history().count(), 1);
}
