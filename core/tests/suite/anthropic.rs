use core_test_support::ANTHROPIC_TEST_KEY;
use core_test_support::anthropic_batch;
use core_test_support::anthropic_message;
use core_test_support::anthropic_result_line;
use core_test_support::anthropic_translator;
use core_test_support::jsonl;
use dualtrans_core::BatchStatus;
use dualtrans_core::TranslationError;
use dualtrans_core::TranslationRequest;
use dualtrans_core::build_prompt;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    serde_json::from_slice(&requests.last().unwrap().body).unwrap()
}

#[tokio::test]
async fn translate_returns_reply_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", ANTHROPIC_TEST_KEY))
        .and(header("anthropic-version", "2023-06-01"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_message("<p>Dzień dobry</p>")))
        .expect(1)
        .mount(&server)
        .await;

    let translator = anthropic_translator(&server);
    let translated = translator
        .translate("<p>Dobrý den</p>", "cs", "pl", 4096)
        .await
        .unwrap();

    assert_eq!(translated, "<p>Dzień dobry</p>");

    let body = last_body(&server).await;
    assert_eq!(body["model"], "claude-sonnet-4-5-20250929");
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(
        body["messages"][0]["content"],
        build_prompt("<p>Dobrý den</p>", "cs", "pl")
    );
}

#[tokio::test]
async fn translate_strips_fenced_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(anthropic_message("```html\n<p>Hello</p>\n```")),
        )
        .mount(&server)
        .await;

    let translated = anthropic_translator(&server)
        .translate("<p>Ahoj</p>", "cs", "en", 512)
        .await
        .unwrap();
    assert_eq!(translated, "<p>Hello</p>");
}

#[tokio::test]
async fn converse_merges_options_and_keeps_reply_raw() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(anthropic_message("```\nWarsaw\n```")),
        )
        .mount(&server)
        .await;

    let extra = json!({"temperature": 0.0, "system": "Answer briefly."});
    let reply = anthropic_translator(&server)
        .converse("What is the capital of Poland?", 2048, extra.as_object())
        .await
        .unwrap();

    assert_eq!(reply, "```\nWarsaw\n```");
    let body = last_body(&server).await;
    assert_eq!(body["max_tokens"], 2048);
    assert_eq!(body["system"], "Answer briefly.");
    assert_eq!(body["messages"][0]["content"], "What is the capital of Poland?");
}

#[tokio::test]
async fn reply_without_text_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": "format"})))
        .mount(&server)
        .await;

    let err = anthropic_translator(&server)
        .converse("Test", 16, None)
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::MalformedResponse { .. }), "{err:?}");
}

#[tokio::test]
async fn create_batch_posts_requests_inline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/batches"))
        .and(header("x-api-key", ANTHROPIC_TEST_KEY))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(anthropic_batch("msgbatch_01", "in_progress", 0, 2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let requests = vec![
        TranslationRequest::new("article-1", "<p>Dobrý den</p>", "cs", "pl"),
        TranslationRequest::new("article-2", "<p>Hello</p>", "en", "cs"),
    ];
    let job = anthropic_translator(&server)
        .create_batch(&requests, 1024)
        .await
        .unwrap();

    assert_eq!(job.id, "msgbatch_01");
    assert_eq!(job.status, BatchStatus::InProgress);
    assert_eq!(job.request_count, 2);

    let body = last_body(&server).await;
    let items = body["requests"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["custom_id"], "article-1");
    assert_eq!(items[1]["custom_id"], "article-2");
    assert_eq!(items[1]["params"]["max_tokens"], 1024);
    assert_eq!(items[1]["params"]["model"], "claude-sonnet-4-5-20250929");
    assert_eq!(
        items[1]["params"]["messages"][0]["content"],
        build_prompt("<p>Hello</p>", "en", "cs")
    );
}

#[tokio::test]
async fn batch_results_decode_one_entry_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(anthropic_batch("msgbatch_01", "ended", 2, 0)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_01/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonl(&[
            anthropic_result_line("article-1", "```html\n<p>Dzień dobry</p>\n```"),
            anthropic_result_line("article-2", "<p>Dobrý den</p>"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let translator = anthropic_translator(&server);
    let status = translator.get_batch_status("msgbatch_01").await.unwrap();
    assert_eq!(status.status, BatchStatus::Completed);
    assert_eq!(status.succeeded_count, 2);

    let entries = translator.get_batch_results("msgbatch_01").await.unwrap();
    let ids: Vec<_> = entries.iter().map(|e| e.custom_id.as_str()).collect();
    assert_eq!(ids, vec!["article-1", "article-2"]);
    assert_eq!(entries[0].text.as_deref(), Some("<p>Dzień dobry</p>"));
    assert_eq!(entries[1].text.as_deref(), Some("<p>Dobrý den</p>"));
    assert_eq!(entries[1].raw["result"]["type"], "succeeded");
}

#[tokio::test]
async fn results_before_batch_ends_are_not_ready() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(anthropic_batch("msgbatch_01", "in_progress", 0, 5)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_01/results"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = anthropic_translator(&server)
        .get_batch_results("msgbatch_01")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, TranslationError::BatchNotReady { status, .. } if status == "in_progress"),
        "{err:?}"
    );
}

#[tokio::test]
async fn ended_batch_without_results_url_is_not_ready() {
    let server = MockServer::start().await;
    let mut batch = anthropic_batch("msgbatch_01", "ended", 2, 0);
    batch["results_url"] = Value::Null;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_01/results"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = anthropic_translator(&server)
        .get_batch_results("msgbatch_01")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, TranslationError::BatchNotReady { status, .. } if status == "ended"),
        "{err:?}"
    );
}

#[tokio::test]
async fn cancel_returns_vendor_acknowledgement() {
    let server = MockServer::start().await;
    let ack = anthropic_batch("msgbatch_01", "canceling", 0, 3);
    Mock::given(method("POST"))
        .and(path("/v1/messages/batches/msgbatch_01/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ack.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let returned = anthropic_translator(&server)
        .cancel_batch("msgbatch_01")
        .await
        .unwrap();
    assert_eq!(returned, ack);
}

#[tokio::test]
async fn list_clamps_limit_to_page_ceiling() {
    let server = MockServer::start().await;
    let page = json!({"data": [anthropic_batch("msgbatch_01", "ended", 1, 0)], "has_more": false});
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let listed = anthropic_translator(&server).list_batches(1_000).await.unwrap();
    assert_eq!(listed, page);
}
