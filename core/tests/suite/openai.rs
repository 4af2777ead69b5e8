use core_test_support::jsonl;
use core_test_support::openai_batch;
use core_test_support::openai_error_line;
use core_test_support::openai_completion;
use core_test_support::openai_result_line;
use core_test_support::openai_translator;
use dualtrans_core::BatchStatus;
use dualtrans_core::TranslationError;
use dualtrans_core::TranslationRequest;
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

const BEARER: &str = "Bearer sk-openai-test-key-12345";

#[tokio::test]
async fn translate_strips_fenced_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", BEARER))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(openai_completion("```html\n<p>Hello</p>\n```")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let translated = openai_translator(&server)
        .translate("<p>Ahoj</p>", "cs", "en", 4096)
        .await
        .unwrap();
    assert_eq!(translated, "<p>Hello</p>");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn converse_forwards_extra_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_completion("Warsaw")))
        .mount(&server)
        .await;

    let extra = json!({"temperature": 0.2});
    let reply = openai_translator(&server)
        .converse("Capital of Poland?", 64, extra.as_object())
        .await
        .unwrap();
    assert_eq!(reply, "Warsaw");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["temperature"], 0.2);
    assert_eq!(body["messages"][0]["content"], "Capital of Poland?");
}

#[tokio::test]
async fn create_batch_uploads_file_then_creates_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/files"))
        .and(header("authorization", BEARER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-abc123",
            "object": "file",
            "purpose": "batch",
            "filename": "batch-translations.jsonl"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/batches"))
        .and(header("authorization", BEARER))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(openai_batch("batch_01", "validating", 2, None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let requests = vec![
        TranslationRequest::new("article-1", "<p>Dobrý den</p>", "cs", "pl"),
        TranslationRequest::new("article-2", "<p>Hello</p>", "en", "cs"),
    ];
    let job = openai_translator(&server)
        .create_batch(&requests, 1024)
        .await
        .unwrap();

    assert_eq!(job.id, "batch_01");
    assert_eq!(job.status, BatchStatus::Validating);
    assert_eq!(job.request_count, 2);
    assert!(job.created_at.is_some());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);

    let upload = String::from_utf8_lossy(&received[0].body);
    assert!(upload.contains("name=\"purpose\""), "{upload}");
    assert!(upload.contains("batch"), "{upload}");
    assert!(upload.contains("batch-translations.jsonl"), "{upload}");
    assert!(upload.contains("\"custom_id\":\"article-1\""), "{upload}");
    assert!(upload.contains("\"custom_id\":\"article-2\""), "{upload}");
    assert!(upload.contains("\"url\":\"/v1/chat/completions\""), "{upload}");

    let create: Value = serde_json::from_slice(&received[1].body).unwrap();
    assert_eq!(
        create,
        json!({
            "input_file_id": "file-abc123",
            "endpoint": "/v1/chat/completions",
            "completion_window": "24h"
        })
    );
}

#[tokio::test]
async fn results_come_from_output_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/batches/batch_01"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(openai_batch("batch_01", "completed", 2, Some("file-out"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/files/file-out/content"))
        .and(header("authorization", BEARER))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonl(&[
            openai_result_line("article-1", "```html\n<p>Dzień dobry</p>\n```"),
            openai_result_line("article-2", "<p>Dobrý den</p>"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let translator = openai_translator(&server);
    let status = translator.get_batch_status("batch_01").await.unwrap();
    assert_eq!(status.status, BatchStatus::Completed);
    assert_eq!(status.output_handle.as_deref(), Some("file-out"));
    assert_eq!(status.succeeded_count, 2);

    let entries = translator.get_batch_results("batch_01").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].custom_id, "article-1");
    assert_eq!(entries[0].text.as_deref(), Some("<p>Dzień dobry</p>"));
    assert_eq!(entries[1].custom_id, "article-2");
    assert_eq!(entries[1].raw["response"]["status_code"], 200);
}

#[tokio::test]
async fn failed_items_come_from_error_file() {
    let server = MockServer::start().await;
    let mut batch = openai_batch("batch_01", "completed", 2, Some("file-out"));
    batch["error_file_id"] = json!("file-err");
    Mock::given(method("GET"))
        .and(path("/v1/batches/batch_01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/files/file-out/content"))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonl(&[openai_result_line(
            "article-1",
            "<p>Dzień dobry</p>",
        )])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/files/file-err/content"))
        .and(header("authorization", BEARER))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonl(&[openai_error_line(
            "article-2",
            "max_tokens is too large",
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let entries = openai_translator(&server)
        .get_batch_results("batch_01")
        .await
        .unwrap();

    let ids: Vec<_> = entries.iter().map(|e| e.custom_id.as_str()).collect();
    assert_eq!(ids, vec!["article-1", "article-2"]);
    assert_eq!(entries[0].text.as_deref(), Some("<p>Dzień dobry</p>"));
    assert_eq!(entries[1].text, None);
    assert_eq!(entries[1].raw["response"]["status_code"], 400);
}

#[tokio::test]
async fn batch_where_every_item_failed_still_has_results() {
    let server = MockServer::start().await;
    let mut batch = openai_batch("batch_01", "completed", 2, None);
    batch["error_file_id"] = json!("file-err");
    batch["request_counts"] = json!({"total": 2, "completed": 0, "failed": 2});
    Mock::given(method("GET"))
        .and(path("/v1/batches/batch_01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/files/file-err/content"))
        .respond_with(ResponseTemplate::new(200).set_body_string(jsonl(&[
            openai_error_line("article-1", "invalid model"),
            openai_error_line("article-2", "invalid model"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let translator = openai_translator(&server);
    let status = translator.get_batch_status("batch_01").await.unwrap();
    assert_eq!(status.failed_count, 2);
    assert_eq!(status.error_handle.as_deref(), Some("file-err"));

    let entries = translator.get_batch_results("batch_01").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.text.is_none()));
}

#[tokio::test]
async fn failed_batch_without_files_has_no_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/batches/batch_01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(openai_batch("batch_01", "failed", 0, None)),
        )
        .mount(&server)
        .await;

    let entries = openai_translator(&server)
        .get_batch_results("batch_01")
        .await
        .unwrap();
    assert!(entries.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn results_without_output_file_are_not_ready() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/batches/batch_01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(openai_batch("batch_01", "in_progress", 3, None)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/files/file-out/content"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = openai_translator(&server)
        .get_batch_results("batch_01")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, TranslationError::BatchNotReady { batch_id, status }
            if batch_id == "batch_01" && status == "in_progress"),
        "{err:?}"
    );
}

#[tokio::test]
async fn cancel_and_list_pass_vendor_payloads_through() {
    let server = MockServer::start().await;
    let ack = openai_batch("batch_01", "cancelling", 3, None);
    Mock::given(method("POST"))
        .and(path("/v1/batches/batch_01/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ack.clone()))
        .expect(1)
        .mount(&server)
        .await;
    let page = json!({"object": "list", "data": [], "has_more": false});
    Mock::given(method("GET"))
        .and(path("/v1/batches"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let translator = openai_translator(&server);
    assert_eq!(translator.cancel_batch("batch_01").await.unwrap(), ack);
    assert_eq!(translator.list_batches(0).await.unwrap(), page);
}

#[tokio::test]
async fn oversized_batch_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let requests: Vec<_> = (0..50_001)
        .map(|i| TranslationRequest::new(format!("r{i}"), "<p>x</p>", "cs", "pl"))
        .collect();
    let err = openai_translator(&server)
        .create_batch(&requests, 16)
        .await
        .unwrap_err();
    assert!(
        matches!(err, TranslationError::BatchSizeExceeded { count: 50_001, max: 50_000, .. }),
        "{err:?}"
    );
}
