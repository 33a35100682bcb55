use std::time::Duration;

use serde_json::json;
use trend_digest::ai::build_http_client;
use trend_digest::dispatch::{Dispatcher, ResendTransport};
use trend_digest::render;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resend(server: &MockServer) -> Dispatcher {
    let client = build_http_client(Duration::from_secs(5)).unwrap();
    Dispatcher::new(Box::new(ResendTransport::new(&server.uri(), "re_test", client)))
}

fn to() -> Vec<String> {
    vec!["reader@example.com".to_string()]
}

#[tokio::test]
async fn sends_html_and_text_and_returns_the_id() {
    let server = MockServer::start().await;
    let doc = render("# Hello\n\nWorld", &["https://a.test".to_string()]);
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer re_test"))
        .and(body_partial_json(json!({
            "from": "Digest <digest@example.com>",
            "to": ["reader@example.com"],
            "subject": "[IT Trends] 2025-01-07",
            "text": "# Hello\n\nWorld",
            "html": doc.html.clone(),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "email_123" })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = resend(&server)
        .deliver(&doc, "[IT Trends] 2025-01-07", &to(), "Digest <digest@example.com>")
        .await;
    assert!(receipt.success, "{receipt:?}");
    assert_eq!(receipt.provider_response_id.as_deref(), Some("email_123"));
    assert!(receipt.error_detail.is_none());
}

#[tokio::test]
async fn empty_document_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let doc = render("  \n\n ", &[]);
    let receipt = resend(&server)
        .deliver(&doc, "subject", &to(), "digest@example.com")
        .await;
    assert!(receipt.skipped);
    assert!(!receipt.success);
}

#[tokio::test]
async fn provider_error_yields_failed_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid from address"))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = resend(&server)
        .deliver(&render("body", &[]), "subject", &to(), "nobody")
        .await;
    assert!(!receipt.success && !receipt.skipped);
    let detail = receipt.error_detail.unwrap();
    assert!(detail.contains("422"), "{detail}");
    assert!(detail.contains("invalid from address"), "{detail}");
}

#[tokio::test]
async fn accepted_without_id_is_still_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let receipt = resend(&server)
        .deliver(&render("body", &[]), "subject", &to(), "digest@example.com")
        .await;
    assert!(receipt.success);
    assert_eq!(receipt.provider_response_id, None);
}

#[tokio::test]
async fn no_recipients_fails_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let receipt = resend(&server)
        .deliver(&render("body", &[]), "subject", &[], "digest@example.com")
        .await;
    assert!(!receipt.success && !receipt.skipped);
}
