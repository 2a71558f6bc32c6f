// crates/hello-action-webhook/tests/http_client.rs
// ============================================================================
// Module: HTTP Webhook Client Tests
// Description: Follow-up calls against a local HTTP server.
// Purpose: Ensure methods, paths, bodies, and status mapping are correct.
// Dependencies: hello-action-webhook, hello-action-core, tiny_http, tokio
// ============================================================================
//! ## Overview
//! Runs the `reqwest` client against a `tiny_http` stand-in for the
//! follow-up API.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::io::Read;
use std::thread::JoinHandle;
use std::time::Duration;

use hello_action_core::CallbackToken;
use hello_action_core::FollowupTarget;
use hello_action_core::MessageData;
use hello_action_core::WebhookClient;
use hello_action_core::WebhookError;
use hello_action_webhook::HttpWebhookClient;
use hello_action_webhook::MAX_RESPONSE_BYTES;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;
use tiny_http::StatusCode;

/// Request observed by the stand-in server.
#[derive(Debug)]
struct Seen {
    method: String,
    url: String,
    body: String,
    authorization: Option<String>,
}

/// Serves `replies.len()` requests, answering each with the given status
/// and body, and returns what it saw.
fn serve(replies: Vec<(u16, String)>) -> (String, JoinHandle<Vec<Seen>>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let addr = server.server_addr();
    let handle = std::thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, reply) in replies {
            let mut request = server.recv().expect("request");
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let authorization = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("Authorization"))
                .map(|header| header.value.to_string());
            seen.push(Seen {
                method: request.method().to_string(),
                url: request.url().to_string(),
                body,
                authorization,
            });
            let response = Response::from_string(reply)
                .with_status_code(status)
                .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
            request.respond(response).expect("respond");
        }
        seen
    });
    (format!("http://{addr}"), handle)
}

fn target(base: &str) -> FollowupTarget {
    FollowupTarget {
        callback_url: format!("{base}/interactions/callback/1/tok"),
        token: CallbackToken::new("tok", Duration::from_secs(60)),
    }
}

fn client() -> HttpWebhookClient {
    HttpWebhookClient::new(Duration::from_secs(5)).unwrap()
}

/// Tests create, edit, and delete hit the expected methods and paths.
#[tokio::test]
async fn followup_calls_use_callback_paths() {
    let (base, handle) = serve(vec![
        (200, json!({"id": "m1", "content": "Follow-up"}).to_string()),
        (200, json!({"id": "m1", "content": "[5s]"}).to_string()),
        (204, String::new()),
    ]);
    let client = client();
    let target = target(&base);

    let created = client.create_followup(&target, &MessageData::text("Follow-up").ephemeral()).await.unwrap();
    assert_eq!(created.id, "m1");
    let edited = client.edit_followup(&target, &created.id, &MessageData::text("[5s]")).await.unwrap();
    assert_eq!(edited.content, "[5s]");
    client.delete_followup(&target, &edited.id).await.unwrap();

    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].url, "/interactions/callback/1/tok");
    let body: Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body, json!({"content": "Follow-up", "flags": 64}));
    assert_eq!(seen[1].method, "PATCH");
    assert_eq!(seen[1].url, "/interactions/callback/1/tok/messages/m1");
    assert_eq!(seen[2].method, "DELETE");
    assert_eq!(seen[2].url, "/interactions/callback/1/tok/messages/m1");
}

/// Tests rejected tokens surface as status errors.
#[tokio::test]
async fn unknown_webhook_maps_to_token_rejection() {
    let (base, handle) = serve(vec![(404, json!({"message": "Unknown Webhook"}).to_string())]);
    let err = client().edit_followup(&target(&base), "m1", &MessageData::text("x")).await.unwrap_err();
    handle.join().expect("server thread");
    match &err {
        WebhookError::Status { status, message } => {
            assert_eq!(*status, 404);
            assert!(message.contains("Unknown Webhook"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_token_rejected());
}

/// Tests non-JSON success bodies are reported as invalid responses.
#[tokio::test]
async fn malformed_message_is_invalid_response() {
    let (base, handle) = serve(vec![(200, "not json".to_string())]);
    let err = client().create_followup(&target(&base), &MessageData::text("x")).await.unwrap_err();
    handle.join().expect("server thread");
    assert!(matches!(err, WebhookError::InvalidResponse(_)));
}

/// Tests the profile lookup targets the callback origin with a bearer token.
#[tokio::test]
async fn account_profile_uses_bearer_token() {
    let (base, handle) = serve(vec![(200, json!({"id": "u1", "name": "clicker"}).to_string())]);
    let profile = client()
        .account_profile(&format!("{base}/interactions/callback/1/tok"), "granted")
        .await
        .unwrap();
    assert_eq!(profile["name"], "clicker");
    let seen = handle.join().expect("server thread");
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].url, "/account/me");
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer granted"));
}

/// Tests a chunked body without a length is cut off at the response cap.
#[tokio::test]
async fn chunked_body_over_cap_is_rejected() {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let addr = server.server_addr();
    let handle = std::thread::spawn(move || {
        let request = server.recv().expect("request");
        let oversized = std::io::repeat(b'a').take(MAX_RESPONSE_BYTES as u64 * 2);
        let response = Response::new(StatusCode(200), Vec::new(), oversized, None, None);
        // The client hangs up once the cap is passed.
        let _ = request.respond(response);
    });
    let err = client()
        .account_profile(&format!("http://{addr}/interactions/callback/1/tok"), "granted")
        .await
        .unwrap_err();
    handle.join().expect("server thread");
    match err {
        WebhookError::InvalidResponse(message) => assert!(message.contains("too large")),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Tests unreachable servers are transport errors.
#[tokio::test]
async fn unreachable_callback_is_transport_error() {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let addr = server.server_addr();
    drop(server);
    let target = target(&format!("http://{addr}"));
    let err = client().create_followup(&target, &MessageData::text("x")).await.unwrap_err();
    assert!(matches!(err, WebhookError::Transport(_)));
}
