//! Protocol Integration Tests
//!
//! Tests for the register/invoke/view adapter, both directly and through
//! the HTTP router.

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{message_event, registry, CallLog, FakeBackend, FakeChat, RecordingRegistrar};
use inngestabot::core::{AdapterSettings, InvokeBody, ProtocolAdapter, StepMemo, StepOutcome};
use inngestabot::server::{router, SERVE_PATH};
use inngestabot::Error;
use serde_json::{json, Value};
use tower::ServiceExt;

fn settings() -> AdapterSettings {
    AdapterSettings {
        app_name: "Inngestabot".to_string(),
        ..Default::default()
    }
}

fn adapter(log: &CallLog, backend: FakeBackend) -> ProtocolAdapter {
    let chat = Arc::new(FakeChat::new(log.clone()));
    ProtocolAdapter::new(Arc::new(registry(chat, backend)), settings())
}

async fn call(
    adapter: ProtocolAdapter,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "bot.test")
        .header("content-type", "application/json")
        .body(body)
        .unwrap();

    let response = router(Arc::new(adapter)).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, json)
}

#[tokio::test]
async fn test_put_returns_descriptors() {
    let log = CallLog::default();
    let (status, body) = call(
        adapter(&log, FakeBackend::replying(log.clone(), "ok")),
        "PUT",
        &format!("{}?deployId=d1", SERVE_PATH),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let functions = body.unwrap();
    let functions = functions.as_array().unwrap();
    assert!(functions.iter().any(|f| {
        f["name"] == "Handle Inngestabot message"
            && f["triggerEventName"] == "inngestabot/message.received"
    }));
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn test_register_reports_to_orchestrator() {
    let log = CallLog::default();
    let registrar = Arc::new(RecordingRegistrar::default());
    let adapter = adapter(&log, FakeBackend::replying(log.clone(), "ok"))
        .with_registrar(registrar.clone());

    let registration = adapter
        .register("https://bot.test/api/inngest", Some("d1"))
        .await
        .unwrap();

    assert_eq!(registration.url, "https://bot.test/api/inngest");
    assert_eq!(registration.deploy_id.as_deref(), Some("d1"));
    assert_eq!(registration.functions.len(), 1);
    assert_eq!(registrar.registrations.lock().unwrap().as_slice(), [registration]);
}

#[tokio::test]
async fn test_register_prefers_configured_serve_url() {
    let log = CallLog::default();
    let chat = Arc::new(FakeChat::new(log.clone()));
    let adapter = ProtocolAdapter::new(
        Arc::new(registry(chat, FakeBackend::replying(log.clone(), "ok"))),
        AdapterSettings {
            serve_url: Some("https://public.example/api/inngest".to_string()),
            ..settings()
        },
    );

    let registration = adapter.register("http://10.0.0.1/api/inngest", None).await.unwrap();
    assert_eq!(registration.url, "https://public.example/api/inngest");
}

#[tokio::test]
async fn test_rejected_registration_is_error_response() {
    let log = CallLog::default();
    let registrar = Arc::new(RecordingRegistrar {
        reject: true,
        ..Default::default()
    });
    let adapter = adapter(&log, FakeBackend::replying(log.clone(), "ok")).with_registrar(registrar);

    let (status, body) = call(adapter, "PUT", SERVE_PATH, None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.unwrap()["error"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn test_post_invokes_workflow() {
    let log = CallLog::default();
    let adapter = adapter(&log, FakeBackend::replying(log.clone(), "ok"));
    let body = json!({ "event": message_event("hi"), "memo": {} });

    let (status, body) = call(
        adapter,
        "POST",
        &format!("{}?fnId=handle-inngestabot-message&stepId=step", SERVE_PATH),
        Some(body),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["result"], json!({"reply": "ok"}));
    assert_eq!(body["memo"]["generate-reply"], json!({"Completed": "ok"}));
    assert_eq!(body["stepsExecuted"].as_array().unwrap().len(), 4);
    assert_eq!(log.calls().len(), 4);
}

#[tokio::test]
async fn test_post_with_memo_resumes() {
    let log = CallLog::default();
    let adapter = adapter(&log, FakeBackend::replying(log.clone(), "fresh"));

    let mut memo = StepMemo::new();
    memo.record("add-reaction", StepOutcome::Completed(Value::Null))
        .unwrap();
    memo.record("generate-reply", StepOutcome::Completed(json!("cached")))
        .unwrap();

    let report = adapter
        .invoke(
            "Handle Inngestabot message",
            None,
            InvokeBody {
                event: message_event("hi"),
                memo,
                run_id: Some("run-42".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(report.run_id, "run-42");
    assert!(report.is_completed());
    assert_eq!(log.count_prefix("add_reaction"), 0);
    assert_eq!(log.count_prefix("complete"), 0);
    assert_eq!(log.count_prefix("send_reply(c1,m1,cached)"), 1);
}

#[tokio::test]
async fn test_post_step_failure_returns_error_with_memo() {
    let log = CallLog::default();
    let adapter = adapter(&log, FakeBackend::with_body(log.clone(), json!({})));
    let body = json!({ "event": message_event("hi") });

    let (status, body) = call(
        adapter,
        "POST",
        &format!("{}?fnId=handle-inngestabot-message", SERVE_PATH),
        Some(body),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = body.unwrap();
    assert_eq!(body["step"], "generate-reply");
    assert_eq!(body["kind"], "backend");
    assert!(body["error"].as_str().unwrap().starts_with("Backend error"));
    assert_eq!(body["memo"]["add-reaction"], json!({"Completed": null}));
}

#[tokio::test]
async fn test_unknown_function() {
    let log = CallLog::default();
    let adapter = adapter(&log, FakeBackend::replying(log.clone(), "ok"));

    let result = adapter
        .invoke(
            "nope",
            None,
            InvokeBody {
                event: message_event("hi"),
                memo: StepMemo::new(),
                run_id: None,
            },
        )
        .await;
    assert!(matches!(result, Err(Error::UnknownFunction(ref id)) if id == "nope"));

    let (status, body) = call(
        adapter,
        "POST",
        &format!("{}?fnId=nope", SERVE_PATH),
        Some(json!({ "event": message_event("hi") })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.unwrap()["error"].as_str().unwrap().contains("nope"));
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_invoke_body() {
    let log = CallLog::default();
    let (status, body) = call(
        adapter(&log, FakeBackend::replying(log.clone(), "ok")),
        "POST",
        &format!("{}?fnId=handle-inngestabot-message", SERVE_PATH),
        Some(json!({ "memo": {} })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_get_view_and_introspection() {
    let log = CallLog::default();

    let (status, body) = call(
        adapter(&log, FakeBackend::replying(log.clone(), "ok")),
        "GET",
        SERVE_PATH,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["functionCount"], 1);
    assert_eq!(body["mode"], "dev");

    let (status, body) = call(
        adapter(&log, FakeBackend::replying(log.clone(), "ok")),
        "GET",
        &format!("{}?introspect", SERVE_PATH),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["functions"][0]["id"], "handle-inngestabot-message");
    assert_eq!(body["hasEventKey"], false);
    assert!(log.calls().is_empty());
}

#[tokio::test]
async fn test_other_methods_are_declined() {
    let log = CallLog::default();
    let registrar = Arc::new(RecordingRegistrar::default());

    for method in ["DELETE", "PATCH"] {
        let adapter = adapter(&log, FakeBackend::replying(log.clone(), "ok"))
            .with_registrar(registrar.clone());
        let (status, body) = call(
            adapter,
            method,
            &format!("{}?fnId=handle-inngestabot-message", SERVE_PATH),
            Some(json!({ "event": message_event("hi") })),
        )
        .await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(body.is_none());
    }

    assert!(log.calls().is_empty());
    assert!(registrar.registrations.lock().unwrap().is_empty());
}
