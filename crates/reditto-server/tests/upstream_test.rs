//! Tests for the real upstream gateway and identity resolver against a
//! local `httpmock` server: request shape, headers, and failure classification.

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;

use reditto_core::PipelineError;
use reditto_server::config::{FlowSettings, IdentityConfig, UpstreamConfig};
use reditto_server::guard::{HttpIdentityResolver, IdentityResolver};
use reditto_server::llm_provider::{ChatPrompt, ModelGateway, OpenRouterGateway, UserContent};

fn upstream_config(base_url: String) -> UpstreamConfig {
    let settings = FlowSettings {
        model: "test/model".into(),
        max_tokens: 100,
        temperature: 0.5,
    };
    UpstreamConfig {
        base_url,
        api_key: "sk-test".into(),
        timeout: Duration::from_secs(5),
        app_url: Some("https://reditto.app".into()),
        app_title: Some("Reditto".into()),
        grading: settings.clone(),
        extraction: settings,
    }
}

fn gateway(config: &UpstreamConfig) -> OpenRouterGateway {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .unwrap();
    OpenRouterGateway::new(client, config)
}

fn prompt() -> ChatPrompt {
    ChatPrompt {
        model: "test/model".into(),
        system: "you grade essays",
        user: UserContent::Text("essay body".into()),
        max_tokens: 100,
        temperature: 0.5,
    }
}

fn completion(content: serde_json::Value) -> serde_json::Value {
    json!({ "id": "gen-1", "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }] })
}

#[tokio::test]
async fn sends_one_authenticated_chat_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .header("http-referer", "https://reditto.app")
                .header("x-title", "Reditto")
                .json_body_partial(
                    r#"{"model":"test/model","max_tokens":100,"messages":[{"role":"system","content":"you grade essays"},{"role":"user","content":"essay body"}]}"#,
                );
            then.status(200).json_body(completion(json!("  resposta  ")));
        })
        .await;

    let config = upstream_config(server.url("/api/v1/"));
    let raw = gateway(&config).send(&prompt()).await.unwrap();

    // Raw text is returned as-is; trimming belongs to the coercer.
    assert_eq!(raw, "  resposta  ");
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn status_429_is_rate_limited_with_retry_after() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429)
                .header("retry-after", "30")
                .body("slow down");
        })
        .await;

    let config = upstream_config(server.base_url());
    let err = gateway(&config).send(&prompt()).await.unwrap_err();

    assert_eq!(
        err,
        PipelineError::RateLimited {
            retry_after: Some(Duration::from_secs(30))
        }
    );
    // Exactly one attempt; no internal retry.
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn other_non_2xx_is_upstream_error_with_status() {
    for status in [400u16, 401, 500, 503] {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(status).body("provider failure");
            })
            .await;

        let config = upstream_config(server.base_url());
        match gateway(&config).send(&prompt()).await {
            Err(PipelineError::UpstreamError { status: got, detail }) => {
                assert_eq!(got, status);
                assert_eq!(detail, "provider failure");
            }
            other => panic!("expected UpstreamError for {status}, got {other:?}"),
        }
        mock.assert_hits_async(1).await;
    }
}

#[tokio::test]
async fn success_without_content_is_empty_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(completion(json!(null)));
        })
        .await;

    let config = upstream_config(server.base_url());
    let err = gateway(&config).send(&prompt()).await.unwrap_err();
    assert_eq!(err, PipelineError::UpstreamEmptyResponse);
}

#[tokio::test]
async fn unreachable_upstream_is_unavailable() {
    // Port 1 is never listening in the test environment.
    let config = upstream_config("http://127.0.0.1:1".into());
    let err = gateway(&config).send(&prompt()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UpstreamUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn timeout_is_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(completion(json!("late")));
        })
        .await;

    let mut config = upstream_config(server.base_url());
    config.timeout = Duration::from_millis(200);
    let err = gateway(&config).send(&prompt()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UpstreamUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn image_prompt_is_sent_as_content_parts() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions").json_body_partial(
                r#"{"messages":[{"role":"system"},{"role":"user","content":[{"type":"text","text":"read"},{"type":"image_url","image_url":{"url":"data:image/png;base64,AAAA"}}]}]}"#,
            );
            then.status(200).json_body(completion(json!("texto")));
        })
        .await;

    let config = upstream_config(server.base_url());
    let mut p = prompt();
    p.user = UserContent::TextWithImage {
        text: "read".into(),
        image_url: "data:image/png;base64,AAAA".into(),
    };
    assert_eq!(gateway(&config).send(&p).await.unwrap(), "texto");
    mock.assert_hits_async(1).await;
}

// ---------------------------------------------------------------------------
// Identity resolver
// ---------------------------------------------------------------------------

fn resolver(base_url: String) -> HttpIdentityResolver {
    let config = IdentityConfig {
        base_url,
        api_key: "anon-key".into(),
        timeout: Duration::from_secs(5),
    };
    HttpIdentityResolver::new(reqwest::Client::new(), &config)
}

#[tokio::test]
async fn identity_resolves_user_id() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("apikey", "anon-key")
                .header("authorization", "Bearer user-jwt");
            then.status(200)
                .json_body(json!({ "id": "8d0f-user", "email": "aluno@example.com" }));
        })
        .await;

    let identity = resolver(server.base_url()).resolve("user-jwt").await.unwrap();
    assert_eq!(identity.user_id, "8d0f-user");
    mock.assert_async().await;
}

#[tokio::test]
async fn identity_rejection_is_unauthenticated() {
    for status in [401u16, 403] {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/auth/v1/user");
                then.status(status).json_body(json!({ "msg": "invalid JWT" }));
            })
            .await;
        let err = resolver(server.base_url()).resolve("expired").await.unwrap_err();
        assert_eq!(err, PipelineError::Unauthenticated);
    }
}

#[tokio::test]
async fn identity_service_failure_is_internal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/auth/v1/user");
            then.status(500).body("oops");
        })
        .await;
    let err = resolver(server.base_url()).resolve("token").await.unwrap_err();
    assert!(matches!(err, PipelineError::Internal(_)), "{err:?}");
}
