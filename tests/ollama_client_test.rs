//! HTTP-level tests for the Ollama client against a mock upstream

use chat_memory::inference::{InferenceClient, InferenceConfig, InferenceError, OllamaClient};
use mockito::Matcher;
use serde_json::json;

fn test_config(url: String) -> InferenceConfig {
    InferenceConfig {
        url,
        model: "minicpm-v:latest".to_string(),
        format: "json".to_string(),
        timeout_ms: 2000,
        retry_attempts: 0,
        retry_backoff_ms: 10,
    }
}

#[tokio::test]
async fn test_generate_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "model": "minicpm-v:latest",
            "prompt": "hello",
            "stream": false,
            "format": "json"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"model": "minicpm-v:latest", "response": "hi there", "done": true}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(test_config(server.url())).unwrap();
    let response = client.generate("hello", &[]).await.unwrap();

    assert_eq!(response.response, "hi there");
    assert!(response.done);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_generate_forwards_image_payloads() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::PartialJson(json!({
            "images": ["aW1hZ2Ux", "aW1hZ2Uy"]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": "two images received"}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(test_config(server.url())).unwrap();
    let images = vec!["aW1hZ2Ux".to_string(), "aW1hZ2Uy".to_string()];
    let response = client.generate("describe", &images).await.unwrap();

    assert_eq!(response.response, "two images received");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_generate_omits_images_field_when_empty() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .match_body(Matcher::Json(json!({
            "model": "minicpm-v:latest",
            "prompt": "text only",
            "stream": false,
            "format": "json"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": "ok"}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(test_config(server.url())).unwrap();
    client.generate("text only", &[]).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_generate_non_success_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/generate")
        .with_status(500)
        .with_body("model crashed")
        .create_async()
        .await;

    let client = OllamaClient::new(test_config(server.url())).unwrap();
    let result = client.generate("hello", &[]).await;

    match result {
        Err(InferenceError::UpstreamError(msg)) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("model crashed"));
        }
        other => panic!("expected UpstreamError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_generate_malformed_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("not json")
        .create_async()
        .await;

    let client = OllamaClient::new(test_config(server.url())).unwrap();
    let result = client.generate("hello", &[]).await;

    assert!(matches!(result, Err(InferenceError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_generate_missing_response_field() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"model": "minicpm-v:latest", "done": true}"#)
        .create_async()
        .await;

    let client = OllamaClient::new(test_config(server.url())).unwrap();
    let result = client.generate("hello", &[]).await;

    assert!(matches!(result, Err(InferenceError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_generate_retries_before_giving_up() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate")
        .with_status(503)
        .with_body("overloaded")
        .expect(3)
        .create_async()
        .await;

    let mut config = test_config(server.url());
    config.retry_attempts = 2;

    let client = OllamaClient::new(config).unwrap();
    let result = client.generate("hello", &[]).await;

    assert!(matches!(result, Err(InferenceError::UpstreamError(_))));
    // Initial attempt plus two retries
    mock.assert_async().await;
}

#[tokio::test]
async fn test_generate_connection_refused() {
    // Nothing listens on this port
    let config = test_config("http://127.0.0.1:1".to_string());
    let client = OllamaClient::new(config).unwrap();

    let result = client.generate("hello", &[]).await;
    assert!(matches!(result, Err(InferenceError::RequestFailed(_))));
}
