use crate::app::error::{AppError, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "You answer questions about the source files provided by the user. Quote file names when relevant.";

/// Thin client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct QaClient {
    http: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl QaClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one chat request and returns the first choice's text.
    pub async fn ask(
        &self,
        api_key: &str,
        model: &str,
        question: &str,
        content: &str,
    ) -> Result<String> {
        let body = json!({
            "model": model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("{}\n\nQuestion: {}", content, question)},
            ],
        });

        log::debug!("Forwarding question to {} (model {})", self.endpoint, model);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamHttp {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Upstream("response contained no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    fn client(endpoint: String) -> QaClient {
        QaClient::new(endpoint, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let user = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
                Json(serde_json::json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": format!("{}|{}|{}", auth, body["model"].as_str().unwrap_or_default(), user)}},
                        {"message": {"role": "assistant", "content": "second"}}
                    ]
                }))
            }),
        );
        let endpoint = spawn_mock(router).await;

        let answer = client(endpoint)
            .ask("sk-test", "gpt-test", "What is this?", "fn main() {}")
            .await
            .expect("answer");

        assert_eq!(
            answer,
            "Bearer sk-test|gpt-test|fn main() {}\n\nQuestion: What is this?"
        );
    }

    #[tokio::test]
    async fn http_failure_is_reported_with_status() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let endpoint = spawn_mock(router).await;

        let err = client(endpoint)
            .ask("sk-bad", "gpt-test", "q", "c")
            .await
            .expect_err("401 must fail");

        assert!(
            matches!(err, AppError::UpstreamHttp { status: 401, ref body } if body == "bad key")
        );
    }

    #[tokio::test]
    async fn empty_choices_are_an_upstream_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({"choices": []})) }),
        );
        let endpoint = spawn_mock(router).await;

        let err = client(endpoint)
            .ask("sk", "m", "q", "c")
            .await
            .expect_err("no choices must fail");

        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_upstream_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let err = client(format!("http://{}/v1/chat/completions", addr))
            .ask("sk", "m", "q", "c")
            .await
            .expect_err("connection refused");

        assert!(matches!(err, AppError::Upstream(_)));
    }
}
