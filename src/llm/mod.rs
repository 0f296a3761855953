pub mod gemini;

use crate::store::models::{Message, Sender};
use async_trait::async_trait;
use gemini::GeminiConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const TRANSPORT_FALLBACK: &str = "Oops! Something went wrong.";
pub const EMPTY_RESPONSE_FALLBACK: &str = "I'm not sure how to respond to that.";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl From<Sender> for Role {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Role::User,
            Sender::Assistant => Role::Model,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Map stored history to provider messages, replacing the last entry's text
/// with `augmented_last`. The stored messages are left untouched.
pub fn build_history(history: &[Message], augmented_last: &str) -> Vec<ChatMessage> {
    let Some((last, earlier)) = history.split_last() else {
        return vec![ChatMessage {
            role: Role::User,
            content: augmented_last.to_string(),
        }];
    };

    earlier
        .iter()
        .map(|m| ChatMessage {
            role: m.sender.into(),
            content: m.content.clone(),
        })
        .chain(std::iter::once(ChatMessage {
            role: last.sender.into(),
            content: augmented_last.to_string(),
        }))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Network failure, timeout, non-success status or a non-JSON body.
    TransportFailure,
    /// Well-formed response without usable text.
    EmptyResponse,
}

impl Fallback {
    pub fn text(&self) -> &'static str {
        match self {
            Fallback::TransportFailure => TRANSPORT_FALLBACK,
            Fallback::EmptyResponse => EMPTY_RESPONSE_FALLBACK,
        }
    }
}

/// Outcome of one generation call. Never an error: failures carry fallback text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    Fallback(Fallback),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Answer(text) => text,
            Reply::Fallback(fallback) => fallback.text(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Reply::Fallback(_))
    }
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Issue one generation request for `history`, sending `augmented_last_text`
    /// in place of the last message's content.
    async fn request_reply(&self, history: &[Message], augmented_last_text: &str) -> Reply;
}

/// Gemini-backed [`ReplyGenerator`].
pub struct GenerationClient {
    client: Client,
    config: GeminiConfig,
}

impl GenerationClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ReplyGenerator for GenerationClient {
    async fn request_reply(&self, history: &[Message], augmented_last_text: &str) -> Reply {
        let messages = build_history(history, augmented_last_text);
        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "requesting reply"
        );

        match gemini::chat(&self.client, &self.config, &messages).await {
            Ok(resp) => match resp.first_text() {
                Some(text) => Reply::Answer(text),
                None => {
                    warn!(model = %self.config.model, "response carried no text");
                    Reply::Fallback(Fallback::EmptyResponse)
                }
            },
            Err(e) => {
                error!(error = %e, "error getting reply");
                Reply::Fallback(Fallback::TransportFailure)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, Uri};
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn msg(id: u64, sender: Sender, content: &str) -> Message {
        Message {
            id,
            sender,
            content: content.into(),
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(String, Value)>>>);

    /// Spawn a fake provider answering every request with `status` and `body`.
    async fn spawn_provider(
        status: StatusCode,
        body: &'static str,
        delay: Duration,
    ) -> (String, Captured) {
        let captured = Captured::default();
        let sink = captured.clone();
        let app = Router::new().fallback(move |uri: Uri, payload: String| {
            let sink = sink.clone();
            async move {
                let json = serde_json::from_str(&payload).unwrap_or(Value::Null);
                sink.0.lock().unwrap().push((uri.to_string(), json));
                tokio::time::sleep(delay).await;
                (status, body)
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), captured)
    }

    fn client_for(base_url: String, timeout_secs: u64) -> GenerationClient {
        GenerationClient::new(GeminiConfig {
            api_key: "test-key".into(),
            base_url,
            model: "test-model".into(),
            timeout_secs,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_build_history_replaces_only_last() {
        let history = vec![
            msg(1, Sender::User, "first"),
            msg(2, Sender::Assistant, "answer"),
            msg(3, Sender::User, "second"),
        ];
        let out = build_history(&history, "second\n\nPage 1:\nctx\n");
        assert_eq!(
            out,
            vec![
                ChatMessage {
                    role: Role::User,
                    content: "first".into()
                },
                ChatMessage {
                    role: Role::Model,
                    content: "answer".into()
                },
                ChatMessage {
                    role: Role::User,
                    content: "second\n\nPage 1:\nctx\n".into()
                },
            ]
        );
        assert_eq!(history[2].content, "second");
    }

    #[test]
    fn test_build_history_empty() {
        let out = build_history(&[], "hello");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].role, Role::User);
        assert_eq!(out[0].content, "hello");
    }

    #[test]
    fn test_fallback_texts() {
        assert_eq!(
            Reply::Fallback(Fallback::TransportFailure).text(),
            "Oops! Something went wrong."
        );
        assert_eq!(
            Reply::Fallback(Fallback::EmptyResponse).text(),
            "I'm not sure how to respond to that."
        );
        assert!(!Reply::Answer("x".into()).is_fallback());
    }

    #[tokio::test]
    async fn test_request_reply_success() {
        let (url, captured) = spawn_provider(
            StatusCode::OK,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":" Hi there! "}]}}]}"#,
            Duration::ZERO,
        )
        .await;
        let client = client_for(url, 5);
        let history = vec![msg(1, Sender::User, "hello")];

        let reply = client.request_reply(&history, "hello\n\n").await;
        assert_eq!(reply, Reply::Answer("Hi there!".into()));

        let calls = captured.0.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        let (uri, body) = &calls[0];
        assert_eq!(uri, "/models/test-model:generateContent?key=test-key");
        assert_eq!(
            body,
            &json!({
                "contents": [{"role": "user", "parts": [{"text": "hello\n\n"}]}],
                "generationConfig": {"responseMimeType": "text/plain"}
            })
        );
    }

    #[tokio::test]
    async fn test_empty_object_yields_not_sure() {
        let (url, _) = spawn_provider(StatusCode::OK, "{}", Duration::ZERO).await;
        let reply = client_for(url, 5)
            .request_reply(&[msg(1, Sender::User, "q")], "q\n\n")
            .await;
        assert_eq!(reply.text(), "I'm not sure how to respond to that.");
    }

    #[tokio::test]
    async fn test_error_status_yields_oops() {
        let (url, _) = spawn_provider(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":400,"message":"API key not valid"}}"#,
            Duration::ZERO,
        )
        .await;
        let reply = client_for(url, 5)
            .request_reply(&[msg(1, Sender::User, "q")], "q\n\n")
            .await;
        assert_eq!(reply, Reply::Fallback(Fallback::TransportFailure));
    }

    #[tokio::test]
    async fn test_non_json_body_yields_oops() {
        let (url, _) = spawn_provider(StatusCode::OK, "not json", Duration::ZERO).await;
        let reply = client_for(url, 5)
            .request_reply(&[msg(1, Sender::User, "q")], "q\n\n")
            .await;
        assert_eq!(reply.text(), TRANSPORT_FALLBACK);
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_oops() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let reply = client_for(format!("http://{}", addr), 5)
            .request_reply(&[msg(1, Sender::User, "q")], "q\n\n")
            .await;
        assert_eq!(reply.text(), "Oops! Something went wrong.");
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let (url, _) = spawn_provider(StatusCode::OK, "{}", Duration::from_secs(5)).await;
        let reply = client_for(url, 1)
            .request_reply(&[msg(1, Sender::User, "q")], "q\n\n")
            .await;
        assert_eq!(reply, Reply::Fallback(Fallback::TransportFailure));
    }
}
