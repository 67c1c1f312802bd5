//! NVIDIA-hosted Nemotron chat-completions client.
//!
//! Speaks the OpenAI-compatible wire format against
//! `https://integrate.api.nvidia.com/v1`. Streaming responses are SSE
//! frames carrying chat-completion chunks; text deltas are relayed to the
//! caller over an mpsc channel.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::provider::error::Error;
use crate::provider::http::{HttpClient, SseParser};
use crate::provider::types::{ChatRequest, Message, Role, StreamEvent, Usage};

pub struct NemotronClient {
    http: HttpClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

/// Wire request body.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

/// Non-streaming response body.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Streaming chunk, one per SSE frame.
#[derive(Debug, Deserialize)]
struct ApiChunk {
    #[serde(default)]
    choices: Vec<ApiChunkChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChunkChoice {
    delta: ApiDelta,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl NemotronClient {
    pub fn new(api_key: impl Into<String>, config: &Config) -> Self {
        Self {
            http: HttpClient::new(config.base_url.clone(), api_key),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }

    /// Build a single-turn request for the given user input.
    pub fn chat_request(&self, user_input: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(user_input)],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
        }
    }

    /// Stream a chat completion, relaying events over `tx`.
    ///
    /// Always ends with either a `Done` event or an error (mirrored as an
    /// `Error` event so consumers that only watch the channel see it too).
    pub async fn stream(
        &self,
        request: ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), Error> {
        let api_request = build_api_request(&request, true);

        tracing::debug!(
            model = %api_request.model,
            messages = api_request.messages.len(),
            "chat-completions stream request"
        );

        let stream = match self.http.post_stream("/chat/completions", &api_request).await {
            Ok(s) => s,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return Err(e);
            }
        };
        futures::pin_mut!(stream);

        let mut parser = SseParser::new();
        let mut done = false;

        while let Some(chunk_result) = stream.next().await {
            let bytes = match chunk_result {
                Ok(b) => b,
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return Err(Error::Stream(e.to_string()));
                }
            };
            for frame in parser.feed(&bytes) {
                if frame.data == "[DONE]" {
                    done = true;
                    break;
                }
                match serde_json::from_str::<ApiChunk>(&frame.data) {
                    Ok(chunk) => relay_chunk(chunk, &tx).await,
                    Err(e) => {
                        // Some backends put an error object on the stream.
                        tracing::warn!("undecodable stream frame: {e}");
                        let _ = tx
                            .send(StreamEvent::Error(super::format_api_error(&frame.data)))
                            .await;
                    }
                }
            }
            if done {
                break;
            }
        }

        if parser.has_pending() {
            tracing::debug!("stream ended with a truncated SSE frame");
        }

        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }

    /// Non-streaming completion. Returns the assistant message text.
    pub async fn complete(&self, request: ChatRequest) -> Result<Message, Error> {
        let api_request = build_api_request(&request, false);

        let response: ApiResponse = self
            .http
            .post_json("/chat/completions", &api_request)
            .await?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "completion usage"
            );
        }

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(Message {
            role: Role::Assistant,
            content,
        })
    }
}

fn build_api_request(request: &ChatRequest, stream: bool) -> ApiRequest {
    ApiRequest {
        model: request.model.clone(),
        messages: request
            .messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: m.content.clone(),
            })
            .collect(),
        stream,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
    }
}

async fn relay_chunk(chunk: ApiChunk, tx: &mpsc::Sender<StreamEvent>) {
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content
            && !content.is_empty()
        {
            let _ = tx.send(StreamEvent::TextDelta(content)).await;
        }
    }

    if let Some(usage) = chunk.usage {
        let _ = tx
            .send(StreamEvent::Usage(Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            }))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> NemotronClient {
        NemotronClient::new("nvapi-test", &Config::default())
    }

    #[test]
    fn request_carries_nemotron_defaults() {
        let client = test_client();
        let request = client.chat_request("Hello there");

        assert_eq!(request.model, "nvidia/nemotron-3-nano-30b-a3b");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, Role::User);
        assert_eq!(request.messages[0].content, "Hello there");
        assert_eq!(request.max_tokens, Some(16384));
        assert_eq!(request.temperature, Some(1.0));
        assert_eq!(request.top_p, Some(1.0));
    }

    #[test]
    fn wire_request_serialization() {
        let client = test_client();
        let api_request = build_api_request(&client.chat_request("hi"), true);
        let json = serde_json::to_value(&api_request).unwrap();

        assert_eq!(json["model"], "nvidia/nemotron-3-nano-30b-a3b");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["max_tokens"], 16384);
    }

    #[test]
    fn wire_request_omits_unset_sampling() {
        let request = ChatRequest {
            model: "m".into(),
            messages: vec![Message::user("x")],
            max_tokens: None,
            temperature: None,
            top_p: None,
        };
        let json = serde_json::to_value(build_api_request(&request, false)).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn decodes_text_delta_chunk() {
        let chunk: ApiChunk = serde_json::from_str(
            r#"{"id":"c1","object":"chat.completion.chunk","created":0,
                "model":"nvidia/nemotron-3-nano-30b-a3b",
                "choices":[{"index":0,"delta":{"content":"Hey"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hey"));
    }

    #[test]
    fn decodes_role_only_delta() {
        let chunk: ApiChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"role":"assistant"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert!(chunk.choices[0].delta.content.is_none());
    }

    #[test]
    fn decodes_final_usage_chunk() {
        let chunk: ApiChunk = serde_json::from_str(
            r#"{"choices":[],"usage":{"prompt_tokens":12,"completion_tokens":34,"total_tokens":46}}"#,
        )
        .unwrap();
        let usage = chunk.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 34);
    }

    #[test]
    fn decodes_completion_response() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Hello!"},
                "finish_reason":"stop"}],
                "usage":{"prompt_tokens":5,"completion_tokens":2}}"#,
        )
        .unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("Hello!")
        );
    }

    #[tokio::test]
    async fn relay_skips_empty_deltas() {
        let (tx, mut rx) = mpsc::channel(8);
        let chunk: ApiChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"content":""},"finish_reason":null},
                          {"index":0,"delta":{"content":"ok"},"finish_reason":null}]}"#,
        )
        .unwrap();
        relay_chunk(chunk, &tx).await;
        drop(tx);

        let mut deltas = Vec::new();
        while let Some(event) = rx.recv().await {
            if let StreamEvent::TextDelta(t) = event {
                deltas.push(t);
            }
        }
        assert_eq!(deltas, ["ok"]);
    }
}
