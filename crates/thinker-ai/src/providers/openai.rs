//! OpenAI-compatible Chat Completions provider (xAI, OpenAI, local servers)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CompletionProvider;
use crate::{
    error::{Error, Result},
    types::{Message, ProviderConfig},
};

/// Environment variable consulted by [`OpenAICompatProvider::from_env`]
pub const API_KEY_ENV_VAR: &str = "XAI_API_KEY";

/// Non-streaming chat-completion client
pub struct OpenAICompatProvider {
    client: reqwest::Client,
    api_key: String,
    config: ProviderConfig,
}

impl OpenAICompatProvider {
    /// Create a new provider with an API key
    pub fn new(api_key: impl Into<String>, config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Create from environment variable
    pub fn from_env(config: ProviderConfig) -> Result<Self> {
        let api_key = super::get_api_key(None, API_KEY_ENV_VAR)?;
        Self::new(api_key, config)
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request<'a>(&self, messages: &'a [Message], model: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model,
            messages,
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompatProvider {
    async fn try_complete(&self, messages: &[Message], model: &str) -> Result<String> {
        let request = self.build_request(messages, model);
        let url = self.endpoint();

        tracing::debug!(%url, model, messages = messages.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Only a plain 200 counts; 201/204 and friends are not chat replies.
        if status != reqwest::StatusCode::OK {
            return Err(Error::status(status.as_u16(), body));
        }

        parse_completion(&body)
    }
}

/// Pull `choices[0].message.content` out of a response body
fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::UnexpectedResponse("no choices in response".into()))?;

    let content = choice
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| Error::UnexpectedResponse("choice has no message content".into()))?;

    if content.is_empty() {
        return Err(Error::EmptyContent);
    }
    Ok(content)
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const VALID_BODY: &str =
        r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Hi there"}}]}"#;

    /// Answer every connection on a loopback port with the same canned
    /// response. Returns the base URL to point a provider at.
    async fn serve(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while !request_complete(&request) {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }

                let response = format!(
                    "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}/v1", addr)
    }

    /// Whether the headers and the full body of a request have arrived
    fn request_complete(request: &[u8]) -> bool {
        let Some(header_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let headers = String::from_utf8_lossy(&request[..header_end]);
        let content_length = headers
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn provider(base_url: &str) -> OpenAICompatProvider {
        OpenAICompatProvider::new(
            "sk-test",
            ProviderConfig {
                base_url: base_url.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_request_shape() {
        let p = provider("https://api.x.ai/v1");
        let messages = vec![Message::system("sys"), Message::user("hello")];
        let json = serde_json::to_value(p.build_request(&messages, "grok-3")).unwrap();

        assert_eq!(json["model"], "grok-3");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hello");
        assert!((json["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(json.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_endpoint_handles_trailing_slash() {
        assert_eq!(
            provider("http://localhost:8080/v1/").endpoint(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_parse_completion_success() {
        assert_eq!(parse_completion(VALID_BODY).unwrap(), "Hi there");
    }

    #[test]
    fn test_parse_completion_missing_fields() {
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(Error::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"error":{"message":"bad"}}"#),
            Err(Error::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#),
            Err(Error::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"finish_reason":"stop"}]}"#),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_parse_completion_malformed_body() {
        assert!(matches!(parse_completion("<html>oops</html>"), Err(Error::Json(_))));
    }

    #[test]
    fn test_parse_completion_empty_content() {
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":""}}]}"#),
            Err(Error::EmptyContent)
        ));
    }

    #[tokio::test]
    async fn test_ok_status_returns_content() {
        let p = provider(&serve("HTTP/1.1 200 OK", VALID_BODY).await);
        let text = p.try_complete(&[Message::user("q")], "grok-3").await.unwrap();
        assert_eq!(text, "Hi there");
    }

    #[tokio::test]
    async fn test_server_error_status_is_failure() {
        let p = provider(&serve("HTTP/1.1 500 Internal Server Error", r#"{"error":"boom"}"#).await);

        match p.try_complete(&[Message::user("q")], "grok-3").await {
            Err(Error::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(p.complete(&[Message::user("q")], "grok-3").await.is_none());
    }

    #[tokio::test]
    async fn test_other_success_codes_are_failures() {
        // A well-formed reply under 201 is still rejected
        let p = provider(&serve("HTTP/1.1 201 Created", VALID_BODY).await);

        match p.try_complete(&[Message::user("q")], "grok-3").await {
            Err(Error::Status { status, .. }) => assert_eq!(status, 201),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(p.complete(&[Message::user("q")], "grok-3").await.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_collapses_to_none() {
        // Port 1 on loopback refuses connections.
        let p = provider("http://127.0.0.1:1/v1");
        let err = p.try_complete(&[Message::user("q")], "grok-3").await.unwrap_err();
        assert!(err.is_transport());
        assert!(p.complete(&[Message::user("q")], "grok-3").await.is_none());
    }
}
