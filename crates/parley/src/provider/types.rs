//! Wire types for OpenAI-compatible chat completions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One role-tagged turn sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub stream: bool,
}

/// Closed result of reading a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Generated text from the first choice.
    Success(String),
    /// The provider answered with an error object (bad key, quota, ...).
    Rejected(String),
    /// The body was not JSON or did not have the expected shape.
    Malformed,
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    /// Loosely typed: some proxies report errors as plain strings.
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Decode a raw provider response body.
///
/// A reported `error` (object or string) wins over any `choices`. A success
/// needs non-empty `choices[0].message.content`; anything else is `Malformed`.
pub fn decode_completion(body: &[u8]) -> CompletionOutcome {
    let Ok(parsed) = serde_json::from_slice::<CompletionBody>(body) else {
        return CompletionOutcome::Malformed;
    };

    if let Some(message) = parsed.error.as_ref().and_then(error_message) {
        return CompletionOutcome::Rejected(message);
    }

    parsed
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
        .map_or(CompletionOutcome::Malformed, CompletionOutcome::Success)
}

/// Human-readable text of a reported error, `None` when nothing was reported.
///
/// Objects prefer `message`, then `type`, then their own JSON text.
fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => {
            let field = |name: &str| match fields.get(name) {
                None | Some(Value::Null) => None,
                Some(Value::String(text)) => Some(text.clone()),
                Some(other) => Some(other.to_string()),
            };
            field("message")
                .or_else(|| field("type"))
                .or_else(|| Some(error.to_string()))
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let body = br#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi there!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 3}
        }"#;
        assert_eq!(
            decode_completion(body),
            CompletionOutcome::Success("Hi there!".to_string())
        );
    }

    #[test]
    fn test_decode_provider_error() {
        let body = br#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        assert_eq!(
            decode_completion(body),
            CompletionOutcome::Rejected("Invalid API Key".to_string())
        );
    }

    #[test]
    fn test_decode_error_without_message_uses_type() {
        let body = br#"{"error": {"type": "rate_limit_exceeded"}}"#;
        assert_eq!(
            decode_completion(body),
            CompletionOutcome::Rejected("rate_limit_exceeded".to_string())
        );
    }

    #[test]
    fn test_decode_string_error() {
        let body = br#"{"error": "Invalid API Key"}"#;
        assert_eq!(
            decode_completion(body),
            CompletionOutcome::Rejected("Invalid API Key".to_string())
        );
    }

    #[test]
    fn test_decode_error_with_odd_fields() {
        let cases: [(&[u8], &str); 3] = [
            (br#"{"error": {"message": 42}}"#, "42"),
            (br#"{"error": {"message": null, "type": "server_error"}}"#, "server_error"),
            (br#"{"error": {"code": 503}}"#, r#"{"code":503}"#),
        ];
        for (body, expected) in cases {
            assert_eq!(
                decode_completion(body),
                CompletionOutcome::Rejected(expected.to_string()),
                "body: {}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_decode_null_error_falls_through_to_choices() {
        let body = br#"{"error": null, "choices": [{"message": {"content": "ok"}}]}"#;
        assert_eq!(
            decode_completion(body),
            CompletionOutcome::Success("ok".to_string())
        );
    }

    #[test]
    fn test_decode_unexpected_shapes() {
        let cases: [&[u8]; 7] = [
            b"not json",
            b"{}",
            br#"{"choices": []}"#,
            br#"{"choices": [{}]}"#,
            br#"{"choices": [{"message": {"content": null}}]}"#,
            br#"{"choices": [{"message": {"content": ""}}]}"#,
            br#"[1, 2, 3]"#,
        ];
        for body in cases {
            assert_eq!(
                decode_completion(body),
                CompletionOutcome::Malformed,
                "body: {}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest {
            model: "llama-3.3-70b-versatile".to_string(),
            messages: vec![ChatTurn::user("Hello")],
            temperature: 0.7,
            max_tokens: 500,
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert_eq!(json["max_tokens"], 500);
        assert_eq!(json["stream"], false);
    }
}
