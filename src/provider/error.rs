//! Provider error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Missing API key. Set {env_var} in the environment or a .env file")]
    MissingApiKey { env_var: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after:?}s")]
    RateLimited { retry_after: Option<u64> },
}

/// Format an API error for display, extracting the message from a JSON
/// error body when one is present.
///
/// Vendor errors usually arrive as `HTTP 4xx: {"error": {"message": ...}}`;
/// showing the raw body at the prompt is unhelpful.
#[must_use]
pub fn format_api_error(error: &str) -> String {
    let Some(json_start) = error.find('{') else {
        return error.to_string();
    };

    let Ok(json) = serde_json::from_str::<serde_json::Value>(&error[json_start..]) else {
        return error.to_string();
    };

    match extract_message(&json) {
        Some(msg) => {
            let prefix = error[..json_start].trim();
            if prefix.is_empty() {
                msg
            } else {
                format!("{prefix} {msg}")
            }
        }
        None => error.to_string(),
    }
}

/// Pull a human-readable message out of a JSON error body.
fn extract_message(json: &serde_json::Value) -> Option<String> {
    if let Some(error_obj) = json.get("error") {
        if let Some(msg) = error_obj.get("message").and_then(|v| v.as_str()) {
            let mut result = msg.to_string();
            if let Some(code) = error_obj.get("code").and_then(|v| v.as_str()) {
                result = format!("{result} (code: {code})");
            }
            return Some(result);
        }
        if let Some(msg) = error_obj.as_str() {
            return Some(msg.to_string());
        }
    }

    json.get("message")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nested_message() {
        let error = r#"HTTP 401: {"error":{"message":"Invalid API key","type":"authentication_error","code":"invalid_api_key"}}"#;
        assert_eq!(
            format_api_error(error),
            "HTTP 401: Invalid API key (code: invalid_api_key)"
        );
    }

    #[test]
    fn extracts_string_error() {
        assert_eq!(
            format_api_error(r#"{"error":"Account not activated"}"#),
            "Account not activated"
        );
    }

    #[test]
    fn extracts_top_level_message() {
        assert_eq!(
            format_api_error(r#"{"message":"Model not found"}"#),
            "Model not found"
        );
    }

    #[test]
    fn passes_plain_text_through() {
        assert_eq!(format_api_error("Connection refused"), "Connection refused");
    }

    #[test]
    fn passes_unparseable_json_through() {
        assert_eq!(
            format_api_error("HTTP 500: {not json}"),
            "HTTP 500: {not json}"
        );
    }

    #[test]
    fn missing_key_error_names_the_variable() {
        let err = Error::MissingApiKey {
            env_var: "NVIDIA_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("NVIDIA_API_KEY"));
    }
}
