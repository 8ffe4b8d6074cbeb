//! Validation shared by every Reddit call.
//!
//! Reddit reports failures two ways: a non-success status code, or a 200 whose
//! body carries an `error`/`errors` entry (sometimes nested under `json`).
//! Both are turned into [`RedditApiError`] values here.

use flairbot_core::RedditApiError;
use reqwest::StatusCode;
use serde_json::Value;

/// Maps a non-success status to the matching transport error.
pub fn status_error(
    endpoint: &str,
    status: StatusCode,
    retry_after: Option<u64>,
) -> RedditApiError {
    match status.as_u16() {
        429 => RedditApiError::RateLimitExceeded {
            retry_after: retry_after.unwrap_or(60),
        },
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::HttpStatus {
            endpoint: endpoint.to_string(),
            status_code: code,
        },
    }
}

/// Looks for error payloads in a successful response body.
pub fn check_response_errors(endpoint: &str, body: &Value) -> Result<(), RedditApiError> {
    let mut messages = collect_errors(body);
    if let Some(nested) = body.get("json") {
        messages.extend(collect_errors(nested));
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(RedditApiError::Remote {
            endpoint: endpoint.to_string(),
            messages,
        })
    }
}

fn collect_errors(value: &Value) -> Vec<String> {
    let mut messages = Vec::new();

    if let Some(errors) = value.get("errors").and_then(Value::as_array) {
        messages.extend(errors.iter().map(describe_error_entry));
    }

    match value.get("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            let mut message = render(error);
            if let Some(description) = value.get("error_description").and_then(Value::as_str) {
                message = format!("{}: {}", message, description);
            } else if let Some(text) = value.get("message").and_then(Value::as_str) {
                message = format!("{}: {}", message, text);
            }
            messages.push(message);
        }
    }

    messages
}

/// Reddit's `errors` entries are `[code, message, field]` triples.
fn describe_error_entry(entry: &Value) -> String {
    match entry {
        Value::Array(parts) => match (parts.first(), parts.get(1)) {
            (Some(code), Some(message)) => format!("{}: {}", render(code), render(message)),
            (Some(code), None) => render(code),
            _ => "unknown error".to_string(),
        },
        other => render(other),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_body_passes() {
        let body = json!({"kind": "Listing", "data": {"children": [], "after": null}});
        assert!(check_response_errors("/r/test/new", &body).is_ok());

        let body = json!({"errors": [], "json": {"errors": []}});
        assert!(check_response_errors("/r/test/api/flaircsv", &body).is_ok());
    }

    #[test]
    fn test_top_level_errors_list() {
        let body = json!({"errors": [["BAD_FLAIR", "flair is too long", "text"]]});
        match check_response_errors("set_user_flairs", &body) {
            Err(RedditApiError::Remote { endpoint, messages }) => {
                assert_eq!(endpoint, "set_user_flairs");
                assert_eq!(messages, vec!["BAD_FLAIR: flair is too long"]);
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_top_level_error_field() {
        let body = json!({"error": "invalid_grant"});
        let err = check_response_errors("/api/v1/access_token", &body).unwrap_err();
        assert_eq!(err.to_string(), "'/api/v1/access_token' error: invalid_grant");

        let body = json!({"error": 403, "message": "Forbidden"});
        let err = check_response_errors("/r/test/new", &body).unwrap_err();
        assert_eq!(err.to_string(), "'/r/test/new' error: 403: Forbidden");
    }

    #[test]
    fn test_nested_json_errors() {
        let body = json!({"json": {"errors": [["RATELIMIT", "you are doing that too much"]]}});
        assert!(matches!(
            check_response_errors("x", &body),
            Err(RedditApiError::Remote { .. })
        ));

        let body = json!({"json": {"error": "USER_REQUIRED"}});
        match check_response_errors("x", &body) {
            Err(RedditApiError::Remote { messages, .. }) => {
                assert_eq!(messages, vec!["USER_REQUIRED"]);
            }
            other => panic!("Expected Remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_array_bodies_pass_through() {
        let body = json!([{"ok": true, "status": "added flair for user alice"}]);
        assert!(check_response_errors("x", &body).is_ok());
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("x", StatusCode::TOO_MANY_REQUESTS, Some(12)),
            RedditApiError::RateLimitExceeded { retry_after: 12 }
        ));
        assert!(matches!(
            status_error("x", StatusCode::UNAUTHORIZED, None),
            RedditApiError::InvalidToken
        ));
        assert!(matches!(
            status_error("x", StatusCode::BAD_GATEWAY, None),
            RedditApiError::ServerError { status_code: 502 }
        ));
        match status_error("/r/test/new", StatusCode::NOT_FOUND, None) {
            RedditApiError::HttpStatus {
                endpoint,
                status_code,
            } => {
                assert_eq!(endpoint, "/r/test/new");
                assert_eq!(status_code, 404);
            }
            other => panic!("Expected HttpStatus, got {:?}", other),
        }
    }
}
