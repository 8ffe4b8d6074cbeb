use flairbot_core::{
    ConfigError, CoreError, ErrorCategory, ErrorExt, ErrorReporter, RedditApiError,
};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    assert_eq!(reddit_error.error_code(), "REDDIT_API");

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "client_id".to_string(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");

    let remote = RedditApiError::Remote {
        endpoint: "/r/test/api/flaircsv".to_string(),
        messages: vec!["USER_REQUIRED: please login".to_string()],
    };
    assert_eq!(remote.error_code(), "REDDIT_REMOTE_ERROR");
}

#[test]
fn test_error_categories() {
    let transport = CoreError::RedditApi(RedditApiError::HttpStatus {
        endpoint: "/r/test/new".to_string(),
        status_code: 404,
    });
    assert_eq!(transport.category(), ErrorCategory::Transport);

    let timeout = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert_eq!(timeout.category(), ErrorCategory::Transport);

    let remote = CoreError::RedditApi(RedditApiError::Remote {
        endpoint: "/api/v1/access_token".to_string(),
        messages: vec!["invalid_grant".to_string()],
    });
    assert_eq!(remote.category(), ErrorCategory::RemoteApi);

    let auth = CoreError::RedditApi(RedditApiError::AuthenticationFailed {
        reason: "invalid_grant".to_string(),
    });
    assert_eq!(auth.category(), ErrorCategory::Authentication);

    let local = CoreError::InvalidInput {
        message: "mismatched batch".to_string(),
    };
    assert_eq!(local.category(), ErrorCategory::Local);
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    let timeout = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert!(timeout.is_retryable());

    let non_retryable_error = CoreError::Config(ConfigError::MissingField {
        field: "password".to_string(),
    });
    assert!(!non_retryable_error.is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let timeout_error = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert_eq!(timeout_error.retry_after(), Some(Duration::from_secs(30)));
}

#[test]
fn test_remote_error_display_joins_messages() {
    let error = RedditApiError::Remote {
        endpoint: "set_user_flairs".to_string(),
        messages: vec!["BAD_CSS: invalid css".to_string(), "TOO_LONG".to_string()],
    };
    assert_eq!(
        error.to_string(),
        "'set_user_flairs' error: BAD_CSS: invalid css; TOO_LONG"
    );
}

#[test]
fn test_user_friendly_messages() {
    let reddit_error = CoreError::RedditApi(RedditApiError::InvalidToken);
    let message = reddit_error.user_friendly_message();
    assert!(message.contains("authentication token is invalid"));

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "client_id".to_string(),
    });
    let message = config_error.user_friendly_message();
    assert!(message.contains("client_id"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new();

    // Reporting only logs; retryable and permanent errors both go through.
    reporter.report_error(&CoreError::RedditApi(RedditApiError::InvalidToken));
    reporter.report_error(&CoreError::RedditApi(RedditApiError::RateLimitExceeded {
        retry_after: 5,
    }));
}
