use prospector_core::{ConfigError, CoreError, ErrorExt, PlatformApiError, SessionError};
use std::time::Duration;

#[test]
fn test_error_codes() {
    let platform_error = CoreError::Platform(PlatformApiError::RequestTimeout);
    assert_eq!(platform_error.error_code(), "PLATFORM_TIMEOUT");

    let session_error = CoreError::Session(SessionError::NotFound {
        session_id: "abc123".to_string(),
    });
    assert_eq!(session_error.error_code(), "SESSION");

    let config_error = CoreError::Config(ConfigError::InvalidValue {
        field: "base_url".to_string(),
        value: String::new(),
    });
    assert_eq!(config_error.error_code(), "CONFIG");
}

#[test]
fn test_retryable_errors() {
    let retryable_error =
        CoreError::Platform(PlatformApiError::RateLimitExceeded { retry_after: 60 });
    assert!(retryable_error.is_retryable());

    let circuit_error = CoreError::Platform(PlatformApiError::CircuitOpen { retry_in: 30 });
    assert!(circuit_error.is_retryable());

    let non_retryable_error = CoreError::Config(ConfigError::InvalidValue {
        field: "base_url".to_string(),
        value: String::new(),
    });
    assert!(!non_retryable_error.is_retryable());
}

#[test]
fn test_retry_after() {
    let rate_limit_error =
        CoreError::Platform(PlatformApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(
        rate_limit_error.retry_after(),
        Some(Duration::from_secs(60))
    );

    let circuit_error = CoreError::Platform(PlatformApiError::CircuitOpen { retry_in: 15 });
    assert_eq!(circuit_error.retry_after(), Some(Duration::from_secs(15)));

    let timeout_error = CoreError::Timeout { seconds: 30 };
    assert_eq!(timeout_error.retry_after(), Some(Duration::from_secs(30)));
}

#[test]
fn test_user_friendly_messages() {
    let circuit_error = CoreError::Platform(PlatformApiError::CircuitOpen { retry_in: 20 });
    let message = circuit_error.user_friendly_message();
    assert!(!message.is_empty());
    assert!(message.contains("20 seconds"));

    let community_error = CoreError::Platform(PlatformApiError::CommunityNotFound {
        community: "ghosttown".to_string(),
    });
    let message = community_error.user_friendly_message();
    assert!(message.contains("ghosttown"));
}

#[test]
fn test_session_error_conversion() {
    let err: CoreError = SessionError::AlreadyExists {
        session_id: "s1".to_string(),
    }
    .into();
    assert!(matches!(
        err,
        CoreError::Session(SessionError::AlreadyExists { .. })
    ));
}
