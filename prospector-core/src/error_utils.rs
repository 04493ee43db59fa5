use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Platform(e) => {
                error!("Platform API error details: {:?}", e);
            }
            CoreError::Session(e) => {
                error!("Session error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Platform(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Platform(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ if self.is_retryable() => Some(Duration::from_secs(5)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Platform(e) => e.user_friendly_message(),
            CoreError::Session(SessionError::NotFound { .. }) => {
                "The crawl session could not be found. It may have expired.".to_string()
            }
            CoreError::Session(SessionError::AlreadyExists { .. }) => {
                "A crawl with this session id is already running.".to_string()
            }
            CoreError::Config(_) => {
                "Configuration error occurred. Please check your settings.".to_string()
            }
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Partial results may be available."
                    .to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Platform(e) => e.error_code(),
            CoreError::Session(_) => "SESSION".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for PlatformApiError {
    fn log_error(&self) -> &Self {
        error!("PlatformApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("PlatformApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            PlatformApiError::RateLimitExceeded { .. } => true,
            PlatformApiError::CircuitOpen { .. } => true,
            PlatformApiError::RequestTimeout => true,
            PlatformApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            PlatformApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            PlatformApiError::CircuitOpen { retry_in } => Some(Duration::from_secs(*retry_in)),
            _ if self.is_retryable() => Some(Duration::from_secs(30)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            PlatformApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            PlatformApiError::CircuitOpen { retry_in } => format!(
                "The platform is being throttled after repeated failures. Retrying in {} seconds.",
                retry_in
            ),
            PlatformApiError::RequestTimeout => {
                "Request to the platform timed out. Please try again.".to_string()
            }
            PlatformApiError::CommunityNotFound { community } => {
                format!("Community '{}' not found or is private.", community)
            }
            PlatformApiError::Forbidden { resource } => {
                format!("Access denied to {}.", resource)
            }
            _ => "Platform API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            PlatformApiError::RateLimitExceeded { .. } => "PLATFORM_RATE_LIMIT".to_string(),
            PlatformApiError::CircuitOpen { .. } => "PLATFORM_CIRCUIT_OPEN".to_string(),
            PlatformApiError::RequestTimeout => "PLATFORM_TIMEOUT".to_string(),
            PlatformApiError::ServerError { .. } => "PLATFORM_SERVER_ERROR".to_string(),
            PlatformApiError::InvalidResponse { .. } => "PLATFORM_INVALID_RESPONSE".to_string(),
            PlatformApiError::CommunityNotFound { .. } => {
                "PLATFORM_COMMUNITY_NOT_FOUND".to_string()
            }
            PlatformApiError::Forbidden { .. } => "PLATFORM_FORBIDDEN".to_string(),
        }
    }
}

pub async fn retry_with_backoff<F, T, E>(
    mut operation: F,
    max_retries: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: ErrorExt,
{
    let mut attempt = 0;
    let mut delay = initial_delay;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= max_retries || !error.is_retryable() {
                    return Err(error);
                }

                if let Some(retry_delay) = error.retry_after() {
                    delay = retry_delay;
                }

                info!(
                    "Retrying operation (attempt {}/{}) after {:?}",
                    attempt + 1,
                    max_retries,
                    delay
                );

                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(60));
                attempt += 1;
            }
        }
    }
}
