//! Mapping of upstream failures to HTTP responses.
//!
//! Rules are evaluated top to bottom and the first match wins. Proxy and timeout checks look
//! at the rendered message and come before the typed checks, because a timeout can surface
//! wrapped inside another error whose message still carries the marker.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::TranscriptError;

/// Error returned to HTTP clients as `{"detail": ...}`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
    challenge: bool,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            challenge: false,
        }
    }

    /// Malformed or out-of-range query parameters
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    /// Missing or wrong bearer token; carries a `WWW-Authenticate` challenge
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self {
            challenge: true,
            ..Self::new(StatusCode::UNAUTHORIZED, detail)
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status, self.detail)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(json!({ "detail": self.detail }))).into_response();
        if self.challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Externally visible failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    ProxyAuthentication,
    ProxyConnection,
    UpstreamUnavailable,
    Timeout,
    TranscriptsDisabled,
    NoTranscript,
    VideoUnavailable,
    RateLimited,
    Blocked,
    NotTranslatable,
    TranslationUnavailable,
    Internal,
}

impl ErrorClass {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorClass::ProxyAuthentication | ErrorClass::ProxyConnection => StatusCode::BAD_GATEWAY,
            ErrorClass::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorClass::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorClass::TranscriptsDisabled | ErrorClass::Blocked => StatusCode::FORBIDDEN,
            ErrorClass::NoTranscript | ErrorClass::VideoUnavailable => StatusCode::NOT_FOUND,
            ErrorClass::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorClass::NotTranslatable | ErrorClass::TranslationUnavailable => StatusCode::BAD_REQUEST,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(self, err: &TranscriptError, video_id: &str) -> String {
        match self {
            ErrorClass::ProxyAuthentication => {
                "Proxy authentication failed. Please check proxy credentials.".to_string()
            }
            ErrorClass::ProxyConnection => {
                "Proxy connection failed. Please try again later.".to_string()
            }
            ErrorClass::UpstreamUnavailable => {
                "Service temporarily unavailable due to connection issues. Please try again later."
                    .to_string()
            }
            ErrorClass::Timeout => "Request timed out. Please try again later.".to_string(),
            ErrorClass::TranscriptsDisabled => {
                format!("Transcripts are disabled for video {}", video_id)
            }
            ErrorClass::NoTranscript => format!(
                "No transcript found for video {} in the requested language(s)",
                video_id
            ),
            ErrorClass::VideoUnavailable => format!("Video {} is unavailable", video_id),
            ErrorClass::RateLimited => "Too many requests. Please try again later.".to_string(),
            ErrorClass::Blocked => "Request blocked. Consider using a proxy service.".to_string(),
            ErrorClass::NotTranslatable => {
                "The requested transcript cannot be translated".to_string()
            }
            ErrorClass::TranslationUnavailable => {
                "Translation to the requested language is not available".to_string()
            }
            ErrorClass::Internal => format!("An unexpected error occurred: {}", err),
        }
    }
}

/// A classification rule: predicate over the error and its lowercased message
struct Rule {
    matches: fn(&TranscriptError, &str) -> bool,
    class: ErrorClass,
}

fn contains_any(message: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| message.contains(needle))
}

const RULES: &[Rule] = &[
    Rule {
        matches: |_, msg| contains_any(msg, &["407", "auth failed", "ip_forbidden"]),
        class: ErrorClass::ProxyAuthentication,
    },
    Rule {
        matches: |_, msg| contains_any(msg, &["proxyerror", "tunnel connection failed"]),
        class: ErrorClass::ProxyConnection,
    },
    Rule {
        matches: |_, msg| contains_any(msg, &["max retries exceeded", "connection pool"]),
        class: ErrorClass::UpstreamUnavailable,
    },
    Rule {
        matches: |_, msg| contains_any(msg, &["read timed out", "timeout"]),
        class: ErrorClass::Timeout,
    },
    Rule {
        matches: |err, _| matches!(err, TranscriptError::TranscriptsDisabled { .. }),
        class: ErrorClass::TranscriptsDisabled,
    },
    Rule {
        matches: |err, _| matches!(err, TranscriptError::NoTranscriptFound { .. }),
        class: ErrorClass::NoTranscript,
    },
    Rule {
        matches: |err, _| {
            matches!(
                err,
                TranscriptError::VideoUnavailable { .. } | TranscriptError::VideoUnplayable { .. }
            )
        },
        class: ErrorClass::VideoUnavailable,
    },
    Rule {
        matches: |_, msg| contains_any(msg, &["429", "too many requests"]),
        class: ErrorClass::RateLimited,
    },
    Rule {
        matches: |err, _| {
            matches!(
                err,
                TranscriptError::RequestBlocked { .. } | TranscriptError::IpBlocked { .. }
            )
        },
        class: ErrorClass::Blocked,
    },
    Rule {
        matches: |err, _| matches!(err, TranscriptError::NotTranslatable { .. }),
        class: ErrorClass::NotTranslatable,
    },
    Rule {
        matches: |err, _| matches!(err, TranscriptError::TranslationLanguageNotAvailable { .. }),
        class: ErrorClass::TranslationUnavailable,
    },
];

/// Pick the first matching class for an error
pub fn classify(err: &TranscriptError) -> ErrorClass {
    let message = err.to_string().to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(err, &message))
        .map(|rule| rule.class)
        .unwrap_or(ErrorClass::Internal)
}

/// Convert an upstream failure for `video_id` into the response sent to the client
pub fn handle_transcript_error(err: &TranscriptError, video_id: &str) -> ApiError {
    let class = classify(err);
    match class {
        ErrorClass::Internal => tracing::error!("Unclassified failure for {}: {}", video_id, err),
        _ => tracing::warn!("Request for {} failed ({:?}): {}", video_id, class, err),
    }
    ApiError::new(class.status(), class.detail(err, video_id))
}
