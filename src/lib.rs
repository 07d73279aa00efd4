//! YouTube Transcription API - an HTTP service serving YouTube transcripts
//!
//! This library fetches timed-text transcripts from YouTube, optionally through a rotating
//! residential proxy, and reshapes them into segmented or flattened responses.

pub mod cli;
pub mod config;
pub mod proxy;
pub mod server;
pub mod transcript;
pub mod utils;
pub mod youtube;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use proxy::ProxyConfig;
pub use transcript::{FilterParameters, TranscriptSegment, TranscriptService};
pub use youtube::{SourceFactory, TranscriptSource};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Failures raised while retrieving transcripts from YouTube
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Subtitles are disabled for video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error("No transcript found for video {video_id} in {requested:?} (available: {available:?})")]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("Video {video_id} is no longer available")]
    VideoUnavailable { video_id: String },

    #[error("Video {video_id} is unplayable: {reason}")]
    VideoUnplayable { video_id: String, reason: String },

    #[error("YouTube is blocking requests for video {video_id} (bot check)")]
    RequestBlocked { video_id: String },

    #[error("YouTube is blocking requests from this IP for video {video_id}")]
    IpBlocked { video_id: String },

    #[error("The requested transcript of video {video_id} is not translatable")]
    NotTranslatable { video_id: String },

    #[error("Translation language {language} is not available for video {video_id}")]
    TranslationLanguageNotAvailable { video_id: String, language: String },

    #[error("{0}")]
    Network(String),

    #[error("Unexpected response from YouTube for video {video_id}: {reason}")]
    UnexpectedResponse { video_id: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl From<reqwest::Error> for TranscriptError {
    fn from(err: reqwest::Error) -> Self {
        TranscriptError::Network(describe_reqwest_error(err))
    }
}

/// Flatten a reqwest error and its sources into one line.
///
/// The classifier and the retry coordinator only see the rendered message, so the request
/// URL is left out (query strings carry arbitrary digits) and proxy and timeout failures get
/// an explicit marker that survives the flattening.
fn describe_reqwest_error(err: reqwest::Error) -> String {
    if let Some(url) = err.url() {
        tracing::debug!("Request to {} failed", url);
    }
    let is_timeout = err.is_timeout();
    let err = err.without_url();

    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }

    let lower = message.to_lowercase();
    if lower.contains("proxy authentication required") && !lower.contains("407") {
        message = format!("407 Proxy Authentication Required: {}", message);
    } else if lower.contains("tunnel") && !lower.contains("proxyerror") {
        message = format!("ProxyError: tunnel connection failed: {}", message);
    }
    if is_timeout && !lower.contains("timeout") {
        message = format!("timeout: {}", message);
    }
    message
}
