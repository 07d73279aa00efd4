use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::parser;
use super::{FetchedTranscript, SourceFactory, TranscriptList, TranscriptSource, TranscriptTrack};
use crate::proxy::ProxyConfig;
use crate::{Result, TranscriptError};

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// Innertube client identity used for the player request
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

/// YouTube transcript source over HTTP
pub struct YoutubeClient {
    client: Client,
    base_url: String,
}

impl YoutubeClient {
    /// Create a client for the given transport
    pub fn new(proxy: &ProxyConfig, timeout: Duration) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);

        if let Some(proxy) = proxy.to_reqwest_proxy()? {
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TranscriptError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: YOUTUBE_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (used against mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch the watch page, accepting the cookie consent form once if YouTube shows it
    async fn fetch_watch_page(&self, video_id: &str) -> Result<String> {
        let url = format!("{}/watch?v={}", self.base_url, urlencoding::encode(video_id));
        tracing::debug!("Fetching watch page: {}", url);

        let html = self.get_text(&url, None).await?;

        match parser::extract_consent_value(&html) {
            Some(consent) => {
                tracing::debug!("Consent page returned for {}, retrying with cookie", video_id);
                let cookie = format!("CONSENT=YES+{}", consent);
                let html = self.get_text(&url, Some(&cookie)).await?;

                if parser::extract_consent_value(&html).is_some() {
                    return Err(TranscriptError::UnexpectedResponse {
                        video_id: video_id.to_string(),
                        reason: "failed to accept the cookie consent form".to_string(),
                    });
                }
                Ok(html)
            }
            None => Ok(html),
        }
    }

    async fn get_text(&self, url: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url).header(ACCEPT_LANGUAGE, "en-US");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Ask the innertube player endpoint for the caption tracks of a video
    async fn fetch_player_response(&self, video_id: &str, api_key: &str) -> Result<String> {
        let url = format!("{}/youtubei/v1/player?key={}", self.base_url, api_key);
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .client
            .post(&url)
            .header(ACCEPT_LANGUAGE, "en-US")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    /// Rewrite a track URL onto the configured base URL
    fn track_url(&self, track: &TranscriptTrack) -> String {
        if self.base_url == YOUTUBE_BASE_URL {
            return track.url.clone();
        }

        let (Ok(mut url), Ok(base)) = (Url::parse(&track.url), Url::parse(&self.base_url)) else {
            return track.url.clone();
        };
        // Scheme changes between http and https always succeed
        let _ = url.set_scheme(base.scheme());
        if url.set_host(base.host_str()).is_err() || url.set_port(base.port()).is_err() {
            return track.url.clone();
        }
        url.to_string()
    }
}

#[async_trait]
impl TranscriptSource for YoutubeClient {
    async fn list(&self, video_id: &str) -> Result<TranscriptList> {
        let html = self.fetch_watch_page(video_id).await?;

        let api_key = match parser::extract_api_key(&html) {
            Some(key) => key,
            None if parser::is_recaptcha_page(&html) => {
                return Err(TranscriptError::IpBlocked {
                    video_id: video_id.to_string(),
                })
            }
            None => {
                return Err(TranscriptError::UnexpectedResponse {
                    video_id: video_id.to_string(),
                    reason: "innertube API key not found in watch page".to_string(),
                })
            }
        };

        let body = self.fetch_player_response(video_id, &api_key).await?;
        parser::parse_player_response(video_id, &body)
    }

    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<FetchedTranscript> {
        let url = self.track_url(track);
        tracing::debug!("Fetching {} captions for {}", track.language_code, track.video_id);

        let xml = self.get_text(&url, None).await?;
        let segments = parser::parse_timedtext(&xml);

        tracing::info!(
            "Fetched {} segments for video {} ({})",
            segments.len(),
            track.video_id,
            track.language_code
        );

        Ok(FetchedTranscript {
            video_id: track.video_id.clone(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            segments,
        })
    }
}

/// Builds a fresh [`YoutubeClient`] per transport configuration
pub struct YoutubeClientFactory {
    timeout: Duration,
    base_url: Option<String>,
}

impl YoutubeClientFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl SourceFactory for YoutubeClientFactory {
    fn connect(&self, proxy: &ProxyConfig) -> Result<Arc<dyn TranscriptSource>> {
        let mut client = YoutubeClient::new(proxy, self.timeout)?;
        if let Some(base_url) = &self.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Ok(Arc::new(client))
    }
}
