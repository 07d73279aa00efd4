use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{ProxySettings, UpstreamConfig};
use crate::proxy::{select_proxy, ProxyConfig};
use crate::utils::round2;
use crate::youtube::{FetchedTranscript, RawSegment, SourceFactory, TranscriptList, DEFAULT_LANGUAGE};
use crate::Result;

pub mod filters;
pub mod retry;

pub use filters::{apply_segment_filters, FilterParameters};
pub use retry::{is_retryable, RetryCoordinator, DEFAULT_MAX_RETRIES};

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,

    /// End time in seconds
    pub end: f64,
}

impl TranscriptSegment {
    /// Build a segment, deriving `end` and rounding every time field to two decimals
    pub fn new(text: String, start: f64, duration: f64) -> Self {
        let start = round2(start);
        let duration = round2(duration);
        Self {
            text,
            start,
            duration,
            end: round2(start + duration),
        }
    }
}

impl From<RawSegment> for TranscriptSegment {
    fn from(raw: RawSegment) -> Self {
        Self::new(raw.text, raw.start, raw.duration)
    }
}

/// Language and origin of the transcript that was served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
}

impl From<&FetchedTranscript> for TranscriptMetadata {
    fn from(fetched: &FetchedTranscript) -> Self {
        Self {
            video_id: fetched.video_id.clone(),
            language: fetched.language.clone(),
            language_code: fetched.language_code.clone(),
            is_generated: fetched.is_generated,
        }
    }
}

/// Segmented transcript payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentedTranscript {
    #[serde(flatten)]
    pub metadata: TranscriptMetadata,
    pub segments: Vec<TranscriptSegment>,
}

/// Flattened transcript payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnsegmentedTranscript {
    #[serde(flatten)]
    pub metadata: TranscriptMetadata,
    pub full_text: String,
}

/// One entry of the available-transcripts listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableTranscript {
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
    pub translation_languages: Vec<String>,
}

/// Available-transcripts payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableTranscripts {
    pub video_id: String,
    pub transcripts: Vec<AvailableTranscript>,
}

/// Composes proxy selection, retries and the segment filters for one request at a time
pub struct TranscriptService {
    factory: Arc<dyn SourceFactory>,
    proxy: ProxySettings,
    max_retries: u32,
}

impl TranscriptService {
    pub fn new(factory: Arc<dyn SourceFactory>, proxy: ProxySettings, upstream: &UpstreamConfig) -> Self {
        Self {
            factory,
            proxy,
            max_retries: upstream.max_retries,
        }
    }

    fn coordinator(&self) -> RetryCoordinator<'_> {
        RetryCoordinator::new(self.factory.as_ref(), self.max_retries)
    }

    /// Segmented transcript with the reduction filters applied
    pub async fn segmented(
        &self,
        video_id: &str,
        languages: Option<Vec<String>>,
        translate_to: Option<&str>,
        filters: &FilterParameters,
    ) -> Result<SegmentedTranscript> {
        let fetched = self.retrieve(video_id, languages, translate_to).await?;
        let metadata = TranscriptMetadata::from(&fetched);

        let segments: Vec<TranscriptSegment> = fetched
            .segments
            .into_iter()
            .map(TranscriptSegment::from)
            .collect();
        let total = segments.len();
        let segments = apply_segment_filters(segments, filters);

        if !filters.is_noop() {
            tracing::debug!("Filtered {} segments down to {} for {}", total, segments.len(), video_id);
        }

        Ok(SegmentedTranscript { metadata, segments })
    }

    /// Whole transcript as a single string
    pub async fn unsegmented(
        &self,
        video_id: &str,
        languages: Option<Vec<String>>,
        translate_to: Option<&str>,
        separator: &str,
    ) -> Result<UnsegmentedTranscript> {
        let fetched = self.retrieve(video_id, languages, translate_to).await?;
        let metadata = TranscriptMetadata::from(&fetched);

        let full_text = fetched
            .segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(separator);

        Ok(UnsegmentedTranscript { metadata, full_text })
    }

    /// Every caption track of the video, manually created first
    pub async fn available(&self, video_id: &str) -> Result<AvailableTranscripts> {
        let transport = select_proxy(&self.proxy);
        let list = self.list(video_id, transport).await?;

        let transcripts = list
            .iter()
            .map(|track| AvailableTranscript {
                language: track.language.clone(),
                language_code: track.language_code.clone(),
                is_generated: track.is_generated,
                is_translatable: track.is_translatable,
                translation_languages: track
                    .translation_languages
                    .iter()
                    .map(|lang| lang.language_code.clone())
                    .collect(),
            })
            .collect();

        Ok(AvailableTranscripts {
            video_id: video_id.to_string(),
            transcripts,
        })
    }

    /// Fetch the transcript, translating it first when a target language is given.
    ///
    /// One proxy session is used for the whole request.
    async fn retrieve(
        &self,
        video_id: &str,
        languages: Option<Vec<String>>,
        translate_to: Option<&str>,
    ) -> Result<FetchedTranscript> {
        let transport = select_proxy(&self.proxy);
        tracing::info!("Fetching transcript for {} via {}", video_id, transport);

        let Some(target) = translate_to else {
            let languages = languages.unwrap_or_default();
            return self
                .coordinator()
                .run(transport, |source| {
                    let languages = languages.clone();
                    async move { source.fetch(video_id, &languages).await }
                })
                .await;
        };

        let languages = languages.unwrap_or_else(|| vec![DEFAULT_LANGUAGE.to_string()]);
        let list = self.list(video_id, transport.clone()).await?;
        let base = list.find_transcript(&languages)?;
        tracing::info!(
            "Translating {} transcript of {} to {}",
            base.language_code,
            video_id,
            target
        );
        let translated = base.translate(target)?;

        self.coordinator()
            .run(transport, |source| {
                let track = translated.clone();
                async move { source.fetch_track(&track).await }
            })
            .await
    }

    async fn list(&self, video_id: &str, transport: ProxyConfig) -> Result<TranscriptList> {
        self.coordinator()
            .run(transport, |source| async move { source.list(video_id).await })
            .await
    }
}
