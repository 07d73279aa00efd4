use async_trait::async_trait;
use std::sync::Arc;

pub mod client;
pub mod parser;

pub use client::{YoutubeClient, YoutubeClientFactory};

use crate::proxy::ProxyConfig;
use crate::{Result, TranscriptError};

/// Language tried when the caller does not ask for one
pub const DEFAULT_LANGUAGE: &str = "en";

/// A single caption entry as delivered by YouTube
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A language a transcript can be machine-translated into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationLanguage {
    pub language: String,
    pub language_code: String,
}

/// One caption track listed for a video
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptTrack {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
    pub translation_languages: Vec<TranslationLanguage>,

    /// Timed-text URL for this track
    pub url: String,
}

impl TranscriptTrack {
    /// Derive the machine-translated variant of this track
    pub fn translate(&self, language_code: &str) -> Result<TranscriptTrack> {
        if !self.is_translatable {
            return Err(TranscriptError::NotTranslatable {
                video_id: self.video_id.clone(),
            });
        }

        let target = self
            .translation_languages
            .iter()
            .find(|lang| lang.language_code == language_code)
            .ok_or_else(|| TranscriptError::TranslationLanguageNotAvailable {
                video_id: self.video_id.clone(),
                language: language_code.to_string(),
            })?;

        Ok(TranscriptTrack {
            video_id: self.video_id.clone(),
            language: target.language.clone(),
            language_code: target.language_code.clone(),
            is_generated: true,
            is_translatable: false,
            translation_languages: Vec::new(),
            url: format!("{}&tlang={}", self.url, urlencoding::encode(language_code)),
        })
    }
}

/// All caption tracks of a video, manually created ones first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscriptList {
    pub video_id: String,
    pub manually_created: Vec<TranscriptTrack>,
    pub generated: Vec<TranscriptTrack>,
}

impl TranscriptList {
    /// Iterate over every track, manually created before generated
    pub fn iter(&self) -> impl Iterator<Item = &TranscriptTrack> {
        self.manually_created.iter().chain(self.generated.iter())
    }

    /// Find the best track for the preferred language codes.
    ///
    /// Codes are tried in order; for each code a manually created track wins over a
    /// generated one.
    pub fn find_transcript(&self, language_codes: &[String]) -> Result<&TranscriptTrack> {
        for code in language_codes {
            let found = self
                .manually_created
                .iter()
                .chain(self.generated.iter())
                .find(|track| &track.language_code == code);

            if let Some(track) = found {
                return Ok(track);
            }
        }

        Err(TranscriptError::NoTranscriptFound {
            video_id: self.video_id.clone(),
            requested: language_codes.to_vec(),
            available: self.iter().map(|track| track.language_code.clone()).collect(),
        })
    }
}

/// A fetched transcript together with the metadata of the track it came from
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTranscript {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub segments: Vec<RawSegment>,
}

/// Source of transcripts for YouTube videos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// List the caption tracks available for a video
    async fn list(&self, video_id: &str) -> Result<TranscriptList>;

    /// Download the captions of one track
    async fn fetch_track(&self, track: &TranscriptTrack) -> Result<FetchedTranscript>;

    /// Fetch the best transcript for the preferred languages (`en` when empty)
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<FetchedTranscript> {
        let list = self.list(video_id).await?;
        let default_languages = [DEFAULT_LANGUAGE.to_string()];
        let languages = if languages.is_empty() {
            &default_languages[..]
        } else {
            languages
        };

        let track = list.find_transcript(languages)?;
        self.fetch_track(track).await
    }
}

/// Builds transcript sources bound to a transport configuration
#[cfg_attr(test, mockall::automock)]
pub trait SourceFactory: Send + Sync {
    fn connect(&self, proxy: &ProxyConfig) -> Result<Arc<dyn TranscriptSource>>;
}


#[cfg(test)]
mod tests {
    use super::fixtures::{list, track, StaticSource};
    use super::*;

    fn codes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_iter_lists_manual_first() {
        let list = list();
        let order: Vec<(&str, bool)> = list
            .iter()
            .map(|t| (t.language_code.as_str(), t.is_generated))
            .collect();
        assert_eq!(
            order,
            vec![("es", false), ("en", false), ("en", true), ("pt", true)]
        );
    }

    #[test]
    fn test_find_prefers_manual_track() {
        let list = list();
        let found = list.find_transcript(&codes(&["en"])).unwrap();
        assert_eq!(found.language_code, "en");
        assert!(!found.is_generated);
    }

    #[test]
    fn test_find_respects_language_order() {
        let list = list();
        let found = list.find_transcript(&codes(&["xx", "pt", "es"])).unwrap();
        assert_eq!(found.language_code, "pt");
        assert!(found.is_generated);
    }

    #[test]
    fn test_find_reports_missing_language() {
        let list = list();
        match list.find_transcript(&codes(&["ja"])) {
            Err(TranscriptError::NoTranscriptFound {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, codes(&["ja"]));
                assert_eq!(available, codes(&["es", "en", "en", "pt"]));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_translate_builds_generated_track() {
        let translated = track("en", false).translate("de").unwrap();
        assert_eq!(translated.language, "German");
        assert_eq!(translated.language_code, "de");
        assert!(translated.is_generated);
        assert!(!translated.is_translatable);
        assert!(translated.url.ends_with("&lang=en&tlang=de"));
    }

    #[test]
    fn test_translate_unknown_language() {
        let err = track("en", false).translate("ja").unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::TranslationLanguageNotAvailable { ref language, .. } if language == "ja"
        ));
    }

    #[test]
    fn test_translate_untranslatable_track() {
        let mut original = track("en", false);
        original.is_translatable = false;
        let err = original.translate("de").unwrap_err();
        assert!(matches!(err, TranscriptError::NotTranslatable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_defaults_to_english() {
        let source = StaticSource::new(list(), Vec::new());
        let fetched = source.fetch("dQw4w9WgXcQ", &[]).await.unwrap();
        assert_eq!(fetched.language_code, "en");
        assert!(!fetched.is_generated);
    }

    #[tokio::test]
    async fn test_fetch_propagates_missing_language() {
        let source = StaticSource::new(list(), Vec::new());
        let err = source.fetch("dQw4w9WgXcQ", &codes(&["ja"])).await.unwrap_err();
        assert!(matches!(err, TranscriptError::NoTranscriptFound { .. }));
    }
}
