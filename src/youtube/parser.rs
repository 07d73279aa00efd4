//! Parsing of YouTube watch pages, innertube player responses and timed-text XML.

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use super::{RawSegment, TranscriptList, TranscriptTrack, TranslationLanguage};
use crate::utils::{strip_tags, unescape_entities};
use crate::{Result, TranscriptError};

/// Reason YouTube gives when it wants the caller to prove it is not a bot
const BOT_CHECK_REASON: &str = "Sign in to confirm you";

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
}

/// Extract the innertube API key embedded in the watch page
pub fn extract_api_key(html: &str) -> Option<String> {
    static API_KEY: OnceLock<Regex> = OnceLock::new();
    regex(&API_KEY, r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#)
        .captures(html)
        .map(|caps| caps[1].to_string())
}

/// Value of the consent form's `v` field, when YouTube served the cookie consent page
pub fn extract_consent_value(html: &str) -> Option<String> {
    if !html.contains("action=\"https://consent.youtube.com/s\"") {
        return None;
    }

    static CONSENT: OnceLock<Regex> = OnceLock::new();
    regex(&CONSENT, r#"name="v" value="(.*?)""#)
        .captures(html)
        .map(|caps| caps[1].to_string())
}

/// Whether the watch page is a recaptcha challenge
pub fn is_recaptcha_page(html: &str) -> bool {
    html.contains("class=\"g-recaptcha\"")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Captions {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
    #[serde(default)]
    translation_languages: Vec<RawTranslationLanguage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    name: Option<Label>,
    language_code: String,
    kind: Option<String>,
    #[serde(default)]
    is_translatable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTranslationLanguage {
    language_code: String,
    language_name: Option<Label>,
}

/// YouTube renders labels either as `simpleText` or as a list of text runs
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Label {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<LabelRun>,
}

#[derive(Debug, Deserialize)]
struct LabelRun {
    text: String,
}

impl Label {
    fn text(&self) -> String {
        match &self.simple_text {
            Some(text) => text.clone(),
            None => self.runs.iter().map(|run| run.text.as_str()).collect(),
        }
    }
}

/// Turn an innertube player response into the caption track listing
pub fn parse_player_response(video_id: &str, body: &str) -> Result<TranscriptList> {
    let response: PlayerResponse =
        serde_json::from_str(body).map_err(|e| TranscriptError::UnexpectedResponse {
            video_id: video_id.to_string(),
            reason: format!("invalid player response: {}", e),
        })?;

    check_playability(video_id, response.playability_status.as_ref())?;

    let renderer = response
        .captions
        .and_then(|captions| captions.player_captions_tracklist_renderer)
        .ok_or_else(|| TranscriptError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        })?;

    if renderer.caption_tracks.is_empty() {
        return Err(TranscriptError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    }

    let translation_languages: Vec<TranslationLanguage> = renderer
        .translation_languages
        .iter()
        .map(|lang| TranslationLanguage {
            language: lang
                .language_name
                .as_ref()
                .map(Label::text)
                .unwrap_or_else(|| lang.language_code.clone()),
            language_code: lang.language_code.clone(),
        })
        .collect();

    let mut list = TranscriptList {
        video_id: video_id.to_string(),
        ..Default::default()
    };

    for caption in renderer.caption_tracks {
        let is_generated = caption.kind.as_deref() == Some("asr");
        let track = TranscriptTrack {
            video_id: video_id.to_string(),
            language: caption
                .name
                .as_ref()
                .map(Label::text)
                .unwrap_or_else(|| caption.language_code.clone()),
            language_code: caption.language_code,
            is_generated,
            is_translatable: caption.is_translatable,
            translation_languages: if caption.is_translatable {
                translation_languages.clone()
            } else {
                Vec::new()
            },
            url: caption.base_url.replace("&fmt=srv3", ""),
        };

        if is_generated {
            list.generated.push(track);
        } else {
            list.manually_created.push(track);
        }
    }

    tracing::debug!(
        "Video {} has {} manual and {} generated caption tracks",
        video_id,
        list.manually_created.len(),
        list.generated.len()
    );

    Ok(list)
}

fn check_playability(video_id: &str, status: Option<&PlayabilityStatus>) -> Result<()> {
    let Some(status) = status else {
        return Ok(());
    };

    let reason = status.reason.clone().unwrap_or_default();
    match status.status.as_deref() {
        None | Some("OK") => Ok(()),
        Some("LOGIN_REQUIRED") if reason.starts_with(BOT_CHECK_REASON) => {
            Err(TranscriptError::RequestBlocked {
                video_id: video_id.to_string(),
            })
        }
        Some("ERROR") => Err(TranscriptError::VideoUnavailable {
            video_id: video_id.to_string(),
        }),
        Some(other) => Err(TranscriptError::VideoUnplayable {
            video_id: video_id.to_string(),
            reason: if reason.is_empty() {
                other.to_string()
            } else {
                reason
            },
        }),
    }
}

/// Parse timed-text XML (`<transcript><text start=".." dur="..">..</text></transcript>`)
pub fn parse_timedtext(xml: &str) -> Vec<RawSegment> {
    static TEXT: OnceLock<Regex> = OnceLock::new();
    static START: OnceLock<Regex> = OnceLock::new();
    static DUR: OnceLock<Regex> = OnceLock::new();

    let text = regex(&TEXT, r#"(?s)<text\b([^>]*?)>(.*?)</text>"#);
    let start_attr = regex(&START, r#"\bstart="([^"]*)""#);
    let dur_attr = regex(&DUR, r#"\bdur="([^"]*)""#);

    let attribute = |re: &Regex, attrs: &str| {
        re.captures(attrs)
            .and_then(|caps| caps[1].parse::<f64>().ok())
    };

    text.captures_iter(xml)
        .filter_map(|caps| {
            let attrs = &caps[1];
            let start = attribute(start_attr, attrs)?;
            let duration = attribute(dur_attr, attrs).unwrap_or(0.0);
            let body = strip_tags(&unescape_entities(&unescape_entities(&caps[2])));

            Some(RawSegment {
                text: body,
                start,
                duration,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER_RESPONSE: &str = r#"{
        "playabilityStatus": {"status": "OK"},
        "captions": {
            "playerCaptionsTracklistRenderer": {
                "captionTracks": [
                    {
                        "baseUrl": "https://www.youtube.com/api/timedtext?v=abc&lang=en&fmt=srv3",
                        "name": {"runs": [{"text": "English"}]},
                        "languageCode": "en",
                        "isTranslatable": true
                    },
                    {
                        "baseUrl": "https://www.youtube.com/api/timedtext?v=abc&lang=en&kind=asr",
                        "name": {"simpleText": "English (auto-generated)"},
                        "languageCode": "en",
                        "kind": "asr",
                        "isTranslatable": false
                    }
                ],
                "translationLanguages": [
                    {"languageCode": "de", "languageName": {"runs": [{"text": "German"}]}},
                    {"languageCode": "fr", "languageName": {"simpleText": "French"}}
                ]
            }
        }
    }"#;

    #[test]
    fn test_extract_api_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_key","OTHER":1})</script>"#;
        assert_eq!(extract_api_key(html).as_deref(), Some("AIzaSyA-test_key"));
        assert_eq!(extract_api_key("<html></html>"), None);
    }

    #[test]
    fn test_extract_consent_value() {
        let html = r#"<form action="https://consent.youtube.com/s"><input type="hidden" name="v" value="cb.20210328-17-p0.de+FX+917"></form>"#;
        assert_eq!(
            extract_consent_value(html).as_deref(),
            Some("cb.20210328-17-p0.de+FX+917")
        );
        assert_eq!(extract_consent_value(r#"<input name="v" value="x">"#), None);
    }

    #[test]
    fn test_recaptcha_detection() {
        assert!(is_recaptcha_page(r#"<div class="g-recaptcha" data-sitekey="k"></div>"#));
        assert!(!is_recaptcha_page("<html></html>"));
    }

    #[test]
    fn test_parse_player_response() {
        let list = parse_player_response("abc", PLAYER_RESPONSE).unwrap();

        assert_eq!(list.manually_created.len(), 1);
        assert_eq!(list.generated.len(), 1);

        let manual = &list.manually_created[0];
        assert_eq!(manual.language, "English");
        assert!(manual.is_translatable);
        assert!(!manual.url.contains("fmt=srv3"));
        assert_eq!(
            manual
                .translation_languages
                .iter()
                .map(|l| (l.language_code.as_str(), l.language.as_str()))
                .collect::<Vec<_>>(),
            vec![("de", "German"), ("fr", "French")]
        );

        let generated = &list.generated[0];
        assert_eq!(generated.language, "English (auto-generated)");
        assert!(generated.is_generated);
        assert!(generated.translation_languages.is_empty());
    }

    #[test]
    fn test_missing_captions_means_disabled() {
        let err = parse_player_response("abc", r#"{"playabilityStatus": {"status": "OK"}}"#)
            .unwrap_err();
        assert!(matches!(err, TranscriptError::TranscriptsDisabled { .. }));
    }

    #[test]
    fn test_bot_check_means_blocked() {
        let body = r#"{"playabilityStatus": {"status": "LOGIN_REQUIRED", "reason": "Sign in to confirm you're not a bot"}}"#;
        let err = parse_player_response("abc", body).unwrap_err();
        assert!(matches!(err, TranscriptError::RequestBlocked { .. }));
    }

    #[test]
    fn test_error_status_means_unavailable() {
        let body = r#"{"playabilityStatus": {"status": "ERROR", "reason": "This video is unavailable"}}"#;
        let err = parse_player_response("abc", body).unwrap_err();
        assert!(matches!(err, TranscriptError::VideoUnavailable { .. }));
    }

    #[test]
    fn test_other_status_means_unplayable() {
        let body = r#"{"playabilityStatus": {"status": "UNPLAYABLE", "reason": "Private video"}}"#;
        match parse_player_response("abc", body).unwrap_err() {
            TranscriptError::VideoUnplayable { reason, .. } => assert_eq!(reason, "Private video"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json_is_unexpected_response() {
        let err = parse_player_response("abc", "<html>").unwrap_err();
        assert!(matches!(err, TranscriptError::UnexpectedResponse { .. }));
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r##"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.16" dur="2.4">Hey there &amp;amp; welcome</text>
            <text start="2.56" dur="3.1">it&amp;#39;s <font color="#E5E5E5">great</font></text>
            <text start="5.66">no duration</text>
            <text dur="1.0">no start</text>
        </transcript>"##;

        let segments = parse_timedtext(xml);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "Hey there & welcome");
        assert_eq!(segments[0].start, 0.16);
        assert_eq!(segments[0].duration, 2.4);
        assert_eq!(segments[1].text, "it's great");
        assert_eq!(segments[2].duration, 0.0);
    }

    #[test]
    fn test_parse_empty_timedtext() {
        assert!(parse_timedtext("<transcript></transcript>").is_empty());
    }
}
