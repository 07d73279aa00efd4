use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::errors::{handle_transcript_error, ApiError};
use super::{AppState, SERVICE_NAME};
use crate::transcript::{
    AvailableTranscripts, FilterParameters, SegmentedTranscript, UnsegmentedTranscript,
};
use crate::utils::parse_languages;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct SegmentedQuery {
    /// Comma-separated language codes in order of preference
    pub languages: Option<String>,
    pub translate_to: Option<String>,
    pub limit: Option<i64>,
    pub merge_segments: Option<i64>,
    pub max_duration: Option<f64>,
    pub sample_rate: Option<i64>,
}

impl SegmentedQuery {
    /// Check ranges and turn the raw parameters into filter settings
    pub fn filters(&self) -> Result<FilterParameters, ApiError> {
        Ok(FilterParameters {
            limit: at_least_one("limit", self.limit)?,
            merge_every: at_least_one("merge_segments", self.merge_segments)?,
            max_duration: match self.max_duration {
                Some(value) if !(value.is_finite() && value > 0.0) => {
                    return Err(ApiError::validation("max_duration must be greater than 0"))
                }
                other => other,
            },
            sample_every: at_least_one("sample_rate", self.sample_rate)?,
        })
    }
}

fn at_least_one(name: &str, value: Option<i64>) -> Result<Option<usize>, ApiError> {
    match value {
        None => Ok(None),
        Some(n) if n >= 1 => usize::try_from(n)
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{} is too large", name))),
        Some(_) => Err(ApiError::validation(format!(
            "{} must be greater than or equal to 1",
            name
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct UnsegmentedQuery {
    pub languages: Option<String>,
    pub translate_to: Option<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_separator() -> String {
    " ".to_string()
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
    }))
}

pub async fn segmented(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    params: Result<Query<SegmentedQuery>, QueryRejection>,
) -> ApiResult<SegmentedTranscript> {
    let params = query(params)?;
    let filters = params.filters()?;
    let languages = parse_languages(params.languages.as_deref());

    state
        .service
        .segmented(&video_id, languages, params.translate_to.as_deref(), &filters)
        .await
        .map(Json)
        .map_err(|err| handle_transcript_error(&err, &video_id))
}

pub async fn unsegmented(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    params: Result<Query<UnsegmentedQuery>, QueryRejection>,
) -> ApiResult<UnsegmentedTranscript> {
    let params = query(params)?;
    let languages = parse_languages(params.languages.as_deref());

    state
        .service
        .unsegmented(
            &video_id,
            languages,
            params.translate_to.as_deref(),
            &params.separator,
        )
        .await
        .map(Json)
        .map_err(|err| handle_transcript_error(&err, &video_id))
}

pub async fn available(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<AvailableTranscripts> {
    state
        .service
        .available(&video_id)
        .await
        .map(Json)
        .map_err(|err| handle_transcript_error(&err, &video_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_filters_accept_valid_ranges() {
        let params = SegmentedQuery {
            limit: Some(10),
            merge_segments: Some(1),
            max_duration: Some(0.5),
            sample_rate: Some(3),
            ..Default::default()
        };
        let filters = params.filters().unwrap();
        assert_eq!(filters.limit, Some(10));
        assert_eq!(filters.merge_every, Some(1));
        assert_eq!(filters.max_duration, Some(0.5));
        assert_eq!(filters.sample_every, Some(3));
    }

    #[test]
    fn test_filters_reject_out_of_range() {
        let params = SegmentedQuery {
            sample_rate: Some(-2),
            ..Default::default()
        };
        let err = params.filters().unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.detail.contains("sample_rate"));

        let params = SegmentedQuery {
            max_duration: Some(f64::NAN),
            ..Default::default()
        };
        assert!(params.filters().is_err());
    }

    #[test]
    fn test_no_parameters_means_no_filtering() {
        assert!(SegmentedQuery::default().filters().unwrap().is_noop());
    }
}
