// Feed API response types.
// Video summaries, response-shape classification and fetch outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::SubfeedError;

/// A video from a subscribed channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    #[serde(alias = "video_id", alias = "videoId")]
    pub id: String,
    pub title: String,
    #[serde(alias = "channelTitle")]
    pub channel_title: String,
    #[serde(
        default,
        alias = "thumbnail",
        alias = "thumbnailUrl",
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_url: Option<String>,
    #[serde(
        default,
        alias = "publishedAt",
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "non_empty_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
}

/// Blank strings count as absent.
fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// RFC 3339 timestamp; blank or unparseable values count as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = non_empty_string(deserializer)?;
    Ok(value.and_then(|raw| {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|at| at.with_timezone(&Utc))
    }))
}

impl VideoSummary {
    /// Link to the watch page, preferring the URL sent by the backend.
    pub fn watch_url(&self) -> String {
        match &self.url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => format!("https://www.youtube.com/watch?v={}", self.id),
        }
    }

    /// Autoplaying embed link.
    pub fn embed_url(&self) -> String {
        format!("https://www.youtube.com/embed/{}?autoplay=1", self.id)
    }
}

/// Terminal, non-retryable failure reported without a transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// No access token in the cache; no request was made.
    MissingCredential,
    /// The backend answered with a `message` object.
    Backend(String),
    /// The backend answered with a body of an unexpected shape.
    UnexpectedResponse,
}

impl AppError {
    pub fn message(&self) -> &str {
        match self {
            AppError::MissingCredential => "no access token",
            AppError::Backend(message) => message,
            AppError::UnexpectedResponse => "unexpected response from server",
        }
    }
}

/// Result of one fetch call. Exactly one is produced per call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(Vec<VideoSummary>),
    EmptyOrAuthError(AppError),
    AuthExpired,
    TransientFailure(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Map the outcome onto the crate error taxonomy.
    pub fn into_result(self) -> Result<Vec<VideoSummary>, SubfeedError> {
        match self {
            FetchOutcome::Success(items) => Ok(items),
            FetchOutcome::EmptyOrAuthError(AppError::MissingCredential) => {
                Err(SubfeedError::MissingCredential)
            }
            FetchOutcome::EmptyOrAuthError(err) => {
                Err(SubfeedError::Application(err.message().to_string()))
            }
            FetchOutcome::AuthExpired => Err(SubfeedError::AuthExpired),
            FetchOutcome::TransientFailure(message) => Err(SubfeedError::Transient(message)),
        }
    }
}

/// Shape of a successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    Items(Vec<VideoSummary>),
    Message(String),
    Unexpected,
}

impl ResponseShape {
    /// Classify a 2xx body. Anything other than a list of videos or a
    /// `message` object is unexpected, including invalid JSON.
    pub fn classify(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return ResponseShape::Unexpected,
        };

        match value {
            Value::Array(_) => match serde_json::from_value::<Vec<VideoSummary>>(value) {
                Ok(items) => ResponseShape::Items(items),
                Err(_) => ResponseShape::Unexpected,
            },
            Value::Object(map) => match map.get("message") {
                Some(Value::String(message)) if !message.is_empty() => {
                    ResponseShape::Message(message.clone())
                }
                _ => ResponseShape::Unexpected,
            },
            _ => ResponseShape::Unexpected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BACKEND_BODY: &str = r#"[
        {
            "url": "https://www.youtube.com/watch?v=abc123",
            "video_id": "abc123",
            "published_at": "2025-01-15T10:30:00Z",
            "title": "Rust in 100 seconds",
            "thumbnail": "https://i.ytimg.com/vi/abc123/hqdefault.jpg",
            "channel_title": "Fireship"
        }
    ]"#;

    #[test]
    fn test_classify_backend_video_list() {
        let ResponseShape::Items(items) = ResponseShape::classify(BACKEND_BODY) else {
            panic!("expected items");
        };

        assert_eq!(items.len(), 1);
        let video = &items[0];
        assert_eq!(video.id, "abc123");
        assert_eq!(video.channel_title, "Fireship");
        assert_eq!(
            video.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/hqdefault.jpg")
        );
        assert!(video.published_at.is_some());
    }

    #[test]
    fn test_classify_camel_case_with_optional_fields_missing() {
        let body = r#"[{"id": "x1", "title": "T", "channelTitle": "C"}]"#;
        let ResponseShape::Items(items) = ResponseShape::classify(body) else {
            panic!("expected items");
        };

        assert_eq!(items[0].channel_title, "C");
        assert_eq!(items[0].thumbnail_url, None);
        assert_eq!(items[0].published_at, None);
    }

    #[test]
    fn test_classify_blank_optional_fields() {
        // Search backends send empty strings when the upstream omits a field
        let body = r#"[
            {
                "url": "",
                "video_id": "a",
                "published_at": "",
                "title": "T",
                "thumbnail": "",
                "channel_title": "C"
            },
            {
                "video_id": "b",
                "published_at": "yesterday",
                "title": "U",
                "channel_title": "C"
            }
        ]"#;
        let ResponseShape::Items(items) = ResponseShape::classify(body) else {
            panic!("expected items");
        };

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].published_at, None);
        assert_eq!(items[0].thumbnail_url, None);
        assert_eq!(items[0].url, None);
        assert_eq!(items[0].watch_url(), "https://www.youtube.com/watch?v=a");
        assert_eq!(items[1].published_at, None);
    }

    #[test]
    fn test_classify_empty_list() {
        assert_eq!(ResponseShape::classify("[]"), ResponseShape::Items(vec![]));
    }

    #[test]
    fn test_classify_message() {
        assert_eq!(
            ResponseShape::classify(r#"{"message": "quota exceeded"}"#),
            ResponseShape::Message("quota exceeded".to_string())
        );
    }

    #[test]
    fn test_classify_unexpected_shapes() {
        assert_eq!(ResponseShape::classify(r#"{"items": []}"#), ResponseShape::Unexpected);
        assert_eq!(ResponseShape::classify(r#"{"message": 42}"#), ResponseShape::Unexpected);
        assert_eq!(ResponseShape::classify("\"hello\""), ResponseShape::Unexpected);
        assert_eq!(ResponseShape::classify("<html>"), ResponseShape::Unexpected);
        assert_eq!(ResponseShape::classify(r#"[{"title": 1}]"#), ResponseShape::Unexpected);
    }

    #[test]
    fn test_video_links() {
        let video = VideoSummary {
            id: "abc123".to_string(),
            title: "T".to_string(),
            channel_title: "C".to_string(),
            thumbnail_url: None,
            published_at: None,
            url: None,
        };

        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=abc123");
        assert_eq!(video.embed_url(), "https://www.youtube.com/embed/abc123?autoplay=1");
    }

    #[test]
    fn test_outcome_into_result() {
        assert!(matches!(
            FetchOutcome::EmptyOrAuthError(AppError::MissingCredential).into_result(),
            Err(SubfeedError::MissingCredential)
        ));
        assert!(matches!(
            FetchOutcome::EmptyOrAuthError(AppError::Backend("quota".into())).into_result(),
            Err(SubfeedError::Application(m)) if m == "quota"
        ));
        assert!(matches!(
            FetchOutcome::AuthExpired.into_result(),
            Err(SubfeedError::AuthExpired)
        ));
        assert_eq!(FetchOutcome::Success(vec![]).into_result().unwrap(), vec![]);
    }
}
