use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::ValidationError;
use crate::{AnalysisInput, ContentPayload, InputMode};

pub const MAX_CONTENT_CHARS: usize = 10_000;
pub const MAX_FIELD_CHARS: usize = 100;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\p{L}\p{N}_]+)").expect("hashtag regex"));
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bat\s+)?\b(\d{1,2}):([0-5]\d)\b").expect("clock regex")
});
static SECONDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:seconds|second|secs|sec|s)\b").expect("seconds regex")
});
static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(?:minutes|minute|mins|min)\b").expect("minutes regex")
});

pub fn validate(input: &AnalysisInput) -> Result<(), ValidationError> {
    let text = input.content_text.as_deref().unwrap_or_default();
    if text.chars().count() > MAX_CONTENT_CHARS {
        return Err(ValidationError::new(
            "content_text",
            format!("must be at most {} characters", MAX_CONTENT_CHARS),
        ));
    }

    match input.input_mode {
        InputMode::Text => {
            if text.trim().is_empty() {
                return Err(ValidationError::new(
                    "content_text",
                    "required for text input",
                ));
            }
        }
        InputMode::UrlReference => {
            let url = input.video_url.as_deref().unwrap_or_default().trim();
            if !is_http_url(url) {
                return Err(ValidationError::new(
                    "video_url",
                    "an http(s) URL is required for url-reference input",
                ));
            }
        }
        InputMode::FileReference => {
            if input
                .file_reference
                .as_deref()
                .unwrap_or_default()
                .trim()
                .is_empty()
            {
                return Err(ValidationError::new(
                    "file_reference",
                    "required for file-reference input",
                ));
            }
        }
    }

    let bounded = [
        ("niche", input.niche.as_deref()),
        ("creator_handle", input.creator_handle.as_deref()),
        ("society_id", input.society_id.as_deref()),
        ("platform", input.platform.as_deref()),
    ];
    for (field, value) in bounded {
        if value.map(|v| v.chars().count() > MAX_FIELD_CHARS).unwrap_or(false) {
            return Err(ValidationError::new(
                field,
                format!("must be at most {} characters", MAX_FIELD_CHARS),
            ));
        }
    }

    Ok(())
}

pub fn normalize(input: &AnalysisInput) -> Result<ContentPayload, ValidationError> {
    validate(input)?;

    let content_text = input
        .content_text
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string();
    let video_url = match input.input_mode {
        InputMode::Text => None,
        InputMode::UrlReference => clean(input.video_url.as_deref()),
        InputMode::FileReference => clean(input.file_reference.as_deref()),
    };

    Ok(ContentPayload {
        hashtags: extract_hashtags(&content_text),
        duration_hint: parse_duration_hint(&content_text),
        content_text,
        content_type: input.content_type,
        input_mode: input.input_mode,
        video_url,
        niche: clean(input.niche.as_deref()),
        creator_handle: clean(input.creator_handle.as_deref())
            .map(|handle| handle.trim_start_matches('@').to_string()),
        society_id: clean(input.society_id.as_deref()),
        platform: clean(input.platform.as_deref()).map(|platform| platform.to_lowercase()),
    })
}

pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|tag| tag.as_str().to_lowercase())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

pub fn parse_duration_hint(text: &str) -> Option<u32> {
    let mut candidates: Vec<(usize, f64)> = Vec::new();

    // "at 7:30" is a time of day, not a length.
    if let Some(caps) = CLOCK_RE.captures_iter(text).find(|caps| caps.get(1).is_none()) {
        let minutes = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        let seconds = caps.get(3).and_then(|m| m.as_str().parse::<f64>().ok());
        if let (Some(minutes), Some(seconds), Some(whole)) = (minutes, seconds, caps.get(2)) {
            candidates.push((whole.start(), minutes * 60.0 + seconds));
        }
    }
    for (regex, scale) in [(&*SECONDS_RE, 1.0), (&*MINUTES_RE, 60.0)] {
        if let Some(caps) = regex.captures(text) {
            let value = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
            if let (Some(value), Some(whole)) = (value, caps.get(0)) {
                candidates.push((whole.start(), value * scale));
            }
        }
    }

    candidates
        .into_iter()
        .filter(|(_, seconds)| seconds.is_finite() && *seconds > 0.0)
        .min_by_key(|(start, _)| *start)
        .map(|(_, seconds)| seconds.round() as u32)
}

fn is_http_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty() && !host.contains(char::is_whitespace))
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
