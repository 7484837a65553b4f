use std::sync::OnceLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const LOGS_ENDPOINT: &str = "/api/get_ses_logs";

// event types the log backend knows how to extract
pub const KNOWN_EVENT_TYPES: [&str; 5] = ["bounce", "delivery", "complaint", "open", "send"];

// characters left untouched by encodeURIComponent
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const MISSING_PART: &str = "undefined";

static DATE_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub log_group: String,
    pub start_date: String,
    pub end_date: String,
    pub event_type: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateMode {
    /// Reformat whatever was entered, garbled or not.
    #[default]
    PassThrough,
    /// Reject anything that is not `YYYY-MM-DD`.
    Strict,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("invalid {field} '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("base URL is empty")]
    EmptyBaseUrl,
}

/// Converts `YYYY-MM-DD` into `YYYY/MM/DD`.
///
/// Input is split on `-` and the first three parts are rejoined with `/`.
/// Missing parts come out as `undefined` and extra parts are dropped, so
/// malformed input yields a garbled value rather than an error.
pub fn format_date(input: &str) -> String {
    let mut parts = input.split('-');
    let year = parts.next().unwrap_or(MISSING_PART);
    let month = parts.next().unwrap_or(MISSING_PART);
    let day = parts.next().unwrap_or(MISSING_PART);
    format!("{year}/{month}/{day}")
}

fn date_re() -> &'static Regex {
    DATE_RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"))
}

pub fn is_valid_date(input: &str) -> bool {
    date_re().is_match(input)
}

pub fn is_known_event_type(value: &str) -> bool {
    KNOWN_EVENT_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(value.trim()))
}

pub fn encode_component(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, COMPONENT).to_string()
}

/// Builds the log query URL for `params` against `base_url`.
pub fn build_query(
    base_url: &str,
    params: &QueryParams,
    mode: DateMode,
) -> Result<String, QueryError> {
    let base = base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(QueryError::EmptyBaseUrl);
    }

    if mode == DateMode::Strict {
        for (field, value) in [
            ("start-date", &params.start_date),
            ("end-date", &params.end_date),
        ] {
            if !is_valid_date(value) {
                return Err(QueryError::InvalidDate {
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    let start_date = format_date(&params.start_date);
    let end_date = format_date(&params.end_date);

    let mut url = String::with_capacity(base.len() + 96);
    url.push_str(base);
    url.push_str(LOGS_ENDPOINT);
    let mut separator = '?';
    for (name, value) in [
        ("log-group", params.log_group.as_str()),
        ("start-date", start_date.as_str()),
        ("end-date", end_date.as_str()),
        ("event-type", params.event_type.as_str()),
    ] {
        url.push(separator);
        separator = '&';
        url.push_str(name);
        url.push('=');
        url.push_str(&encode_component(value));
    }
    Ok(url)
}
