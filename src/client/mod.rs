use thiserror::Error;

use crate::payload::{PayloadError, ResultPayload};

pub const USER_AGENT: &str = concat!("seslog/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Fetches `url` and parses the body as a result payload.
pub async fn fetch_payload(
    client: &reqwest::Client,
    url: &str,
) -> Result<ResultPayload, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Request {
            url: url.to_string(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|e| FetchError::Body {
        url: url.to_string(),
        source: e,
    })?;
    Ok(ResultPayload::parse(&body)?)
}
