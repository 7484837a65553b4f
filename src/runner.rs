use std::time::Duration;

use thiserror::Error;

use crate::client::{self, FetchError};
use crate::payload::ResultPayload;
use crate::query::{self, DateMode, QueryError, QueryParams};
use crate::render::{RenderOptions, RenderSurface};
use crate::session::{InFlight, RequestTicket, Session, Settled};

#[derive(Clone, Debug)]
pub struct Options {
    pub base_url: String,
    pub params: QueryParams,
    pub date_mode: DateMode,
    pub timeout_seconds: usize,
    pub proxy: Option<String>,
    pub render: RenderOptions,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_url: query::DEFAULT_BASE_URL.to_string(),
            params: QueryParams::default(),
            date_mode: DateMode::PassThrough,
            timeout_seconds: 10,
            proxy: None,
            render: RenderOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

/// What a submission did to the render surface.
#[derive(Debug)]
pub enum SubmitOutcome {
    Rendered {
        ticket: RequestTicket,
        sections: usize,
        records: usize,
    },
    /// The surface now shows the error notice.
    Failed {
        ticket: RequestTicket,
        error: FetchError,
    },
    /// A newer query was issued before this one finished; nothing changed.
    Stale {
        ticket: RequestTicket,
        latest: RequestTicket,
    },
}

impl SubmitOutcome {
    pub fn ticket(&self) -> RequestTicket {
        match self {
            Self::Rendered { ticket, .. } => *ticket,
            Self::Failed { ticket, .. } => *ticket,
            Self::Stale { ticket, .. } => *ticket,
        }
    }
}

/// A finished request that has not been applied to a surface yet.
#[derive(Debug)]
pub struct Fetched {
    flight: InFlight,
    result: Result<ResultPayload, FetchError>,
}

impl Fetched {
    pub fn ticket(&self) -> RequestTicket {
        self.flight.ticket()
    }
}

#[derive(Debug)]
pub struct Runner {
    options: Options,
    url: String,
    client: reqwest::Client,
    session: Session,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self, RunnerError> {
        Self::with_session(options, Session::default())
    }

    pub fn with_session(options: Options, session: Session) -> Result<Self, RunnerError> {
        let url = build_url(&options)?;
        let client = build_client(options.proxy.as_deref(), options.timeout_seconds)?;
        Ok(Self {
            options,
            url,
            client,
            session,
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Replaces the query fields; later submissions use the new URL.
    pub fn set_params(&mut self, params: QueryParams) -> Result<(), RunnerError> {
        let mut options = self.options.clone();
        options.params = params;
        self.url = build_url(&options)?;
        self.options = options;
        Ok(())
    }

    /// Issues a new ticket and performs the request.
    pub async fn fetch(&self) -> Fetched {
        let flight = self.session.begin();
        let result = client::fetch_payload(&self.client, &self.url).await;
        Fetched { flight, result }
    }

    /// Draws a finished request onto `surface` unless a newer one was issued.
    pub fn apply(&self, fetched: Fetched, surface: &mut RenderSurface) -> SubmitOutcome {
        match fetched.flight.settle(fetched.result) {
            Settled::Stale { ticket, latest } => SubmitOutcome::Stale { ticket, latest },
            Settled::Current(ticket, Ok(payload)) => {
                let sections = surface.render(&payload, &self.options.render);
                SubmitOutcome::Rendered {
                    ticket,
                    sections,
                    records: payload.record_count(),
                }
            }
            Settled::Current(ticket, Err(error)) => {
                surface.show_error();
                SubmitOutcome::Failed { ticket, error }
            }
        }
    }

    pub async fn submit(&self, surface: &mut RenderSurface) -> SubmitOutcome {
        let fetched = self.fetch().await;
        self.apply(fetched, surface)
    }
}

fn build_url(options: &Options) -> Result<String, RunnerError> {
    let url = query::build_query(&options.base_url, &options.params, options.date_mode)?;
    if reqwest::Url::parse(&url).is_err() {
        return Err(RunnerError::InvalidUrl { url });
    }
    Ok(url)
}

fn build_client(
    proxy: Option<&str>,
    timeout_seconds: usize,
) -> Result<reqwest::Client, RunnerError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(client::USER_AGENT),
    );

    let timeout = Duration::from_secs(timeout_seconds.try_into().unwrap_or(10));
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .timeout(timeout);

    match proxy.filter(|p| !p.trim().is_empty()) {
        Some(proxy) => {
            let proxy_cfg = reqwest::Proxy::all(proxy).map_err(|e| RunnerError::ProxySetup {
                proxy: proxy.to_string(),
                source: e,
            })?;
            builder = builder.proxy(proxy_cfg);
        }
        None => {
            builder = builder.no_proxy();
        }
    }

    builder
        .build()
        .map_err(|e| RunnerError::HttpClientBuild { source: e })
}
