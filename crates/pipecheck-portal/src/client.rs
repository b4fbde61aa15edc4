//! Blocking portal client.
//!
//! Every fetch is `GET {base_url}/{path}/?format=json&frame=embedded`, where
//! the path is the accession, or the full path of an `@id` link.
//! Transport failures and 5xx responses are retried with a doubling backoff;
//! 401/403 and 404 are final.

use crate::error::PortalError;
use pipecheck_kernel::{MetadataSource, SourceError, normalize_identifier};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.encodeproject.org";
pub const API_KEY_ENV: &str = "DCC_API_KEY";
pub const SECRET_KEY_ENV: &str = "DCC_SECRET_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub base_url: String,
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry; doubled for each subsequent one.
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            retries: 3,
            backoff: Duration::from_millis(1000),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Basic-auth key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub secret: String,
}

impl Credentials {
    /// Read `DCC_API_KEY` / `DCC_SECRET_KEY`. Both must be set and non-empty.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let key = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty())?;
        let secret = lookup(SECRET_KEY_ENV).filter(|v| !v.trim().is_empty())?;
        Some(Self { key, secret })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

pub struct PortalClient {
    http: HttpClient,
    config: PortalConfig,
    credentials: Option<Credentials>,
}

impl PortalClient {
    pub fn new(config: PortalConfig, credentials: Option<Credentials>) -> Result<Self, PortalError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| PortalError::Client(err.to_string()))?;
        Ok(Self {
            http,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn object_url(&self, id: &str) -> String {
        object_url(&self.config.base_url, id)
    }

    fn fetch_once(&self, id: &str, url: &str) -> Result<Value, Failure> {
        let mut request = self.http.get(url).header("Accept", "application/json");
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.key, Some(&credentials.secret));
        }

        let response = request.send().map_err(|err| {
            Failure::Transient(SourceError::Transport {
                id: id.to_string(),
                message: err.to_string(),
            })
        })?;
        classify_status(id, response.status())?;

        response.json::<Value>().map_err(|err| {
            Failure::Fatal(SourceError::Malformed {
                id: id.to_string(),
                message: err.to_string(),
            })
        })
    }
}

impl MetadataSource for PortalClient {
    fn fetch_object(&self, id: &str) -> Result<Value, SourceError> {
        let accession = normalize_identifier(id);
        let url = self.object_url(id);
        debug!(%url, "GET");
        with_retries(
            &accession,
            self.config.retries,
            self.config.backoff,
            std::thread::sleep,
            || self.fetch_once(&accession, &url),
        )
    }
}

pub fn object_url(base_url: &str, id: &str) -> String {
    let trimmed = id.trim();
    // Names like `H3K27ac-human` only resolve under their collection.
    let path = match trimmed.strip_prefix('/') {
        Some(link) => link
            .split(['?', '#'])
            .next()
            .unwrap_or(link)
            .trim_matches('/')
            .to_string(),
        None => normalize_identifier(trimmed),
    };
    format!(
        "{}/{}/?format=json&frame=embedded",
        base_url.trim_end_matches('/'),
        path
    )
}

/// Outcome of a failed attempt.
#[derive(Debug)]
enum Failure {
    Transient(SourceError),
    Fatal(SourceError),
}

fn classify_status(id: &str, status: StatusCode) -> Result<(), Failure> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(Failure::Fatal(SourceError::Unauthorized {
                id: id.to_string(),
                status: status.as_u16(),
            }))
        }
        StatusCode::NOT_FOUND => Err(Failure::Fatal(SourceError::NotFound(id.to_string()))),
        s if s.is_server_error() => Err(Failure::Transient(SourceError::Transport {
            id: id.to_string(),
            message: format!("server returned {s}"),
        })),
        s => Err(Failure::Fatal(SourceError::Transport {
            id: id.to_string(),
            message: format!("unexpected status {s}"),
        })),
    }
}

fn with_retries<T>(
    id: &str,
    retries: u32,
    backoff: Duration,
    sleep: impl Fn(Duration),
    mut attempt: impl FnMut() -> Result<T, Failure>,
) -> Result<T, SourceError> {
    let mut delay = backoff;
    let mut remaining = retries;
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(Failure::Fatal(err)) => return Err(err),
            Err(Failure::Transient(err)) if remaining == 0 => return Err(err),
            Err(Failure::Transient(err)) => {
                warn!(
                    %id,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    remaining,
                    "fetch failed; retrying"
                );
                sleep(delay);
                delay = delay.saturating_mul(2);
                remaining -= 1;
            }
        }
    }
}
