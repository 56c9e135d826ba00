#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Backend collaborators.
//!
//! The map core only sees two async traits: [`RoutingService`] and
//! [`IncidentService`]. [`ApiClient`] implements both against the HTTP
//! backend:
//!
//! | Call | Endpoint |
//! |---|---|
//! | calculate route | `POST /api/calculate-route` |
//! | fetch incidents | `GET /api/crimes` |
//! | connectivity check | `GET /` |

pub mod config;
pub mod retry;

use std::time::Duration;

use safe_route_incident_models::{Incident, parse_incidents};
use safe_route_route_models::{CalculateRouteRequest, CalculateRouteResponse};
use serde::Deserialize;
use thiserror::Error;

pub use config::{ClientConfig, ConfigError};
pub use retry::HttpReply;

/// Path of the route calculation endpoint.
pub const CALCULATE_ROUTE_PATH: &str = "/api/calculate-route";

/// Path of the incident feed.
pub const INCIDENTS_PATH: &str = "/api/crimes";

/// Path of the connectivity check.
pub const HEALTH_PATH: &str = "/";

/// Errors talking to the backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The body was not the expected JSON.
    #[error("unexpected response: {0}")]
    Json(#[from] serde_json::Error),
    /// The backend answered with an error status.
    #[error("server returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },
    /// Client configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Computes candidate routes between two free-text locations.
#[async_trait::async_trait]
pub trait RoutingService: Send + Sync {
    /// Requests routes for `request`.
    ///
    /// A response with `success: false` is still `Ok`; validating it is
    /// the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] for transport failures or unreadable
    /// responses.
    async fn calculate_route(
        &self,
        request: &CalculateRouteRequest,
    ) -> Result<CalculateRouteResponse, ClientError>;
}

/// Supplies the current incident set.
#[async_trait::async_trait]
pub trait IncidentService: Send + Sync {
    /// Fetches every incident.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] for transport failures or unreadable
    /// responses.
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, ClientError>;
}

/// HTTP client for the backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    auth_token: Option<String>,
    max_retries: u32,
    client: reqwest::Client,
}

impl ApiClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `config` has an out-of-range
    /// value, or [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            max_retries: config.max_retries,
            client,
        })
    }

    /// The backend base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Checks that the backend is reachable and returns its greeting.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the backend is unreachable or answers
    /// with an error status.
    pub async fn ping(&self) -> Result<String, ClientError> {
        let reply = retry::send(
            || self.request(reqwest::Method::GET, HEALTH_PATH),
            self.max_retries,
        )
        .await?;
        decode_ping_reply(reply)
    }
}

#[async_trait::async_trait]
impl RoutingService for ApiClient {
    async fn calculate_route(
        &self,
        request: &CalculateRouteRequest,
    ) -> Result<CalculateRouteResponse, ClientError> {
        log::debug!("Requesting routes {:?} -> {:?}", request.start, request.end);
        let reply = retry::send(
            || {
                self.request(reqwest::Method::POST, CALCULATE_ROUTE_PATH)
                    .json(request)
            },
            self.max_retries,
        )
        .await?;
        decode_route_reply(reply)
    }
}

#[async_trait::async_trait]
impl IncidentService for ApiClient {
    async fn fetch_incidents(&self) -> Result<Vec<Incident>, ClientError> {
        let reply = retry::send(
            || self.request(reqwest::Method::GET, INCIDENTS_PATH),
            self.max_retries,
        )
        .await?;
        let incidents = decode_incident_reply(reply)?;
        log::info!("Loaded {} incidents", incidents.len());
        Ok(incidents)
    }
}

/// Reads a calculate-route reply.
///
/// 4xx replies carrying the usual JSON envelope are decoded like
/// successes so the backend's error text reaches the user.
///
/// # Errors
///
/// Returns [`ClientError::Json`] for an unreadable 2xx body, or
/// [`ClientError::Status`] for any other non-2xx reply.
pub fn decode_route_reply(reply: HttpReply) -> Result<CalculateRouteResponse, ClientError> {
    if reply.is_success() {
        return Ok(serde_json::from_str(&reply.body)?);
    }
    if reply.is_client_error() {
        let envelope = serde_json::from_str::<CalculateRouteResponse>(&reply.body)
            .ok()
            .filter(|response| response.success.is_some() || response.error.is_some());
        if let Some(response) = envelope {
            return Ok(response);
        }
    }
    Err(reply.into_status_error())
}

/// Reads an incident feed reply (bare array or `{crimes: [...]}`).
///
/// # Errors
///
/// Returns [`ClientError::Status`] for a non-2xx reply or
/// [`ClientError::Json`] if the body is neither envelope.
pub fn decode_incident_reply(reply: HttpReply) -> Result<Vec<Incident>, ClientError> {
    if !reply.is_success() {
        return Err(reply.into_status_error());
    }
    let body: serde_json::Value = serde_json::from_str(&reply.body)?;
    Ok(parse_incidents(body)?)
}

#[derive(Deserialize)]
struct Greeting {
    message: String,
}

/// Reads the connectivity check reply. Falls back to the raw body when it
/// is not a `{message}` object.
///
/// # Errors
///
/// Returns [`ClientError::Status`] for a non-2xx reply.
pub fn decode_ping_reply(reply: HttpReply) -> Result<String, ClientError> {
    if !reply.is_success() {
        return Err(reply.into_status_error());
    }
    Ok(serde_json::from_str::<Greeting>(&reply.body)
        .map_or_else(|_| reply.body.trim().to_string(), |greeting| greeting.message))
}
