//! Wire transport for GraphQL documents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::protocol::{GraphQLRequest, GraphQLResponse};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_GRAPHQL_URL: &str = "http://localhost:4000/graphql";

#[async_trait]
pub trait GraphQLTransport: Send + Sync {
    async fn execute(&self, request: GraphQLRequest)
        -> Result<GraphQLResponse<Value>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransportOptions {
    pub request_timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
}

impl Default for HttpTransportOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            accept_invalid_certs: false,
        }
    }
}

/// JSON-over-HTTP POST transport.
pub struct HttpTransport {
    http: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        Self::with_options(endpoint, HttpTransportOptions::default())
    }

    pub fn with_options(
        endpoint: &str,
        options: HttpTransportOptions,
    ) -> Result<Self, ClientError> {
        let endpoint = parse_endpoint(endpoint)?;
        let mut builder =
            Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

pub fn parse_endpoint(raw: &str) -> Result<Url, ClientError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ClientError::InvalidEndpoint(format!("{raw}: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ClientError::InvalidEndpoint(format!(
            "{raw}: unsupported scheme {other}"
        ))),
    }
}

#[async_trait]
impl GraphQLTransport for HttpTransport {
    async fn execute(
        &self,
        request: GraphQLRequest,
    ) -> Result<GraphQLResponse<Value>, ClientError> {
        debug!(
            endpoint = %self.endpoint,
            operation = request.operation_name.as_deref().unwrap_or("anonymous"),
            "sending graphql request"
        );
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            // Validation failures arrive as 4xx with a regular `errors` body.
            if let Ok(payload) = serde_json::from_slice::<GraphQLResponse<Value>>(&body) {
                if !payload.errors.is_empty() {
                    debug!(status = status.as_u16(), "graphql errors in non-success response");
                    return Ok(payload);
                }
            }
            return Err(ClientError::Status {
                status: status.as_u16(),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }
}
