//! Cloudflare API client
//!
//! Minimal typed wrapper over the v4 REST API: bearer auth on every request,
//! envelope unwrapping, and exhaustive error classification at the client
//! boundary. One outbound call per method invocation, no retry, no
//! pagination loop.

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{DeployError, Result};

const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const USER_AGENT: &str = concat!("inkrypt-deploy/", env!("CARGO_PKG_VERSION"));

/// Cloudflare v4 response envelope. Every endpoint wraps its payload in
/// `{ success, errors, result }`; modeling it here keeps error handling out
/// of the reconciler.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<EnvelopeError>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    code: i64,
    message: String,
}

/// A DNS zone as returned by `GET /zones`.
#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub account: ZoneAccount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZoneAccount {
    pub id: String,
}

/// A DNS record as returned by `GET /zones/{id}/dns_records`.
#[derive(Debug, Clone, Deserialize)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(default)]
    pub proxied: bool,
}

/// Create/update payload for a DNS record. TTL 1 means "automatic".
#[derive(Debug, Clone, Serialize)]
pub struct DnsRecordRequest {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    pub proxied: bool,
}

/// A worker route binding a URL pattern to a script. Create/update
/// responses may carry only the id, so everything else is defaulted.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerRoute {
    pub id: String,
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub script: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerRouteRequest {
    pub pattern: String,
    pub script: String,
}

/// Typed Cloudflare API client.
pub struct CloudflareClient {
    http: Client,
    api_token: String,
    base_url: String,
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("api_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl CloudflareClient {
    /// Build a client for the given API token. An empty token is rejected
    /// before any network call can happen.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(DeployError::MissingCredential);
        }

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DeployError::Http {
                url: CLOUDFLARE_API_BASE.to_string(),
                source: e,
            })?;

        Ok(Self {
            http,
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API base (staging, mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Issue one request and unwrap the response envelope.
    ///
    /// Any of the following is an error: transport failure, a body that is
    /// not a valid envelope, a non-2xx status, or `success: false`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&impl Serialize>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "cloudflare request");

        let mut req = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_token);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| DeployError::Http {
            url: url.clone(),
            source: e,
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| DeployError::Http {
            url: url.clone(),
            source: e,
        })?;

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) => {
                return Err(DeployError::ApiTransport {
                    status: status.as_u16(),
                    url,
                    body: truncate_body(&text),
                });
            }
        };

        if !status.is_success() || !envelope.success {
            return Err(DeployError::ApiLogic {
                status: status.as_u16(),
                url,
                errors: envelope
                    .errors
                    .iter()
                    .map(|e| format!("{} (code {})", e.message, e.code))
                    .collect(),
            });
        }

        envelope.result.ok_or(DeployError::ApiTransport {
            status: status.as_u16(),
            url,
            body: "envelope reported success but carried no result".to_string(),
        })
    }

    /// List active zones exactly matching `name` (one page, up to 50).
    pub async fn list_zones(&self, name: &str) -> Result<Vec<Zone>> {
        self.request(
            Method::GET,
            "/zones",
            &[("name", name), ("status", "active"), ("per_page", "50")],
            None::<&()>,
        )
        .await
    }

    /// List DNS records in a zone exactly matching `name` (one page, up to 100).
    pub async fn list_dns_records(&self, zone_id: &str, name: &str) -> Result<Vec<DnsRecord>> {
        self.request(
            Method::GET,
            &format!("/zones/{zone_id}/dns_records"),
            &[("name", name), ("per_page", "100")],
            None::<&()>,
        )
        .await
    }

    pub async fn create_dns_record(
        &self,
        zone_id: &str,
        record: &DnsRecordRequest,
    ) -> Result<DnsRecord> {
        self.request(
            Method::POST,
            &format!("/zones/{zone_id}/dns_records"),
            &[],
            Some(record),
        )
        .await
    }

    /// Full overwrite of an existing record.
    pub async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecordRequest,
    ) -> Result<DnsRecord> {
        self.request(
            Method::PUT,
            &format!("/zones/{zone_id}/dns_records/{record_id}"),
            &[],
            Some(record),
        )
        .await
    }

    /// List all worker routes in a zone.
    pub async fn list_worker_routes(&self, zone_id: &str) -> Result<Vec<WorkerRoute>> {
        self.request(
            Method::GET,
            &format!("/zones/{zone_id}/workers/routes"),
            &[],
            None::<&()>,
        )
        .await
    }

    pub async fn create_worker_route(
        &self,
        zone_id: &str,
        route: &WorkerRouteRequest,
    ) -> Result<WorkerRoute> {
        self.request(
            Method::POST,
            &format!("/zones/{zone_id}/workers/routes"),
            &[],
            Some(route),
        )
        .await
    }

    pub async fn update_worker_route(
        &self,
        zone_id: &str,
        route_id: &str,
        route: &WorkerRouteRequest,
    ) -> Result<WorkerRoute> {
        self.request(
            Method::PUT,
            &format!("/zones/{zone_id}/workers/routes/{route_id}"),
            &[],
            Some(route),
        )
        .await
    }
}

fn truncate_body(text: &str) -> String {
    const MAX: usize = 512;
    if text.chars().count() > MAX {
        let head: String = text.chars().take(MAX).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_the_token() {
        let client = CloudflareClient::new("super-secret-token").unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn truncate_body_caps_long_bodies() {
        let long = "x".repeat(1000);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 515);
    }
}
