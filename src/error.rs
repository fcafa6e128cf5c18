//! Error taxonomy for deployment reconciliation
//!
//! Every failure mode the deploy tool can hit is enumerated here so the
//! CLI can report a single descriptive line and callers can match on the
//! class of failure (validation vs. transport vs. remote conflict).

use thiserror::Error;

/// Errors produced by the deploy core.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Local domain validation failed; never reaches the network.
    #[error("invalid domain {input:?}: {reason}")]
    InvalidDomain { input: String, reason: String },

    /// No API token was supplied via flag or environment.
    #[error("missing Cloudflare API token (pass --api-token or set CLOUDFLARE_API_TOKEN)")]
    MissingCredential,

    /// The control plane returned something that is not a valid envelope.
    #[error("Cloudflare API transport error ({status}) at {url}: {body}")]
    ApiTransport {
        status: u16,
        url: String,
        body: String,
    },

    /// A well-formed envelope reported failure.
    #[error("Cloudflare API error ({status}) at {url}: {}", errors.join(", "))]
    ApiLogic {
        status: u16,
        url: String,
        errors: Vec<String>,
    },

    /// No active zone matches the domain or any ancestor of it.
    #[error("no active zone found for {domain} or any parent domain; \
             is the domain onboarded and does the token have Zone:Read?")]
    ZoneNotFound { domain: String },

    /// More than one DNS record occupies the target name.
    #[error("{count} DNS records already exist for {name}; refusing to guess which to manage")]
    AmbiguousRecord { name: String, count: usize },

    /// An existing record diverges from the desired one and --force was not given.
    #[error("DNS record {name} already exists with {field} = {existing:?} \
             (wanted {desired:?}); re-run with --force to overwrite")]
    DnsConflict {
        name: String,
        field: &'static str,
        existing: String,
        desired: String,
    },

    /// A route pattern is bound to a different worker and --force was not given.
    #[error("route {pattern} is already bound to worker {owner:?}; \
             re-run with --force to take it over")]
    RouteConflict { pattern: String, owner: String },

    /// A listing came back as a full page; results may be truncated.
    #[error("too many {what} returned in one page; refusing to act on a truncated listing")]
    TooManyResults { what: &'static str },

    /// Underlying HTTP failure (connection refused, timeout, TLS, ...).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl DeployError {
    pub(crate) fn invalid_domain(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
