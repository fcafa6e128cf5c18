//! Inkrypt deploy core
//!
//! Resolves deployment configuration from a single domain and idempotently
//! converges the Cloudflare-side resources (DNS records, worker routes) that
//! an Inkrypt install needs.

pub mod cloudflare;
pub mod domain;
pub mod error;
pub mod naming;
pub mod output;
pub mod reconcile;
pub mod resolved;

pub use cloudflare::CloudflareClient;
pub use error::DeployError;
pub use resolved::ResolvedConfig;
