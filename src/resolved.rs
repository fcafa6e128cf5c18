//! Resolved deployment configuration
//!
//! Collapses the single user-supplied domain (plus optional overrides) into
//! the full set of values the rest of the deploy pipeline consumes: origin,
//! WebAuthn relying-party identity, CORS origin, cookie policy, and derived
//! worker/database names.

use serde::Serialize;

use crate::domain::normalize;
use crate::error::Result;
use crate::naming;

/// Cookie SameSite policy for the deployed app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "PascalCase")]
#[value(rename_all = "PascalCase")]
pub enum CookieSameSite {
    #[default]
    Lax,
    Strict,
    None,
}

impl std::fmt::Display for CookieSameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CookieSameSite::Lax => write!(f, "Lax"),
            CookieSameSite::Strict => write!(f, "Strict"),
            CookieSameSite::None => write!(f, "None"),
        }
    }
}

/// Operator overrides for [`ResolvedConfig::derive`]. Any field left `None`
/// falls back to the derived default.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rp_name: Option<String>,
    pub cookie_same_site: Option<CookieSameSite>,
    pub cors_origin: Option<String>,
    pub worker_name: Option<String>,
    pub d1_name: Option<String>,
}

/// The read-only configuration bundle for one deployment run. Computed fresh
/// each invocation and emitted immediately; never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub domain: String,
    pub origin: String,
    pub rp_id: String,
    pub rp_name: String,
    pub cors_origin: String,
    pub cookie_same_site: CookieSameSite,
    pub worker_name: String,
    pub d1_name: String,
}

impl ResolvedConfig {
    /// Normalize the domain and derive every dependent value. Explicit
    /// overrides bypass derivation entirely.
    pub fn derive(raw_domain: &str, overrides: ConfigOverrides) -> Result<Self> {
        let domain = normalize(raw_domain)?;
        let origin = format!("https://{domain}");

        Ok(Self {
            rp_id: domain.clone(),
            rp_name: overrides.rp_name.unwrap_or_else(|| "Inkrypt".to_string()),
            cors_origin: overrides.cors_origin.unwrap_or_else(|| origin.clone()),
            cookie_same_site: overrides.cookie_same_site.unwrap_or_default(),
            worker_name: overrides
                .worker_name
                .unwrap_or_else(|| naming::worker_name(&domain)),
            d1_name: overrides.d1_name.unwrap_or_else(|| naming::d1_name(&domain)),
            origin,
            domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_all_fields_from_domain() {
        let cfg = ResolvedConfig::derive("HTTPS://Notes.Example.com/", ConfigOverrides::default())
            .unwrap();
        assert_eq!(cfg.domain, "notes.example.com");
        assert_eq!(cfg.origin, "https://notes.example.com");
        assert_eq!(cfg.rp_id, "notes.example.com");
        assert_eq!(cfg.rp_name, "Inkrypt");
        assert_eq!(cfg.cors_origin, "https://notes.example.com");
        assert_eq!(cfg.cookie_same_site, CookieSameSite::Lax);
        assert!(cfg.worker_name.starts_with("inkrypt-api-notes-example-com-"));
        assert!(cfg.d1_name.starts_with("inkrypt-notes-example-com-"));
    }

    #[test]
    fn overrides_bypass_derivation() {
        let overrides = ConfigOverrides {
            rp_name: Some("My Notes".to_string()),
            cookie_same_site: Some(CookieSameSite::Strict),
            cors_origin: Some("https://app.example.com".to_string()),
            worker_name: Some("custom-worker".to_string()),
            d1_name: Some("custom-db".to_string()),
        };
        let cfg = ResolvedConfig::derive("notes.example.com", overrides).unwrap();
        assert_eq!(cfg.rp_name, "My Notes");
        assert_eq!(cfg.cookie_same_site, CookieSameSite::Strict);
        assert_eq!(cfg.cors_origin, "https://app.example.com");
        assert_eq!(cfg.worker_name, "custom-worker");
        assert_eq!(cfg.d1_name, "custom-db");
    }

    #[test]
    fn invalid_domain_propagates() {
        assert!(ResolvedConfig::derive("localhost", ConfigOverrides::default()).is_err());
    }

    #[test]
    fn same_site_serializes_pascal_case() {
        let json = serde_json::to_string(&CookieSameSite::Lax).unwrap();
        assert_eq!(json, "\"Lax\"");
    }
}
