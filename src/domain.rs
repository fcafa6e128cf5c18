//! Domain normalization
//!
//! Turns whatever the operator typed (`HTTPS://Notes.Example.com/`,
//! `notes.example.com.`) into a canonical lowercase hostname, or rejects it
//! with the specific rule that was violated. Pure, no network access.

use url::Url;

use crate::error::{DeployError, Result};

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Validate and canonicalize a raw domain or URL string into a DNS-safe
/// hostname.
///
/// Accepts either a bare hostname or an `http(s)://` URL with no path, query,
/// fragment, or port. Normalization is idempotent: feeding the output back in
/// yields the same value.
pub fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DeployError::invalid_domain(raw, "empty input"));
    }

    if let Some((_, rest)) = trimmed.split_once("://") {
        // Url::parse drops scheme-default ports (https://x:443), so an
        // explicit port has to be caught on the raw authority.
        let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
        if authority.contains(':') {
            return Err(DeployError::invalid_domain(raw, "URL must not have a port"));
        }

        let url = Url::parse(trimmed)
            .map_err(|e| DeployError::invalid_domain(raw, format!("unparseable URL: {e}")))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(DeployError::invalid_domain(
                    raw,
                    format!("scheme must be http or https, got {other:?}"),
                ));
            }
        }
        if !matches!(url.path(), "" | "/") {
            return Err(DeployError::invalid_domain(raw, "URL must not have a path"));
        }
        if url.query().is_some() {
            return Err(DeployError::invalid_domain(raw, "URL must not have a query"));
        }
        if url.fragment().is_some() {
            return Err(DeployError::invalid_domain(raw, "URL must not have a fragment"));
        }
        let host = url
            .host_str()
            .ok_or_else(|| DeployError::invalid_domain(raw, "URL has no hostname"))?
            .to_string();
        return normalize_host(raw, &host);
    }

    for (ch, what) in [('/', "path"), ('?', "query"), ('#', "fragment"), (':', "port")] {
        if trimmed.contains(ch) {
            return Err(DeployError::invalid_domain(
                raw,
                format!("bare hostname must not contain a {what} ({ch:?})"),
            ));
        }
    }

    normalize_host(raw, trimmed)
}

fn normalize_host(raw: &str, host: &str) -> Result<String> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    if host.is_empty() {
        return Err(DeployError::invalid_domain(raw, "hostname is empty"));
    }
    if host.len() > MAX_HOSTNAME_LEN {
        return Err(DeployError::invalid_domain(
            raw,
            format!("hostname exceeds {MAX_HOSTNAME_LEN} characters"),
        ));
    }
    if let Some(bad) = host
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(DeployError::invalid_domain(
            raw,
            format!("illegal character {bad:?} in hostname"),
        ));
    }
    if !host.contains('.') {
        return Err(DeployError::invalid_domain(
            raw,
            "hostname must contain at least one dot",
        ));
    }

    for label in host.split('.') {
        if label.is_empty() {
            return Err(DeployError::invalid_domain(raw, "empty label in hostname"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DeployError::invalid_domain(
                raw,
                format!("label {label:?} exceeds {MAX_LABEL_LEN} characters"),
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(DeployError::invalid_domain(
                raw,
                format!("label {label:?} starts or ends with a hyphen"),
            ));
        }
    }

    Ok(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_url_form_and_canonicalizes() {
        assert_eq!(
            normalize("HTTPS://Notes.Example.com/").unwrap(),
            "notes.example.com"
        );
    }

    #[test]
    fn accepts_bare_hostname() {
        assert_eq!(normalize("notes.example.com").unwrap(), "notes.example.com");
        assert_eq!(normalize("Notes.Example.COM.").unwrap(), "notes.example.com");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["HTTP://A.B.c/", "x.y.z.", "already.lower.case"] {
            let once = normalize(input).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn rejects_ports_paths_and_schemes() {
        assert!(normalize("example.com:8080").is_err());
        assert!(normalize("example.com/x").is_err());
        assert!(normalize("ftp://example.com").is_err());
        assert!(normalize("https://example.com:8443").is_err());
        assert!(normalize("https://example.com/app").is_err());
        // Url::parse would silently drop scheme-default ports.
        assert!(normalize("https://example.com:443").is_err());
        assert!(normalize("http://example.com:80/").is_err());
        assert!(normalize("https://example.com/?q=1").is_err());
        assert!(normalize("https://example.com/#frag").is_err());
    }

    #[test]
    fn rejects_single_label_hosts() {
        assert!(normalize("localhost").is_err());
        assert!(normalize("intranet").is_err());
    }

    #[test]
    fn rejects_bad_labels() {
        let long_label = format!("{}.example.com", "a".repeat(64));
        assert!(normalize(&long_label).is_err());
        assert!(normalize("-bad.example.com").is_err());
        assert!(normalize("bad-.example.com").is_err());
        assert!(normalize("double..dot.com").is_err());
        assert!(normalize("under_score.example.com").is_err());
        assert!(normalize("").is_err());
    }

    #[test]
    fn rejects_overlong_hostname() {
        let label = "a".repeat(63);
        let host = format!("{label}.{label}.{label}.{label}.com");
        assert!(host.len() > 253);
        assert!(normalize(&host).is_err());
    }

    #[test]
    fn error_names_the_rule() {
        let err = normalize("example.com:8080").unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
