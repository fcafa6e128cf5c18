//! Derived resource names
//!
//! Worker and D1 database names are derived from the deployment domain so
//! that two Inkrypt installs on different domains never collide, while
//! staying inside Cloudflare's 63-character identifier limit. The scheme is
//! `{prefix}-{slug}-{hash}`: a human-readable slug for operators plus an
//! 8-hex-char SHA-256 prefix that survives slug truncation.

use sha2::{Digest, Sha256};

pub const MAX_NAME_LEN: usize = 63;

pub const WORKER_PREFIX: &str = "inkrypt-api";
pub const D1_PREFIX: &str = "inkrypt";

/// Reduce a domain to a safe identifier fragment: anything outside
/// `[a-z0-9.-]` becomes `-`, dots become `-`, runs collapse, edges trim.
pub fn slugify(domain: &str) -> String {
    let mapped: String = domain
        .to_ascii_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '-',
        })
        .collect();

    let collapsed = collapse_hyphens(&mapped);
    let trimmed = collapsed.trim_matches('-');
    if trimmed.is_empty() {
        "site".to_string()
    } else {
        trimmed.to_string()
    }
}

/// First 8 hex characters of the SHA-256 digest of the domain.
pub fn short_hash(domain: &str) -> String {
    let digest = Sha256::digest(domain.as_bytes());
    hex::encode(digest)[..8].to_string()
}

/// Compose `{prefix}-{slug}-{hash}` within `max_len`, truncating only the
/// slug. The hash suffix is reserved up front so truncation can never eat
/// into it.
pub fn build_name(prefix: &str, slug: &str, hash: &str, max_len: usize) -> String {
    // `-{slug}` and `-{hash}` both cost one separator.
    let suffix_len = hash.len() + 2;
    let slug_budget = max_len
        .saturating_sub(prefix.len())
        .saturating_sub(suffix_len)
        .max(1);

    let truncated: String = slug.chars().take(slug_budget).collect();
    let truncated = truncated.trim_end_matches('-');

    collapse_hyphens(&format!("{prefix}-{truncated}-{hash}"))
}

/// Derived worker script name for a domain, e.g.
/// `inkrypt-api-notes-example-com-a1b2c3d4`.
pub fn worker_name(domain: &str) -> String {
    build_name(WORKER_PREFIX, &slugify(domain), &short_hash(domain), MAX_NAME_LEN)
}

/// Derived D1 database name for a domain.
pub fn d1_name(domain: &str) -> String {
    build_name(D1_PREFIX, &slugify(domain), &short_hash(domain), MAX_NAME_LEN)
}

fn collapse_hyphens(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_hyphen = false;
    for c in s.chars() {
        if c == '-' {
            if !prev_hyphen {
                out.push(c);
            }
            prev_hyphen = true;
        } else {
            out.push(c);
            prev_hyphen = false;
        }
    }
    out
}
