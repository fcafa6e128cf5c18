//! Resource reconciliation
//!
//! Three idempotent "ensure" operations against the Cloudflare control
//! plane: zone resolution, A-record convergence, and worker-route
//! convergence. Each one reads the remote state, compares it to the desired
//! state, and only writes when they differ. Divergent state that was not
//! created by this tool is a hard error unless the operator passes `force`.

use serde::Serialize;
use tracing::{debug, info};

use crate::cloudflare::{CloudflareClient, DnsRecordRequest, WorkerRouteRequest};
use crate::domain::normalize;
use crate::error::{DeployError, Result};

const ZONE_PAGE_SIZE: usize = 50;
const DNS_RECORD_PAGE_SIZE: usize = 100;

/// The zone that owns a domain, resolved by walking its suffixes.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedZone {
    pub zone_id: String,
    pub zone_name: String,
    pub account_id: String,
}

/// What a DNS convergence run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsAction {
    Created,
    Updated,
    Unchanged,
}

impl std::fmt::Display for DnsAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnsAction::Created => write!(f, "created"),
            DnsAction::Updated => write!(f, "updated"),
            DnsAction::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DnsOutcome {
    pub record_name: String,
    pub action: DnsAction,
}

/// What happened to one route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAction {
    Created,
    Updated,
    Unchanged,
}

impl std::fmt::Display for RouteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteAction::Created => write!(f, "created"),
            RouteAction::Updated => write!(f, "updated"),
            RouteAction::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub pattern: String,
    pub action: RouteAction,
}

/// Candidate zone names for a hostname: every right-aligned suffix with at
/// least two labels, most specific first.
pub fn zone_candidates(domain: &str) -> Vec<String> {
    let labels: Vec<&str> = domain.split('.').collect();
    (0..labels.len().saturating_sub(1))
        .map(|i| labels[i..].join("."))
        .collect()
}

/// Find the zone that owns `raw_domain` (or an ancestor of it).
///
/// Walks the suffix candidates from most to least specific and returns the
/// first active zone whose name matches exactly. Fails with `ZoneNotFound`
/// when the domain is not onboarded or the token cannot see it.
pub async fn resolve_zone(client: &CloudflareClient, raw_domain: &str) -> Result<ResolvedZone> {
    let domain = normalize(raw_domain)?;

    for candidate in zone_candidates(&domain) {
        debug!(%candidate, "querying zones");
        let zones = client.list_zones(&candidate).await?;
        if zones.len() >= ZONE_PAGE_SIZE {
            return Err(DeployError::TooManyResults { what: "zones" });
        }
        if let Some(zone) = zones.iter().find(|z| z.name.eq_ignore_ascii_case(&candidate)) {
            info!(zone = %zone.name, zone_id = %zone.id, "resolved zone for {domain}");
            return Ok(ResolvedZone {
                zone_id: zone.id.clone(),
                zone_name: zone.name.clone(),
                account_id: zone.account.id.clone(),
            });
        }
    }

    Err(DeployError::ZoneNotFound { domain })
}

/// Converge exactly one A record at `record_name` onto `ip`.
///
/// Zero existing records creates, a matching record is left alone, a
/// mismatching record fails closed unless `force` overwrites it, and more
/// than one record is never auto-resolved.
pub async fn ensure_dns_a(
    client: &CloudflareClient,
    zone_id: &str,
    record_name: &str,
    ip: &str,
    proxied: bool,
    force: bool,
) -> Result<DnsOutcome> {
    let record_name = normalize(record_name)?;

    let existing = client.list_dns_records(zone_id, &record_name).await?;
    if existing.len() >= DNS_RECORD_PAGE_SIZE {
        return Err(DeployError::TooManyResults { what: "DNS records" });
    }
    if existing.len() > 1 {
        return Err(DeployError::AmbiguousRecord {
            name: record_name,
            count: existing.len(),
        });
    }

    let desired = DnsRecordRequest {
        record_type: "A".to_string(),
        name: record_name.clone(),
        content: ip.to_string(),
        ttl: 1, // automatic
        proxied,
    };

    let Some(current) = existing.into_iter().next() else {
        info!(name = %record_name, content = %ip, proxied, "creating A record");
        client.create_dns_record(zone_id, &desired).await?;
        return Ok(DnsOutcome {
            record_name,
            action: DnsAction::Created,
        });
    };

    let mismatch = if !current.record_type.eq_ignore_ascii_case("A") {
        Some(("type", current.record_type.clone(), "A".to_string()))
    } else if !current.name.eq_ignore_ascii_case(&record_name) {
        Some(("name", current.name.clone(), record_name.clone()))
    } else if current.content != ip {
        Some(("content", current.content.clone(), ip.to_string()))
    } else if current.proxied != proxied {
        Some((
            "proxied",
            current.proxied.to_string(),
            proxied.to_string(),
        ))
    } else {
        None
    };

    match mismatch {
        None => {
            info!(name = %record_name, "A record already converged");
            Ok(DnsOutcome {
                record_name,
                action: DnsAction::Unchanged,
            })
        }
        Some((field, existing_value, desired_value)) if !force => Err(DeployError::DnsConflict {
            name: record_name,
            field,
            existing: existing_value,
            desired: desired_value,
        }),
        Some((field, ..)) => {
            info!(name = %record_name, field, "overwriting divergent A record (forced)");
            client
                .update_dns_record(zone_id, &current.id, &desired)
                .await?;
            Ok(DnsOutcome {
                record_name,
                action: DnsAction::Updated,
            })
        }
    }
}

/// Converge a set of route patterns onto `worker_name`, one pattern at a
/// time.
///
/// Routes already created or updated before a conflict is hit stay applied;
/// re-running after the conflict is resolved converges the remainder.
pub async fn ensure_worker_routes(
    client: &CloudflareClient,
    zone_id: &str,
    worker_name: &str,
    patterns: &[String],
    force: bool,
) -> Result<Vec<RouteOutcome>> {
    let existing = client.list_worker_routes(zone_id).await?;
    let mut outcomes = Vec::with_capacity(patterns.len());

    for pattern in patterns {
        let current = existing
            .iter()
            .find(|r| r.pattern.eq_ignore_ascii_case(pattern));

        let action = match current {
            None => {
                info!(%pattern, worker = %worker_name, "creating worker route");
                client
                    .create_worker_route(
                        zone_id,
                        &WorkerRouteRequest {
                            pattern: pattern.clone(),
                            script: worker_name.to_string(),
                        },
                    )
                    .await?;
                RouteAction::Created
            }
            Some(route) if route.script.as_deref() == Some(worker_name) => {
                debug!(%pattern, "route already bound to this worker");
                RouteAction::Unchanged
            }
            Some(route) if !force => {
                return Err(DeployError::RouteConflict {
                    pattern: pattern.clone(),
                    owner: route.script.clone().unwrap_or_else(|| "<none>".to_string()),
                });
            }
            Some(route) => {
                info!(%pattern, worker = %worker_name, "rebinding worker route (forced)");
                client
                    .update_worker_route(
                        zone_id,
                        &route.id,
                        &WorkerRouteRequest {
                            pattern: pattern.clone(),
                            script: worker_name.to_string(),
                        },
                    )
                    .await?;
                RouteAction::Updated
            }
        };

        outcomes.push(RouteOutcome {
            pattern: pattern.clone(),
            action,
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_candidates_walk_suffixes_most_specific_first() {
        assert_eq!(
            zone_candidates("a.b.c.com"),
            vec!["a.b.c.com", "b.c.com", "c.com"]
        );
        assert_eq!(zone_candidates("example.com"), vec!["example.com"]);
    }

    #[test]
    fn zone_candidates_never_yield_single_labels() {
        for domain in ["a.b.c.com", "x.y", "deep.sub.domain.example.org"] {
            for candidate in zone_candidates(domain) {
                assert!(candidate.contains('.'), "bad candidate {candidate}");
            }
        }
    }

    #[test]
    fn actions_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&DnsAction::Created).unwrap(), "\"created\"");
        assert_eq!(
            serde_json::to_string(&RouteAction::Unchanged).unwrap(),
            "\"unchanged\""
        );
    }
}
