//! Inkrypt deployment reconciler
//!
//! Run once per deployment: derive configuration from the install domain,
//! then converge the Cloudflare-side resources against it.
//!
//! # Usage
//! ```bash
//! # Derive config values from the domain (offline)
//! inkrypt-deploy resolve-config --domain notes.example.com
//!
//! # Find the zone that owns the domain
//! inkrypt-deploy resolve-zone --domain notes.example.com
//!
//! # Converge the A record
//! inkrypt-deploy ensure-dns-a --zone-id abc123 --name notes.example.com --proxied true
//!
//! # Converge worker routes
//! inkrypt-deploy ensure-worker-routes --zone-id abc123 \
//!     --worker-name inkrypt-api-notes-example-com-a1b2c3d4 \
//!     --route 'notes.example.com/*'
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use inkrypt_deploy::cloudflare::CloudflareClient;
use inkrypt_deploy::output::OutputSink;
use inkrypt_deploy::reconcile;
use inkrypt_deploy::resolved::{ConfigOverrides, CookieSameSite, ResolvedConfig};

/// IP used for A records that only exist to front a proxied worker. Traffic
/// never reaches it; Cloudflare terminates at the edge.
const DEFAULT_PLACEHOLDER_IP: &str = "192.0.2.1";

#[derive(Parser)]
#[command(name = "inkrypt-deploy")]
#[command(about = "Inkrypt deployment reconciler for Cloudflare", long_about = None)]
#[command(version)]
struct Cli {
    /// Cloudflare API token (flag wins over the environment)
    #[arg(long, global = true, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Append outputs to this step-output file instead of printing JSON
    #[arg(long, global = true, env = "INKRYPT_OUTPUT")]
    output_file: Option<PathBuf>,

    /// Override the Cloudflare API base URL (staging, testing)
    #[arg(long, global = true, env = "CLOUDFLARE_API_BASE", hide = true)]
    api_base: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive deployment configuration from a domain (no network access)
    ResolveConfig(ResolveConfigArgs),

    /// Find the Cloudflare zone that owns a domain
    ResolveZone {
        /// Install domain (bare hostname or https:// URL)
        #[arg(long)]
        domain: String,
    },

    /// Converge a single A record onto the desired value
    EnsureDnsA {
        /// Zone ID that owns the record
        #[arg(long)]
        zone_id: String,

        /// Fully-qualified record name
        #[arg(long)]
        name: String,

        /// Record content (defaults to the proxied-worker placeholder)
        #[arg(long, default_value = DEFAULT_PLACEHOLDER_IP)]
        ip: String,

        /// Proxy through Cloudflare's edge (1/true/yes/y/on)
        #[arg(long, value_name = "BOOL", default_value = "false", value_parser = parse_truthy)]
        proxied: bool,

        /// Overwrite a divergent existing record instead of failing
        #[arg(long)]
        force: bool,
    },

    /// Converge worker route bindings, one pattern at a time
    EnsureWorkerRoutes {
        /// Zone ID that owns the routes
        #[arg(long)]
        zone_id: String,

        /// Worker script the patterns should be bound to
        #[arg(long)]
        worker_name: String,

        /// Route pattern (repeatable)
        #[arg(long = "route", required = true)]
        routes: Vec<String>,

        /// Take over patterns bound to a different worker
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct ResolveConfigArgs {
    /// Install domain (bare hostname or https:// URL)
    #[arg(long)]
    domain: String,

    /// WebAuthn relying-party display name
    #[arg(long)]
    rp_name: Option<String>,

    /// Cookie SameSite policy
    #[arg(long, value_name = "POLICY")]
    cookie_samesite: Option<CookieSameSite>,

    /// CORS origin if it differs from the install origin
    #[arg(long)]
    cors_origin: Option<String>,

    /// Explicit worker script name (bypasses derivation)
    #[arg(long)]
    worker_name: Option<String>,

    /// Explicit D1 database name (bypasses derivation)
    #[arg(long)]
    d1_name: Option<String>,
}

#[derive(Serialize)]
struct RouteSummary {
    worker_name: String,
    routes_processed: usize,
    routes: Vec<reconcile::RouteOutcome>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // CI step-output convention: an explicit flag or INKRYPT_OUTPUT wins,
    // GITHUB_OUTPUT is honored when running inside a workflow.
    let output_path = cli
        .output_file
        .or_else(|| std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from));
    let sink = OutputSink::from_path(output_path);

    run(cli.command, cli.api_token, cli.api_base, &sink).await
}

async fn run(
    command: Commands,
    api_token: Option<String>,
    api_base: Option<String>,
    sink: &OutputSink,
) -> Result<()> {
    match command {
        Commands::ResolveConfig(args) => {
            let overrides = ConfigOverrides {
                rp_name: args.rp_name,
                cookie_same_site: args.cookie_samesite,
                cors_origin: args.cors_origin,
                worker_name: args.worker_name,
                d1_name: args.d1_name,
            };
            let config = ResolvedConfig::derive(&args.domain, overrides)?;
            info!("resolved config for {}", config.domain);
            sink.emit(&config)?;
        }

        Commands::ResolveZone { domain } => {
            let client = build_client(api_token, api_base)?;
            let zone = reconcile::resolve_zone(&client, &domain).await?;
            info!("domain {} belongs to zone {}", domain, zone.zone_name);
            sink.emit(&zone)?;
        }

        Commands::EnsureDnsA {
            zone_id,
            name,
            ip,
            proxied,
            force,
        } => {
            let client = build_client(api_token, api_base)?;
            let outcome =
                reconcile::ensure_dns_a(&client, &zone_id, &name, &ip, proxied, force).await?;
            info!("A record {}: {}", outcome.record_name, outcome.action);
            sink.emit(&outcome)?;
        }

        Commands::EnsureWorkerRoutes {
            zone_id,
            worker_name,
            routes,
            force,
        } => {
            let client = build_client(api_token, api_base)?;
            let outcomes =
                reconcile::ensure_worker_routes(&client, &zone_id, &worker_name, &routes, force)
                    .await?;
            info!(
                "converged {} route pattern(s) onto {}",
                outcomes.len(),
                worker_name
            );
            sink.emit(&RouteSummary {
                worker_name,
                routes_processed: outcomes.len(),
                routes: outcomes,
            })?;
        }
    }

    Ok(())
}

fn build_client(
    api_token: Option<String>,
    api_base: Option<String>,
) -> Result<CloudflareClient, inkrypt_deploy::DeployError> {
    let client = CloudflareClient::new(api_token.unwrap_or_default())?;
    Ok(match api_base {
        Some(base) => client.with_base_url(base),
        None => client,
    })
}

/// Parse the conventional CI truthy set; everything else is false.
fn parse_truthy(value: &str) -> Result<bool, std::convert::Infallible> {
    Ok(matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    ))
}
