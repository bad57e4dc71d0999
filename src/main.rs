//! Funding calls aggregator: binary entrypoint.
//!
//! `search` runs one top-up and writes the export file, `sources` lists the
//! configured portals, `serve` exposes the same engine over HTTP.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use funding_calls::export::write_export;
use funding_calls::{build_engine, AppConfig, Call, FetchPolicy, Query, Scope};

#[derive(Parser)]
#[command(name = "funding-calls")]
#[command(about = "Aggregate research-funding calls with a per-filter CSV cache")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Top up and print calls for one source or "all"
    Search {
        /// Source name, or "all"
        #[arg(default_value = "all")]
        site: String,
        #[arg(long, default_value = "")]
        theme: String,
        #[arg(long, default_value = "")]
        sdg: String,
        #[arg(long, default_value = "")]
        keyword: String,
        /// "Regalías" / "Proyectos" for national sources
        #[arg(long, default_value = "")]
        call_type: String,
        /// Per-source cap (defaults to the configured limit for the scope)
        #[arg(long)]
        limit: Option<usize>,
        /// Search ministry sources instead of international portals
        #[arg(long)]
        national: bool,
        /// Answer from cache only
        #[arg(long)]
        offline: bool,
        /// Reference date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
        /// Skip writing the export file
        #[arg(long)]
        no_export: bool,
    },

    /// List configured sources
    Sources {
        #[arg(long)]
        national: bool,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("funding_calls=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn print_calls(calls: &[Call]) {
    if calls.is_empty() {
        println!("No open calls found.");
        return;
    }
    for (i, c) in calls.iter().enumerate() {
        println!("{:>3}. {} [{}]", i + 1, c.title, c.site);
        println!("     {}", c.link);
        if !c.deadline_date.is_empty() {
            println!("     deadline: {}", c.deadline_date);
        }
        println!("     SDG: {}", c.ods_joined());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = AppConfig::load_default()?;

    match cli.command {
        Commands::Search {
            site,
            theme,
            sdg,
            keyword,
            call_type,
            limit,
            national,
            offline,
            today,
            json,
            no_export,
        } => {
            let scope = if national {
                Scope::National
            } else {
                Scope::International
            };
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            let policy = if offline {
                FetchPolicy::CacheOnly
            } else {
                FetchPolicy::Online
            };
            let query = Query::new(limit.unwrap_or_else(|| cfg.limit_for(scope)), today)
                .scope(scope)
                .theme(&theme)
                .sdg(&sdg)
                .keyword(&keyword)
                .call_type(&call_type)
                .policy(policy);

            let engine = build_engine(&cfg)?;
            let calls = engine.search(&site, &query).await;

            if !no_export {
                write_export(&cfg.export_path(), &calls)?;
            }
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&calls).context("encoding calls as JSON")?
                );
            } else {
                print_calls(&calls);
            }
        }
        Commands::Sources { national } => {
            let scope = if national {
                Scope::National
            } else {
                Scope::International
            };
            let engine = build_engine(&cfg)?;
            for name in engine.source_names(scope) {
                println!("{name}");
            }
        }
        Commands::Serve { addr } => {
            let app = funding_calls::app(&cfg)?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            info!(%addr, "listening");
            axum::serve(listener, app).await.context("http server")?;
        }
    }
    Ok(())
}
