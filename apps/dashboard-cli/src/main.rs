//! linkdash — terminal dashboard for a links backend.
//!
//! Lists, creates, edits and deletes the signed-in user's short links and
//! shows their click analytics, either as the flattened click table or as the
//! totals/date/device bars of the dashboard.
//!
//! Run:
//! ```bash
//! DASHBOARD_TOKEN=... cargo run -p dashboard-cli -- links --sort desc
//! DASHBOARD_TOKEN=... cargo run -p dashboard-cli -- stats --source clicks
//! # machine-readable output
//! cargo run -p dashboard-cli -- --json clicks
//! ```
//!
//! Configuration: See `config.rs` for all environment variables. Logs go to
//! stderr; stdout carries command output only.

mod config;
mod edit;
mod render;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use domain::analytics::{sort_by_timestamp, summarize, AnalyticsSummary};
use domain::page::paginate;
use domain::sort::sort_stable_by_key;
use domain::store::LinkCollectionStore;
use domain::{Clock, CoreError, Link, LinkDraft, Session, ShortCode, SortOrder, SystemClock};
use http_backend::HttpBackend;
use http_common::{json_error_with_message, parse_timestamp};
use serde::Serialize;
use session_token::SessionStatus;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Store = LinkCollectionStore<HttpBackend>;

#[derive(Debug, Parser)]
#[command(name = "linkdash", version, about = "Manage short links and read their click analytics")]
struct Cli {
    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List links, one page at a time.
    Links {
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Only links whose remark contains this text.
        #[arg(long)]
        search: Option<String>,
        /// Order by expiration date.
        #[arg(long, value_parser = parse_sort)]
        sort: Option<SortOrder>,
    },
    /// Shorten a URL.
    Create {
        #[arg(long)]
        url: String,
        #[arg(long)]
        remark: String,
        /// RFC 3339 or `YYYY-MM-DDTHH:MM` (UTC).
        #[arg(long, value_parser = parse_expiry)]
        expires: Option<chrono::DateTime<chrono::Utc>>,
    },
    /// Change a link. Fields left out keep their current value.
    Edit {
        code: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        remark: Option<String>,
        #[arg(long, value_parser = parse_expiry, conflicts_with = "no_expiry")]
        expires: Option<chrono::DateTime<chrono::Utc>>,
        /// Remove the expiration date.
        #[arg(long)]
        no_expiry: bool,
    },
    /// Delete a link.
    Delete { code: String },
    /// Every click across all links.
    Clicks {
        #[arg(long, value_parser = parse_sort)]
        sort: Option<SortOrder>,
    },
    /// Click totals with per-date and per-device bars.
    Stats {
        #[arg(long, value_enum, default_value_t = StatsSource::Backend)]
        source: StatsSource,
    },
    /// Show whether the configured token is usable.
    Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatsSource {
    /// The backend aggregate endpoint.
    Backend,
    /// Computed locally from the fetched clicks.
    Clicks,
}

fn parse_sort(s: &str) -> Result<SortOrder, String> {
    SortOrder::parse(s).ok_or_else(|| format!("expected 'asc' or 'desc', got '{s}'"))
}

fn parse_expiry(s: &str) -> Result<chrono::DateTime<chrono::Utc>, String> {
    parse_timestamp(s).map_err(|e| format!("invalid date '{s}': {e}"))
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment alone may be enough.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let json = cli.json;

    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    init_tracing(&cfg);
    cfg.warn_if_unusable();

    if let Err(err) = run(cli, &cfg).await {
        if json {
            let body = json_error_with_message(error_code(&err), &format!("{:#}", err));
            println!("{}", body);
        } else {
            eprintln!("error: {:#}", err);
        }
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

/// Map a failure onto the error code of the JSON error body.
fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(core) = err.downcast_ref::<CoreError>() {
        return match core {
            CoreError::Validation(_) | CoreError::PageOutOfRange { .. } => "validation",
            CoreError::Consistency(_) => "stale",
            CoreError::Unauthenticated => "unauthorized",
            CoreError::Transport(_) => "transport",
        };
    }
    if err.downcast_ref::<session_token::TokenError>().is_some() {
        return "unauthorized";
    }
    "error"
}

fn open_session(cfg: &config::Config) -> anyhow::Result<Session> {
    let Some(token) = cfg.token.as_deref() else {
        return Ok(Session::anonymous());
    };
    let session = session_token::open_session(token, SystemClock.now())
        .context("DASHBOARD_TOKEN is not usable")?;
    info!(expires_at = ?session.expires_at(), "session opened");
    Ok(session)
}

/// A store for the configured backend, not yet loaded.
fn open_store(cfg: &config::Config) -> anyhow::Result<Store> {
    let session = open_session(cfg)?;
    let backend = HttpBackend::new(&cfg.api_base, cfg.request_timeout)
        .context("building HTTP client")?;
    Ok(LinkCollectionStore::new(backend, session))
}

/// A store loaded with the current links.
async fn connect(cfg: &config::Config) -> anyhow::Result<Store> {
    let mut store = open_store(cfg)?;
    let count = store.refresh().await?;
    info!(count, api_base = %store.backend().base_url(), "links loaded");
    Ok(store)
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

async fn run(cli: Cli, cfg: &config::Config) -> anyhow::Result<()> {
    let json = cli.json;
    match cli.command {
        Command::Session => session_status(cfg, json),
        Command::Links { page, search, sort } => {
            let store = connect(cfg).await?;
            let mut links: Vec<Link> = match search.as_deref() {
                Some(q) => store.search(q),
                None => store.links().to_vec(),
            };
            if let Some(order) = sort {
                sort_stable_by_key(&mut links, order, Link::expiry_sort_key);
            }
            let page = paginate(&links, page, cfg.page_size)?;
            emit(json, &page, || {
                render::links_page(&page, &cfg.short_url_base, sort, SystemClock.now())
            })
        }
        Command::Create {
            url,
            remark,
            expires,
        } => {
            let mut store = connect(cfg).await?;
            let mut draft = LinkDraft::new(url, remark);
            if let Some(at) = expires {
                draft = draft.with_expiration(at);
            }
            let link = store.create(&draft).await?;
            emit(json, &link, || render::link_detail(&link, &cfg.short_url_base))
        }
        Command::Edit {
            code,
            url,
            remark,
            expires,
            no_expiry,
        } => {
            let code = ShortCode::new(code).map_err(CoreError::from)?;
            let edits = edit::LinkEdits {
                url,
                remark,
                expires,
                clear_expiry: no_expiry,
            };
            // Loaded on demand: the first miss refetches.
            let mut store = open_store(cfg)?;
            let link = edit::edit_link(&mut store, &code, &edits).await?;
            emit(json, &link, || render::link_detail(&link, &cfg.short_url_base))
        }
        Command::Delete { code } => {
            let code = ShortCode::new(code).map_err(CoreError::from)?;
            let mut store = connect(cfg).await?;
            if store.get(&code).is_none() {
                bail!("no link with code {}", code);
            }
            store.remove(&code).await?;
            emit(json, &serde_json::json!({ "deleted": code }), || {
                format!("Deleted {}\n", code)
            })
        }
        Command::Clicks { sort } => {
            let store = connect(cfg).await?;
            let mut events = store.click_events(&cfg.short_url_base);
            if let Some(order) = sort {
                events = sort_by_timestamp(&events, order);
            }
            emit(json, &events, || render::clicks_table(&events, sort))
        }
        Command::Stats { source } => {
            let summary: AnalyticsSummary = match source {
                StatsSource::Backend => open_store(cfg)?.fetch_summary().await?,
                StatsSource::Clicks => {
                    let store = connect(cfg).await?;
                    summarize(&store.click_events(&cfg.short_url_base))
                }
            };
            emit(json, &summary, || render::summary(&summary, cfg.bar_padding))
        }
    }
}

fn session_status(cfg: &config::Config, json: bool) -> anyhow::Result<()> {
    let Some(token) = cfg.token.as_deref() else {
        let body = serde_json::json!({ "authenticated": false });
        return emit(json, &body, || "No token configured (set DASHBOARD_TOKEN).\n".to_string());
    };
    let status = session_token::inspect(token, SystemClock.now())?;
    let authenticated = status.is_valid();
    let (body, text) = match status {
        SessionStatus::Valid { expires_at } => (
            serde_json::json!({ "authenticated": authenticated, "expiresAt": expires_at }),
            match expires_at {
                Some(at) => format!("Token valid until {}\n", at),
                None => "Token valid (no expiry)\n".to_string(),
            },
        ),
        SessionStatus::Expired { expired_at } => (
            serde_json::json!({ "authenticated": authenticated, "expiredAt": expired_at }),
            format!("Token expired at {}; sign in again\n", expired_at),
        ),
    };
    emit(json, &body, || text)
}
