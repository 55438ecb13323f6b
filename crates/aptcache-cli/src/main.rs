//! `aptcache` command-line admin surface.
//!
//! Each subcommand is thin wiring over `aptcache_local::Engine` and the
//! on-disk [`config`]: no cache/fetch logic is re-implemented here.

mod config;

use aptcache_core::CoreConfig;
use aptcache_local::stats::{InMemoryStats, RingLog};
use aptcache_local::Engine;
use clap::{Parser, Subcommand};
use config::ConfigMirrors;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "aptcache", version, about = "Admin CLI for the apt-cache-proxy engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a package straight into the cache, without a waiting client.
    Prefetch {
        #[arg(long)]
        distro: String,
        #[arg(long = "path")]
        request_path: String,
    },
    /// Run one retention sweep now. Destructive: requires --admin-token.
    Sweep {
        /// Report what would be deleted without deleting anything.
        #[arg(long)]
        dry_run: bool,
        #[arg(long = "admin-token", env = "APTCACHE_ADMIN_TOKEN", default_value = "")]
        admin_token: String,
    },
    /// Search cached package indexes (and, failing that, probe upstream).
    Search {
        #[arg(long)]
        distro: String,
        #[arg(long)]
        query: String,
    },
    /// Remove one cached file by its path relative to the storage root.
    /// Destructive: requires --admin-token.
    Delete {
        path: String,
        #[arg(long = "admin-token", env = "APTCACHE_ADMIN_TOKEN", default_value = "")]
        admin_token: String,
    },
    /// Manage the upstream-filename blacklist.
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
    /// Check that the configured storage path exists and is writable.
    Doctor,
    /// Print version information as JSON.
    Version,
}

#[derive(Subcommand)]
enum BlacklistAction {
    Add { pattern: String },
    /// Destructive: requires --admin-token.
    Remove {
        pattern: String,
        #[arg(long = "admin-token", env = "APTCACHE_ADMIN_TOKEN", default_value = "")]
        admin_token: String,
    },
    List,
}

/// Gates a destructive admin subcommand behind `CoreConfig::admin_token`.
/// The engine itself never inspects this token; it exists purely so the CLI
/// can refuse to run `sweep`/`delete`/`blacklist remove` for a caller who
/// doesn't know the configured value.
fn require_admin_token(cfg: &config::AppConfig, provided: &str) -> anyhow::Result<()> {
    if provided != cfg.core.admin_token {
        anyhow::bail!("invalid or missing --admin-token for a destructive operation");
    }
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("APTCACHE_LOG")
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_engine(cfg: &config::AppConfig) -> anyhow::Result<Engine> {
    let stats = Arc::new(InMemoryStats::load(&cfg.core.storage_path_resolved));
    let events = Arc::new(RingLog::new());
    let mirrors = Arc::new(ConfigMirrors(cfg.mirrors.clone()));
    Engine::new(cfg.core.clone(), cfg.blacklist.clone(), mirrors, stats, events)
        .map_err(|e| anyhow::anyhow!("failed to build engine: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load()?;
    init_tracing(&cfg.core.log_level);

    match cli.command {
        Commands::Prefetch { distro, request_path } => {
            let engine = build_engine(&cfg)?;
            let (already_cached, message) = engine.prefetch(&distro, &request_path).await;
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "prefetch",
                "ok": true,
                "distro": distro,
                "path": request_path,
                "already_cached": already_cached,
                "message": message,
            }));
        }
        Commands::Sweep { dry_run, admin_token } => {
            if !dry_run {
                require_admin_token(&cfg, &admin_token)?;
            }
            let engine = build_engine(&cfg)?;
            let report = engine.sweep(dry_run);
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "sweep",
                "ok": true,
                "dry_run": dry_run,
                "scanned": report.scanned,
                "deleted": report.deleted,
                "errors": report.errors,
            }));
        }
        Commands::Search { distro, query } => {
            let engine = build_engine(&cfg)?;
            let hits = engine.search(&distro, &query).await;
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "search",
                "ok": true,
                "distro": distro,
                "query": query,
                "hits": hits,
            }));
        }
        Commands::Delete { path, admin_token } => {
            require_admin_token(&cfg, &admin_token)?;
            let engine = build_engine(&cfg)?;
            let deleted = engine.delete(&path);
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "delete",
                "ok": deleted,
                "path": path,
            }));
        }
        Commands::Blacklist { action } => handle_blacklist(cfg, action)?,
        Commands::Doctor => run_doctor(&cfg)?,
        Commands::Version => {
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }));
        }
    }

    Ok(())
}

fn handle_blacklist(mut cfg: config::AppConfig, action: BlacklistAction) -> anyhow::Result<()> {
    match action {
        BlacklistAction::Add { pattern } => {
            if !cfg.blacklist.contains(&pattern) {
                cfg.blacklist.push(pattern.clone());
                config::save(&cfg)?;
            }
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "blacklist_add",
                "ok": true,
                "pattern": pattern,
                "patterns": cfg.blacklist,
            }));
        }
        BlacklistAction::Remove { pattern, admin_token } => {
            require_admin_token(&cfg, &admin_token)?;
            cfg.blacklist.retain(|p| p != &pattern);
            config::save(&cfg)?;
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "blacklist_remove",
                "ok": true,
                "pattern": pattern,
                "patterns": cfg.blacklist,
            }));
        }
        BlacklistAction::List => {
            print_json(serde_json::json!({
                "schema_version": 1,
                "kind": "blacklist_list",
                "ok": true,
                "patterns": cfg.blacklist,
            }));
        }
    }
    Ok(())
}

fn run_doctor(cfg: &config::AppConfig) -> anyhow::Result<()> {
    let CoreConfig {
        storage_path_resolved,
        ..
    } = &cfg.core;

    std::fs::create_dir_all(storage_path_resolved).ok();
    let writable = storage_path_resolved
        .metadata()
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false);

    let config_readable = config::config_path().map(|p| p.exists()).unwrap_or(false);

    let stats = InMemoryStats::load(storage_path_resolved);
    stats.rescan(storage_path_resolved);
    let snapshot = stats.snapshot();

    print_json(serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": writable && config_readable,
        "storage_path": storage_path_resolved,
        "storage_writable": writable,
        "config_readable": config_readable,
        "mirrors_configured": cfg.mirrors.len(),
        "blacklist_patterns": cfg.blacklist.len(),
        "per_distro_files": snapshot["per_distro_files"],
        "per_distro_bytes": snapshot["per_distro_bytes"],
    }));
    Ok(())
}

fn print_json(value: serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
}
