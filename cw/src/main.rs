//! commitwatch - live Git status for the last announced directory
//!
//! CLI entry point: runs the watcher or talks to a running one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use commitwatch::cli::{Cli, Command};
use commitwatch::config::Config;
use commitwatch::ipc::{Endpoint, Transport, WatchClient};
use commitwatch::reactor::{self, Event, EventSender, Reactor};
use commitwatch::render::{TextRenderer, ViewLine, commit_lines, status_lines};
use commitwatch::status::{GitStatusProvider, StatusProvider};
use commitwatch::ticker::RefreshTicker;
use commitwatch::tui::{self, KeyHandler, TerminalGuard, TerminalRenderer};
use commitwatch::watch::{NotifySubscriber, WatchManager};

fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" | "WARNING" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // The terminal belongs to the view, so logs go to a file
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("commitwatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }),
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("commitwatch.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level is needed before the full config load can log anything
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Watch { plain }) => {
            debug!(plain, "main: matched Watch command");
            cmd_watch(&config, plain).await
        }
        Some(Command::Notify { path }) => {
            debug!(?path, "main: matched Notify command");
            cmd_notify(&config, &path).await
        }
        Some(Command::Status { path, max_commits }) => {
            debug!(?path, ?max_commits, "main: matched Status command");
            cmd_status(&config, path.as_deref(), max_commits, false)
        }
        Some(Command::Log { path, max_commits }) => {
            debug!(?path, ?max_commits, "main: matched Log command");
            cmd_status(&config, path.as_deref(), max_commits, true)
        }
        None => {
            debug!("main: no command specified, watching");
            cmd_watch(&config, false).await
        }
    }
}

/// Run the watcher until a quit key or signal
async fn cmd_watch(config: &Config, plain: bool) -> Result<()> {
    debug!(plain, "cmd_watch: called");
    let endpoint = Endpoint::from_config(&config.watch)?;
    let (events, mut queue) = reactor::channel();

    // Bind before touching the terminal so a busy address fails cleanly
    let transport = Transport::start(&endpoint, events.clone())
        .await
        .context(format!("Failed to start watcher on {}", endpoint))?;
    let ticker = RefreshTicker::start(config.watch.refresh_interval(), events.clone());

    let provider: Arc<dyn StatusProvider> =
        Arc::new(GitStatusProvider::new().with_search_parents(config.watch.search_parents));
    let manager = WatchManager::new(provider, Box::new(NotifySubscriber::new(events.clone())));
    let signals = spawn_signal_handler(events.clone());
    info!(%endpoint, "Watcher listening");

    if plain {
        let renderer = TextRenderer::new(io::stdout(), config.display.color);
        let mut reactor = Reactor::new(manager, renderer, config.watch.max_commits());
        reactor.run(&mut queue, transport, ticker).await;
    } else {
        let terminal = tui::init()?;
        let _guard = TerminalGuard;
        let keys = KeyHandler::spawn(events.clone());

        let mut reactor = Reactor::new(manager, TerminalRenderer::new(terminal), config.watch.max_commits());
        reactor.run(&mut queue, transport, ticker).await;
        keys.stop();
    }

    signals.abort();
    info!("Watcher stopped");
    Ok(())
}

/// Forward SIGINT/SIGTERM to the reactor as a cancel request
fn spawn_signal_handler(events: EventSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        debug!("spawn_signal_handler: signal received");
        let _ = events.send(Event::CancelRequest);
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Announce a path to the running watcher
async fn cmd_notify(config: &Config, path: &Path) -> Result<()> {
    debug!(?path, "cmd_notify: called");
    let endpoint = Endpoint::from_config(&config.watch)?;
    let announced = WatchClient::new(endpoint).notify(path).await?;
    println!("Announced {}", announced);
    Ok(())
}

/// Print a repository's status (or only its commits) once
fn cmd_status(config: &Config, path: Option<&Path>, max_commits: Option<usize>, commits_only: bool) -> Result<()> {
    debug!(?path, ?max_commits, commits_only, "cmd_status: called");
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let max_commits = match max_commits {
        Some(0) | None => config.watch.max_commits(),
        Some(n) => n,
    };

    let provider = GitStatusProvider::new().with_search_parents(config.watch.search_parents);
    let handle = provider.open(&path.to_string_lossy())?;
    let status = handle.status(max_commits)?;

    let now = chrono::Utc::now();
    let lines = if commits_only {
        commit_lines(&status.commits, now)
    } else {
        let mut lines = vec![ViewLine::Target(handle.root().display().to_string())];
        lines.extend(status_lines(&status, now));
        lines
    };

    let mut renderer = TextRenderer::new(io::stdout(), config.display.color);
    renderer.print(&lines)
}
