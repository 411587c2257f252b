use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::event::{KeyCode, KeyModifiers};
use f1qa_core::{ApiClient, Config, Storage};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{AppEvent, EventHandler, Tui};

/// Smallest terminal the chat layout can be drawn in.
const MIN_WIDTH: u16 = 60;
const MIN_HEIGHT: u16 = 16;

#[derive(Parser, Debug)]
#[command(name = "f1qa", version)]
#[command(about = "Terminal chat client for the F1 Q&A knowledge base")]
struct Cli {
    /// Backend base URL, including the API prefix
    #[arg(long)]
    base_url: Option<String>,
    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Seconds between background health checks
    #[arg(long)]
    health_interval_secs: Option<u64>,
    /// Bearer token sent with every request
    #[arg(long)]
    token: Option<String>,
    /// Path to a config file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Neither restore nor save conversation history
    #[arg(long)]
    no_history: bool,
    /// Write the effective settings to the config file and exit
    #[arg(long)]
    save_config: bool,
}

impl Cli {
    /// Config file values with command-line flags applied on top.
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(secs) = self.health_interval_secs {
            config.health_interval_secs = secs;
        }
        if let Some(token) = &self.token {
            config.auth_token = Some(token.clone());
        }
        if self.no_history {
            config.persist_history = false;
        }

        Ok(config)
    }

    /// Persist `config` where [`Cli::load_config`] would read it back from.
    fn write_config(&self, config: &Config) -> Result<PathBuf> {
        match &self.config {
            Some(path) => {
                config.save_to(path)?;
                Ok(path.clone())
            }
            None => {
                config.save()?;
                Config::get_config_path()
            }
        }
    }
}

/// The terminal belongs to the UI, so logs go to `<data_dir>/f1qa/f1qa.log`.
fn init_logging() -> Result<PathBuf> {
    let dir = dirs::data_dir()
        .context("Could not determine data directory")?
        .join("f1qa");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {:?}", dir))?;

    let path = dir.join("f1qa.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {:?}", path))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "f1qa=info,f1qa_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.save_config {
        let config = cli.load_config()?;
        let path = cli.write_config(&config)?;
        println!("Saved configuration to {}", path.display());
        return Ok(());
    }

    match init_logging() {
        Ok(path) => {
            let version = env!("CARGO_PKG_VERSION");
            info!(log = %path.display(), version, "logging initialised");
        }
        Err(e) => eprintln!("warning: logging disabled: {:#}", e),
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&cli, &mut terminal).await;

    tui::restore()?;
    result
}

async fn run(cli: &Cli, terminal: &mut Tui) -> Result<()> {
    let mut events = EventHandler::new();

    loop {
        match init_app(cli, terminal, events.sender()) {
            Ok(mut app) => return run_app(terminal, &mut app, &mut events).await,
            Err(e) => {
                let message = format!("{:#}", e);
                error!(error = %message, "initialisation failed");
                if !show_fatal(terminal, &mut events, &message).await? {
                    return Ok(());
                }
                info!("retrying initialisation");
            }
        }
    }
}

fn init_app(cli: &Cli, terminal: &Tui, events: UnboundedSender<AppEvent>) -> Result<App> {
    let config = cli.load_config()?;

    let size = terminal.size()?;
    if size.width < MIN_WIDTH || size.height < MIN_HEIGHT {
        bail!(
            "Terminal is {}x{} but at least {}x{} is needed. Resize it and reload.",
            size.width,
            size.height,
            MIN_WIDTH,
            MIN_HEIGHT
        );
    }

    let mut api = ApiClient::new(&config.base_url);
    api.set_timeout(config.timeout());
    api.set_auth_token(config.auth_token.as_deref())
        .context("Invalid auth token")?;

    let store = if config.persist_history {
        match Storage::open_default() {
            Ok(store) => {
                info!(dir = %store.dir().display(), "history enabled");
                Some(store)
            }
            Err(e) => {
                warn!(error = %e, "history unavailable");
                None
            }
        }
    } else {
        None
    };

    let mut app = App::new(api, &config, events, store);
    app.start_health_checks();

    info!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "f1qa started");
    Ok(app)
}

async fn run_app(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }

    app.shutdown();
    info!("f1qa exiting");
    Ok(())
}

/// Show the static error panel until the user reloads (`true`) or quits (`false`).
async fn show_fatal(terminal: &mut Tui, events: &mut EventHandler, message: &str) -> Result<bool> {
    loop {
        terminal.draw(|frame| ui::render_fatal(frame, message))?;

        match events.next().await {
            Some(AppEvent::Key(key)) => match key.code {
                KeyCode::Char('r') | KeyCode::Char('R') => return Ok(true),
                KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(false)
                }
                _ => {}
            },
            Some(_) => {}
            None => return Ok(false),
        }
    }
}
