// subfeed entry point.
// Parses the command line, sets up logging and runs the TUI or a headless command.

mod app;
mod auth;
mod config;
mod credentials;
mod error;
mod feed;
mod state;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::config::Config;
use crate::credentials::{AuthState, CredentialStore, FileStore, MemoryStore, paths};
use crate::error::{Result, SubfeedError};
use crate::feed::{FeedClient, VideoSummary, endpoints};

#[derive(Parser)]
#[command(name = "subfeed", version, about = "Browse your video subscriptions from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the config file.
    #[arg(long, global = true, env = "SUBFEED_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive viewer (default).
    Tui,
    /// Finish a login with the URL the browser was redirected to.
    Login {
        /// Redirect URL or its query string. Prints the login address when omitted.
        redirect: Option<String>,
    },
    /// Forget the cached credential.
    Logout,
    /// Show whether a credential is cached.
    Status,
    /// List the latest videos from your subscriptions.
    Videos {
        #[arg(long)]
        json: bool,
    },
    /// Search videos.
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
}

fn init_telemetry(cli: &Cli, to_file: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // The TUI owns the terminal, so its logs go to a file
    let log_file = to_file
        .then(paths::log_path)
        .flatten()
        .and_then(|path| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).ok()?;
            }
            OpenOptions::new().create(true).append(true).open(path).ok()
        });

    match log_file {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
            .init(),
        // No writable cache dir; stay quiet rather than draw over the UI
        None if to_file => {}
        None => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_ansi(true),
            )
            .init(),
    }
}

fn open_store() -> Arc<dyn CredentialStore> {
    match paths::credentials_path() {
        Some(path) => Arc::new(FileStore::new(path)),
        None => {
            tracing::warn!("no cache directory, credentials will not persist");
            Arc::new(MemoryStore::new())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let tui = matches!(cli.command, None | Some(Commands::Tui));
    init_telemetry(&cli, tui);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "subfeed starting");

    let config = Config::load(cli.config.as_deref())?;
    let runtime = Runtime::new()?;
    let client = FeedClient::from_config(config, open_store())?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => run_tui(client, &runtime),
        Commands::Login { redirect: None } => {
            println!("Open this address in a browser and sign in:");
            println!("  {}", endpoints::login_url(client.config())?);
            println!("Then run: subfeed login '<the address you were redirected to>'");
            Ok(())
        }
        Commands::Login {
            redirect: Some(redirect),
        } => {
            runtime.block_on(auth::complete_login(&client, &redirect))?;
            println!("Logged in.");
            Ok(())
        }
        Commands::Logout => {
            auth::logout(client.store().as_ref())?;
            println!("Logged out.");
            Ok(())
        }
        Commands::Status => {
            match client.auth_state() {
                AuthState::Authenticated(credential) => {
                    println!("Logged in");
                    println!(
                        "  refresh token: {}",
                        if credential.refresh_token.is_some() { "present" } else { "missing" }
                    );
                    if let Some(expires_in) = credential.expires_in {
                        println!("  expires in:    {}s", expires_in);
                    }
                }
                AuthState::Anonymous => println!("Logged out"),
            }
            println!("API: {}", client.config().api_base);
            Ok(())
        }
        Commands::Videos { json } => {
            let videos = runtime.block_on(client.subscription_videos()).into_result()?;
            print_videos(&videos, json)
        }
        Commands::Search { query, json } => {
            let videos = runtime.block_on(client.search(&query)).into_result()?;
            print_videos(&videos, json)
        }
    }
}

fn print_videos(videos: &[VideoSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(videos)?);
        return Ok(());
    }

    if videos.is_empty() {
        println!("No videos found.");
    }
    for video in videos {
        let published = video
            .published_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("{:<10} {:<24} {}", published, video.channel_title, video.title);
        println!("{:<10} {}", "", video.watch_url());
    }
    Ok(())
}

fn run_tui(client: FeedClient, runtime: &Runtime) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(client, runtime.handle().clone());
    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result.map_err(SubfeedError::from)
}
