// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod config;
mod network;
mod theme;
mod view;

use std::io::BufRead;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dashboard_client::api::STATUS_PATH;
use dashboard_client::render::render_users;
use dashboard_client::{
    render_failure, render_logs, render_status, ActionReply, AdminApi, Credentials, HttpSource,
    LogKind, LogResponse, PollError, Region, StatusResponse,
};

use config::AppConfig;
use network::PollerManager;
use theme::Palette;
use view::{DashboardView, Screen, ViewUpdate};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const PASSWORD_ENV: &str = "DASHBOARD_PASSWORD";

#[derive(Debug, Parser)]
#[command(name = "mysite-dashboard", version, about = "Terminal dashboard for the mysite backend")]
struct Cli {
    /// Backend origin (overrides DASHBOARD_BASE_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Live dashboard: server status and a log stream, refreshed periodically
    Watch(WatchArgs),
    /// Print the server status once
    Status,
    /// Print a log stream once
    Logs {
        #[arg(long)]
        kind: Option<LogKind>,
    },
    /// Log in, then open the dashboard with the new session
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,
        /// Exit after logging in
        #[arg(long)]
        no_watch: bool,
    },
    /// Create an account
    Register {
        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// User administration (needs an admin session)
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },
    /// Show or change the saved theme
    Theme {
        #[command(subcommand)]
        action: ThemeCommand,
    },
    /// Print the configuration file location
    ConfigPath,
}

#[derive(Debug, Args)]
struct WatchArgs {
    /// Log stream to show first
    #[arg(long, value_name = "admin|debug")]
    logs: Option<LogKind>,

    /// Seconds between status polls
    #[arg(long, value_name = "S")]
    status_interval: Option<u64>,

    /// Seconds between log polls
    #[arg(long, value_name = "S")]
    log_interval: Option<u64>,

    /// Log in as this user before watching
    #[arg(long)]
    user: Option<String>,

    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    password: Option<String>,
}

#[derive(Debug, Args)]
struct CredentialArgs {
    #[arg(long)]
    user: String,

    #[arg(long, env = PASSWORD_ENV, hide_env_values = true)]
    password: String,
}

impl CredentialArgs {
    fn credentials(&self) -> Credentials {
        Credentials::new(&self.user, &self.password)
    }
}

#[derive(Debug, Subcommand)]
enum AdminCommand {
    /// List users and their admin flag
    List,
    /// Make a user an admin
    Grant { username: String },
    /// Remove a user's admin rights
    Revoke { username: String },
}

#[derive(Debug, Subcommand)]
enum ThemeCommand {
    /// Print the saved theme
    Show,
    /// Save a theme (`dark`, `plain`, or `default`)
    Set { name: String },
}

/// Keyboard commands accepted while watching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Switch(LogKind),
    Quit,
}

fn parse_key(line: &str) -> Option<Key> {
    let line = line.trim();
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Some(Key::Quit);
    }
    line.parse::<LogKind>().ok().map(Key::Switch)
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, BoxError> {
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {e}");
        AppConfig::default()
    });

    let mut source_config = config.source_config();
    if let Some(url) = cli.base_url {
        source_config.base_url = url;
    }
    if let Some(secs) = cli.timeout {
        source_config.timeout = Duration::from_secs(secs.max(1));
    }

    let source = HttpSource::new(source_config)?;

    match cli.command {
        Command::Watch(args) => {
            if let Some(user) = &args.user {
                let Some(password) = &args.password else {
                    return Err(format!("--user requires --password or {PASSWORD_ENV}").into());
                };
                let api = AdminApi::new(source.clone());
                if !report(api.login(&Credentials::new(user, password)).await) {
                    return Ok(ExitCode::FAILURE);
                }
            }
            if let Some(secs) = args.status_interval {
                config.status_interval_secs = secs;
            }
            if let Some(secs) = args.log_interval {
                config.log_interval_secs = secs;
            }
            watch(source, &config, args.logs.unwrap_or(config.log_kind)).await
        }
        Command::Status => {
            let result = source.get_json::<StatusResponse>(STATUS_PATH).await;
            Ok(print_region(result.map(|r| render_status(&r)), Region::Status))
        }
        Command::Logs { kind } => {
            let kind = kind.unwrap_or(config.log_kind);
            let result = source.get_json::<LogResponse>(kind.endpoint()).await;
            Ok(print_region(result.map(|r| render_logs(kind, &r)), Region::Logs))
        }
        Command::Login { credentials, no_watch } => {
            let api = AdminApi::new(source);
            if !report(api.login(&credentials.credentials()).await) {
                return Ok(ExitCode::FAILURE);
            }
            if no_watch {
                return Ok(ExitCode::SUCCESS);
            }
            // Same client, so the session cookie carries over
            watch(api.source().clone(), &config, config.log_kind).await
        }
        Command::Register { credentials } => {
            let api = AdminApi::new(source);
            Ok(exit_code(report(api.register(&credentials.credentials()).await)))
        }
        Command::Admin { action } => admin_command(&AdminApi::new(source), action).await,
        Command::Theme { action } => theme_command(&mut config, action),
        Command::ConfigPath => {
            println!("{}", AppConfig::get_config_path()?.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn admin_command(api: &AdminApi, action: AdminCommand) -> Result<ExitCode, BoxError> {
    let reply = match action {
        AdminCommand::List => {
            return match api.list_users().await {
                Ok(list) => {
                    println!("{}", render_users(&list));
                    Ok(exit_code(list.success))
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    Ok(ExitCode::FAILURE)
                }
            };
        }
        AdminCommand::Grant { username } => api.grant_admin(&username).await,
        AdminCommand::Revoke { username } => api.revoke_admin(&username).await,
    };
    Ok(exit_code(report(reply)))
}

fn theme_command(config: &mut AppConfig, action: ThemeCommand) -> Result<ExitCode, BoxError> {
    match action {
        ThemeCommand::Show => println!("{}", theme::current_theme(config)),
        ThemeCommand::Set { name } => {
            theme::save_theme(config, &name)?;
            println!("Theme set to {}", theme::current_theme(config));
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print an action's reply; true when the backend reported success
fn report(result: Result<ActionReply, PollError>) -> bool {
    match result {
        Ok(reply) => {
            if reply.success {
                println!("{}", reply.text());
            } else {
                eprintln!("❌ {}", reply.text());
            }
            reply.success
        }
        Err(e) => {
            eprintln!("❌ {e}");
            false
        }
    }
}

fn print_region(result: Result<String, PollError>, region: Region) -> ExitCode {
    match result {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", render_failure(region, &e));
            ExitCode::FAILURE
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the live dashboard until `q` or Ctrl-C
async fn watch(source: HttpSource, config: &AppConfig, kind: LogKind) -> Result<ExitCode, BoxError> {
    let screen = Screen::new(
        Palette::for_theme(config.theme.as_deref()),
        source.base_url(),
    );
    let mut view = DashboardView::new(kind);

    let (update_tx, mut updates) = mpsc::unbounded_channel();
    let mut manager = PollerManager::new(
        source,
        update_tx,
        config.status_interval(),
        config.log_interval(),
    );
    manager.start_status();
    manager.start_logs(kind);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
        }
        signal_token.cancel();
    });

    // Blocking stdin reads live on their own thread so shutdown never waits on them
    let (key_tx, mut keys) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if let Some(key) = parse_key(&line) {
                if key_tx.send(key).is_err() {
                    break;
                }
            }
        }
    });

    screen.draw(&view)?;
    let result = drive_view(
        &mut view,
        &mut updates,
        &mut keys,
        &shutdown,
        |kind| manager.set_log_kind(kind),
        |view| screen.draw(view),
    )
    .await;

    manager.stop_all();
    result?;
    Ok(ExitCode::SUCCESS)
}

/// Apply poll updates and keyboard commands to `view` until `q` or shutdown.
///
/// A closed keyboard (stdin at end of file) only stops key handling; the
/// dashboard keeps refreshing until shutdown.
async fn drive_view<S, R>(
    view: &mut DashboardView,
    updates: &mut mpsc::UnboundedReceiver<ViewUpdate>,
    keys: &mut mpsc::UnboundedReceiver<Key>,
    shutdown: &CancellationToken,
    mut switch_log: S,
    mut redraw: R,
) -> std::io::Result<()>
where
    S: FnMut(LogKind),
    R: FnMut(&DashboardView) -> std::io::Result<()>,
{
    let mut keys_open = true;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            key = keys.recv(), if keys_open => match key {
                Some(Key::Switch(kind)) => {
                    view.set_log_kind(kind);
                    switch_log(kind);
                }
                Some(Key::Quit) => break,
                None => {
                    info!("Keyboard input closed; Ctrl-C to exit");
                    keys_open = false;
                    continue;
                }
            },
            update = updates.recv() => match update {
                Some(update) => view.apply(update),
                // Every poller is gone
                None => break,
            },
        }
        redraw(view)?;
    }
    Ok(())
}
