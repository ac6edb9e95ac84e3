//! Orbita Gateway - Main Entry Point
//!
//! This is the main executable for the orbita-gateway application.
//! It handles CLI argument parsing, configuration loading, and startup of
//! either the gateway (serve) or the one-shot browser launcher (launch).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orbita_gateway::{
    config::{CliArgs, GatewaySettings},
    fingerprint::FingerprintClient,
    gateway::{ActiveSessionRegistry, GatewayServer, GatewayState},
    launch::{build_launch_args, ProcessSupervisor, StdioMode, SupervisorConfig},
    profile::ProfileManager,
    NAME, VERSION,
};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
}

/// Print the startup banner with version and ASCII art
fn print_banner() {
    println!(
        r#"
{cyan}{bold}   ___       _     _ _          ____       _
  / _ \ _ __| |__ (_) |_ __ _  / ___| __ _| |_ _____      ____ _ _   _
 | | | | '__| '_ \| | __/ _` || |  _ / _` | __/ _ \ \ /\ / / _` | | | |
 | |_| | |  | |_) | | || (_| || |_| | (_| | ||  __/\ V  V / (_| | |_| |
  \___/|_|  |_.__/|_|\__\__,_| \____|\__,_|\__\___| \_/\_/ \__,_|\__, |
                                                                 |___/
{reset}
{dim}  Fingerprint-Injecting Browser Automation Gateway{reset}
{dim}  Version: {version}{reset}
"#,
        cyan = colors::CYAN,
        bold = colors::BOLD,
        reset = colors::RESET,
        dim = colors::DIM,
        version = VERSION
    );
}

/// Print configuration summary
fn print_config_summary(settings: &GatewaySettings) {
    println!(
        "{bold}{blue}Configuration:{reset}",
        bold = colors::BOLD,
        blue = colors::BLUE,
        reset = colors::RESET
    );
    println!(
        "  {dim}Gateway Port:{reset}   {}",
        settings.gateway_port,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Backend:{reset}        {} ({})",
        settings.backend_http_url(),
        settings.backend_command.display(),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Orbita:{reset}         {}",
        settings.orbita_path.display(),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}GoLogin API:{reset}    {}",
        settings.api_url,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Token:{reset}          {}",
        if settings.token_configured() {
            format!("{green}configured{reset}", green = colors::GREEN, reset = colors::RESET)
        } else {
            format!("{yellow}missing{reset}", yellow = colors::YELLOW, reset = colors::RESET)
        },
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Profiles:{reset}       {} (sweep after {}s)",
        settings.profile_root.display(),
        settings.profile_max_age_secs,
        dim = colors::DIM,
        reset = colors::RESET
    );

    println!();
}

/// Build the CLI command parser
fn build_cli() -> Command {
    Command::new(NAME)
        .version(VERSION)
        .author("Orbita Gateway Team")
        .about("Fingerprint-injecting gateway and launcher for Orbita-backed automation")
        .long_about(
            "Orbita Gateway fronts a headless-browser automation backend:\n\
             - Per-session browser identities from the GoLogin API\n\
             - Transparent HTTP and WebSocket reverse proxy\n\
             - Isolated per-session profile directories\n\
             - Supervised backend process with keep-alive restarts",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file (TOML or JSON)")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Gateway listen port (default: 8080)")
                .value_parser(clap::value_parser!(u16))
                .global(true),
        )
        .arg(
            Arg::new("orbita")
                .long("orbita")
                .value_name("PATH")
                .help("Path to the Orbita browser executable")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .value_name("TOKEN")
                .help("GoLogin API bearer token")
                .global(true),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("GoLogin API base URL")
                .global(true),
        )
        .arg(
            Arg::new("workspace")
                .long("workspace")
                .value_name("NAME")
                .help("GoLogin workspace name")
                .global(true),
        )
        .arg(
            Arg::new("os")
                .long("os")
                .value_name("OS")
                .help("OS family to request fingerprints for")
                .value_parser(["lin", "mac", "win"])
                .global(true),
        )
        .arg(
            Arg::new("os-spec")
                .long("os-spec")
                .value_name("SPEC")
                .help("OS variant hint (e.g. M1)")
                .global(true),
        )
        .arg(
            Arg::new("profile-root")
                .long("profile-root")
                .value_name("PATH")
                .help("Root directory for per-session profiles")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .global(true),
        )
        .subcommand(Command::new("serve").about("Run the gateway in front of the automation backend"))
        .subcommand(
            Command::new("launch")
                .about("Launch Orbita once with a fresh fingerprint")
                .arg(
                    Arg::new("browser-args")
                        .value_name("ARGS")
                        .help("Extra arguments passed to the browser, after --")
                        .num_args(0..)
                        .allow_hyphen_values(true)
                        .trailing_var_arg(true),
                ),
        )
}

/// Parse CLI arguments into CliArgs struct
fn parse_cli_args(matches: &ArgMatches) -> CliArgs {
    CliArgs {
        config_file: matches.get_one::<PathBuf>("config").cloned(),
        gateway_port: matches.get_one::<u16>("port").copied(),
        orbita_path: matches.get_one::<PathBuf>("orbita").cloned(),
        api_token: matches.get_one::<String>("token").cloned(),
        api_url: matches.get_one::<String>("api-url").cloned(),
        workspace: matches.get_one::<String>("workspace").cloned(),
        os_type: matches.get_one::<String>("os").cloned(),
        os_spec: matches.get_one::<String>("os-spec").cloned(),
        profile_root: matches.get_one::<PathBuf>("profile-root").cloned(),
    }
}

/// Initialize the tracing/logging subsystem
fn init_tracing(verbosity: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Resolves when the process receives an interrupt or termination signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for interrupt signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to listen for terminate signal: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Environment handed to the automation backend process.
fn backend_envs(settings: &GatewaySettings) -> Vec<(String, String)> {
    vec![
        ("PORT".to_string(), settings.backend_port.to_string()),
        (
            "CHROME_PATH".to_string(),
            settings.orbita_path.display().to_string(),
        ),
        (
            "MAX_CONCURRENT_SESSIONS".to_string(),
            settings.max_concurrent_sessions.to_string(),
        ),
        (
            "QUEUE_LENGTH".to_string(),
            settings.queue_length.to_string(),
        ),
        (
            "CONNECTION_TIMEOUT".to_string(),
            settings.connection_timeout_ms.to_string(),
        ),
        (
            "DEFAULT_IGNORE_HTTPS_ERRORS".to_string(),
            settings.ignore_https_errors.to_string(),
        ),
        (
            "EXIT_ON_HEALTH_FAILURE".to_string(),
            settings.exit_on_health_failure.to_string(),
        ),
    ]
}

/// Run the gateway: supervised backend plus proxy server.
async fn run_serve(settings: GatewaySettings) -> Result<()> {
    let settings = Arc::new(settings);

    // Routine housekeeping before the launch cycle
    let profiles = ProfileManager::new(&settings.profile_root);
    let swept = profiles.sweep(Duration::from_secs(settings.profile_max_age_secs));
    if swept > 0 {
        info!(swept, "removed stale profile directories");
    }

    let fingerprint = FingerprintClient::from_settings(&settings);
    let registry = ActiveSessionRegistry::new();
    let state = GatewayState::new(Arc::clone(&settings), fingerprint, registry);

    let supervisor = ProcessSupervisor::new(SupervisorConfig {
        executable: settings.backend_command.clone(),
        args: Vec::new(),
        envs: backend_envs(&settings),
        stdio: StdioMode::Forward("backend".to_string()),
        restart_delay: Duration::from_secs(settings.restart_delay_secs),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let backend = tokio::spawn(async move { supervisor.run_keep_alive(shutdown_rx).await });

    let mut server = GatewayServer::new(settings.gateway_port, state);
    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("failed to start gateway server: {}", e))?;

    println!(
        "{green}{bold}Gateway started:{reset} http://0.0.0.0:{}",
        settings.gateway_port,
        green = colors::GREEN,
        bold = colors::BOLD,
        reset = colors::RESET
    );
    println!(
        "{dim}Press Ctrl+C to stop{reset}",
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!();

    info!("orbita-gateway is running");
    shutdown_signal().await;
    println!();
    info!("received shutdown signal, stopping gracefully...");

    let _ = shutdown_tx.send(true);
    server.stop().await;
    let _ = backend.await;

    println!(
        "{green}Orbita Gateway stopped successfully.{reset}",
        green = colors::GREEN,
        reset = colors::RESET
    );

    Ok(())
}

/// Run the launcher: one browser process with a fresh identity.
async fn run_launch(settings: GatewaySettings, browser_args: Vec<String>) -> Result<i32> {
    let profiles = ProfileManager::new(&settings.profile_root);
    let swept = profiles.sweep(Duration::from_secs(settings.profile_max_age_secs));
    if swept > 0 {
        info!(swept, "removed stale profile directories");
    }

    let client = FingerprintClient::from_settings(&settings);
    let descriptor = client
        .fetch(&settings.os_type, settings.os_spec.as_deref())
        .await
        .context("fingerprint acquisition failed, aborting launch")?;

    info!(
        session_id = %descriptor.session_id,
        user_agent = %descriptor.user_agent(),
        "launching Orbita with fresh identity"
    );

    let profile = profiles.prepare(&descriptor);
    let args = build_launch_args(&descriptor, &profile, &browser_args);

    let supervisor = ProcessSupervisor::new(SupervisorConfig {
        executable: settings.orbita_path.clone(),
        args,
        envs: Vec::new(),
        stdio: StdioMode::Inherit,
        restart_delay: Duration::from_secs(settings.restart_delay_secs),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let outcome = supervisor
        .run_once(shutdown_rx)
        .await
        .context("browser failed to start")?;

    profiles.reclaim(&profile);
    info!(code = outcome.code(), "browser session ended");

    Ok(outcome.code())
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    let verbosity = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");

    init_tracing(verbosity, quiet);

    let cli_args = parse_cli_args(&matches);
    let settings = cli_args
        .load_settings()
        .context("Failed to load configuration")?;

    // Missing token is fatal at startup, before any server or child starts
    settings.validate().context("Invalid configuration")?;

    if !quiet {
        print_banner();
        print_config_summary(&settings);
    }

    match matches.subcommand() {
        Some(("launch", sub)) => {
            let browser_args: Vec<String> = sub
                .get_many::<String>("browser-args")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();

            let code = run_launch(settings, browser_args).await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        // `serve` is the default mode
        _ => run_serve(settings).await,
    }
}
