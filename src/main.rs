//! floatclock CLI
//!
//! Clock, countdown and Pomodoro timer:
//! - `floatclock daemon` keeps the timers ticking and persists their state
//! - every other subcommand talks to the daemon over its control socket
//! - `floatclock clock` prints the time locally

use anyhow::Result;
use chrono::Local;
use clap::{CommandFactory, Parser};

use floatclock::cli::{Cli, Commands, Display, IpcClient};
use floatclock::clock::{render, ClockFormat};
use floatclock::config::AppConfig;

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Completions { shell } => {
            generate_completions(shell);
            return Ok(());
        }
        Commands::Clock => {
            let format = AppConfig::load(cli.config.as_deref())
                .map(|config| config.clock)
                .unwrap_or_else(|e| {
                    tracing::warn!("設定を読み込めないため既定の表示形式を使います: {:#}", e);
                    ClockFormat::default()
                });
            Display::show_clock(&render(&Local::now(), &format));
            return Ok(());
        }
        _ => {}
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    if let Commands::Daemon = command {
        return floatclock::daemon::run(config).await;
    }

    let socket_path = cli.socket.unwrap_or_else(|| config.socket_path());
    let client = IpcClient::with_socket_path(socket_path);

    let response = match command {
        Commands::Start => client.start().await?,
        Commands::Pause => client.pause().await?,
        Commands::Reset => client.reset().await?,
        Commands::Preset { minutes } => client.preset(minutes).await?,
        Commands::Duration { seconds } => client.duration(seconds).await?,
        Commands::Mode => client.cycle_mode().await?,
        Commands::Skip => client.advance_phase().await?,
        Commands::Configure(args) => {
            let params = args.to_params();
            if params.is_empty() {
                anyhow::bail!("変更する設定を指定してください (--help で一覧を表示)");
            }
            client.configure(params).await?
        }
        Commands::Status => {
            let response = client.status().await?;
            if let Some(snapshot) = &response.data {
                Display::show_status(snapshot, &render(&Local::now(), &config.clock));
                Display::show_presets(&config.countdown.presets);
            }
            return Ok(());
        }
        Commands::Watch => {
            let format = config.clock;
            client
                .watch(|snapshot| {
                    Display::show_watch_line(snapshot, &render(&Local::now(), &format));
                })
                .await?;
            return Ok(());
        }
        Commands::Daemon | Commands::Clock | Commands::Completions { .. } => return Ok(()),
    };

    Display::show_response(&response);
    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
