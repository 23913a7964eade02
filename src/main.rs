//! Binary entrypoint for the radiomenu CLI.
//!
//! Commands:
//! - `start` - run the menu engine on a stdin console transport with a demo menu tree
//! - `init` - create a starter `config.toml`
//! - `status` - print the configuration summary and a metrics snapshot
//!
//! See the library crate docs for module‑level details: `radiomenu::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, MissedTickBehavior};

use radiomenu::config::Config;
use radiomenu::console::{install_demo, ConsoleCommand, Demo, HELP};
use radiomenu::popup::{
    ChannelDisplay, CommandDisposition, DisplayFrame, MenuServer, RegistryEvent, SendArgs,
    StaticDirectory, UserProfile,
};

#[derive(Parser)]
#[command(name = "radiomenu")]
#[command(about = "Per-user popup menu engine for digit driven game clients")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine with the interactive console transport
    Start,
    /// Write a default configuration file
    Init,
    /// Show configuration summary and counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config, so it never reads one first
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start => {
            let config = match pre_config {
                Some(config) => config,
                None => {
                    warn!("No usable config at {}; using defaults", cli.config);
                    Config::default()
                }
            };
            config.validate()?;
            info!("Starting radiomenu v{}", env!("CARGO_PKG_VERSION"));
            run_console(config).await?;
        }
        Commands::Init => {
            info!("Initializing new radiomenu configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load(&cli.config).await?,
            };
            show_status(&cli.config, &config);
        }
    }

    Ok(())
}

fn show_status(path: &str, config: &Config) {
    let valid = match config.validate() {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("invalid ({})", e),
    };
    let mut languages: Vec<&str> = config.strings.keys().map(String::as_str).collect();
    languages.sort_unstable();
    println!("radiomenu v{}", env!("CARGO_PKG_VERSION"));
    println!("config:            {} [{}]", path, valid);
    println!("refresh interval:  {}s", config.menu.refresh_seconds);
    println!("default language:  {}", config.menu.default_language);
    println!("accepted keys:     {}", config.menu.accepted_keys);
    println!("list page size:    {}", config.menu.list_options_per_page);
    println!("string tables:     {}", languages.join(", "));

    let snap = radiomenu::metrics::snapshot();
    println!("displays:          {}", snap.displays);
    println!("responses:         {}", snap.responses);
    println!("callback failures: {}", snap.callback_failures);
    println!("live sessions:     {}", snap.live_sessions());
    let mut kinds: Vec<(String, u64)> = radiomenu::metrics::kind_displays_snapshot()
        .into_iter()
        .collect();
    kinds.sort();
    for (kind, count) in kinds {
        println!("  {:<16} {}", kind, count);
    }
}

async fn run_console(config: Config) -> Result<()> {
    let (display, mut frames) = ChannelDisplay::channel();
    let users = StaticDirectory::new();
    let mut server = MenuServer::new(config, display, users.clone());
    let demo = install_demo(server.registry_mut())?;
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // Timer events arrive on the server channel; drain them even while stdin is idle
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(cmd) => {
                        if !apply_command(&mut server, &users, &demo, cmd) {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            _ = tick.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
        server.process_pending();
        while let Ok(frame) = frames.try_recv() {
            print_frame(&frame);
        }
    }
    Ok(())
}

/// Returns `false` when the console should exit.
fn apply_command(
    server: &mut MenuServer,
    users: &StaticDirectory,
    demo: &Demo,
    cmd: ConsoleCommand,
) -> bool {
    match cmd {
        ConsoleCommand::Connect {
            user,
            language,
            automated,
        } => {
            users.insert(
                user,
                UserProfile {
                    language,
                    automated,
                },
            );
            server.dispatch(RegistryEvent::UserConnected(user));
            if let Err(e) = server
                .registry_mut()
                .send(user, demo.main.into(), SendArgs::default())
            {
                warn!("could not send main menu to user {}: {}", user, e);
            }
        }
        ConsoleCommand::Disconnect(user) => {
            server.dispatch(RegistryEvent::UserDisconnected(user));
            users.remove(user);
        }
        ConsoleCommand::Reset => {
            server.dispatch(RegistryEvent::WorldReset);
        }
        ConsoleCommand::Input { user, args } => {
            if server.registry_mut().filter_command(user, args.as_slice()) == CommandDisposition::PassThrough
            {
                println!("[{}] {} (not a menu command)", user, args.join(" "));
            }
        }
        ConsoleCommand::Show(user) => match server.registry().session(user) {
            Some(session) => {
                let names = |ids: &[radiomenu::popup::MenuId]| {
                    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(" ")
                };
                println!(
                    "user {}: active={} queue=[{}] history=[{}]",
                    user,
                    session.is_activated(),
                    names(session.queue()),
                    names(session.history())
                );
            }
            None => println!("user {} has no session", user),
        },
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return false,
    }
    true
}

fn print_frame(frame: &DisplayFrame) {
    match frame {
        DisplayFrame::Render { user, text, keys } => {
            println!("--- user {} (keys {}) ---\n{}\n", user, keys, text);
        }
        DisplayFrame::Close { user } => println!("--- user {} menu closed ---", user),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(file) = config.as_ref().and_then(|cfg| cfg.logging.file.clone()) {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

            // Console output only when attached to a terminal
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());

                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }

                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
            let _ = builder.try_init();
            return;
        }
    }
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
