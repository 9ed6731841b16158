use anidb_registry_cli::commands::{self, CommandSpec};
use anidb_registry_cli::config::{ConfigManager, SESSION_ENV, ServerOverrides};
use anidb_registry_core::{CommandKind, ProtocolError, RegistryClient, UdpChannel};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "anidb-registry")]
#[command(author, version, about = "AniDB registry tool - render commands, parse replies, run queries", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    server: ServerOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the wire text of a command without sending it
    Render {
        #[command(subcommand)]
        spec: CommandSpec,
    },

    /// Parse a captured reply and print it as JSON
    Parse {
        /// Command kind the reply answers (e.g. creator, group-status)
        kind: CommandKind,

        /// Anime id, required for group-status replies
        #[arg(long)]
        aid: Option<u64>,

        /// File holding the raw reply; stdin when omitted
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Send one command over an authenticated session
    Query {
        /// Session key from a prior AUTH
        #[arg(long, env = SESSION_ENV, hide_env_values = true)]
        session: String,

        #[command(subcommand)]
        spec: CommandSpec,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the merged configuration as TOML
    Show,

    /// Print the configuration file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Warn)
            .filter_module("anidb_registry_core", log::LevelFilter::Debug)
            .filter_module("anidb_registry_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match cli.command {
        Commands::Render { spec } => {
            println!("{}", spec.render()?);
        }
        Commands::Parse { kind, aid, input } => {
            let reply = commands::read_captured(input.as_deref())?;
            log::debug!("Parsing captured {} reply with code {}", kind.name(), reply.code);
            let response = commands::parse_captured(kind, aid, &reply)?;
            println!("{}", commands::to_json(&response)?);
        }
        Commands::Query { session, spec } => {
            query_command(&cli.server, session, &spec).await?;
        }
        Commands::Config { command } => {
            let manager = ConfigManager::new();
            match command {
                ConfigCommand::Show => print!("{}", manager.show()?),
                ConfigCommand::Path => println!("{}", manager.config_path().display()),
            }
        }
    }

    Ok(())
}

async fn query_command(overrides: &ServerOverrides, session: String, spec: &CommandSpec) -> Result<()> {
    let command = spec.to_command()?;
    // Reject before opening a socket
    command.encode()?;

    let mut config = ConfigManager::new()
        .load()
        .context("Failed to load configuration")?;
    overrides.apply(&mut config);

    let channel = UdpChannel::connect(&config.server, session)
        .await
        .with_context(|| {
            format!(
                "Failed to connect to {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let client = RegistryClient::from_config(Arc::new(channel), &config);

    match client.run(&command).await {
        Ok(response) => {
            println!("{}", commands::to_json(&response)?);
            Ok(())
        }
        Err(ProtocolError::Banned { channel, resume_at }) => {
            eprintln!(
                "{}",
                format!("Registry {channel} channel banned: communication suspended until {resume_at}")
                    .red()
            );
            std::process::exit(2);
        }
        Err(err) => {
            if let Some(advice) = describe_advice(&err) {
                eprintln!("{}", advice.yellow());
            }
            Err(err).context("Query failed")
        }
    }
}

fn describe_advice(err: &ProtocolError) -> Option<&'static str> {
    if err.requires_reauth() {
        Some("The session was rejected; authenticate again and retry")
    } else if err.is_transient() {
        Some("This failure is transient; the query may be retried")
    } else {
        None
    }
}
