//! kiwicast
//!
//! Watches the live chat of a YouTube broadcast and turns `!` commands into
//! OBS scene switches, stream stops and KiwiSDR receiver changes.
//!
//! # Usage
//!
//! ```bash
//! kiwicast --config config/config.json --secrets config/secrets.json
//! kiwicast --broadcast 1 --log-level debug
//! kiwicast --live-chat-id Cg0KC2FiY2RlZmdoaWpr
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use kiwicast_runtime::config::{DEFAULT_CONFIG_PATH, DEFAULT_SECRETS_PATH, LogLevel};
use kiwicast_runtime::{KiwicastRuntime, LiveBroadcast, Secrets};
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file (re-read by `!reload`).
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Secrets file; created interactively when missing.
    #[arg(long, default_value = DEFAULT_SECRETS_PATH)]
    secrets: PathBuf,

    /// Live chat to follow, skipping the broadcast listing.
    #[arg(long, conflicts_with = "broadcast")]
    live_chat_id: Option<String>,

    /// Pick the N-th active broadcast (1-based) instead of prompting.
    #[arg(long, value_name = "N")]
    broadcast: Option<usize>,

    /// Overrides the configured log level.
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = KiwicastRuntime::builder()
        .config_file(&cli.config)
        .secrets_file(&cli.secrets);
    if let Some(level) = cli.log_level {
        builder = builder.log_level(level);
    }
    if !cli.secrets.exists() {
        builder = builder.secrets(create_secrets(&cli.secrets)?);
    }

    let mut runtime = builder.build().context("failed to start kiwicast")?;
    runtime.connect().await.context("failed to connect")?;

    let chat_id = match cli.live_chat_id {
        Some(id) => id,
        None => {
            let broadcasts = runtime
                .active_broadcasts()
                .await
                .context("failed to list active broadcasts")?;
            choose_broadcast(broadcasts, cli.broadcast)?.live_chat_id
        }
    };

    runtime.run(&chat_id).await?;
    Ok(())
}

// ============================================================================
// Interactive Setup
// ============================================================================

/// Prompts for the OBS password and writes a new secrets file.
fn create_secrets(path: &Path) -> Result<Secrets> {
    println!("No secrets file found at {}.", path.display());
    let password = prompt("OBS WebSocket password (leave empty if disabled): ")?;

    let secrets = Secrets::with_obs_password(password);
    secrets
        .save_to_file(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Saved {}. Add youtube_access_token or youtube_api_key before the next run.",
        path.display()
    );
    Ok(secrets)
}

/// Picks the broadcast to follow, prompting when `index` is not given.
fn choose_broadcast(broadcasts: Vec<LiveBroadcast>, index: Option<usize>) -> Result<LiveBroadcast> {
    if broadcasts.is_empty() {
        bail!("no active broadcasts found");
    }

    let index = match index {
        Some(index) => index,
        None => {
            println!("Active broadcasts:");
            for (i, broadcast) in broadcasts.iter().enumerate() {
                println!("  {}. {} ({})", i + 1, broadcast.title, broadcast.id);
            }
            prompt("Broadcast number: ")?
                .parse()
                .context("not a number")?
        }
    };

    let broadcast = index
        .checked_sub(1)
        .and_then(|i| broadcasts.into_iter().nth(i))
        .with_context(|| format!("no broadcast number {index}"))?;
    info!(broadcast = %broadcast.id, title = %broadcast.title, "Selected broadcast");
    Ok(broadcast)
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcasts() -> Vec<LiveBroadcast> {
        ["one", "two"]
            .into_iter()
            .map(|id| LiveBroadcast {
                id: id.to_string(),
                title: format!("Broadcast {id}"),
                live_chat_id: format!("chat-{id}"),
            })
            .collect()
    }

    #[test]
    fn test_choose_broadcast_by_index() {
        let chosen = choose_broadcast(broadcasts(), Some(2)).unwrap();
        assert_eq!(chosen.live_chat_id, "chat-two");
    }

    #[test]
    fn test_choose_broadcast_out_of_range() {
        assert!(choose_broadcast(broadcasts(), Some(0)).is_err());
        assert!(choose_broadcast(broadcasts(), Some(3)).is_err());
    }

    #[test]
    fn test_choose_broadcast_none_active() {
        assert!(choose_broadcast(Vec::new(), Some(1)).is_err());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["kiwicast", "--broadcast", "2", "--log-level", "debug"]);
        assert_eq!(cli.broadcast, Some(2));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));

        assert!(Cli::try_parse_from(["kiwicast", "--broadcast", "1", "--live-chat-id", "x"]).is_err());
    }
}
