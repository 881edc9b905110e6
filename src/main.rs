use std::path::PathBuf;
use std::sync::Arc;

use battle_engine::server::{self, ServerConfig};
use battle_engine::sim::simulate;
use battle_engine::{init_logging, BattleListener, BattleSummary, GameConfig, SessionManager};
use clap::Parser;
use tokio::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    /// Serve battles to remote players over TCP.
    Serve {
        #[arg(long, default_value = "127.0.0.1:7878")]
        bind: String,
        #[arg(long, help = "JSON file with grid size, fleet and turn rules")]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 300)]
        idle_timeout_secs: u64,
        #[arg(long, help = "Forfeit a player's battle when their connection drops")]
        forfeit_on_disconnect: bool,
    },
    /// Play one battle between two automatic players and print the result.
    Simulate {
        #[arg(long, help = "Fix RNG seed for reproducible battles (e.g., --seed 12345)")]
        seed: Option<u64>,
        #[arg(long, help = "JSON file with grid size, fleet and turn rules")]
        config: Option<PathBuf>,
    },
}

struct LogResults;

impl BattleListener for LogResults {
    fn on_battle_end(&self, summary: &BattleSummary) {
        log::info!(
            "battle {} won by {} over {} ({:?}, {} shots)",
            summary.battle_id,
            summary.winner.id,
            summary.loser.id,
            summary.reason,
            summary.shots_fired
        );
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::from_json_file(path),
        None => Ok(GameConfig::classic()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            config,
            idle_timeout_secs,
            forfeit_on_disconnect,
        } => {
            let rules = load_config(config)?;
            let manager = Arc::new(SessionManager::new(rules)?);
            manager.add_listener(Arc::new(LogResults));
            let config = ServerConfig {
                bind,
                idle_timeout: Duration::from_secs(idle_timeout_secs.max(1)),
                forfeit_on_disconnect,
            };
            server::run(manager, config).await?;
        }
        Commands::Simulate { seed, config } => {
            let rules = load_config(config)?;
            let seed = seed.unwrap_or_else(rand::random);
            let report = simulate(rules, seed)?;
            println!("{}", serde_json::to_string(&report)?);
        }
    }
    Ok(())
}
