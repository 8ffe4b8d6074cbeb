use anyhow::Context;
use clap::Parser;
use flair_service::{BotState, FlairBot};
use flairbot_core::BotConfig;
use reddit_client::{PasswordTokenProvider, RedditApiClient, RequestExecutor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "flairbot=info,flair_service=info,reddit_client=info";

/// Keeps user flair in a subreddit in line with recent activity.
#[derive(Debug, Parser)]
#[command(name = "flairbot", version, about)]
struct Args {
    /// Bot configuration, TOML or JSON.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    let config = BotConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    info!("Starting flairbot for r/{}", config.subreddit);
    info!("Loaded configuration: {:?}", config);

    let executor = Arc::new(RequestExecutor::new(
        config.user_agent.clone(),
        config.request_timeout(),
    )?);
    let api = Arc::new(RedditApiClient::from_config(executor.clone(), &config)?);
    let tokens = Arc::new(PasswordTokenProvider::from_config(executor.clone(), &config)?);
    let bot = FlairBot::new(&config, api, tokens);

    let mut state = BotState::new();
    if args.once {
        bot.run_cycle(state, chrono::Utc::now()).await;
        return Ok(());
    }

    let started = Instant::now();
    let mut ticker = interval(config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Polling every {}s, press Ctrl-C to stop",
        config.poll_interval().as_secs()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state = bot.run_cycle(state, chrono::Utc::now()).await;
                let status = executor.get_rate_limit_status().await;
                info!(
                    "Uptime {}s after {} cycles ({:.0}% of request budget in use)",
                    started.elapsed().as_secs(),
                    state.cycles,
                    status.utilization_percentage()
                );
                if status.is_near_limit() {
                    warn!("Close to the Reddit request limit");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutting down after {} cycles", state.cycles);
                break;
            }
        }
    }

    Ok(())
}
