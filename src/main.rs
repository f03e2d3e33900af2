use std::path::PathBuf;

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dqn_trader::config::{AgentConfig, DqnConfig, EnvConfig, TrainingConfig};
use dqn_trader::error::Result;
use dqn_trader::training::{
    evaluate_agent, summarize_results, timestamped_name, train_agent, Checkpointer,
};
use dqn_trader::{load_dataset, DqnAgent, QNetworkConfig};

type TrainBackend = Autodiff<NdArray<f32>>;

/// Train a DQN trading agent on daily OHLCV history and evaluate it
/// greedily on the held-out split.
#[derive(Parser, Debug)]
#[command(name = "dqn-trader", version, about)]
struct Cli {
    /// Directory holding one <TICKER>.csv per ticker
    #[arg(long, env = "DATA_DIR", default_value = "yahoo_data")]
    data_dir: PathBuf,

    /// Combined CSV with a ticker column; takes precedence when it exists
    #[arg(long, env = "DATA_FILE", default_value = "stock_details_5_years_cleaned.csv")]
    data_file: PathBuf,

    /// Tickers to load in per-file mode
    #[arg(long, value_delimiter = ',', default_value = "AAPL,MSFT,GOOGL,AMZN,NVDA")]
    tickers: Vec<String>,

    /// Number of training episodes
    #[arg(long, env = "MAX_EPISODES", default_value_t = 150)]
    episodes: usize,

    /// Step cap per episode
    #[arg(long, env = "MAX_STEPS_PER_EPISODE", default_value_t = 1_000)]
    max_steps: usize,

    /// Lookback window length
    #[arg(long, default_value_t = 30)]
    window_size: usize,

    /// Starting cash per episode
    #[arg(long, default_value_t = 10_000.0)]
    start_cash: f64,

    /// Proportional transaction cost per leg
    #[arg(long, default_value_t = 0.001)]
    transaction_cost: f64,

    /// Directory for model checkpoints
    #[arg(long, default_value = "./checkpoints")]
    checkpoint_dir: PathBuf,

    /// Resume from the most recent checkpoint in the checkpoint directory
    #[arg(long)]
    resume: bool,

    /// Skip evaluation on the held-out split
    #[arg(long)]
    no_eval: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = DqnConfig {
        env: EnvConfig {
            window_size: cli.window_size,
            start_cash: cli.start_cash,
            transaction_cost: cli.transaction_cost,
        },
        agent: AgentConfig::default(),
        training: TrainingConfig {
            max_episodes: cli.episodes,
            max_steps_per_episode: cli.max_steps,
            checkpoint_dir: cli.checkpoint_dir.to_string_lossy().into_owned(),
            ..Default::default()
        },
    };

    let dataset = load_dataset(
        &cli.data_dir,
        &cli.data_file,
        &cli.tickers,
        config.training.train_ratio,
    )?;
    info!(
        "Loaded {} tickers: {:?}",
        dataset.len(),
        dataset.iter().map(|t| t.ticker.as_str()).collect::<Vec<_>>()
    );

    let device = NdArrayDevice::default();
    let mut agent = DqnAgent::<TrainBackend>::new(
        config.env.observation_dim(),
        config.agent.clone(),
        device,
    );

    let checkpointer = Checkpointer::new(&config.training.checkpoint_dir, 5);
    if cli.resume {
        match checkpointer.latest_checkpoint() {
            Some(name) => {
                info!("Resuming from checkpoint {}", name);
                let network = checkpointer.load::<TrainBackend>(
                    &QNetworkConfig::new(config.env.observation_dim()),
                    &name,
                    &device,
                )?;
                agent.load_network(network);
            }
            None => info!(
                "No checkpoint found in {}; starting fresh",
                config.training.checkpoint_dir
            ),
        }
    }

    let results = train_agent(&mut agent, &dataset, &config)?;
    let summary = summarize_results(&results);
    info!(
        "Training complete: {} episodes, avg reward {:.2}, best {:.2}",
        summary.num_episodes, summary.avg_reward, summary.best_reward
    );

    checkpointer.save(agent.network(), &timestamped_name("dqn"))?;

    if !cli.no_eval {
        let evaluation = evaluate_agent(&agent, &dataset, &config)?;
        info!(
            "Evaluation: average net worth {:.2}",
            evaluation.avg_net_worth
        );
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dqn_trader=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
