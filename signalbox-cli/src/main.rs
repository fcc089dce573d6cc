//! Signalbox CLI — check, run, and generate strategy scripts.
//!
//! Commands:
//! - `check` — parse and policy-validate a script without data
//! - `run` — full sandbox pipeline over a CSV dataset, prints signals
//! - `data tokens|timeframes|validate` — dataset introspection
//! - `generate` — ask the model for a script, optionally test it

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use signalbox_agent::client::ChatClient;
use signalbox_agent::codegen::CodeGenerator;
use signalbox_agent::config::AgentConfig;
use signalbox_agent::pipeline::generate_and_test;
use signalbox_agent::store::{StrategyRecord, StrategyStore};
use signalbox_core::data::{random_walk, validate_frame, MarketData};
use signalbox_core::domain::{Frame, SignalSeries};
use signalbox_core::fingerprint::{DatasetHash, ScriptHash, StrategyId};
use signalbox_core::sandbox::Sandbox;

#[derive(Parser)]
#[command(
    name = "signalbox",
    about = "Signalbox CLI — sandboxed trading-strategy scripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and policy-validate a script without running it.
    Check {
        /// Path to the script file.
        script: PathBuf,
    },
    /// Run a script against a dataset and print the signals.
    Run {
        /// Path to the script file.
        script: PathBuf,

        /// Path to the market data CSV.
        #[arg(long)]
        data: PathBuf,

        /// Instrument token, e.g. BTC.
        #[arg(long)]
        token: String,

        /// Timeframe label, e.g. 1d.
        #[arg(long)]
        timeframe: String,

        /// Write the signal series as JSON to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Dataset introspection commands.
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
    /// Generate a strategy script from a plain-language description.
    Generate {
        /// What the strategy should do.
        #[arg(long)]
        task: String,

        /// Test the generated script in the sandbox before printing it.
        #[arg(long, default_value_t = false)]
        test: bool,

        /// Market data CSV to test against (synthetic data if omitted).
        #[arg(long)]
        data: Option<PathBuf>,

        /// Instrument token (required with --data).
        #[arg(long)]
        token: Option<String>,

        /// Timeframe label (required with --data).
        #[arg(long)]
        timeframe: Option<String>,

        /// Agent config TOML. Defaults apply when missing.
        #[arg(long, default_value = "signalbox.toml")]
        config: PathBuf,

        /// Save accepted strategies into this store directory.
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DataAction {
    /// List the tokens in a dataset.
    Tokens {
        #[arg(long)]
        data: PathBuf,
    },
    /// List the timeframes available for one token.
    Timeframes {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        token: String,
    },
    /// Run quality checks over one (token, timeframe) frame.
    Validate {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        token: String,

        #[arg(long)]
        timeframe: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check { script } => run_check(&script),
        Commands::Run {
            script,
            data,
            token,
            timeframe,
            out,
        } => run_script(&script, &data, &token, &timeframe, out),
        Commands::Data { action } => match action {
            DataAction::Tokens { data } => {
                for token in MarketData::load_csv(&data)?.tokens() {
                    println!("{token}");
                }
                Ok(())
            }
            DataAction::Timeframes { data, token } => {
                for tf in MarketData::load_csv(&data)?.timeframes(&token) {
                    println!("{tf}");
                }
                Ok(())
            }
            DataAction::Validate {
                data,
                token,
                timeframe,
            } => run_validate(&data, &token, &timeframe),
        },
        Commands::Generate {
            task,
            test,
            data,
            token,
            timeframe,
            config,
            store_dir,
        } => run_generate(&task, test, data, token, timeframe, &config, store_dir),
    }
}

fn load_frame(data: &PathBuf, token: &str, timeframe: &str) -> Result<Frame> {
    let catalog = MarketData::load_csv(data)
        .with_context(|| format!("loading {}", data.display()))?;
    Ok(catalog.frame(token, timeframe)?)
}

fn run_check(script: &PathBuf) -> Result<()> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("reading {}", script.display()))?;
    match Sandbox::new().check(&source) {
        Ok(stmts) => {
            println!("ok: {} statements", stmts.len());
            Ok(())
        }
        Err(err) => {
            eprintln!("rejected at stage '{}': {err}", err.stage());
            std::process::exit(1);
        }
    }
}

fn run_script(
    script: &PathBuf,
    data: &PathBuf,
    token: &str,
    timeframe: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("reading {}", script.display()))?;
    let frame = load_frame(data, token, timeframe)?;
    let signals = match Sandbox::new().run_strategy(&source, &frame) {
        Ok(signals) => signals,
        Err(err) => {
            eprintln!("rejected at stage '{}': {err}", err.stage());
            std::process::exit(1);
        }
    };
    print_signals(&signals);
    if let Some(out) = out {
        fs::write(&out, serde_json::to_string_pretty(&signals)?)?;
        println!("wrote {}", out.display());
    }
    Ok(())
}

fn run_validate(data: &PathBuf, token: &str, timeframe: &str) -> Result<()> {
    let frame = load_frame(data, token, timeframe)?;
    let report = validate_frame(&frame);
    println!("{} rows", report.rows);
    if report.is_clean() {
        println!("clean");
        Ok(())
    } else {
        for issue in &report.issues {
            eprintln!("{issue:?}");
        }
        std::process::exit(1);
    }
}

fn run_generate(
    task: &str,
    test: bool,
    data: Option<PathBuf>,
    token: Option<String>,
    timeframe: Option<String>,
    config_path: &PathBuf,
    store_dir: Option<PathBuf>,
) -> Result<()> {
    let config = AgentConfig::load_or_default(config_path)?;
    let api_key = config.api_key()?;
    let client = ChatClient::new(config.clone(), api_key)?;
    let mut generator = CodeGenerator::new(client, config.session_window);

    if !test {
        let code = generator.generate(task)?;
        println!("{code}");
        return Ok(());
    }

    let frame = match (&data, &token, &timeframe) {
        (Some(data), Some(token), Some(timeframe)) => load_frame(data, token, timeframe)?,
        (None, None, None) => random_walk(42, 250, 100.0),
        _ => bail!("--data, --token, and --timeframe must be given together"),
    };

    let sandbox = Sandbox::new();
    let tested = generate_and_test(
        &mut generator,
        &sandbox,
        task,
        &frame,
        config.max_fix_attempts,
    )?;
    println!("{}", tested.code);
    let (buys, holds, sells) = tested.signals.counts();
    println!("accepted after {} attempt(s): {buys} buy / {holds} hold / {sells} sell", tested.attempts);

    if let Some(dir) = store_dir {
        let store = StrategyStore::open(dir)?;
        let record = StrategyRecord {
            id: StrategyId::new(
                ScriptHash::from_source(&tested.code),
                DatasetHash::from_frame(&frame),
            ),
            name: task.chars().take(40).collect(),
            description: task.to_string(),
            code: tested.code.clone(),
            created_at: chrono::Local::now().naive_local(),
            signal_counts: tested.signals.counts(),
        };
        let path = store.save(&record)?;
        println!("saved {}", path.display());
    }
    Ok(())
}

fn print_signals(signals: &SignalSeries) {
    for (ts, value) in signals.iter() {
        let label = match value {
            1 => "buy",
            -1 => "sell",
            _ => "hold",
        };
        println!("{ts}  {value:>2}  {label}");
    }
    let (buys, holds, sells) = signals.counts();
    println!("{} rows: {buys} buy / {holds} hold / {sells} sell", signals.len());
}
