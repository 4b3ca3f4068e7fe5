use brokenhub::{BridgeEngine, BridgeError, RandomSource, StartError, DEFAULT_CONFIG_PATH};
use clap::{CommandFactory, Parser};
use log::error;
use rand::SeedableRng;
use std::convert::Infallible;
use std::path::PathBuf;
use std::{io, process};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(
    name = "brokenhub",
    version,
    about = "Bridge two interfaces, dropping, corrupting, truncating and throttling what passes",
    after_help = "This command must be run as root",
)]
struct Cli {
    /// First interface to bridge
    interface_a: String,
    /// Second interface to bridge
    interface_b: String,
    /// Configuration file, re-read on SIGHUP
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Seed for the impairment random number generator
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Error)]
enum Fatal {
    #[error("failed to start runtime: {0}")]
    Runtime(io::Error),
    #[error(transparent)]
    Start(#[from] StartError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let res = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime.block_on(run(cli)),
        Err(err) => Err(Fatal::Runtime(err)),
    };
    let err = match res {
        Ok(never) => match never {},
        Err(err) => err,
    };
    if let Fatal::Start(ref start_err) = err {
        if start_err.is_permission_denied() {
            eprintln!("{}", start_err);
            eprintln!("{}", Cli::command().render_usage());
            eprintln!("This command must be run as root");
            process::exit(1);
        }
    }
    error!("{}", err);
    process::abort();
}

async fn run(cli: Cli) -> Result<Infallible, Fatal> {
    let rng = match cli.seed {
        Some(seed) => RandomSource::seed_from_u64(seed),
        None => RandomSource::default(),
    };
    let mut engine = BridgeEngine::open(&cli.interface_a, &cli.interface_b, cli.config, rng)?;
    engine.listen_for_hangup()?;
    let never = engine.run().await?;
    Ok(never)
}
