use relay_history::InMemoryDataset;
use relay_runner::{BridgeConfig, run_backtest};
use relay_strategy::StrategyRegistry;
use std::sync::Arc;

fn print_help() {
    eprintln!(
        r#"Relay Backtest - replay historical bars into a strategy session

USAGE:
    relay-backtest [OPTIONS]

OPTIONS:
    --config <PATH>     Load configuration from JSON file
    --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG            Log level filter (default: info)

EXAMPLES:
    # Run with config file
    relay-backtest --config bridge.json

    # Verbose bus traffic
    RUST_LOG=debug relay-backtest --config bridge.json
"#
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
                config_path = Some(args[i].clone());
            }
            arg => {
                eprintln!("Unknown argument: {}", arg);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            log::info!("Loading configuration from: {}", path);
            BridgeConfig::from_file(&path)?
        }
        None => {
            log::info!("Using default configuration");
            BridgeConfig::default()
        }
    };

    let Some(dataset_path) = config.dataset_path.as_deref() else {
        eprintln!("Error: dataset_path is not set in the configuration");
        std::process::exit(1);
    };
    let dataset = InMemoryDataset::from_file(dataset_path)?;
    log::info!(
        "Strategy: {} on {} ({} bars back)",
        config.strategy.reference,
        config.strategy.symbol,
        config.strategy.bars_back
    );

    let registry = StrategyRegistry::with_builtins();
    let report = run_backtest(&config, Arc::new(dataset), &registry).await?;

    println!("{}", report);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        std::process::exit(2);
    }
    Ok(())
}
