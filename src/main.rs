use options_amm::agents::{RandomTrader, TradingAgent, VolatilityTrader};
use options_amm::errors::AmmResult;
use options_amm::feeds::price_path;
use options_amm::{config, paper};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("options_amm simulation starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    match run(cfg) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!("report serialization error: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!(error = %e, recoverable = e.is_recoverable(), "simulation failed");
            std::process::exit(1);
        }
    }
}

fn run(cfg: config::AppConfig) -> AmmResult<paper::tracker::SimulationReport> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let path = price_path::generate(&cfg.path, &mut rng)?;

    let mut agents: Vec<Box<dyn TradingAgent>> = Vec::new();
    for i in 0..cfg.random_traders {
        agents.push(Box::new(RandomTrader::new(
            format!("random-{i}"),
            cfg.trade_probability,
            cfg.amm.call_strikes.clone(),
            cfg.amm.put_strikes.clone(),
            cfg.seed.wrapping_add(1 + i as u64),
        )?));
    }
    for i in 0..cfg.volatility_traders {
        agents.push(Box::new(VolatilityTrader::new(
            format!("volatility-{i}"),
            1.0,
            cfg.edge_threshold,
        )?));
    }

    let report = paper::simulator::run(cfg.amm, &path, &mut agents, cfg.simulation)?;

    tracing::info!(
        cycles = report.cycles.len(),
        fills = report.total_fills,
        rejections = report.total_rejections,
        call_pool = report.last.call_pool_size,
        put_pool = report.last.put_pool_size,
        call_fees = report.call_fees_collected,
        put_fees = report.put_fees_collected,
        "simulation finished"
    );
    Ok(report)
}
