use crate::amm::AmmConfig;
use crate::errors::{AmmError, AmmResult};
use crate::feeds::price_path::PricePathParams;
use crate::paper::simulator::SimulationParams;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub amm: AmmConfig,
    pub path: PricePathParams,
    pub simulation: SimulationParams,
    pub seed: u64,
    pub random_traders: usize,
    pub trade_probability: f64,
    pub volatility_traders: usize,
    pub edge_threshold: f64,
}

impl AppConfig {
    pub fn from_env() -> AmmResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = AmmConfig::default();
        let amm = AmmConfig {
            fee: parse_env("AMM_FEE", defaults.fee)?,
            alpha: parse_env("AMM_ALPHA", defaults.alpha)?,
            call_volatility: parse_env("AMM_CALL_VOLATILITY", defaults.call_volatility)?,
            put_volatility: parse_env("AMM_PUT_VOLATILITY", defaults.put_volatility)?,
            call_pool_size: parse_env("AMM_CALL_POOL", defaults.call_pool_size)?,
            put_pool_size: parse_env("AMM_PUT_POOL", defaults.put_pool_size)?,
            ..defaults
        };
        amm.validate()?;

        let path_defaults = PricePathParams::default();
        let path = PricePathParams {
            alpha: parse_env("PATH_ALPHA", path_defaults.alpha)?,
            beta: parse_env("PATH_BETA", path_defaults.beta)?,
            gamma: parse_env("PATH_GAMMA", path_defaults.gamma)?,
            series_len: parse_env("SIM_SERIES_LEN", 1000)?,
            error_var: parse_env("PATH_ERROR_VAR", path_defaults.error_var)?,
            initial_sigma: parse_env("PATH_INITIAL_SIGMA", path_defaults.initial_sigma)?,
            initial_price: parse_env("PATH_INITIAL_PRICE", path_defaults.initial_price)?,
            ..path_defaults
        };
        path.validate()
            .map_err(|e| AmmError::Config(format!("price path: {e}")))?;

        let trade_probability = parse_env("SIM_TRADE_PROBABILITY", 0.3)?;
        if !(0.0..=1.0).contains(&trade_probability) {
            return Err(AmmError::Config(format!(
                "SIM_TRADE_PROBABILITY: {trade_probability} not in [0, 1]"
            )));
        }

        Ok(Self {
            amm,
            path,
            simulation: SimulationParams {
                epochs_per_maturity: parse_env("SIM_EPOCHS_PER_MATURITY", 30)?,
            },
            seed: parse_env("SIM_SEED", 42)?,
            random_traders: parse_env("SIM_RANDOM_TRADERS", 5)?,
            trade_probability,
            volatility_traders: parse_env("SIM_VOLATILITY_TRADERS", 1)?,
            edge_threshold: parse_env("SIM_EDGE_THRESHOLD", 0.0)?,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> AmmResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> AmmResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| AmmError::Config(format!("{key}: {e}")))
}
