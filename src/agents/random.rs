use crate::agents::TradingAgent;
use crate::amm::AmmEngine;
use crate::errors::{AmmError, AmmResult};
use crate::state::{OptionClass, Side, TradeIntent};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Trades one contract with a fixed probability per epoch; class, side
/// and strike are picked uniformly.
pub struct RandomTrader {
    name: String,
    trade_probability: f64,
    call_strikes: Vec<f64>,
    put_strikes: Vec<f64>,
    rng: StdRng,
}

impl RandomTrader {
    pub fn new(
        name: impl Into<String>,
        trade_probability: f64,
        call_strikes: Vec<f64>,
        put_strikes: Vec<f64>,
        seed: u64,
    ) -> AmmResult<Self> {
        if !(0.0..=1.0).contains(&trade_probability) {
            return Err(AmmError::InvalidArgument(format!(
                "trade probability must be in [0, 1], got {trade_probability}"
            )));
        }
        if call_strikes.is_empty() || put_strikes.is_empty() {
            return Err(AmmError::InvalidArgument("random trader needs both strike ladders".into()));
        }
        Ok(Self {
            name: name.into(),
            trade_probability,
            call_strikes,
            put_strikes,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Draw the next intent, independent of market state.
    pub fn next_intent(&mut self) -> Option<TradeIntent> {
        if !self.rng.gen_bool(self.trade_probability) {
            return None;
        }

        let class = if self.rng.gen_bool(0.5) { OptionClass::Call } else { OptionClass::Put };
        let side = if self.rng.gen_bool(0.5) { Side::Long } else { Side::Short };
        let ladder = match class {
            OptionClass::Call => &self.call_strikes,
            OptionClass::Put => &self.put_strikes,
        };
        let strike = *ladder.choose(&mut self.rng)?;

        Some(TradeIntent {
            class,
            side,
            strike,
            quantity: 1.0,
        })
    }
}

impl TradingAgent for RandomTrader {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&mut self, _amm: &AmmEngine, _true_volatility: f64) -> Option<TradeIntent> {
        self.next_intent()
    }
}
