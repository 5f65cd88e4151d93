pub mod random;
pub mod volatility_trader;

pub use random::RandomTrader;
pub use volatility_trader::VolatilityTrader;

use crate::amm::AmmEngine;
use crate::state::TradeIntent;

/// Produces at most one trade request per epoch.
///
/// Agents only read the engine; the driver executes whatever they return.
pub trait TradingAgent {
    fn name(&self) -> &str;

    /// `true_volatility` is the generator's volatility for the current epoch.
    fn decide(&mut self, amm: &AmmEngine, true_volatility: f64) -> Option<TradeIntent>;
}
