use crate::agents::TradingAgent;
use crate::amm::AmmEngine;
use crate::errors::{AmmError, AmmResult};
use crate::models::BlackScholes;
use crate::state::{OptionClass, Side, TradeIntent};

/// Compares AMM premia against fair value at the true volatility and takes
/// the single most favourable trade across both ladders.
///
/// Fair value comes from the pure pricing function at an explicit volatility,
/// so no second engine is needed for the counterfactual quote.
pub struct VolatilityTrader {
    name: String,
    quantity: f64,
    /// Minimum edge, in quote units, before trading
    edge_threshold: f64,
    pricing: BlackScholes,
}

impl VolatilityTrader {
    pub fn new(name: impl Into<String>, quantity: f64, edge_threshold: f64) -> AmmResult<Self> {
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(AmmError::InvalidArgument(format!("quantity must be positive, got {quantity}")));
        }
        Ok(Self {
            name: name.into(),
            quantity,
            edge_threshold,
            pricing: BlackScholes::new(),
        })
    }

    /// Edge of taking `side` at `strike`, in quote units. Positive is good for the trader.
    fn edge(&self, amm: &AmmEngine, class: OptionClass, strike: f64, side: Side, volatility: f64) -> Option<f64> {
        let view = amm.market_view();
        let fair = self.pricing.pool_premium(&view, class, strike, volatility).ok()? * self.quantity;
        let amm_premium = amm.get_premium(strike, class, side, self.quantity).ok()?;
        let edge = match side {
            Side::Long => fair - amm_premium,
            Side::Short => amm_premium - fair,
        };
        Some(match class {
            OptionClass::Call => edge * view.spot,
            OptionClass::Put => edge,
        })
    }
}

impl TradingAgent for VolatilityTrader {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&mut self, amm: &AmmEngine, true_volatility: f64) -> Option<TradeIntent> {
        if amm.time_to_maturity() <= 0.0 {
            return None;
        }

        let mut best: Option<(f64, TradeIntent)> = None;
        for class in OptionClass::ALL {
            for &strike in amm.strikes(class) {
                for side in [Side::Long, Side::Short] {
                    let Some(edge) = self.edge(amm, class, strike, side, true_volatility) else {
                        continue;
                    };
                    if edge > self.edge_threshold && best.map_or(true, |(e, _)| edge > e) {
                        best = Some((
                            edge,
                            TradeIntent {
                                class,
                                side,
                                strike,
                                quantity: self.quantity,
                            },
                        ));
                    }
                }
            }
        }

        if let Some((edge, intent)) = best {
            tracing::debug!(
                agent = %self.name,
                class = %intent.class,
                side = %intent.side,
                strike = intent.strike,
                edge,
                "volatility edge found"
            );
        }
        best.map(|(_, intent)| intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buys_when_amm_volatility_is_low() {
        let amm = AmmEngine::new(30.0, 1.0).unwrap();
        let mut t = VolatilityTrader::new("vol", 1.0, 0.0).unwrap();
        let intent = t.decide(&amm, 0.5).expect("should trade");
        assert_eq!(intent.side, Side::Long);
    }

    #[test]
    fn test_sells_when_amm_volatility_is_high() {
        let amm = AmmEngine::new(30.0, 1.0).unwrap();
        let mut t = VolatilityTrader::new("vol", 1.0, 0.0).unwrap();
        let intent = t.decide(&amm, 0.02).expect("should trade");
        assert_eq!(intent.side, Side::Short);
    }

    #[test]
    fn test_no_edge_at_fair_volatility() {
        // Fee and impact both work against the trader at the AMM's own volatility
        let amm = AmmEngine::new(30.0, 1.0).unwrap();
        let mut t = VolatilityTrader::new("vol", 1.0, 0.0).unwrap();
        assert!(t.decide(&amm, 0.1).is_none());
    }

    #[test]
    fn test_threshold_filters_small_edges() {
        let amm = AmmEngine::new(30.0, 1.0).unwrap();
        let mut t = VolatilityTrader::new("vol", 1.0, 1e6).unwrap();
        assert!(t.decide(&amm, 0.5).is_none());
    }

    #[test]
    fn test_intent_is_tradeable() {
        let mut amm = AmmEngine::new(30.0, 1.0).unwrap();
        let mut t = VolatilityTrader::new("vol", 1.0, 0.0).unwrap();
        let intent = t.decide(&amm, 0.5).unwrap();
        assert!(amm.trade_intent(&intent).is_ok());
    }
}
