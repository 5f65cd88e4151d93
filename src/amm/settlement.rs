use crate::amm::engine::{check_price, AmmEngine};
use crate::errors::{AmmError, AmmResult};
use crate::state::{OptionClass, Side};

/// Settlement outcome for one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ClassSettlement {
    pub positions_settled: usize,
    /// Change in pool size during settlement, native unit
    pub pool_delta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SettlementReport {
    pub settlement_price: f64,
    pub call: ClassSettlement,
    pub put: ClassSettlement,
}

impl AmmEngine {
    /// Enter the settlement epoch: time to maturity becomes 0 at `final_price`.
    /// This is the only way to reach 0; quoting and trading stop until `clear`.
    pub fn expire(&mut self, final_price: f64) -> AmmResult<()> {
        check_price(final_price)?;
        self.time_to_maturity = 0.0;
        self.underlying_price = final_price;
        tracing::info!(settlement_price = final_price, "options expired");
        Ok(())
    }

    /// Exercise every AMM-held position at the current spot and empty both inventories.
    ///
    /// Pool long:  receives quantity * intrinsic value.
    /// Pool short: keeps the locked collateral minus quantity * intrinsic value.
    /// Call values are in base units ((S - K) / S), put values in quote units (K - S).
    pub fn clear(&mut self) -> AmmResult<SettlementReport> {
        if self.time_to_maturity != 0.0 {
            return Err(AmmError::InvalidArgument(format!(
                "cannot settle with {} periods to maturity",
                self.time_to_maturity
            )));
        }

        let spot = self.underlying_price;
        let call = self.settle_class(OptionClass::Call, spot)?;
        let put = self.settle_class(OptionClass::Put, spot)?;

        tracing::info!(
            settlement_price = spot,
            calls_settled = call.positions_settled,
            call_pool_delta = call.pool_delta,
            puts_settled = put.positions_settled,
            put_pool_delta = put.pool_delta,
            "settlement complete"
        );

        Ok(SettlementReport {
            settlement_price: spot,
            call,
            put,
        })
    }

    fn settle_class(&mut self, class: OptionClass, spot: f64) -> AmmResult<ClassSettlement> {
        let pool = self.pool_mut(class);
        let size_before = pool.size;
        let mut settled = 0;

        for id in pool.inventory.ids() {
            let position = pool.inventory.remove(id)?;
            let payoff = position.quantity() * class.intrinsic_value(spot, position.strike());
            pool.size += match position.side() {
                Side::Long => payoff,
                Side::Short => position.locked_collateral() - payoff,
            };
            settled += 1;
        }

        if !pool.inventory.is_empty() {
            return Err(AmmError::InternalConsistency(format!(
                "{class} inventory not empty after settlement"
            )));
        }

        Ok(ClassSettlement {
            positions_settled: settled,
            pool_delta: pool.size - size_before,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::amm::engine::{AmmConfig, AmmEngine};
    use crate::errors::AmmError;
    use crate::state::{OptionClass, Position, Side};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn seeded(positions: &[(f64, OptionClass, Side, f64, f64)]) -> AmmEngine {
        let mut amm = AmmEngine::new(10.0, 1.0).unwrap();
        for &(strike, class, side, locked, qty) in positions {
            amm.seed_inventory(Position::new(strike, class, side, locked, qty).unwrap())
                .unwrap();
        }
        amm
    }

    #[test]
    fn test_clear_requires_expiry() {
        let mut amm = AmmEngine::new(10.0, 1.0).unwrap();
        assert!(matches!(amm.clear(), Err(AmmError::InvalidArgument(_))));
        amm.expire(1.0).unwrap();
        assert!(amm.clear().is_ok());
    }

    #[test]
    fn test_expire_is_the_only_path_to_zero() {
        let mut amm = AmmEngine::new(10.0, 1.0).unwrap();
        assert!(amm.advance_epoch(0.0, 1.0).is_err());
        assert!(amm.expire(0.0).is_err());
        amm.expire(1.2).unwrap();
        assert_eq!(amm.time_to_maturity(), 0.0);
        assert_eq!(amm.underlying_price(), 1.2);
    }

    #[test]
    fn test_no_trading_after_expiry() {
        let mut amm = AmmEngine::new(10.0, 1.0).unwrap();
        amm.expire(1.0).unwrap();
        let before = amm.snapshot();
        let r = amm.trade(1.0, OptionClass::Call, Side::Long, 1.0);
        assert!(matches!(r, Err(AmmError::InvalidArgument(_))));
        assert!(amm.get_premium(1.0, OptionClass::Call, Side::Long, 1.0).is_err());
        assert_eq!(amm.snapshot(), before);
    }

    #[test]
    fn test_call_settlement() {
        let mut amm = seeded(&[
            (1.0, OptionClass::Call, Side::Long, 0.0, 2.0),
            (1.0, OptionClass::Call, Side::Short, 3.0, 3.0),
            (1.5, OptionClass::Call, Side::Long, 0.0, 1.0),
            (1.5, OptionClass::Call, Side::Short, 1.0, 1.0),
        ]);
        amm.expire(1.25).unwrap();
        let report = amm.clear().unwrap();

        // ITM at 1.0: intrinsic (1.25 - 1.0) / 1.25 = 0.2 base units per contract
        // long: +2 * 0.2, short: +3 - 3 * 0.2; OTM at 1.5: long +0, short keeps 1
        let expected = 0.4 + (3.0 - 0.6) + 0.0 + 1.0;
        assert!(close(report.call.pool_delta, expected), "delta={}", report.call.pool_delta);
        assert_eq!(report.call.positions_settled, 4);
        assert!(close(amm.call_pool_size(), 100.0 + expected));
        assert!(amm.inventory(OptionClass::Call).is_empty());
    }

    #[test]
    fn test_put_settlement() {
        let mut amm = seeded(&[
            (0.8, OptionClass::Put, Side::Long, 0.0, 2.0),
            (0.8, OptionClass::Put, Side::Short, 1.6, 2.0),
            (0.5, OptionClass::Put, Side::Long, 0.0, 1.0),
            (0.5, OptionClass::Put, Side::Short, 0.5, 1.0),
        ]);
        amm.expire(0.6).unwrap();
        let report = amm.clear().unwrap();

        // ITM at 0.8: 0.2 quote units per contract; OTM at 0.5
        let expected = 2.0 * 0.2 + (1.6 - 2.0 * 0.2) + 0.0 + 0.5;
        assert!(close(report.put.pool_delta, expected), "delta={}", report.put.pool_delta);
        assert_eq!(report.put.positions_settled, 4);
        assert_eq!(report.call.positions_settled, 0);
        assert!(amm.inventory(OptionClass::Put).is_empty());
    }

    #[test]
    fn test_offsetting_book_returns_collateral_only() {
        for spot in [0.5, 1.0, 1.2, 3.0] {
            let mut amm = seeded(&[
                (1.1, OptionClass::Call, Side::Long, 0.0, 4.0),
                (1.1, OptionClass::Call, Side::Short, 4.0, 4.0),
                (0.9, OptionClass::Put, Side::Long, 0.0, 4.0),
                (0.9, OptionClass::Put, Side::Short, 3.6, 4.0),
            ]);
            amm.expire(spot).unwrap();
            let report = amm.clear().unwrap();
            assert!(close(report.call.pool_delta, 4.0), "spot={spot}: {}", report.call.pool_delta);
            assert!(close(report.put.pool_delta, 3.6), "spot={spot}: {}", report.put.pool_delta);
        }
    }

    #[test]
    fn test_round_trip_nets_fee_intake() {
        let mut amm = AmmEngine::new(10.0, 1.0).unwrap();
        let start = amm.call_pool_size();
        let long = amm.trade(1.1, OptionClass::Call, Side::Long, 2.0).unwrap();
        let short = amm.trade(1.1, OptionClass::Call, Side::Short, 2.0).unwrap();
        assert!(amm.inventory(OptionClass::Call).is_empty());

        amm.expire(1.4).unwrap();
        let report = amm.clear().unwrap();
        assert_eq!(report.call.pool_delta, 0.0);
        assert!((amm.call_pool_size() - (start + long.premium - short.premium)).abs() < 1e-12);
        assert!(amm.call_pool_size() > start, "spread should leave the pool ahead");
        assert!(amm.fees_collected(OptionClass::Call) > 0.0);
    }

    #[test]
    fn test_new_cycle_after_clear() {
        let config = AmmConfig::default();
        let mut amm = AmmEngine::with_config(config, 2.0, 1.0).unwrap();
        amm.trade(1.0, OptionClass::Call, Side::Long, 1.0).unwrap();
        amm.expire(1.1).unwrap();
        amm.clear().unwrap();

        let vol = amm.call_volatility();
        amm.advance_epoch(2.0, 1.1).unwrap();
        assert_eq!(amm.call_volatility(), vol, "volatility survives the roll");
        assert!(amm.trade(1.1, OptionClass::Call, Side::Long, 1.0).is_ok());
    }
}
