use crate::errors::{AmmError, AmmResult};
use crate::state::{OptionClass, Side};

/// Volatility after a trade, constant-function style.
///
/// q       = quantity in the pool's native unit (puts: quantity * spot)
/// pool'   = pool_size - q
/// sigma'  = sigma / (1 - (±q / pool')^alpha)      (+ for long, - for short)
///
/// Users going long push volatility up, users going short pull it down.
/// Trades that leave no positive post-trade depth, or a non-positive
/// denominator, are rejected instead of producing a negative/infinite sigma.
pub fn impacted_volatility(
    class: OptionClass,
    side: Side,
    current_volatility: f64,
    pool_size: f64,
    quantity: f64,
    spot: f64,
    alpha: i32,
) -> AmmResult<f64> {
    let native = class.native_quantity(quantity, spot);
    let post_trade_pool = pool_size - native;

    let depth_exceeded = || AmmError::PoolDepthExceeded {
        class,
        quantity,
        pool_size,
    };

    if !(post_trade_pool > 0.0) {
        return Err(depth_exceeded());
    }

    let signed = match side {
        Side::Long => native,
        Side::Short => -native,
    };
    let denominator = 1.0 - (signed / post_trade_pool).powi(alpha);
    if !(denominator > 0.0) {
        return Err(depth_exceeded());
    }

    let new_volatility = current_volatility / denominator;
    if !new_volatility.is_finite() {
        return Err(depth_exceeded());
    }
    Ok(new_volatility)
}

/// Trades are priced at the midpoint of pre- and post-trade volatility.
#[inline]
pub fn trade_volatility(current_volatility: f64, impacted_volatility: f64) -> f64 {
    (current_volatility + impacted_volatility) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_call_raises_volatility() {
        let v = impacted_volatility(OptionClass::Call, Side::Long, 0.01, 100.0, 1.0, 100.0, 1).unwrap();
        assert!((v - 0.01 / (1.0 - 1.0 / 99.0)).abs() < 1e-15, "v={v}");
        assert!(v > 0.01);
    }

    #[test]
    fn test_short_put_lowers_volatility() {
        // Put quantity is converted with spot: 1 * 100 = 100 quote units
        let v = impacted_volatility(OptionClass::Put, Side::Short, 0.01, 10_000.0, 1.0, 100.0, 1).unwrap();
        assert!((v - 0.0099).abs() < 1e-12, "v={v}");
    }

    #[test]
    fn test_larger_trades_move_more() {
        let small = impacted_volatility(OptionClass::Call, Side::Long, 0.1, 100.0, 1.0, 1.0, 1).unwrap();
        let large = impacted_volatility(OptionClass::Call, Side::Long, 0.1, 100.0, 10.0, 1.0, 1).unwrap();
        assert!(large > small);
    }

    #[test]
    fn test_exhausted_depth_rejected() {
        // Post-trade pool is zero
        let r = impacted_volatility(OptionClass::Call, Side::Short, 0.1, 10.0, 10.0, 1.0, 1);
        assert!(matches!(r, Err(AmmError::PoolDepthExceeded { .. })));

        // Positive post-trade pool, but q / pool' >= 1 for a long
        let r = impacted_volatility(OptionClass::Call, Side::Long, 0.1, 10.0, 6.0, 1.0, 1);
        assert!(matches!(r, Err(AmmError::PoolDepthExceeded { .. })));
    }

    #[test]
    fn test_trade_volatility_is_midpoint() {
        assert_eq!(trade_volatility(0.1, 0.3), 0.2);
    }
}
