use crate::errors::{AmmError, AmmResult};
use crate::state::{MarketView, OptionClass};
use statrs::distribution::{ContinuousCDF, Normal};

/// Inputs to the closed-form premium, with the shared terms precomputed.
/// Time and volatility are in the same period unit as the simulation epochs.
#[derive(Debug, Clone, Copy)]
pub struct PricingInputs {
    pub volatility: f64,
    pub spot: f64,
    pub strike: f64,
    pub rate: f64,
    pub time_to_maturity: f64,
    // Precomputed
    pub ln_s_k: f64,
    pub sigma_sqrt_t: f64,
    pub discount: f64,
}

impl PricingInputs {
    /// Rejects inputs for which d1 is undefined (zero volatility or time,
    /// non-positive spot or strike).
    pub fn new(
        volatility: f64,
        spot: f64,
        strike: f64,
        rate: f64,
        time_to_maturity: f64,
    ) -> AmmResult<Self> {
        for (name, value) in [
            ("volatility", volatility),
            ("spot", spot),
            ("strike", strike),
            ("time to maturity", time_to_maturity),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(AmmError::InvalidArgument(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if !rate.is_finite() {
            return Err(AmmError::InvalidArgument(format!("rate must be finite, got {rate}")));
        }

        Ok(Self {
            volatility,
            spot,
            strike,
            rate,
            time_to_maturity,
            ln_s_k: (spot / strike).ln(),
            sigma_sqrt_t: volatility * time_to_maturity.sqrt(),
            discount: (-rate * time_to_maturity).exp(),
        })
    }
}

/// Call and put premia for the same strike, both in quote units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OptionPremia {
    pub call: f64,
    pub put: f64,
}

/// European Black-Scholes pricing.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
/// C  = Phi(d1)*S - Phi(d2)*K*e^(-rT)
/// P  = K*e^(-rT) - S + C
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    /// Pure function of the inputs. The put leg comes from put-call parity.
    #[inline]
    pub fn premia(&self, inputs: &PricingInputs) -> OptionPremia {
        let d1 = (inputs.ln_s_k
            + (inputs.rate + 0.5 * inputs.volatility * inputs.volatility) * inputs.time_to_maturity)
            / inputs.sigma_sqrt_t;
        let d2 = d1 - inputs.sigma_sqrt_t;

        let discounted_strike = inputs.strike * inputs.discount;
        let call = self.normal.cdf(d1) * inputs.spot - self.normal.cdf(d2) * discounted_strike;
        let put = discounted_strike - inputs.spot + call;

        OptionPremia { call, put }
    }

    /// Per-contract premium in the pool's native unit at an explicit volatility.
    /// Calls are paid in base units, so the quote-unit premium is divided by spot.
    pub fn pool_premium(
        &self,
        view: &MarketView,
        class: OptionClass,
        strike: f64,
        volatility: f64,
    ) -> AmmResult<f64> {
        let inputs = PricingInputs::new(
            volatility,
            view.spot,
            strike,
            view.risk_free_rate,
            view.time_to_maturity,
        )?;
        let premia = self.premia(&inputs);
        Ok(match class {
            OptionClass::Call => premia.call / view.spot,
            OptionClass::Put => premia.put,
        })
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper for one-off pricing.
pub fn black_scholes(vol: f64, s: f64, k: f64, r: f64, t: f64) -> AmmResult<OptionPremia> {
    let inputs = PricingInputs::new(vol, s, k, r, t)?;
    Ok(BlackScholes::new().premia(&inputs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel_close(a: f64, b: f64, tol: f64) -> bool {
        ((a - b) / b).abs() < tol
    }

    #[test]
    fn test_reference_values() {
        let cases = [
            (0.2, 100.0, 100.0, 0.2, 0.128767, 4.277304453686696, 1.7348434806567639),
            (0.2, 100.0, 100.0, 0.2, 0.257534, 6.95278811264042, 1.932507244574353),
        ];
        for (vol, s, k, r, t, call, put) in cases {
            let p = black_scholes(vol, s, k, r, t).unwrap();
            assert!(rel_close(p.call, call, 1e-6), "call={} expected {call}", p.call);
            assert!(rel_close(p.put, put, 1e-6), "put={} expected {put}", p.put);
        }
    }

    #[test]
    fn test_put_call_parity() {
        let model = BlackScholes::new();
        for (vol, s, k, r, t) in [
            (0.1, 1.0, 0.9, 0.0, 30.0),
            (0.35, 120.0, 100.0, 0.05, 0.5),
            (0.01, 100.0, 90.0, 0.0, 100.0),
            (0.8, 0.4, 1.1, 0.02, 3.0),
        ] {
            let inputs = PricingInputs::new(vol, s, k, r, t).unwrap();
            let p = model.premia(&inputs);
            let parity = p.call + k * (-r * t).exp() - s;
            assert!((p.put - parity).abs() < 1e-12, "parity broken: {} vs {parity}", p.put);
        }
    }

    #[test]
    fn test_premium_increases_with_volatility() {
        let model = BlackScholes::new();
        let mut prev_call = 0.0;
        let mut prev_put = 0.0;
        for i in 1..=40 {
            let vol = i as f64 * 0.025;
            let p = model.premia(&PricingInputs::new(vol, 1.0, 1.2, 0.0, 4.0).unwrap());
            assert!(p.call > prev_call, "call not increasing at vol={vol}");
            assert!(p.put > prev_put, "put not increasing at vol={vol}");
            prev_call = p.call;
            prev_put = p.put;
        }
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        assert!(black_scholes(0.0, 100.0, 100.0, 0.0, 1.0).is_err());
        assert!(black_scholes(0.2, 100.0, 100.0, 0.0, 0.0).is_err());
        assert!(black_scholes(0.2, 0.0, 100.0, 0.0, 1.0).is_err());
        assert!(black_scholes(0.2, 100.0, -1.0, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_call_pool_premium_in_base_units() {
        let model = BlackScholes::new();
        let view = MarketView { spot: 100.0, time_to_maturity: 0.128767, risk_free_rate: 0.2 };
        let call = model.pool_premium(&view, OptionClass::Call, 100.0, 0.2).unwrap();
        let put = model.pool_premium(&view, OptionClass::Put, 100.0, 0.2).unwrap();
        assert!(rel_close(call, 0.04277304453686696, 1e-6), "call={call}");
        assert!(rel_close(put, 1.7348434806567639, 1e-6), "put={put}");
    }
}
