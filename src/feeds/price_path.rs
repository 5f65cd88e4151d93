use crate::errors::{AmmError, AmmResult};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Parameters of the synthetic price process.
///
/// price_t = (1 + r_t) * price_{t-1}
/// r_t     = alpha * r_{t-1} + beta * r_{t-2} + eps_t,   eps_t ~ N(epsilon_mean, sigma_t)
/// sigma_t = gamma * sigma_{t-1} + e_t,                  e_t ~ U[0, error_var)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PricePathParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub series_len: usize,
    pub epsilon_mean: f64,
    pub error_var: f64,
    pub initial_sigma: f64,
    pub initial_price: f64,
}

impl Default for PricePathParams {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.1,
            gamma: 0.9,
            series_len: 10_000,
            epsilon_mean: 0.0,
            error_var: 0.002,
            initial_sigma: 0.05,
            initial_price: 1.0,
        }
    }
}

impl PricePathParams {
    pub fn validate(&self) -> AmmResult<()> {
        // Leaves room for a finite stationary variance
        if self.alpha + self.beta > 0.95 {
            return Err(AmmError::InvalidArgument(format!(
                "alpha + beta = {}, which does not leave enough room to calculate true variance",
                self.alpha + self.beta
            )));
        }
        if stationary_denominator(self.alpha, self.beta) <= 0.0 {
            return Err(AmmError::InvalidArgument("AR(2) coefficients are not stationary".into()));
        }
        if !(self.error_var > 0.0) || !(self.initial_sigma > 0.0) || !(self.gamma >= 0.0) {
            return Err(AmmError::InvalidArgument(
                "error_var and initial_sigma must be positive, gamma non-negative".into(),
            ));
        }
        if !(self.initial_price.is_finite() && self.initial_price > 0.0) {
            return Err(AmmError::InvalidArgument("initial price must be positive".into()));
        }
        if self.series_len == 0 {
            return Err(AmmError::InvalidArgument("series length must be positive".into()));
        }
        Ok(())
    }
}

/// Prices and matching true volatilities, one entry per epoch.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PricePath {
    pub prices: Vec<f64>,
    pub volatilities: Vec<f64>,
}

#[inline]
fn stationary_denominator(alpha: f64, beta: f64) -> f64 {
    (1.0 + beta) * (1.0 - alpha - beta) * (1.0 + alpha - beta)
}

/// Standard deviation of returns implied by the AR(2) process at noise level `sigma`:
/// var = (1 - beta) * sigma / ((1 + beta)(1 - alpha - beta)(1 + alpha - beta))
#[inline]
pub fn true_volatility(alpha: f64, beta: f64, sigma: f64) -> f64 {
    ((1.0 - beta) * sigma / stationary_denominator(alpha, beta)).sqrt()
}

/// Generate a price path. Fails instead of emitting a non-positive price.
pub fn generate<R: Rng>(params: &PricePathParams, rng: &mut R) -> AmmResult<PricePath> {
    params.validate()?;

    let n = params.series_len;
    let mut prices = Vec::with_capacity(n);
    let mut volatilities = Vec::with_capacity(n);

    let mut sigma = params.initial_sigma;
    let mut price = params.initial_price;
    let (mut r_1, mut r_2) = (0.0, 0.0);

    for t in 0..n {
        sigma = params.gamma * sigma + rng.gen_range(0.0..params.error_var);

        let noise = Normal::new(params.epsilon_mean, sigma)
            .map_err(|e| AmmError::InvalidArgument(format!("noise distribution: {e}")))?;
        let r_t = params.alpha * r_1 + params.beta * r_2 + noise.sample(rng);
        r_2 = r_1;
        r_1 = r_t;

        price *= 1.0 + r_t;
        if !(price.is_finite() && price > 0.0) {
            return Err(AmmError::InvalidArgument(format!(
                "price path hit {price} at step {t}"
            )));
        }

        prices.push(price);
        volatilities.push(true_volatility(params.alpha, params.beta, sigma));
    }

    tracing::debug!(len = n, last_price = price, "price path generated");
    Ok(PricePath { prices, volatilities })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_path_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let path = generate(&PricePathParams::default(), &mut rng).unwrap();
        assert_eq!(path.prices.len(), 10_000);
        assert_eq!(path.volatilities.len(), 10_000);
        assert!(path.prices.iter().all(|p| p.is_finite() && *p > 0.0));
        assert!(path.volatilities.iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn test_seeded_paths_repeat() {
        let params = PricePathParams { series_len: 500, ..PricePathParams::default() };
        let a = generate(&params, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = generate(&params, &mut StdRng::seed_from_u64(9)).unwrap();
        let c = generate(&params, &mut StdRng::seed_from_u64(10)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_non_stationary_rejected() {
        let params = PricePathParams { alpha: 0.6, beta: 0.4, ..PricePathParams::default() };
        let r = generate(&params, &mut StdRng::seed_from_u64(0));
        assert!(matches!(r, Err(AmmError::InvalidArgument(_))));
    }

    #[test]
    fn test_true_volatility_formula() {
        // x = 0.9 * 0.01, y = 1.1 * 0.6 * 1.2
        let v = true_volatility(0.3, 0.1, 0.01);
        assert!((v - (0.009_f64 / 0.792).sqrt()).abs() < 1e-12, "v={v}");
    }
}
