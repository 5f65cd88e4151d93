pub mod black_scholes;
pub mod volatility;

pub use black_scholes::BlackScholes;
