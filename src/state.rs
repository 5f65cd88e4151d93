use crate::amm::inventory::InventoryEntry;
use crate::errors::{AmmError, AmmResult};
use std::str::FromStr;

// ── Option class / side ──

/// Option class. Each class trades against its own pool:
/// calls are denominated in the base unit, puts in the quote unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionClass {
    Call,
    Put,
}

impl OptionClass {
    pub const ALL: [OptionClass; 2] = [OptionClass::Call, OptionClass::Put];

    /// Convert a contract quantity into the pool's native unit.
    #[inline]
    pub fn native_quantity(self, quantity: f64, spot: f64) -> f64 {
        match self {
            Self::Call => quantity,
            Self::Put => quantity * spot,
        }
    }

    /// Collateral that fully backs `quantity` short contracts.
    /// Calls lock the underlying, puts lock the cash to buy it at strike.
    #[inline]
    pub fn collateral(self, quantity: f64, strike: f64) -> f64 {
        match self {
            Self::Call => quantity,
            Self::Put => quantity * strike,
        }
    }

    /// Inverse of [`OptionClass::collateral`]: contracts covered by `collateral`.
    #[inline]
    pub fn covered_quantity(self, collateral: f64, strike: f64) -> f64 {
        match self {
            Self::Call => collateral,
            Self::Put => collateral / strike,
        }
    }

    /// Per-contract payoff at expiry, in the pool's native unit.
    #[inline]
    pub fn intrinsic_value(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call if spot > strike => (spot - strike) / spot,
            Self::Put if spot < strike => strike - spot,
            _ => 0.0,
        }
    }
}

impl std::fmt::Display for OptionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionClass {
    type Err = AmmError;

    fn from_str(s: &str) -> AmmResult<Self> {
        match s {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(AmmError::InvalidArgument(format!("unknown option class: {other}"))),
        }
    }
}

/// Position side, relative to whoever holds the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

impl FromStr for Side {
    type Err = AmmError;

    fn from_str(s: &str) -> AmmResult<Self> {
        match s {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            other => Err(AmmError::InvalidArgument(format!("unknown side: {other}"))),
        }
    }
}

// ── Position ──

/// An issued option contract. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Position {
    strike: f64,
    class: OptionClass,
    side: Side,
    /// Base unit for calls, quote unit for puts.
    locked_collateral: f64,
    quantity: f64,
}

impl Position {
    pub fn new(
        strike: f64,
        class: OptionClass,
        side: Side,
        locked_collateral: f64,
        quantity: f64,
    ) -> AmmResult<Self> {
        if !(strike.is_finite() && strike > 0.0) {
            return Err(AmmError::InvalidArgument(format!("strike must be positive, got {strike}")));
        }
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(AmmError::InvalidArgument(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        if !(locked_collateral.is_finite() && locked_collateral >= 0.0) {
            return Err(AmmError::InvalidArgument(format!(
                "locked collateral must be non-negative, got {locked_collateral}"
            )));
        }
        Ok(Self {
            strike,
            class,
            side,
            locked_collateral,
            quantity,
        })
    }

    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    #[inline]
    pub fn class(&self) -> OptionClass {
        self.class
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn locked_collateral(&self) -> f64 {
        self.locked_collateral
    }

    #[inline]
    pub fn quantity(&self) -> f64 {
        self.quantity
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} x{} @ {} (locked {})",
            self.side, self.class, self.quantity, self.strike, self.locked_collateral
        )
    }
}

/// Stable handle of a position inside an AMM inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct PositionId(pub u64);

// ── Market context for pricing ──

/// Everything besides volatility and strike that a premium depends on.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct MarketView {
    pub spot: f64,
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
}

// ── Trade intents (agents -> driver) ──

/// A request to trade against the AMM. Class/side are from the trader's point of view.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TradeIntent {
    pub class: OptionClass,
    pub side: Side,
    pub strike: f64,
    pub quantity: f64,
}

// ── Engine snapshots (reporting + tests) ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PoolSnapshot {
    pub class: OptionClass,
    pub strikes: Vec<f64>,
    pub volatility: f64,
    pub size: f64,
    pub fees_collected: f64,
    pub inventory: Vec<InventoryEntry>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AmmSnapshot {
    pub call: PoolSnapshot,
    pub put: PoolSnapshot,
    pub time_to_maturity: f64,
    pub underlying_price: f64,
}
