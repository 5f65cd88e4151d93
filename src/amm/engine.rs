use crate::amm::inventory::Inventory;
use crate::errors::{AmmError, AmmResult};
use crate::models::volatility::{impacted_volatility, trade_volatility};
use crate::models::BlackScholes;
use crate::risk::solvency::{check_premium_payment, check_underwriting};
use crate::state::*;
use smallvec::SmallVec;

/// Coverage slack for collateral/strike round trips; smaller remainders are dropped.
const QUANTITY_EPSILON: f64 = 1e-12;

/// Parameters fixed at construction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AmmConfig {
    pub call_strikes: Vec<f64>,
    pub put_strikes: Vec<f64>,
    pub call_volatility: f64,
    pub put_volatility: f64,
    /// Base units
    pub call_pool_size: f64,
    /// Quote units
    pub put_pool_size: f64,
    /// Relative fee on paid/received premia
    pub fee: f64,
    /// Speed of volatility adjustments
    pub alpha: i32,
    pub risk_free_rate: f64,
    /// Absolute tolerance when matching strikes
    pub strike_tolerance: f64,
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            call_strikes: (9..20).map(|x| x as f64 / 10.0).collect(),
            put_strikes: (2..12).map(|x| x as f64 / 10.0).collect(),
            call_volatility: 0.1,
            put_volatility: 0.1,
            call_pool_size: 100.0,
            put_pool_size: 100.0,
            fee: 0.03,
            alpha: 1,
            risk_free_rate: 0.0,
            strike_tolerance: 0.001,
        }
    }
}

impl AmmConfig {
    pub fn validate(&self) -> AmmResult<()> {
        for (class, strikes) in [("call", &self.call_strikes), ("put", &self.put_strikes)] {
            if strikes.is_empty() {
                return Err(AmmError::Config(format!("{class} strike ladder is empty")));
            }
            if let Some(bad) = strikes.iter().find(|k| !(k.is_finite() && **k > 0.0)) {
                return Err(AmmError::Config(format!("{class} strike must be positive, got {bad}")));
            }
        }
        for (name, vol) in [("call", self.call_volatility), ("put", self.put_volatility)] {
            if !(vol.is_finite() && vol > 0.0) {
                return Err(AmmError::Config(format!("{name} volatility must be positive, got {vol}")));
            }
        }
        for (name, size) in [("call", self.call_pool_size), ("put", self.put_pool_size)] {
            if !(size.is_finite() && size >= 0.0) {
                return Err(AmmError::Config(format!("{name} pool size must be non-negative, got {size}")));
            }
        }
        if !(0.0..1.0).contains(&self.fee) {
            return Err(AmmError::Config(format!("fee must be in [0, 1), got {}", self.fee)));
        }
        if self.alpha < 1 {
            return Err(AmmError::Config(format!("alpha must be >= 1, got {}", self.alpha)));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(AmmError::Config("risk-free rate must be finite".into()));
        }
        if !(self.strike_tolerance.is_finite() && self.strike_tolerance >= 0.0) {
            return Err(AmmError::Config("strike tolerance must be non-negative".into()));
        }
        Ok(())
    }
}

/// Capital, volatility and inventory of one option class.
#[derive(Debug, Clone)]
pub(super) struct Pool {
    pub(super) strikes: Vec<f64>,
    pub(super) volatility: f64,
    pub(super) size: f64,
    pub(super) fees_collected: f64,
    pub(super) inventory: Inventory,
}

impl Pool {
    fn new(class: OptionClass, strikes: Vec<f64>, volatility: f64, size: f64) -> Self {
        Self {
            strikes,
            volatility,
            size,
            fees_collected: 0.0,
            inventory: Inventory::new(class),
        }
    }

    /// The ladder entry within `tolerance` of `strike`, if any.
    fn ladder_strike(&self, strike: f64, tolerance: f64) -> Option<f64> {
        self.strikes
            .iter()
            .copied()
            .find(|k| (k - strike).abs() <= tolerance)
    }

    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            class: self.inventory.class(),
            strikes: self.strikes.clone(),
            volatility: self.volatility,
            size: self.size,
            fees_collected: self.fees_collected,
            inventory: self.inventory.entries().to_vec(),
        }
    }
}

/// How a fill was sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillKind {
    /// Pool handed over positions it already held on the requested side.
    Transferred,
    /// Pool wrote a fresh contract and kept the mirror side.
    Issued,
}

/// Result of a successful trade, from the trader's point of view.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Fill {
    pub position: Position,
    /// Premium after fee: paid by the trader when long, received when short.
    pub premium: f64,
    pub kind: FillKind,
}

/// Inventory reconciliation plan, computed before any state is touched.
enum Execution {
    Transfer {
        removed: SmallVec<[PositionId; 4]>,
        filled: Position,
        remainder: Option<Position>,
    },
    Issue {
        user: Position,
        mirror: Position,
    },
}

/// Single-maker options AMM with one pool per option class.
///
/// Every mutating call either applies completely or fails before touching
/// state. There is no internal locking: wrap the engine in a mutex or give
/// it a single owning task when sharing it.
pub struct AmmEngine {
    pub(super) call: Pool,
    pub(super) put: Pool,
    fee: f64,
    alpha: i32,
    risk_free_rate: f64,
    strike_tolerance: f64,
    pub(super) time_to_maturity: f64,
    pub(super) underlying_price: f64,
    pricing: BlackScholes,
}

impl AmmEngine {
    /// Engine with the default ladders, volatilities, pools and fee.
    pub fn new(time_to_maturity: f64, underlying_price: f64) -> AmmResult<Self> {
        Self::with_config(AmmConfig::default(), time_to_maturity, underlying_price)
    }

    pub fn with_config(
        config: AmmConfig,
        time_to_maturity: f64,
        underlying_price: f64,
    ) -> AmmResult<Self> {
        config.validate()?;
        check_epoch(time_to_maturity, underlying_price)?;

        Ok(Self {
            call: Pool::new(
                OptionClass::Call,
                config.call_strikes,
                config.call_volatility,
                config.call_pool_size,
            ),
            put: Pool::new(
                OptionClass::Put,
                config.put_strikes,
                config.put_volatility,
                config.put_pool_size,
            ),
            fee: config.fee,
            alpha: config.alpha,
            risk_free_rate: config.risk_free_rate,
            strike_tolerance: config.strike_tolerance,
            time_to_maturity,
            underlying_price,
            pricing: BlackScholes::new(),
        })
    }

    // ── Epochs ──

    /// Move to the next epoch. Time to maturity must stay >= 1;
    /// use [`AmmEngine::expire`] for the settlement epoch.
    pub fn advance_epoch(&mut self, time_to_maturity: f64, underlying_price: f64) -> AmmResult<()> {
        check_epoch(time_to_maturity, underlying_price)?;
        self.time_to_maturity = time_to_maturity;
        self.underlying_price = underlying_price;
        Ok(())
    }

    // ── Read access ──

    #[inline]
    pub(super) fn pool(&self, class: OptionClass) -> &Pool {
        match class {
            OptionClass::Call => &self.call,
            OptionClass::Put => &self.put,
        }
    }

    #[inline]
    pub(super) fn pool_mut(&mut self, class: OptionClass) -> &mut Pool {
        match class {
            OptionClass::Call => &mut self.call,
            OptionClass::Put => &mut self.put,
        }
    }

    pub fn call_volatility(&self) -> f64 {
        self.call.volatility
    }

    pub fn put_volatility(&self) -> f64 {
        self.put.volatility
    }

    pub fn call_pool_size(&self) -> f64 {
        self.call.size
    }

    pub fn put_pool_size(&self) -> f64 {
        self.put.size
    }

    pub fn volatility(&self, class: OptionClass) -> f64 {
        self.pool(class).volatility
    }

    pub fn pool_size(&self, class: OptionClass) -> f64 {
        self.pool(class).size
    }

    pub fn fees_collected(&self, class: OptionClass) -> f64 {
        self.pool(class).fees_collected
    }

    pub fn strikes(&self, class: OptionClass) -> &[f64] {
        &self.pool(class).strikes
    }

    pub fn inventory(&self, class: OptionClass) -> &Inventory {
        &self.pool(class).inventory
    }

    pub fn time_to_maturity(&self) -> f64 {
        self.time_to_maturity
    }

    pub fn underlying_price(&self) -> f64 {
        self.underlying_price
    }

    pub fn market_view(&self) -> MarketView {
        MarketView {
            spot: self.underlying_price,
            time_to_maturity: self.time_to_maturity,
            risk_free_rate: self.risk_free_rate,
        }
    }

    pub fn snapshot(&self) -> AmmSnapshot {
        AmmSnapshot {
            call: self.call.snapshot(),
            put: self.put.snapshot(),
            time_to_maturity: self.time_to_maturity,
            underlying_price: self.underlying_price,
        }
    }

    /// Insert a fixture position into the inventory of its class.
    pub fn seed_inventory(&mut self, position: Position) -> AmmResult<PositionId> {
        self.pool_mut(position.class()).inventory.insert(position)
    }

    // ── Quoting ──

    /// Volatility of `class` after the trader takes `side` for `quantity` contracts.
    pub fn compute_new_volatility(&self, class: OptionClass, side: Side, quantity: f64) -> AmmResult<f64> {
        check_quantity(quantity)?;
        let pool = self.pool(class);
        impacted_volatility(
            class,
            side,
            pool.volatility,
            pool.size,
            quantity,
            self.underlying_price,
            self.alpha,
        )
    }

    /// Volatility the trade is priced at: midpoint of current and impacted.
    pub fn compute_trade_volatility(&self, class: OptionClass, side: Side, quantity: f64) -> AmmResult<f64> {
        let impacted = self.compute_new_volatility(class, side, quantity)?;
        Ok(trade_volatility(self.volatility(class), impacted))
    }

    /// Per-contract premium before fee, in the pool's native unit.
    pub fn quote_price(&self, strike: f64, class: OptionClass, side: Side, quantity: f64) -> AmmResult<f64> {
        let volatility = self.compute_trade_volatility(class, side, quantity)?;
        self.pricing
            .pool_premium(&self.market_view(), class, strike, volatility)
    }

    /// Premium for `quantity` contracts with the fee applied: the trader pays
    /// `base * (1 + fee)` going long and receives `base * (1 - fee)` going short.
    pub fn get_premium(&self, strike: f64, class: OptionClass, side: Side, quantity: f64) -> AmmResult<f64> {
        Ok(self.price_with_fee(strike, class, side, quantity)?.1)
    }

    /// (premium before fee, premium after fee), both for the full quantity.
    fn price_with_fee(
        &self,
        strike: f64,
        class: OptionClass,
        side: Side,
        quantity: f64,
    ) -> AmmResult<(f64, f64)> {
        let base = self.quote_price(strike, class, side, quantity)? * quantity;
        let after_fee = match side {
            Side::Long => base * (1.0 + self.fee),
            Side::Short => base * (1.0 - self.fee),
        };
        Ok((base, after_fee))
    }

    // ── Trading ──

    pub fn trade_intent(&mut self, intent: &TradeIntent) -> AmmResult<Fill> {
        self.trade(intent.strike, intent.class, intent.side, intent.quantity)
    }

    /// Execute a trade. `class`/`side` describe what the trader wants.
    ///
    /// All checks run first; the inventory is reconciled next (it validates
    /// before mutating), and only then are volatility and pool size updated.
    pub fn trade(&mut self, strike: f64, class: OptionClass, side: Side, quantity: f64) -> AmmResult<Fill> {
        if self.time_to_maturity <= 0.0 {
            return Err(AmmError::InvalidArgument(
                "options have expired, settle before trading".into(),
            ));
        }
        check_quantity(quantity)?;
        let strike = self
            .pool(class)
            .ladder_strike(strike, self.strike_tolerance)
            .ok_or_else(|| AmmError::InvalidArgument(format!("{class} strike {strike} not on ladder")))?;

        let pool = self.pool(class);
        let matched = pool.inventory.matching(strike, side, self.strike_tolerance);

        check_underwriting(class, side, pool.size, quantity, strike).into_result(class)?;

        let new_volatility = self.compute_new_volatility(class, side, quantity)?;
        let (base_premium, premium) = self.price_with_fee(strike, class, side, quantity)?;

        check_premium_payment(side, pool.size, premium).into_result(class)?;

        let execution = self.plan_execution(class, strike, side, quantity, matched)?;

        // ── Commit ──
        let fee = base_premium * self.fee;
        let pool = self.pool_mut(class);
        let (position, kind, retained) = match execution {
            Execution::Transfer {
                removed,
                filled,
                remainder,
            } => {
                let reinserted = pool.inventory.replace(&removed, remainder.into_iter().collect())?;
                if side == Side::Short {
                    // The trader takes over the obligation, freeing the pool's collateral
                    pool.size += filled.locked_collateral();
                }
                (filled, FillKind::Transferred, reinserted.first().copied())
            }
            Execution::Issue { user, mirror } => {
                let locked = mirror.locked_collateral();
                let mirror_id = pool.inventory.insert(mirror)?;
                pool.size -= locked;
                (user, FillKind::Issued, Some(mirror_id))
            }
        };

        pool.volatility = new_volatility;
        match side {
            Side::Long => pool.size += premium,
            Side::Short => pool.size -= premium,
        }
        pool.fees_collected += fee;

        tracing::debug!(
            class = %class,
            side = %side,
            strike,
            quantity,
            premium,
            volatility = new_volatility,
            pool_size = pool.size,
            kind = ?kind,
            retained = ?retained,
            "trade filled"
        );

        Ok(Fill {
            position,
            premium,
            kind,
        })
    }

    /// Decide between handing over held positions and writing a fresh contract.
    fn plan_execution(
        &self,
        class: OptionClass,
        strike: f64,
        side: Side,
        quantity: f64,
        matched: SmallVec<[PositionId; 4]>,
    ) -> AmmResult<Execution> {
        let inventory = &self.pool(class).inventory;
        let mut total_collateral = 0.0;
        for id in &matched {
            let position = inventory
                .get(*id)
                .ok_or_else(|| AmmError::InternalConsistency(format!("matched {id:?} is missing")))?;
            total_collateral += position.locked_collateral();
        }
        let covered = class.covered_quantity(total_collateral, strike);

        if !matched.is_empty() && covered >= quantity - QUANTITY_EPSILON {
            let filled_collateral = class.collateral(quantity, strike);
            let filled = Position::new(strike, class, side, filled_collateral, quantity)?;

            let remaining_quantity = covered - quantity;
            let remainder = if remaining_quantity > QUANTITY_EPSILON {
                Some(Position::new(
                    strike,
                    class,
                    side,
                    (total_collateral - filled_collateral).max(0.0),
                    remaining_quantity,
                )?)
            } else {
                None
            };

            return Ok(Execution::Transfer {
                removed: matched,
                filled,
                remainder,
            });
        }

        let collateral = class.collateral(quantity, strike);
        let (user_locked, mirror_locked) = match side {
            // Pool underwrites
            Side::Long => (0.0, collateral),
            Side::Short => (collateral, 0.0),
        };
        Ok(Execution::Issue {
            user: Position::new(strike, class, side, user_locked, quantity)?,
            mirror: Position::new(strike, class, side.opposite(), mirror_locked, quantity)?,
        })
    }
}

fn check_epoch(time_to_maturity: f64, underlying_price: f64) -> AmmResult<()> {
    if !(time_to_maturity.is_finite() && time_to_maturity >= 1.0) {
        return Err(AmmError::InvalidArgument(format!(
            "time to maturity must be >= 1, got {time_to_maturity}"
        )));
    }
    check_price(underlying_price)
}

pub(super) fn check_price(underlying_price: f64) -> AmmResult<()> {
    if !(underlying_price.is_finite() && underlying_price > 0.0) {
        return Err(AmmError::InvalidArgument(format!(
            "underlying price must be positive, got {underlying_price}"
        )));
    }
    Ok(())
}

fn check_quantity(quantity: f64) -> AmmResult<()> {
    if !(quantity.is_finite() && quantity > 0.0) {
        return Err(AmmError::InvalidArgument(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}
