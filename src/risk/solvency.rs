use crate::errors::{AmmError, AmmResult};
use crate::state::{OptionClass, Side};

/// Solvency check result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SolvencyCheck {
    /// Pool can take the trade
    Allowed,
    /// Pool balance short of what the trade needs
    Blocked { required: f64, available: f64 },
}

impl SolvencyCheck {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, SolvencyCheck::Allowed)
    }

    pub fn into_result(self, class: OptionClass) -> AmmResult<()> {
        match self {
            SolvencyCheck::Allowed => Ok(()),
            SolvencyCheck::Blocked { required, available } => {
                Err(AmmError::InsufficientPoolCapital {
                    class,
                    required,
                    available,
                })
            }
        }
    }
}

#[inline]
fn require(required: f64, available: f64) -> SolvencyCheck {
    if available < required {
        SolvencyCheck::Blocked { required, available }
    } else {
        SolvencyCheck::Allowed
    }
}

/// User goes long: the pool underwrites and must be able to lock the
/// full collateral of the contracts it writes.
///
/// Puts are checked against `quantity * strike`, the amount actually locked
/// in the mirror position, not `quantity * spot`.
/// Pure function, no side effects.
#[inline]
pub fn check_underwriting(
    class: OptionClass,
    user_side: Side,
    pool_size: f64,
    quantity: f64,
    strike: f64,
) -> SolvencyCheck {
    match user_side {
        Side::Long => require(class.collateral(quantity, strike), pool_size),
        Side::Short => SolvencyCheck::Allowed,
    }
}

/// User goes short: the pool pays the premium out of its balance.
#[inline]
pub fn check_premium_payment(user_side: Side, pool_size: f64, premium_after_fee: f64) -> SolvencyCheck {
    match user_side {
        Side::Short => require(premium_after_fee, pool_size),
        Side::Long => SolvencyCheck::Allowed,
    }
}
