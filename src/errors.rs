use crate::state::OptionClass;

/// Domain-specific error types for the AMM engine.
/// Every failure is surfaced to the caller. The driver must:
/// - Skip a rejected trade and keep stepping epochs
/// - Abort on internal consistency violations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AmmError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("insufficient {class} pool capital: required {required}, available {available}")]
    InsufficientPoolCapital {
        class: OptionClass,
        required: f64,
        available: f64,
    },

    #[error("{class} pool too shallow for quantity {quantity} (pool size {pool_size})")]
    PoolDepthExceeded {
        class: OptionClass,
        quantity: f64,
        pool_size: f64,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("internal consistency violated: {0}")]
    InternalConsistency(String),
}

impl AmmError {
    /// Rejections the caller may skip or retry with different inputs.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AmmError::InvalidArgument(_)
                | AmmError::InsufficientPoolCapital { .. }
                | AmmError::PoolDepthExceeded { .. }
        )
    }
}

pub type AmmResult<T> = Result<T, AmmError>;
