pub mod engine;
pub mod inventory;
pub mod settlement;

pub use engine::{AmmConfig, AmmEngine, Fill, FillKind};
pub use settlement::SettlementReport;
