//! Simulation bookkeeping.
//! The tracker only observes the engine; reports are plain serializable data.

use crate::amm::{AmmEngine, Fill, FillKind, SettlementReport};
use crate::state::{OptionClass, Side};

/// Pool state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PoolMark {
    pub call_pool_size: f64,
    pub put_pool_size: f64,
    pub call_volatility: f64,
    pub put_volatility: f64,
}

impl PoolMark {
    pub fn of(amm: &AmmEngine) -> Self {
        Self {
            call_pool_size: amm.call_pool_size(),
            put_pool_size: amm.put_pool_size(),
            call_volatility: amm.call_volatility(),
            put_volatility: amm.put_volatility(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct FillCounts {
    pub call_long: u64,
    pub call_short: u64,
    pub put_long: u64,
    pub put_short: u64,
}

impl FillCounts {
    #[inline]
    pub fn total(&self) -> u64 {
        self.call_long + self.call_short + self.put_long + self.put_short
    }
}

/// One option cycle, from the first epoch to settlement.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CycleReport {
    pub cycle: usize,
    pub start: PoolMark,
    pub end: PoolMark,
    pub fills: FillCounts,
    pub transfers: u64,
    pub rejections: u64,
    pub settlement: SettlementReport,
}

/// Accumulates fills and rejections for the cycle in progress.
pub struct CycleTracker {
    cycle: usize,
    start: PoolMark,
    fills: FillCounts,
    transfers: u64,
    rejections: u64,
}

impl CycleTracker {
    pub fn start(cycle: usize, amm: &AmmEngine) -> Self {
        Self {
            cycle,
            start: PoolMark::of(amm),
            fills: FillCounts::default(),
            transfers: 0,
            rejections: 0,
        }
    }

    pub fn record_fill(&mut self, fill: &Fill) {
        let p = &fill.position;
        match (p.class(), p.side()) {
            (OptionClass::Call, Side::Long) => self.fills.call_long += 1,
            (OptionClass::Call, Side::Short) => self.fills.call_short += 1,
            (OptionClass::Put, Side::Long) => self.fills.put_long += 1,
            (OptionClass::Put, Side::Short) => self.fills.put_short += 1,
        }
        if fill.kind == FillKind::Transferred {
            self.transfers += 1;
        }
    }

    #[inline]
    pub fn record_rejection(&mut self) {
        self.rejections += 1;
    }

    pub fn finish(self, amm: &AmmEngine, settlement: SettlementReport) -> CycleReport {
        CycleReport {
            cycle: self.cycle,
            start: self.start,
            end: PoolMark::of(amm),
            fills: self.fills,
            transfers: self.transfers,
            rejections: self.rejections,
            settlement,
        }
    }
}

/// Whole-run summary.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SimulationReport {
    pub initial: PoolMark,
    pub last: PoolMark,
    pub call_fees_collected: f64,
    pub put_fees_collected: f64,
    pub total_fills: u64,
    pub total_rejections: u64,
    pub cycles: Vec<CycleReport>,
}

/// Aggregate cycle reports. Pure function.
pub fn compute_aggregate(initial: PoolMark, amm: &AmmEngine, cycles: Vec<CycleReport>) -> SimulationReport {
    SimulationReport {
        initial,
        last: PoolMark::of(amm),
        call_fees_collected: amm.fees_collected(OptionClass::Call),
        put_fees_collected: amm.fees_collected(OptionClass::Put),
        total_fills: cycles.iter().map(|c| c.fills.total()).sum(),
        total_rejections: cycles.iter().map(|c| c.rejections).sum(),
        cycles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_fills_by_class_and_side() {
        let mut amm = AmmEngine::new(10.0, 1.0).unwrap();
        let mut tracker = CycleTracker::start(0, &amm);

        let f = amm.trade(1.0, OptionClass::Call, Side::Long, 1.0).unwrap();
        tracker.record_fill(&f);
        let f = amm.trade(1.0, OptionClass::Call, Side::Short, 1.0).unwrap();
        tracker.record_fill(&f);
        let f = amm.trade(0.9, OptionClass::Put, Side::Short, 1.0).unwrap();
        tracker.record_fill(&f);
        tracker.record_rejection();

        amm.expire(1.0).unwrap();
        let settlement = amm.clear().unwrap();
        let report = tracker.finish(&amm, settlement);

        assert_eq!(report.fills.call_long, 1);
        assert_eq!(report.fills.call_short, 1);
        assert_eq!(report.fills.put_short, 1);
        assert_eq!(report.fills.total(), 3);
        assert_eq!(report.transfers, 1);
        assert_eq!(report.rejections, 1);
        assert_eq!(report.start.call_pool_size, 100.0);
        assert_eq!(report.end.call_pool_size, amm.call_pool_size());
    }

    #[test]
    fn test_aggregate_sums_cycles() {
        let mut amm = AmmEngine::new(10.0, 1.0).unwrap();
        let initial = PoolMark::of(&amm);
        let mut cycles = Vec::new();
        for i in 0..2 {
            let mut tracker = CycleTracker::start(i, &amm);
            let f = amm.trade(1.2, OptionClass::Call, Side::Long, 1.0).unwrap();
            tracker.record_fill(&f);
            tracker.record_rejection();
            amm.expire(1.0).unwrap();
            let s = amm.clear().unwrap();
            cycles.push(tracker.finish(&amm, s));
            amm.advance_epoch(10.0, 1.0).unwrap();
        }
        let report = compute_aggregate(initial, &amm, cycles);
        assert_eq!(report.total_fills, 2);
        assert_eq!(report.total_rejections, 2);
        assert!(report.call_fees_collected > 0.0);
        assert_eq!(report.put_fees_collected, 0.0);
        // OTM longs expire worthless: pool keeps premia plus returned collateral
        assert!(report.last.call_pool_size > report.initial.call_pool_size);
    }
}
