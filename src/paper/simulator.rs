use crate::agents::TradingAgent;
use crate::amm::{AmmConfig, AmmEngine};
use crate::errors::{AmmError, AmmResult};
use crate::feeds::price_path::PricePath;
use crate::paper::tracker::{self, CycleTracker, PoolMark, SimulationReport};
use crate::state::TradeIntent;
use smallvec::SmallVec;

// ═══════════════════════════════════════════════════════════════════════════════
// EPOCH DRIVER
//
// The path is walked in option cycles of `epochs_per_maturity` epochs:
//   1. Advance the AMM to (periods left, price_t)
//   2. Every agent looks at the same pre-trade state and may emit one intent
//   3. Intents execute in agent order; rejected ones are skipped
//   4. After the last epoch the next price is the settlement price:
//      expire, clear, start the next cycle on the surviving pools
// A cycle only runs if the path still has its settlement price.
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SimulationParams {
    pub epochs_per_maturity: u32,
}

/// Run the whole path. Recoverable trade rejections are counted and skipped;
/// anything else aborts the run.
pub fn run(
    amm_config: AmmConfig,
    path: &PricePath,
    agents: &mut [Box<dyn TradingAgent>],
    params: SimulationParams,
) -> AmmResult<SimulationReport> {
    let n = params.epochs_per_maturity as usize;
    if n == 0 {
        return Err(AmmError::InvalidArgument("epochs per maturity must be positive".into()));
    }
    if path.prices.len() < n + 1 || path.volatilities.len() != path.prices.len() {
        return Err(AmmError::InvalidArgument(format!(
            "path of {} prices cannot cover a cycle of {n} epochs",
            path.prices.len()
        )));
    }

    let mut amm = AmmEngine::with_config(amm_config, n as f64, path.prices[0])?;
    let initial = PoolMark::of(&amm);
    let mut cycles = Vec::new();
    let mut cursor = 0;

    tracing::info!(
        epochs = path.prices.len(),
        epochs_per_maturity = n,
        agents = agents.len(),
        "simulation starting"
    );

    while cursor + n < path.prices.len() {
        let mut cycle = CycleTracker::start(cycles.len(), &amm);

        for step in 0..n {
            let t = cursor + step;
            amm.advance_epoch((n - step) as f64, path.prices[t])?;

            let intents: SmallVec<[(usize, TradeIntent); 8]> = agents
                .iter_mut()
                .enumerate()
                .filter_map(|(i, agent)| agent.decide(&amm, path.volatilities[t]).map(|intent| (i, intent)))
                .collect();

            for (i, intent) in intents {
                match amm.trade_intent(&intent) {
                    Ok(fill) => cycle.record_fill(&fill),
                    Err(e) if e.is_recoverable() => {
                        tracing::warn!(
                            agent = agents[i].name(),
                            epoch = t,
                            class = %intent.class,
                            side = %intent.side,
                            strike = intent.strike,
                            error = %e,
                            "trade rejected"
                        );
                        cycle.record_rejection();
                    }
                    Err(e) => {
                        tracing::error!(agent = agents[i].name(), epoch = t, error = %e, "simulation aborted");
                        return Err(e);
                    }
                }
            }
        }

        amm.expire(path.prices[cursor + n])?;
        let settlement = amm.clear()?;
        let report = cycle.finish(&amm, settlement);
        tracing::info!(
            cycle = report.cycle,
            fills = report.fills.total(),
            rejections = report.rejections,
            call_pool = report.end.call_pool_size,
            put_pool = report.end.put_pool_size,
            "cycle settled"
        );
        cycles.push(report);

        cursor += n;
        if cursor + n < path.prices.len() {
            amm.advance_epoch(n as f64, path.prices[cursor])?;
        }
    }

    Ok(tracker::compute_aggregate(initial, &amm, cycles))
}
