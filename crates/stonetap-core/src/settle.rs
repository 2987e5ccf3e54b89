//! Click batch settlement with partial fulfilment.
//!
//! Clients report taps in batches as a requested stone amount. The server
//! reconstructs how many clicks that represents, prices them in energy, and
//! credits as much as the available energy honours. Manual settlement never
//! hard-fails on energy: a short batch settles partially, an empty battery
//! settles zero, and the client learns the truth from the returned state.

use stonetap_types::{CreditSource, PlayerRecord};

/// Exponent of the per-click energy cost curve.
const COST_CURVE_EXPONENT: f64 = 1.2;
/// Divisor of the per-click energy cost curve.
const COST_CURVE_DIVISOR: f64 = 10.0;

/// Outcome of settling one credit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Stones credited, multiplier already applied.
    pub stones_granted: i64,
    /// Energy deducted.
    pub energy_spent: i64,
    /// Whole clicks the settlement honoured. Zero for idle credits.
    pub clicks_settled: i64,
    /// Whether the full requested amount was credited.
    pub fully_settled: bool,
}

/// Energy price of one click at the given per-click yield.
///
/// `ceil(stones_per_click^1.2 / 10)`, never below 1 so a click always costs
/// something. The curve keeps upgraded clicks profitable but not free.
pub fn energy_cost_per_click(stones_per_click: i64) -> i64 {
    #[allow(clippy::cast_precision_loss)]
    let yield_per_click = stones_per_click.max(1) as f64;
    let cost = (yield_per_click.powf(COST_CURVE_EXPONENT) / COST_CURVE_DIVISOR).ceil();
    #[allow(clippy::cast_possible_truncation)]
    let cost = cost as i64;
    cost.max(1)
}

/// Settle a credit request against a record.
///
/// The caller validates `requested > 0` and supplies the earning multiplier
/// in force. `AutoBot` credits spend no energy; manual credits are honoured
/// in whole clicks up to what the battery affords.
pub fn settle(
    record: &mut PlayerRecord,
    requested: i64,
    source: CreditSource,
    multiplier: i64,
) -> Settlement {
    match source {
        CreditSource::AutoBot => {
            let granted = requested.saturating_mul(multiplier);
            record.stones = record.stones.saturating_add(granted);
            Settlement {
                stones_granted: granted,
                energy_spent: 0,
                clicks_settled: 0,
                fully_settled: true,
            }
        }
        CreditSource::ManualTap => settle_manual(record, requested, multiplier),
    }
}

fn settle_manual(record: &mut PlayerRecord, requested: i64, multiplier: i64) -> Settlement {
    let per_click = record.stones_per_click.max(1);
    let cost_per_click = energy_cost_per_click(record.stones_per_click);

    // How many clicks the batch represents, final partial click included.
    let clicks = requested
        .saturating_add(per_click.saturating_sub(1))
        .checked_div(per_click)
        .unwrap_or(1)
        .max(1);
    let full_cost = clicks.saturating_mul(cost_per_click);
    let energy = record.energy.max(0);

    if energy >= full_cost {
        let granted = requested.saturating_mul(multiplier);
        record.stones = record.stones.saturating_add(granted);
        record.energy = record.energy.saturating_sub(full_cost);
        return Settlement {
            stones_granted: granted,
            energy_spent: full_cost,
            clicks_settled: clicks,
            fully_settled: true,
        };
    }

    // Partial fulfilment: honour whole clicks only, never error.
    let allowed = energy.checked_div(cost_per_click).unwrap_or(0);
    if allowed == 0 {
        return Settlement {
            stones_granted: 0,
            energy_spent: 0,
            clicks_settled: 0,
            fully_settled: false,
        };
    }

    let granted = allowed.saturating_mul(per_click).saturating_mul(multiplier);
    let spent = allowed.saturating_mul(cost_per_click);
    record.stones = record.stones.saturating_add(granted);
    record.energy = record.energy.saturating_sub(spent);
    Settlement {
        stones_granted: granted,
        energy_spent: spent,
        clicks_settled: allowed,
        fully_settled: false,
    }
}
