//! Position tracking and trade segmentation.
//!
//! Two historical algorithms implement one [`Segmenter`] capability so
//! callers choose explicitly:
//!
//! - [`FlipSplitSegmenter`] is the primary engine: an explicit transition
//!   function folded over the partition, splitting an over-close execution
//!   into a closing fragment and the opening fragment of the next trade.
//! - [`ZeroCrossingSegmenter`] is the legacy engine: closes only when the
//!   running position returns to exactly zero, clipping an over-close at
//!   the zero boundary.
//!
//! Both must report the same total realized P&L per partition; the
//! integration suite asserts this equivalence.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;

use super::execution::{Execution, Side};
use super::normalize;
use super::trade::{
    Fragment, FragmentRole, OpenPosition, PositionState, Trade, TradeSide, TradeStatus,
};

/// One (account, symbol[, trading-day]) grouping, processed independently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub account: String,
    pub symbol: String,
    pub day: Option<NaiveDate>,
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.day {
            Some(day) => write!(f, "{}::{}::{}", self.account, self.symbol, day),
            None => write!(f, "{}::{}", self.account, self.symbol),
        }
    }
}

/// Group a time-ordered execution stream into partitions, preserving
/// order within each. The trading-day component is the exchange-local
/// calendar date of the instant.
pub fn partition_executions(
    executions: &[Execution],
    tz: Tz,
    by_day: bool,
) -> BTreeMap<PartitionKey, Vec<Execution>> {
    let mut partitions: BTreeMap<PartitionKey, Vec<Execution>> = BTreeMap::new();
    for execution in executions {
        let key = PartitionKey {
            account: execution.account.clone(),
            symbol: execution.symbol.clone(),
            day: by_day.then(|| normalize::exchange_day(execution.timestamp, tz)),
        };
        partitions.entry(key).or_default().push(execution.clone());
    }
    partitions
}

/// Segmentation capability: turn one partition's ordered executions into
/// trades. Pure and total over validated executions; invariant breaches
/// are upstream defects, not error paths.
pub trait Segmenter {
    fn name(&self) -> &'static str;
    fn segment(&self, key: &PartitionKey, executions: &[Execution]) -> Vec<Trade>;
}

/// Which segmentation algorithm to run; selected by config or CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    FlipSplit,
    ZeroCrossing,
}

static FLIP_SPLIT: FlipSplitSegmenter = FlipSplitSegmenter;
static ZERO_CROSSING: ZeroCrossingSegmenter = ZeroCrossingSegmenter;

impl Algorithm {
    pub fn from_name(name: &str) -> Option<Algorithm> {
        match name.trim().to_lowercase().as_str() {
            "flip-split" | "flip_split" => Some(Algorithm::FlipSplit),
            "zero-crossing" | "zero_crossing" => Some(Algorithm::ZeroCrossing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::FlipSplit => "flip-split",
            Algorithm::ZeroCrossing => "zero-crossing",
        }
    }

    pub fn segmenter(&self) -> &'static dyn Segmenter {
        match self {
            Algorithm::FlipSplit => &FLIP_SPLIT,
            Algorithm::ZeroCrossing => &ZERO_CROSSING,
        }
    }

    /// The algorithm cross-checked against this one.
    pub fn counterpart(&self) -> Algorithm {
        match self {
            Algorithm::FlipSplit => Algorithm::ZeroCrossing,
            Algorithm::ZeroCrossing => Algorithm::FlipSplit,
        }
    }
}

fn trade_side_of(side: Side) -> TradeSide {
    match side {
        Side::Buy => TradeSide::Long,
        Side::Sell => TradeSide::Short,
    }
}

/// One transition of the position state machine.
///
/// Returns the next state and, when this execution returned the position
/// to flat, the completed position ready to emit as a closed trade. Rules
/// in priority order: flat opens; same direction adds and re-averages;
/// an opposite-direction execution closes up to the open size (an exact
/// offset is a close, never a flip); any leftover beyond the open size
/// flips into a fresh position at this execution's price.
pub fn step(state: PositionState, execution: &Execution) -> (PositionState, Option<OpenPosition>) {
    debug_assert!(
        execution.quantity > 0.0 && execution.price > 0.0,
        "segmenter received an unvalidated execution"
    );

    let mut position = match state {
        PositionState::Flat => {
            let fragment = Fragment::whole(FragmentRole::Open, execution);
            let opened = OpenPosition::open(trade_side_of(execution.side), fragment);
            return (PositionState::Open(opened), None);
        }
        PositionState::Open(position) => position,
    };

    if execution.side == position.side.opening_side() {
        let fragment = Fragment::whole(FragmentRole::Open, execution);
        let new_size = position.size + fragment.quantity;
        position.avg_entry =
            (position.avg_entry * position.size + fragment.price * fragment.quantity) / new_size;
        position.size = new_size;
        position.opened_quantity += fragment.quantity;
        position.entry_notional += fragment.price * fragment.quantity;
        position.commission += fragment.commission;
        position.fragments.push(fragment);
        return (PositionState::Open(position), None);
    }

    let closed_quantity = execution.quantity.min(position.size);
    let fragment = Fragment::slice(FragmentRole::Close, execution, closed_quantity);
    let gross = match position.side {
        TradeSide::Long => (execution.price - position.avg_entry) * closed_quantity,
        TradeSide::Short => (position.avg_entry - execution.price) * closed_quantity,
    };
    position.realized_gross += gross;
    position.commission += fragment.commission;
    position.closed_quantity += closed_quantity;
    position.exit_notional += fragment.price * closed_quantity;
    position.fragments.push(fragment);

    let remaining = position.size - closed_quantity;
    if remaining > 0.0 {
        position.size = remaining;
        return (PositionState::Open(position), None);
    }

    // Position returned to flat: the trade is complete.
    let leftover = execution.quantity - closed_quantity;
    if leftover > 0.0 {
        // Flip: the leftover opens the next trade at this execution.
        let fragment = Fragment::slice(FragmentRole::Open, execution, leftover);
        let reopened = OpenPosition::open(trade_side_of(execution.side), fragment);
        (PositionState::Open(reopened), Some(position))
    } else {
        (PositionState::Flat, Some(position))
    }
}

/// Primary segmenter: folds [`step`] over the partition.
pub struct FlipSplitSegmenter;

impl Segmenter for FlipSplitSegmenter {
    fn name(&self) -> &'static str {
        "flip-split"
    }

    fn segment(&self, key: &PartitionKey, executions: &[Execution]) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut sequence = 1;
        let mut state = PositionState::Flat;

        for execution in executions {
            let (next, completed) = step(state, execution);
            if let Some(position) = completed {
                trades.push(emit_closed(key, position, &mut sequence));
            }
            state = next;
        }

        if let PositionState::Open(position) = state {
            trades.push(emit_open(key, position, &mut sequence));
        }
        trades
    }
}

/// Legacy segmenter: closes a trade only when the running signed position
/// returns to exactly zero. An over-close is clipped at the zero boundary
/// (proration as in the primary) and the remainder opens the next trade
/// anchored at the same execution.
pub struct ZeroCrossingSegmenter;

impl Segmenter for ZeroCrossingSegmenter {
    fn name(&self) -> &'static str {
        "zero-crossing"
    }

    fn segment(&self, key: &PartitionKey, executions: &[Execution]) -> Vec<Trade> {
        let mut trades = Vec::new();
        let mut sequence = 1;
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut position = 0.0_f64;

        for execution in executions {
            debug_assert!(
                execution.quantity > 0.0 && execution.price > 0.0,
                "segmenter received an unvalidated execution"
            );
            let signed = execution.signed_quantity();

            if fragments.is_empty() {
                fragments.push(Fragment::whole(FragmentRole::Open, execution));
                position = signed;
                continue;
            }

            let new_position = position + signed;

            if new_position == 0.0 {
                fragments.push(Fragment::whole(FragmentRole::Close, execution));
                trades.push(finish_closed(key, std::mem::take(&mut fragments), &mut sequence));
                position = 0.0;
                continue;
            }

            if position.signum() != new_position.signum() {
                let close_quantity = position.abs();
                let open_quantity = new_position.abs();
                fragments.push(Fragment::slice(FragmentRole::Close, execution, close_quantity));
                trades.push(finish_closed(key, std::mem::take(&mut fragments), &mut sequence));
                fragments.push(Fragment::slice(FragmentRole::Open, execution, open_quantity));
                position = new_position;
                continue;
            }

            let role = if position.signum() == signed.signum() {
                FragmentRole::Open
            } else {
                FragmentRole::Close
            };
            fragments.push(Fragment::whole(role, execution));
            position = new_position;
        }

        if !fragments.is_empty() {
            trades.push(finish_open_from_fragments(key, fragments, position, &mut sequence));
        }
        trades
    }
}

fn emit_closed(key: &PartitionKey, position: OpenPosition, sequence: &mut usize) -> Trade {
    let exit_time = position.fragments.last().map(|f| f.timestamp);
    let trade = Trade {
        id: format!("{key}-{sequence}"),
        account: key.account.clone(),
        symbol: key.symbol.clone(),
        side: position.side,
        status: TradeStatus::Closed,
        size: position.closed_quantity,
        entry_price: position.entry_price(),
        exit_price: position.exit_price(),
        entry_time: position.entry_time,
        exit_time,
        pnl: position.realized_gross - position.commission,
        fragments: position.fragments,
    };
    *sequence += 1;
    trade
}

fn emit_open(key: &PartitionKey, position: OpenPosition, sequence: &mut usize) -> Trade {
    let trade = Trade {
        id: format!("{key}-{sequence}"),
        account: key.account.clone(),
        symbol: key.symbol.clone(),
        side: position.side,
        status: TradeStatus::Open,
        size: position.size,
        entry_price: position.entry_price(),
        exit_price: None,
        entry_time: position.entry_time,
        exit_time: None,
        pnl: 0.0,
        fragments: position.fragments,
    };
    *sequence += 1;
    trade
}

/// Build a closed trade from a complete fragment list. All opened
/// quantity has been closed, so the realized gross collapses to the
/// difference of the exit and entry notionals.
fn finish_closed(key: &PartitionKey, fragments: Vec<Fragment>, sequence: &mut usize) -> Trade {
    let side = trade_side_of(fragments[0].side);
    let (opened_quantity, entry_notional) = fragment_totals(&fragments, FragmentRole::Open);
    let (closed_quantity, exit_notional) = fragment_totals(&fragments, FragmentRole::Close);
    let commission: f64 = fragments.iter().map(|f| f.commission).sum();
    let gross = match side {
        TradeSide::Long => exit_notional - entry_notional,
        TradeSide::Short => entry_notional - exit_notional,
    };

    let entry_time = fragments[0].timestamp;
    let exit_time = fragments.last().map(|f| f.timestamp);
    let trade = Trade {
        id: format!("{key}-{sequence}"),
        account: key.account.clone(),
        symbol: key.symbol.clone(),
        side,
        status: TradeStatus::Closed,
        size: closed_quantity,
        entry_price: entry_notional / opened_quantity,
        exit_price: Some(exit_notional / closed_quantity),
        entry_time,
        exit_time,
        pnl: gross - commission,
        fragments,
    };
    *sequence += 1;
    trade
}

fn finish_open_from_fragments(
    key: &PartitionKey,
    fragments: Vec<Fragment>,
    position: f64,
    sequence: &mut usize,
) -> Trade {
    let side = trade_side_of(fragments[0].side);
    let (opened_quantity, entry_notional) = fragment_totals(&fragments, FragmentRole::Open);
    let trade = Trade {
        id: format!("{key}-{sequence}"),
        account: key.account.clone(),
        symbol: key.symbol.clone(),
        side,
        status: TradeStatus::Open,
        size: position.abs(),
        entry_price: entry_notional / opened_quantity,
        exit_price: None,
        entry_time: fragments[0].timestamp,
        exit_time: None,
        pnl: 0.0,
        fragments,
    };
    *sequence += 1;
    trade
}

fn fragment_totals(fragments: &[Fragment], role: FragmentRole) -> (f64, f64) {
    fragments
        .iter()
        .filter(|f| f.role == role)
        .fold((0.0, 0.0), |(quantity, notional), f| {
            (quantity + f.quantity, notional + f.price * f.quantity)
        })
}
