//! Trade output records and the per-partition position working state.

use chrono::{DateTime, Utc};

use super::execution::{Execution, Side};

/// Direction of a round-trip trade, fixed when the position opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "LONG",
            TradeSide::Short => "SHORT",
        }
    }

    /// The fill direction that opens (or adds to) a position on this side.
    pub fn opening_side(&self) -> Side {
        match self {
            TradeSide::Long => Side::Buy,
            TradeSide::Short => Side::Sell,
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Closed,
    Open,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Closed => "CLOSED",
            TradeStatus::Open => "OPEN",
        }
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a fragment opened or closed quantity within its trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRole {
    Open,
    Close,
}

/// One contributing slice of an execution.
///
/// Usually a whole execution; a quantity/commission-split slice when the
/// source execution both closes one trade and opens the next (a flip).
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub role: FragmentRole,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    /// This fragment's share of the source execution's commission.
    pub commission: f64,
    pub timestamp: DateTime<Utc>,
    pub row_number: usize,
}

impl Fragment {
    /// A fragment covering the whole execution.
    pub fn whole(role: FragmentRole, execution: &Execution) -> Self {
        Fragment {
            role,
            side: execution.side,
            quantity: execution.quantity,
            price: execution.price,
            commission: execution.commission,
            timestamp: execution.timestamp,
            row_number: execution.row_number,
        }
    }

    /// A slice of the execution with the commission prorated by quantity.
    pub fn slice(role: FragmentRole, execution: &Execution, quantity: f64) -> Self {
        let commission = execution.commission * (quantity / execution.quantity);
        Fragment {
            role,
            side: execution.side,
            quantity,
            price: execution.price,
            commission,
            timestamp: execution.timestamp,
            row_number: execution.row_number,
        }
    }
}

/// A reconstructed round-trip (or still-open) trade.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: String,
    pub account: String,
    pub symbol: String,
    pub side: TradeSide,
    pub status: TradeStatus,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    /// Realized gross minus accumulated fragment commission; 0 for OPEN trades.
    pub pnl: f64,
    pub fragments: Vec<Fragment>,
}

impl Trade {
    /// Sort key for the final trade list: exit time for closed trades,
    /// entry time for trades still open at end of stream.
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.exit_time.unwrap_or(self.entry_time)
    }

    pub fn total_commission(&self) -> f64 {
        self.fragments.iter().map(|f| f.commission).sum()
    }
}

/// Working state for the currently-open trade of one partition.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub side: TradeSide,
    /// Absolute open quantity; the signed position is `side`-signed.
    pub size: f64,
    pub avg_entry: f64,
    pub entry_time: DateTime<Utc>,
    pub opened_quantity: f64,
    pub entry_notional: f64,
    pub closed_quantity: f64,
    pub exit_notional: f64,
    pub realized_gross: f64,
    pub commission: f64,
    pub fragments: Vec<Fragment>,
}

impl OpenPosition {
    /// Open a fresh position from one opening fragment.
    pub fn open(side: TradeSide, fragment: Fragment) -> Self {
        OpenPosition {
            side,
            size: fragment.quantity,
            avg_entry: fragment.price,
            entry_time: fragment.timestamp,
            opened_quantity: fragment.quantity,
            entry_notional: fragment.price * fragment.quantity,
            closed_quantity: 0.0,
            exit_notional: 0.0,
            realized_gross: 0.0,
            commission: fragment.commission,
            fragments: vec![fragment],
        }
    }

    /// Signed position size: positive long, negative short.
    pub fn signed_size(&self) -> f64 {
        match self.side {
            TradeSide::Long => self.size,
            TradeSide::Short => -self.size,
        }
    }

    /// Notional-weighted average over the opening fragments.
    pub fn entry_price(&self) -> f64 {
        if self.opened_quantity > 0.0 {
            self.entry_notional / self.opened_quantity
        } else {
            self.avg_entry
        }
    }

    /// Notional-weighted average over the closing fragments, if any closed.
    pub fn exit_price(&self) -> Option<f64> {
        if self.closed_quantity > 0.0 {
            Some(self.exit_notional / self.closed_quantity)
        } else {
            None
        }
    }
}

/// Explicit per-partition position state threaded through the segmenter fold.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}
