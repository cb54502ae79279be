//! Canonical execution records produced by the stream builder.

use chrono::{DateTime, Utc};

use super::error::RowReason;

/// Direction of a single fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic fill, fully resolved and validated.
///
/// Constructed exactly once by the stream builder and never mutated.
/// The timestamp is an absolute instant; the naive wall-clock value from
/// the export has already been anchored to the reference exchange timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub account: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub timestamp: DateTime<Utc>,
    /// 1-based source row (header row counts as row 1) for error attribution.
    pub row_number: usize,
}

impl Execution {
    /// Quantity with the sign convention used by the position tracker:
    /// positive for buys, negative for sells.
    pub fn signed_quantity(&self) -> f64 {
        match self.side {
            Side::Buy => self.quantity,
            Side::Sell => -self.quantity,
        }
    }
}

/// A rejected row: which row and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_number: usize,
    pub reason: RowReason,
}
