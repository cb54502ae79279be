#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::io::Write;
use tempfile::NamedTempFile;
use tradebook::domain::execution::{Execution, Side};
use tradebook::domain::segment::PartitionKey;
use tradebook::domain::trade::{FragmentRole, Trade, TradeStatus};

/// An afternoon UTC instant on the reference trading day, offset by minutes.
pub fn instant(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 3, 14, 0, 0).unwrap() + chrono::Duration::minutes(minute as i64)
}

pub fn make_execution(
    side: Side,
    quantity: f64,
    price: f64,
    commission: f64,
    minute: u32,
) -> Execution {
    Execution {
        account: "ACC1".into(),
        symbol: "AAPL".into(),
        side,
        quantity,
        price,
        commission,
        timestamp: instant(minute),
        row_number: minute as usize + 2,
    }
}

pub fn partition_key() -> PartitionKey {
    PartitionKey {
        account: "ACC1".into(),
        symbol: "AAPL".into(),
        day: None,
    }
}

pub fn write_export(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

pub fn closed_trades(trades: &[Trade]) -> Vec<&Trade> {
    trades
        .iter()
        .filter(|trade| trade.status == TradeStatus::Closed)
        .collect()
}

pub fn closed_pnl(trades: &[Trade]) -> f64 {
    closed_trades(trades).iter().map(|trade| trade.pnl).sum()
}

/// Sum of a trade's fragment quantities for one role.
pub fn fragment_quantity(trade: &Trade, role: FragmentRole) -> f64 {
    trade
        .fragments
        .iter()
        .filter(|fragment| fragment.role == role)
        .map(|fragment| fragment.quantity)
        .sum()
}
