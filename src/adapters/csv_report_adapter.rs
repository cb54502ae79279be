//! CSV trade-list report adapter.

use std::path::Path;

use crate::domain::error::TradebookError;
use crate::domain::pipeline::ImportResult;
use crate::domain::trade::Trade;
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    fn record(trade: &Trade) -> Vec<String> {
        vec![
            trade.id.clone(),
            trade.account.clone(),
            trade.symbol.clone(),
            trade.side.to_string(),
            trade.status.to_string(),
            format_quantity(trade.size),
            format_money(trade.entry_price),
            trade.exit_price.map(format_money).unwrap_or_default(),
            trade.entry_time.to_rfc3339(),
            trade
                .exit_time
                .map(|time| time.to_rfc3339())
                .unwrap_or_default(),
            format_money(trade.pnl),
            format_money(trade.total_commission()),
            trade.fragments.len().to_string(),
        ]
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &ImportResult, output_path: &Path) -> Result<(), TradebookError> {
        let mut writer = csv::Writer::from_path(output_path).map_err(|e| TradebookError::Read {
            file: output_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let map_err = |e: csv::Error| TradebookError::Read {
            file: output_path.display().to_string(),
            reason: e.to_string(),
        };

        writer
            .write_record([
                "id",
                "account",
                "symbol",
                "side",
                "status",
                "size",
                "entry_price",
                "exit_price",
                "entry_time",
                "exit_time",
                "pnl",
                "commission",
                "fills",
            ])
            .map_err(map_err)?;

        for trade in &result.trades {
            writer.write_record(Self::record(trade)).map_err(map_err)?;
        }

        writer.flush().map_err(TradebookError::Io)?;
        Ok(())
    }
}

fn format_money(value: f64) -> String {
    format!("{:.4}", value)
}

/// Whole-share quantities print without a fractional tail.
fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
