//! Execution stream building: per-row resolution, normalization, and
//! validation of raw export rows into a time-ordered execution list.

use chrono_tz::Tz;

use super::columns::{CommissionColumns, ResolvedColumns};
use super::error::RowReason;
use super::execution::{Execution, RowError};
use super::normalize;

/// One sheet of raw cell values, header row included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn header(&self) -> Option<&Vec<String>> {
        self.rows.first()
    }

    /// True when the sheet has a header and at least one data row.
    pub fn has_data(&self) -> bool {
        self.rows.len() > 1
    }

    /// Data rows paired with their 1-based source row number (the header
    /// is row 1, so data starts at row 2).
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &Vec<String>)> {
        self.rows.iter().enumerate().skip(1).map(|(at, row)| (at + 1, row))
    }
}

/// Counts reported back to the caller alongside the executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseMeta {
    pub sheets_processed: usize,
    pub total_rows: usize,
    pub valid_executions: usize,
    pub skipped_missing_symbol: usize,
    pub skipped_invalid: usize,
}

/// The stream builder's output: validated, time-ordered executions plus
/// the structured per-row error list.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStream {
    pub executions: Vec<Execution>,
    pub errors: Vec<RowError>,
    pub meta: ParseMeta,
}

/// Build the execution stream for one sheet.
///
/// Every data row is processed independently; a failure on one row is
/// recorded and never aborts the batch. Blank rows are skipped without
/// error. The result is stably sorted ascending by timestamp, so original
/// row order breaks ties.
pub fn build_stream(sheet: &RawSheet, columns: &ResolvedColumns, tz: Tz) -> ParsedStream {
    let mut executions = Vec::new();
    let mut errors = Vec::new();
    let mut meta = ParseMeta {
        sheets_processed: 1,
        ..ParseMeta::default()
    };

    for (row_number, row) in sheet.data_rows() {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        meta.total_rows += 1;

        match build_execution(row, columns, tz, row_number) {
            Ok(execution) => {
                meta.valid_executions += 1;
                executions.push(execution);
            }
            Err(reason) => {
                if reason.is_missing_symbol() {
                    meta.skipped_missing_symbol += 1;
                } else {
                    meta.skipped_invalid += 1;
                }
                errors.push(RowError { row_number, reason });
            }
        }
    }

    executions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    ParsedStream {
        executions,
        errors,
        meta,
    }
}

fn build_execution(
    row: &[String],
    columns: &ResolvedColumns,
    tz: Tz,
    row_number: usize,
) -> Result<Execution, RowReason> {
    let cell = |at: usize| row.get(at).map(String::as_str).unwrap_or("").trim();

    let symbol = cell(columns.symbol).to_uppercase();
    if symbol.is_empty() {
        return Err(RowReason::MissingSymbol);
    }

    let side_raw = cell(columns.side);
    let side =
        normalize::parse_side(side_raw).ok_or_else(|| RowReason::InvalidSide(side_raw.into()))?;

    let quantity_raw = cell(columns.quantity);
    let quantity = normalize::parse_number(quantity_raw)
        .filter(|q| *q > 0.0)
        .ok_or_else(|| RowReason::InvalidQuantity(quantity_raw.into()))?;

    let price_raw = cell(columns.price);
    let price = normalize::parse_number(price_raw)
        .filter(|p| *p > 0.0)
        .ok_or_else(|| RowReason::InvalidPrice(price_raw.into()))?;

    let commission = resolve_commission(row, columns)?;

    let timestamp_raw = cell(columns.timestamp);
    let timestamp = normalize::parse_local_timestamp(timestamp_raw)
        .and_then(|naive| normalize::anchor(naive, tz))
        .ok_or_else(|| RowReason::InvalidTimestamp(timestamp_raw.into()))?;

    let account = columns
        .account
        .map(cell)
        .filter(|value| !value.is_empty())
        .unwrap_or("DEFAULT")
        .to_string();

    Ok(Execution {
        account,
        symbol,
        side,
        quantity,
        price,
        commission,
        timestamp,
        row_number,
    })
}

/// Commission for one row: breakdown columns are summed (empty cells count
/// as 0), a single column parses directly, and a wholly absent column
/// defaults to 0. A present-but-unparseable or negative value invalidates
/// the row; commission is never silently coerced.
fn resolve_commission(row: &[String], columns: &ResolvedColumns) -> Result<f64, RowReason> {
    let cell = |at: usize| row.get(at).map(String::as_str).unwrap_or("").trim();

    let total = match &columns.commission {
        CommissionColumns::Breakdown(indexes) => {
            let mut sum = 0.0;
            for &at in indexes {
                let raw = cell(at);
                if raw.is_empty() {
                    continue;
                }
                sum += normalize::parse_number(raw)
                    .ok_or_else(|| RowReason::InvalidCommission(raw.into()))?;
            }
            sum
        }
        CommissionColumns::Single(at) => {
            let raw = cell(*at);
            if raw.is_empty() {
                0.0
            } else {
                normalize::parse_number(raw)
                    .ok_or_else(|| RowReason::InvalidCommission(raw.into()))?
            }
        }
        CommissionColumns::Absent => 0.0,
    };

    if total < 0.0 {
        return Err(RowReason::InvalidCommission(format!("{total}")));
    }
    Ok(total)
}
