//! End-to-end import orchestration: sheet selection, column resolution,
//! stream building, partitioning, and segmentation.

use chrono_tz::Tz;

use super::columns;
use super::error::TradebookError;
use super::execution::RowError;
use super::normalize::DEFAULT_TIMEZONE;
use super::segment::{self, Algorithm, PartitionKey};
use super::stream::{self, ParseMeta, ParsedStream, RawSheet};
use super::trade::{Trade, TradeStatus};

/// Import configuration resolved from config file and CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub timezone: Tz,
    pub partition_by_day: bool,
    pub algorithm: Algorithm,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            timezone: DEFAULT_TIMEZONE,
            partition_by_day: true,
            algorithm: Algorithm::FlipSplit,
        }
    }
}

/// The full import output handed to reporting collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportResult {
    pub trades: Vec<Trade>,
    pub errors: Vec<RowError>,
    pub meta: ParseMeta,
}

/// A per-partition realized-P&L disagreement between the two segmenters.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossCheckMismatch {
    pub partition: PartitionKey,
    pub primary_pnl: f64,
    pub counterpart_pnl: f64,
}

/// Parse the first sheet that has a header and data.
///
/// Structural failures (nothing parseable, unresolvable required columns)
/// are fatal; row-level failures come back as data inside the stream.
pub fn parse_sheets(
    sheets: &[RawSheet],
    source: &str,
    options: &ImportOptions,
) -> Result<ParsedStream, TradebookError> {
    let sheet = sheets
        .iter()
        .find(|sheet| sheet.has_data())
        .ok_or_else(|| TradebookError::EmptyInput {
            file: source.to_string(),
        })?;

    let header = sheet.header().expect("sheet with data has a header");
    let resolved = columns::resolve_columns(header)?;

    let mut stream = stream::build_stream(sheet, &resolved, options.timezone);
    stream.meta.sheets_processed = sheets.len();
    Ok(stream)
}

/// Segment a parsed stream into the final ordered trade list.
pub fn build_trades(
    stream: &ParsedStream,
    options: &ImportOptions,
) -> Result<Vec<Trade>, TradebookError> {
    if stream.executions.is_empty() {
        return Err(TradebookError::NoExecutions);
    }

    let segmenter = options.algorithm.segmenter();
    let partitions =
        segment::partition_executions(&stream.executions, options.timezone, options.partition_by_day);

    let mut trades: Vec<Trade> = partitions
        .iter()
        .flat_map(|(key, executions)| segmenter.segment(key, executions))
        .collect();

    if trades.is_empty() {
        return Err(TradebookError::NoTrades);
    }

    // Closed trades order by exit time, open trades by entry time; the
    // sort is stable so partition order breaks exact ties.
    trades.sort_by_key(|trade| trade.effective_time());
    Ok(trades)
}

/// One-call import: parse, segment, and bundle the result.
pub fn run_import(
    sheets: &[RawSheet],
    source: &str,
    options: &ImportOptions,
) -> Result<ImportResult, TradebookError> {
    let stream = parse_sheets(sheets, source, options)?;
    let trades = build_trades(&stream, options)?;
    Ok(ImportResult {
        trades,
        errors: stream.errors,
        meta: stream.meta,
    })
}

/// Run the counterpart segmenter over the same partitions and compare
/// total realized P&L. The algorithms may draw trade boundaries
/// differently, but any per-partition P&L drift is a defect.
pub fn cross_check(stream: &ParsedStream, options: &ImportOptions) -> Vec<CrossCheckMismatch> {
    const TOLERANCE: f64 = 1e-6;

    let primary = options.algorithm.segmenter();
    let counterpart = options.algorithm.counterpart().segmenter();
    let partitions =
        segment::partition_executions(&stream.executions, options.timezone, options.partition_by_day);

    let realized = |trades: &[Trade]| -> f64 {
        trades
            .iter()
            .filter(|trade| trade.status == TradeStatus::Closed)
            .map(|trade| trade.pnl)
            .sum()
    };

    let mut mismatches = Vec::new();
    for (key, executions) in &partitions {
        let primary_pnl = realized(&primary.segment(key, executions));
        let counterpart_pnl = realized(&counterpart.segment(key, executions));
        if (primary_pnl - counterpart_pnl).abs() > TOLERANCE {
            mismatches.push(CrossCheckMismatch {
                partition: key.clone(),
                primary_pnl,
                counterpart_pnl,
            });
        }
    }
    mismatches
}
