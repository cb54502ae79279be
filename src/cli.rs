//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::delimited_adapter::DelimitedFileAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::columns::{self, CommissionColumns};
use crate::domain::error::TradebookError;
use crate::domain::pipeline::{self, ImportOptions, ImportResult};
use crate::domain::segment::Algorithm;
use crate::domain::stream::ParsedStream;
use crate::domain::trade::TradeStatus;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;
use crate::ports::row_source_port::RowSourcePort;

#[derive(Parser, Debug)]
#[command(name = "tradebook", about = "Broker-fill import and trade reconstruction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import an export file and write the reconstructed trade list
    Import {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        algorithm: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
        /// Partition by account and symbol only, ignoring the trading day
        #[arg(long)]
        no_day_split: bool,
        /// Re-segment with the counterpart algorithm and compare realized P&L
        #[arg(long)]
        cross_check: bool,
    },
    /// Parse only: report executions, row errors, and counts
    Check {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        timezone: Option<String>,
    },
    /// Show how a file's headers resolve to canonical fields
    Columns {
        #[arg(short, long)]
        file: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Import {
            file,
            config,
            output,
            algorithm,
            timezone,
            no_day_split,
            cross_check,
        } => run_import(
            &file,
            config.as_ref(),
            output.as_ref(),
            algorithm.as_deref(),
            timezone.as_deref(),
            no_day_split,
            cross_check,
        ),
        Command::Check {
            file,
            config,
            timezone,
        } => run_check(&file, config.as_ref(), timezone.as_deref()),
        Command::Columns { file } => run_columns(&file),
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = TradebookError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        fail(&err)
    })
}

fn fail(err: &TradebookError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

/// Flags override config values; built-in defaults apply when neither is
/// present.
fn build_options(
    config: Option<&FileConfigAdapter>,
    algorithm_flag: Option<&str>,
    timezone_flag: Option<&str>,
    no_day_split: bool,
) -> Result<ImportOptions, TradebookError> {
    let defaults = ImportOptions::default();

    let timezone = match timezone_flag
        .map(str::to_string)
        .or_else(|| config.and_then(|c| c.get_string("import", "timezone")))
    {
        Some(name) => name
            .parse()
            .map_err(|_| TradebookError::ConfigInvalid {
                section: "import".into(),
                key: "timezone".into(),
                reason: format!("unknown timezone \"{name}\""),
            })?,
        None => defaults.timezone,
    };

    let algorithm = match algorithm_flag
        .map(str::to_string)
        .or_else(|| config.and_then(|c| c.get_string("import", "algorithm")))
    {
        Some(name) => {
            Algorithm::from_name(&name).ok_or_else(|| TradebookError::ConfigInvalid {
                section: "import".into(),
                key: "algorithm".into(),
                reason: format!(
                    "unknown algorithm \"{name}\" (expected flip-split or zero-crossing)"
                ),
            })?
        }
        None => defaults.algorithm,
    };

    let partition_by_day = if no_day_split {
        false
    } else {
        config
            .map(|c| c.get_bool("import", "partition_by_day", defaults.partition_by_day))
            .unwrap_or(defaults.partition_by_day)
    };

    Ok(ImportOptions {
        timezone,
        partition_by_day,
        algorithm,
    })
}

fn read_and_parse(file: &Path, options: &ImportOptions) -> Result<ParsedStream, TradebookError> {
    eprintln!("Reading {}", file.display());
    let sheets = DelimitedFileAdapter::new().read_sheets(file)?;
    let source = file.display().to_string();
    pipeline::parse_sheets(&sheets, &source, options)
}

fn print_row_errors(stream: &ParsedStream) {
    for error in &stream.errors {
        eprintln!("warning: row {}: {}", error.row_number, error.reason);
    }
}

fn print_summary(result: &ImportResult, options: &ImportOptions) {
    let closed = result
        .trades
        .iter()
        .filter(|t| t.status == TradeStatus::Closed)
        .count();
    let open = result.trades.len() - closed;
    let realized: f64 = result
        .trades
        .iter()
        .filter(|t| t.status == TradeStatus::Closed)
        .map(|t| t.pnl)
        .sum();

    eprintln!("\n=== Import Summary ===");
    eprintln!("Algorithm:        {}", options.algorithm.as_str());
    eprintln!("Sheets processed: {}", result.meta.sheets_processed);
    eprintln!("Rows read:        {}", result.meta.total_rows);
    eprintln!("Valid executions: {}", result.meta.valid_executions);
    eprintln!(
        "Rows skipped:     {} missing symbol, {} invalid fields",
        result.meta.skipped_missing_symbol, result.meta.skipped_invalid
    );
    eprintln!("Trades:           {} closed, {} open", closed, open);
    eprintln!("Realized P&L:     {:+.2}", realized);
}

fn run_import(
    file: &Path,
    config_path: Option<&PathBuf>,
    output_flag: Option<&PathBuf>,
    algorithm_flag: Option<&str>,
    timezone_flag: Option<&str>,
    no_day_split: bool,
    cross_check: bool,
) -> ExitCode {
    let config = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(adapter) => Some(adapter),
                Err(code) => return code,
            }
        }
        None => None,
    };

    let options = match build_options(config.as_ref(), algorithm_flag, timezone_flag, no_day_split)
    {
        Ok(options) => options,
        Err(e) => return fail(&e),
    };

    let stream = match read_and_parse(file, &options) {
        Ok(parsed) => parsed,
        Err(e) => return fail(&e),
    };
    print_row_errors(&stream);

    let trades = match pipeline::build_trades(&stream, &options) {
        Ok(trades) => trades,
        Err(e) => return fail(&e),
    };

    if cross_check {
        let mismatches = pipeline::cross_check(&stream, &options);
        if mismatches.is_empty() {
            eprintln!(
                "Cross-check: {} agrees on realized P&L",
                options.algorithm.counterpart().as_str()
            );
        }
        for mismatch in &mismatches {
            eprintln!(
                "warning: cross-check mismatch in {}: {} reports {:+.2}, {} reports {:+.2}",
                mismatch.partition,
                options.algorithm.as_str(),
                mismatch.primary_pnl,
                options.algorithm.counterpart().as_str(),
                mismatch.counterpart_pnl,
            );
        }
    }

    let result = ImportResult {
        trades,
        errors: stream.errors.clone(),
        meta: stream.meta,
    };

    let output = output_flag
        .cloned()
        .or_else(|| {
            config
                .as_ref()
                .and_then(|c| c.get_string("report", "output"))
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("trades.csv"));

    if let Err(e) = CsvReportAdapter::new().write(&result, &output) {
        return fail(&e);
    }

    print_summary(&result, &options);
    eprintln!("\nTrades written to: {}", output.display());
    ExitCode::SUCCESS
}

fn run_check(file: &Path, config_path: Option<&PathBuf>, timezone_flag: Option<&str>) -> ExitCode {
    let config = match config_path {
        Some(path) => match load_config(path) {
            Ok(adapter) => Some(adapter),
            Err(code) => return code,
        },
        None => None,
    };

    let options = match build_options(config.as_ref(), None, timezone_flag, false) {
        Ok(options) => options,
        Err(e) => return fail(&e),
    };

    let stream = match read_and_parse(file, &options) {
        Ok(parsed) => parsed,
        Err(e) => return fail(&e),
    };
    print_row_errors(&stream);

    eprintln!("\nSheets processed: {}", stream.meta.sheets_processed);
    eprintln!("Rows read:        {}", stream.meta.total_rows);
    eprintln!("Valid executions: {}", stream.meta.valid_executions);
    eprintln!(
        "Rows skipped:     {} missing symbol, {} invalid fields",
        stream.meta.skipped_missing_symbol, stream.meta.skipped_invalid
    );

    if stream.executions.is_empty() {
        return fail(&TradebookError::NoExecutions);
    }
    ExitCode::SUCCESS
}

fn run_columns(file: &Path) -> ExitCode {
    let sheets = match DelimitedFileAdapter::new().read_sheets(file) {
        Ok(sheets) => sheets,
        Err(e) => return fail(&e),
    };

    let Some(sheet) = sheets.iter().find(|sheet| sheet.header().is_some()) else {
        return fail(&TradebookError::EmptyInput {
            file: file.display().to_string(),
        });
    };
    let header = sheet.header().expect("checked above");

    let resolved = match columns::resolve_columns(header) {
        Ok(resolved) => resolved,
        Err(e) => return fail(&e),
    };

    let cell = |at: usize| header.get(at).map(String::as_str).unwrap_or("");
    println!("symbol    -> column {} ({})", resolved.symbol + 1, cell(resolved.symbol));
    println!("side      -> column {} ({})", resolved.side + 1, cell(resolved.side));
    println!(
        "quantity  -> column {} ({})",
        resolved.quantity + 1,
        cell(resolved.quantity)
    );
    println!("price     -> column {} ({})", resolved.price + 1, cell(resolved.price));
    println!(
        "timestamp -> column {} ({})",
        resolved.timestamp + 1,
        cell(resolved.timestamp)
    );
    match resolved.account {
        Some(at) => println!("account   -> column {} ({})", at + 1, cell(at)),
        None => println!("account   -> (absent, rows default to DEFAULT)"),
    }
    match &resolved.commission {
        CommissionColumns::Breakdown(indexes) => {
            let names: Vec<&str> = indexes.iter().map(|&at| cell(at)).collect();
            println!("commission-> sum of {}", names.join(", "));
        }
        CommissionColumns::Single(at) => {
            println!("commission-> column {} ({})", at + 1, cell(*at));
        }
        CommissionColumns::Absent => println!("commission-> (absent, defaults to 0)"),
    }

    ExitCode::SUCCESS
}
