//! Header resolution: maps raw export columns to canonical fields.

use std::collections::HashMap;

use super::error::TradebookError;

const SYMBOL_ALIASES: &[&str] = &["symbol", "ticker", "stock", "instrument"];
const SIDE_ALIASES: &[&str] = &["side", "action", "b/s", "type"];
const QUANTITY_ALIASES: &[&str] = &["qty", "quantity", "shares", "size", "filled"];
const PRICE_ALIASES: &[&str] = &["price", "fill price", "avg price", "execution price"];
const TIMESTAMP_ALIASES: &[&str] = &[
    "date/time",
    "time/date",
    "datetime",
    "timestamp",
    "time",
    "date",
];
const ACCOUNT_ALIASES: &[&str] = &["account", "acct", "cuenta"];
const COMMISSION_ALIASES: &[&str] = &["commission", "comm", "fee", "fees", "fees total"];

/// Per-fee columns some exports split commission into. Summed per row
/// when present.
const FEE_BREAKDOWN_ALIASES: &[&str] = &[
    "comm",
    "commission",
    "ecn fee",
    "sec",
    "taf",
    "nscc",
    "clr",
    "cat",
    "misc",
];

/// How commission is assembled for each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommissionColumns {
    /// Sum of several sub-fee columns.
    Breakdown(Vec<usize>),
    /// One commission column.
    Single(usize),
    /// No commission column at all; defaults to 0 per row.
    Absent,
}

/// Resolved column indexes for one header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub symbol: usize,
    pub side: usize,
    pub quantity: usize,
    pub price: usize,
    pub timestamp: usize,
    pub account: Option<usize>,
    pub commission: CommissionColumns,
}

/// Canonicalize one raw header cell: strip a leading byte-order mark,
/// trim, lowercase, fold `_`/`-` runs to a single space, collapse spaces.
pub fn normalize_header(raw: &str) -> String {
    let stripped = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut out = String::with_capacity(stripped.len());
    let mut pending_space = false;
    for ch in stripped.trim().chars() {
        let ch = if ch == '_' || ch == '-' { ' ' } else { ch };
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.extend(ch.to_lowercase());
    }
    out
}

/// Resolve every canonical field against one header row.
///
/// Fails only when one of symbol, side, quantity, price, or timestamp has
/// no matching column; account and commission are optional.
pub fn resolve_columns(header: &[String]) -> Result<ResolvedColumns, TradebookError> {
    // First occurrence of each normalized header wins.
    let mut lookup: HashMap<String, usize> = HashMap::new();
    for (index, cell) in header.iter().enumerate() {
        lookup.entry(normalize_header(cell)).or_insert(index);
    }

    let find = |aliases: &[&str]| -> Option<usize> {
        aliases.iter().find_map(|alias| lookup.get(*alias).copied())
    };

    let symbol = find(SYMBOL_ALIASES);
    let side = find(SIDE_ALIASES);
    let quantity = find(QUANTITY_ALIASES);
    let price = find(PRICE_ALIASES);
    let timestamp = find(TIMESTAMP_ALIASES);

    let mut missing = Vec::new();
    if symbol.is_none() {
        missing.push("symbol".to_string());
    }
    if side.is_none() {
        missing.push("side".to_string());
    }
    if quantity.is_none() {
        missing.push("quantity".to_string());
    }
    if price.is_none() {
        missing.push("price".to_string());
    }
    if timestamp.is_none() {
        missing.push("timestamp".to_string());
    }
    if !missing.is_empty() {
        return Err(TradebookError::MissingColumns { columns: missing });
    }

    let breakdown: Vec<usize> = FEE_BREAKDOWN_ALIASES
        .iter()
        .filter_map(|alias| lookup.get(*alias).copied())
        .collect();

    let commission = if !breakdown.is_empty() {
        CommissionColumns::Breakdown(breakdown)
    } else if let Some(index) = find(COMMISSION_ALIASES) {
        CommissionColumns::Single(index)
    } else {
        CommissionColumns::Absent
    };

    Ok(ResolvedColumns {
        symbol: symbol.unwrap(),
        side: side.unwrap(),
        quantity: quantity.unwrap(),
        price: price.unwrap(),
        timestamp: timestamp.unwrap(),
        account: find(ACCOUNT_ALIASES),
        commission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn normalize_header_strips_bom_and_folds_separators() {
        assert_eq!(normalize_header("\u{feff}Symbol"), "symbol");
        assert_eq!(normalize_header("  Fill_Price "), "fill price");
        assert_eq!(normalize_header("DATE-TIME"), "date time");
        assert_eq!(normalize_header("B/S"), "b/s");
    }

    #[test]
    fn resolves_exact_canonical_headers() {
        let cols = resolve_columns(&header(&[
            "Symbol", "Side", "Qty", "Price", "Date/Time", "Account", "Commission",
        ]))
        .unwrap();
        assert_eq!(cols.symbol, 0);
        assert_eq!(cols.side, 1);
        assert_eq!(cols.quantity, 2);
        assert_eq!(cols.price, 3);
        assert_eq!(cols.timestamp, 4);
        assert_eq!(cols.account, Some(5));
        // "commission" is also a breakdown alias, so a lone commission
        // column resolves through the breakdown path; the sum is identical.
        assert_eq!(cols.commission, CommissionColumns::Breakdown(vec![6]));
    }

    #[test]
    fn resolves_alternate_aliases_case_insensitively() {
        let cols = resolve_columns(&header(&[
            "TICKER", "b/s", "Filled", "Avg Price", "TimeStamp", "cuenta",
        ]))
        .unwrap();
        assert_eq!(cols.symbol, 0);
        assert_eq!(cols.side, 1);
        assert_eq!(cols.quantity, 2);
        assert_eq!(cols.price, 3);
        assert_eq!(cols.timestamp, 4);
        assert_eq!(cols.account, Some(5));
        assert_eq!(cols.commission, CommissionColumns::Absent);
    }

    #[test]
    fn fee_breakdown_collects_every_present_sub_fee_column() {
        let cols = resolve_columns(&header(&[
            "Symbol", "Side", "Qty", "Price", "Time", "Comm", "ECN Fee", "SEC", "TAF", "NSCC",
        ]))
        .unwrap();
        assert_eq!(
            cols.commission,
            CommissionColumns::Breakdown(vec![5, 6, 7, 8, 9])
        );
    }

    #[test]
    fn single_commission_aliases_apply_when_no_breakdown_column_exists() {
        let cols = resolve_columns(&header(&[
            "Symbol",
            "Side",
            "Qty",
            "Price",
            "Time",
            "Fees Total",
        ]))
        .unwrap();
        assert_eq!(cols.commission, CommissionColumns::Single(5));
    }

    #[test]
    fn missing_required_columns_all_reported() {
        let err = resolve_columns(&header(&["Symbol", "Qty", "Time"])).unwrap_err();
        match err {
            TradebookError::MissingColumns { columns } => {
                assert_eq!(columns, vec!["side", "price"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn commission_is_never_a_fatal_column() {
        let cols = resolve_columns(&header(&["Symbol", "Side", "Qty", "Price", "Time"])).unwrap();
        assert_eq!(cols.commission, CommissionColumns::Absent);
        assert_eq!(cols.account, None);
    }

    #[test]
    fn first_matching_column_wins_on_duplicates() {
        let cols = resolve_columns(&header(&[
            "Symbol", "Side", "Qty", "Price", "Date", "Time", "Symbol",
        ]))
        .unwrap();
        assert_eq!(cols.symbol, 0);
        // "date/time" aliases prefer "time" over "date" by table order.
        assert_eq!(cols.timestamp, 5);
    }
}
