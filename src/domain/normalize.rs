//! Field normalization: locale-variant numbers, broker side codes, and
//! multi-layout timestamps.
//!
//! Timestamps pass through two distinct types: the raw cell parses to a
//! [`NaiveDateTime`] (local wall-clock value), and [`anchor`] is the single
//! boundary that interprets it in the reference exchange timezone and
//! converts to an absolute [`DateTime<Utc>`] instant.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::execution::Side;

/// Reference exchange timezone used when none is configured.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;

/// Date-time layouts accepted from exports, in trial order.
///
/// Month-first layouts come before day-first, so an ambiguous value like
/// "02/03/25 09:31:00" resolves month-first (February 3).
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%y %H:%M:%S",
    "%d/%m/%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts; the time defaults to midnight.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m/%d/%y", "%d/%m/%y", "%Y-%m-%d"];

/// Map a broker side code to a canonical side.
///
/// SS is the "sell to open short" code some platforms emit; it collapses
/// to SELL, the position sign downstream recovers the short-open meaning.
pub fn parse_side(raw: &str) -> Option<Side> {
    match raw.trim().to_uppercase().as_str() {
        "B" | "BUY" | "BOT" => Some(Side::Buy),
        "S" | "SELL" | "SLD" | "SHORT" | "SS" => Some(Side::Sell),
        _ => None,
    }
}

/// Parse a locale-variant numeric cell.
///
/// Strips currency symbols and whitespace; a fully parenthesized value is
/// negative. Thousands vs. decimal separator is disambiguated by position:
/// the rightmost of the last comma and last dot is the decimal separator,
/// every other comma/dot is stripped.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, inner) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner
        .chars()
        .filter(|ch| !ch.is_whitespace() && !matches!(ch, '$' | '€' | '£'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value: f64 = canonicalize_separators(&cleaned).parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

fn canonicalize_separators(s: &str) -> String {
    let decimal_at = match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) => Some(comma.max(dot)),
        (Some(comma), None) => Some(comma),
        (None, Some(dot)) => Some(dot),
        (None, None) => None,
    };

    s.char_indices()
        .filter_map(|(at, ch)| match ch {
            ',' | '.' => (Some(at) == decimal_at).then_some('.'),
            _ => Some(ch),
        })
        .collect()
}

/// Parse a timestamp cell into the naive local wall-clock value.
///
/// Accepts the layout ladder above plus spreadsheet serial date-times
/// (bare numerics, days since 1899-12-30 with the fraction as time of day).
pub fn parse_local_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(parsed) = parse_spreadsheet_serial(trimmed) {
        return Some(parsed);
    }

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(fix_two_digit_year(parsed));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0).map(fix_two_digit_year);
        }
    }

    None
}

/// Anchor a naive local value in the exchange timezone and convert to an
/// absolute instant. DST rules for the target date apply: ambiguous
/// fall-back times take the earlier offset, nonexistent spring-forward
/// times roll forward one hour.
pub fn anchor(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|anchored| anchored.with_timezone(&Utc))
}

/// The exchange-local calendar date of an instant; the trading-day
/// component of the partition key.
pub fn exchange_day(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// A two-digit year always means 2000+YY, regardless of which layout
/// matched it (the greedy four-digit parse yields years below 100, the
/// two-digit parse puts 69-99 in the 1900s).
fn fix_two_digit_year(parsed: NaiveDateTime) -> NaiveDateTime {
    let year = parsed.year();
    let fixed = if (0..100).contains(&year) {
        year + 2000
    } else if (1900..2000).contains(&year) {
        year + 100
    } else {
        year
    };
    if fixed == year {
        parsed
    } else {
        parsed.with_year(fixed).unwrap_or(parsed)
    }
}

fn parse_spreadsheet_serial(raw: &str) -> Option<NaiveDateTime> {
    if raw.contains(['/', '-', ':']) {
        return None;
    }
    let value: f64 = raw.parse().ok()?;
    // Serial 20000 is mid-1954, 80000 is 2119; anything outside is a
    // plain number that landed in the timestamp column.
    if !(20_000.0..80_000.0).contains(&value) {
        return None;
    }

    let days = value.floor();
    let seconds = ((value - days) * 86_400.0).round() as i64;
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days as u64))?;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight + Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    mod sides {
        use super::*;

        #[test]
        fn single_letter_and_word_codes() {
            assert_eq!(parse_side("B"), Some(Side::Buy));
            assert_eq!(parse_side("buy"), Some(Side::Buy));
            assert_eq!(parse_side("BOT"), Some(Side::Buy));
            assert_eq!(parse_side("S"), Some(Side::Sell));
            assert_eq!(parse_side(" sell "), Some(Side::Sell));
            assert_eq!(parse_side("SLD"), Some(Side::Sell));
        }

        #[test]
        fn sell_to_open_short_collapses_to_sell() {
            assert_eq!(parse_side("SS"), Some(Side::Sell));
            assert_eq!(parse_side("SHORT"), Some(Side::Sell));
        }

        #[test]
        fn unknown_codes_rejected() {
            assert_eq!(parse_side("HOLD"), None);
            assert_eq!(parse_side(""), None);
        }
    }

    mod numbers {
        use super::*;

        #[test]
        fn both_locale_conventions_normalize_identically() {
            assert_eq!(parse_number("1.234,56"), Some(1234.56));
            assert_eq!(parse_number("1,234.56"), Some(1234.56));
        }

        #[test]
        fn parenthesized_value_is_negative() {
            assert_eq!(parse_number("(12.50)"), Some(-12.50));
            assert_eq!(parse_number("($1,000.00)"), Some(-1000.0));
        }

        #[test]
        fn currency_symbols_and_whitespace_stripped() {
            assert_eq!(parse_number("$ 12.50"), Some(12.50));
            assert_eq!(parse_number("€1.234,00"), Some(1234.0));
            assert_eq!(parse_number("-£5"), Some(-5.0));
        }

        #[test]
        fn lone_comma_is_a_decimal_separator() {
            assert_eq!(parse_number("12,5"), Some(12.5));
        }

        #[test]
        fn multiple_thousands_groups_stripped() {
            assert_eq!(parse_number("1.234.567,89"), Some(1_234_567.89));
            assert_eq!(parse_number("1,234,567.89"), Some(1_234_567.89));
        }

        #[test]
        fn garbage_rejected() {
            assert_eq!(parse_number(""), None);
            assert_eq!(parse_number("abc"), None);
            assert_eq!(parse_number("$"), None);
        }
    }

    mod timestamps {
        use super::*;

        #[test]
        fn ambiguous_slash_date_resolves_month_first() {
            assert_eq!(
                parse_local_timestamp("02/03/25 09:31:00"),
                Some(naive(2025, 2, 3, 9, 31, 0))
            );
        }

        #[test]
        fn day_first_applies_when_month_first_is_impossible() {
            assert_eq!(
                parse_local_timestamp("14/02/25 09:31:00"),
                Some(naive(2025, 2, 14, 9, 31, 0))
            );
        }

        #[test]
        fn four_digit_year_with_seconds() {
            assert_eq!(
                parse_local_timestamp("02/15/2024 09:30:00"),
                Some(naive(2024, 2, 15, 9, 30, 0))
            );
        }

        #[test]
        fn twelve_hour_clock_with_meridiem() {
            assert_eq!(
                parse_local_timestamp("02/15/2024 1:05:09 PM"),
                Some(naive(2024, 2, 15, 13, 5, 9))
            );
            assert_eq!(
                parse_local_timestamp("02/15/2024 9:30 AM"),
                Some(naive(2024, 2, 15, 9, 30, 0))
            );
        }

        #[test]
        fn iso_layouts_with_and_without_seconds() {
            assert_eq!(
                parse_local_timestamp("2024-02-15 09:30:00"),
                Some(naive(2024, 2, 15, 9, 30, 0))
            );
            assert_eq!(
                parse_local_timestamp("2024-02-15 09:30"),
                Some(naive(2024, 2, 15, 9, 30, 0))
            );
        }

        #[test]
        fn date_only_defaults_to_midnight() {
            assert_eq!(
                parse_local_timestamp("02/15/2024"),
                Some(naive(2024, 2, 15, 0, 0, 0))
            );
            assert_eq!(
                parse_local_timestamp("2024-02-15"),
                Some(naive(2024, 2, 15, 0, 0, 0))
            );
        }

        #[test]
        fn two_digit_year_resolves_to_2000s() {
            assert_eq!(
                parse_local_timestamp("02/03/99 10:00:00"),
                Some(naive(2099, 2, 3, 10, 0, 0))
            );
            assert_eq!(
                parse_local_timestamp("02/03/07 10:00:00"),
                Some(naive(2007, 2, 3, 10, 0, 0))
            );
        }

        #[test]
        fn spreadsheet_serial_with_time_fraction() {
            // 45323 = 2024-02-01; .5 = noon.
            assert_eq!(
                parse_local_timestamp("45323.5"),
                Some(naive(2024, 2, 1, 12, 0, 0))
            );
            assert_eq!(
                parse_local_timestamp("45323"),
                Some(naive(2024, 2, 1, 0, 0, 0))
            );
        }

        #[test]
        fn small_bare_numbers_are_not_serials() {
            assert_eq!(parse_local_timestamp("1234.56"), None);
            assert_eq!(parse_local_timestamp("0"), None);
        }

        #[test]
        fn empty_and_garbage_rejected() {
            assert_eq!(parse_local_timestamp(""), None);
            assert_eq!(parse_local_timestamp("not a date"), None);
        }
    }

    mod anchoring {
        use super::*;

        #[test]
        fn winter_and_summer_offsets_differ_for_target_dates() {
            // 2025-03-09 02:00 is the US spring-forward; the same wall
            // clock maps to different UTC offsets on either side of it.
            let winter = anchor(naive(2025, 3, 8, 9, 31, 0), DEFAULT_TIMEZONE).unwrap();
            let summer = anchor(naive(2025, 3, 10, 9, 31, 0), DEFAULT_TIMEZONE).unwrap();
            assert_eq!(winter, Utc.with_ymd_and_hms(2025, 3, 8, 14, 31, 0).unwrap());
            assert_eq!(summer, Utc.with_ymd_and_hms(2025, 3, 10, 13, 31, 0).unwrap());
        }

        #[test]
        fn spring_forward_gap_rolls_forward_one_hour() {
            let gap = anchor(naive(2025, 3, 9, 2, 30, 0), DEFAULT_TIMEZONE).unwrap();
            assert_eq!(gap, Utc.with_ymd_and_hms(2025, 3, 9, 7, 30, 0).unwrap());
        }

        #[test]
        fn fall_back_ambiguity_takes_the_earlier_offset() {
            // 2025-11-02 01:30 occurs twice; the earlier (EDT) offset wins.
            let ambiguous = anchor(naive(2025, 11, 2, 1, 30, 0), DEFAULT_TIMEZONE).unwrap();
            assert_eq!(
                ambiguous,
                Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap()
            );
        }

        #[test]
        fn exchange_day_uses_the_local_calendar_date() {
            // 2025-02-03 23:30 New York is 04:30 UTC on the 4th.
            let instant = anchor(naive(2025, 2, 3, 23, 30, 0), DEFAULT_TIMEZONE).unwrap();
            assert_eq!(instant.date_naive(), NaiveDate::from_ymd_opt(2025, 2, 4).unwrap());
            assert_eq!(
                exchange_day(instant, DEFAULT_TIMEZONE),
                NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
            );
        }
    }
}
