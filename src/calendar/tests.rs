#![allow(clippy::unwrap_used)]

use super::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ── month_bounds ──────────────────────────────────────────────

#[test]
fn test_month_bounds_every_month_non_leap() {
    let expected = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    for (i, days) in expected.iter().enumerate() {
        let month = i as u32 + 1;
        let (first, last) = month_bounds(2025, month).unwrap();
        assert_eq!(first, date(2025, month, 1));
        assert_eq!(last, date(2025, month, *days));
    }
}

#[test]
fn test_month_bounds_every_month_leap() {
    let expected = [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    for (i, days) in expected.iter().enumerate() {
        let month = i as u32 + 1;
        let (_, last) = month_bounds(2024, month).unwrap();
        assert_eq!(last, date(2024, month, *days));
    }
}

#[test]
fn test_century_leap_rules() {
    assert!(!is_leap_year(1900));
    assert!(is_leap_year(2000));
    assert_eq!(days_in_month(2100, 2), 28);
}

#[test]
fn test_month_bounds_invalid_month() {
    assert!(month_bounds(2025, 0).is_none());
    assert!(month_bounds(2025, 13).is_none());
}

// ── IST clock ─────────────────────────────────────────────────

#[test]
fn test_ist_rolls_date_forward_after_1830_utc() {
    let before = DateTime::parse_from_rfc3339("2025-01-31T18:29:00Z")
        .unwrap()
        .with_timezone(&Utc);
    let after = DateTime::parse_from_rfc3339("2025-01-31T18:30:00Z")
        .unwrap()
        .with_timezone(&Utc);
    assert_eq!(ist_date(before), date(2025, 1, 31));
    assert_eq!(ist_date(after), date(2025, 2, 1));
}

// ── YearMonth ─────────────────────────────────────────────────

#[test]
fn test_previous_wraps_year() {
    assert_eq!(YearMonth::new(2025, 1).previous(), YearMonth::new(2024, 12));
    assert_eq!(YearMonth::new(2025, 3).previous(), YearMonth::new(2025, 2));
}

#[test]
fn test_year_month_parse() {
    assert_eq!(YearMonth::parse("2025-01"), Some(YearMonth::new(2025, 1)));
    assert!(YearMonth::parse("2025-13").is_none());
    assert!(YearMonth::parse("2025-1").is_none());
    assert!(YearMonth::parse("garbage").is_none());
}

#[test]
fn test_year_month_contains_and_display() {
    let jan = YearMonth::new(2025, 1);
    assert!(jan.contains(date(2025, 1, 31)));
    assert!(!jan.contains(date(2024, 1, 31)));
    assert_eq!(jan.to_string(), "January 2025");
}

// ── Formatting ────────────────────────────────────────────────

#[test]
fn test_display_date_has_no_leading_zero() {
    assert_eq!(format_display_date(date(2025, 1, 5)), "5 Jan 2025");
    assert_eq!(format_display_date(date(2025, 11, 25)), "25 Nov 2025");
}

#[test]
fn test_parse_date() {
    assert_eq!(parse_date(" 2025-01-05 "), Some(date(2025, 1, 5)));
    assert!(parse_date("05/01/2025").is_none());
}
