//! Property-based tests for the input parsers

use super::*;
use chrono::{Datelike, Timelike};
use proptest::prelude::*;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

proptest! {
    #[test]
    fn compact_time_round_trips(hour in 0u32..24, minute in 0u32..60) {
        let parsed = parse_time(&format!("{hour:02}{minute:02}")).unwrap();
        prop_assert_eq!((parsed.hour(), parsed.minute()), (hour, minute));
    }

    #[test]
    fn colon_time_round_trips(hour in 0u32..24, minute in 0u32..60) {
        let parsed = parse_time(&format!("{hour}:{minute:02}")).unwrap();
        prop_assert_eq!((parsed.hour(), parsed.minute()), (hour, minute));
    }

    #[test]
    fn twelve_hour_time_matches_clock(hour in 1u32..=12, minute in 0u32..60, pm in any::<bool>(), spaced in any::<bool>()) {
        let suffix = if pm { "PM" } else { "am" };
        let gap = if spaced { " " } else { "" };
        let parsed = parse_time(&format!("{hour}:{minute:02}{gap}{suffix}")).unwrap();
        let expected = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        prop_assert_eq!((parsed.hour(), parsed.minute()), (expected, minute));
    }

    #[test]
    fn out_of_range_minutes_never_parse(hour in 0u32..24, minute in 60u32..100) {
        let colon = format!("{hour}:{minute}");
        let compact = format!("{hour:02}{minute}");
        prop_assert!(parse_time(&colon).is_err());
        prop_assert!(parse_time(&compact).is_err());
    }

    #[test]
    fn parsers_never_panic(input in "\\PC{0,20}") {
        let _ = parse_iata(&input);
        let _ = parse_time(&input);
        let _ = parse_date(&input, today());
        let _ = parse_flight_number(&input);
    }

    #[test]
    fn three_letters_always_parse_as_iata(code in "[a-zA-Z]{3}") {
        prop_assert_eq!(parse_iata(&code).unwrap(), code.to_ascii_uppercase());
    }

    #[test]
    fn accepted_dates_are_never_in_the_past(offset in 0u64..2000, sep in prop_oneof![Just('/'), Just('-'), Just(' ')]) {
        let date = today().checked_add_days(Days::new(offset)).unwrap();
        let input = format!("{:02}{sep}{:02}{sep}{}", date.day(), date.month(), date.year());
        let parsed = parse_date(&input, today()).unwrap();
        prop_assert_eq!(parsed, date);
        prop_assert!(parsed >= today());
    }

    #[test]
    fn past_dates_are_rejected(offset in 1u64..2000) {
        let date = today().checked_sub_days(Days::new(offset)).unwrap();
        let input = format!("{:02}/{:02}/{}", date.day(), date.month(), date.year());
        let rejected = matches!(parse_date(&input, today()), Err(ParseError::DateInPast { .. }));
        prop_assert!(rejected);
    }
}
