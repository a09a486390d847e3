use chrono::{TimeZone, Timelike};
use chrono_tz::{Asia, Tz};
use rusqlite::types::ValueRef;
use sqlkit::datetime::{
    parse_date_multi, parse_date_time, parse_stamp, zero_instant, NullTime, Stamp, DEFAULT_ZONE,
};
use sqlkit::Error;

#[test]
fn bare_dates_are_midnight_in_the_default_zone() {
    let parsed = parse_date_time("2024-03-01", Asia::Tokyo).expect("date");
    assert_eq!(
        parsed,
        DEFAULT_ZONE.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(parsed.timezone(), DEFAULT_ZONE);
}

#[test]
fn wall_clock_digits_attach_to_the_location() {
    let parsed = parse_date_time("2024-03-01 10:15:00", Asia::Tokyo).expect("datetime");
    assert_eq!(
        parsed,
        Asia::Tokyo.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap()
    );

    let parsed = parse_date_time("2024-03-01 10:15:00", Tz::UTC).expect("datetime");
    assert_eq!(parsed.hour(), 10);
    assert_eq!(parsed.timezone(), Tz::UTC);
}

#[test]
fn one_to_six_fractional_digits_are_accepted() {
    let inputs = [
        ("2024-03-01 10:15:00.1", 100_000_000),
        ("2024-03-01 10:15:00.12", 120_000_000),
        ("2024-03-01 10:15:00.123", 123_000_000),
        ("2024-03-01 10:15:00.1234", 123_400_000),
        ("2024-03-01 10:15:00.12345", 123_450_000),
        ("2024-03-01 10:15:00.123456", 123_456_000),
    ];
    for (input, nanos) in inputs {
        let parsed = parse_date_time(input, Tz::UTC).expect(input);
        assert_eq!(parsed.nanosecond(), nanos, "{input}");
        assert_eq!(parsed.second(), 0, "{input}");
    }
}

#[test]
fn unsupported_lengths_are_parse_errors() {
    for input in ["", "2024-3-1", "2024-03-01 ", "2024-03-01 10:15", "2024-03-01 10:15:00.", "2024-03-01 10:15:00.1234567"] {
        let err = parse_date_time(input, Tz::UTC).expect_err(input);
        assert!(matches!(err, Error::Parse { .. }), "{input}");
    }
}

#[test]
fn right_length_garbage_is_a_parse_error() {
    assert!(matches!(
        parse_date_time("2024-13-01", Tz::UTC),
        Err(Error::Parse { .. })
    ));
    assert!(matches!(
        parse_date_time("2024-03-01T10:15:00", Tz::UTC),
        Err(Error::Parse { .. })
    ));
}

#[test]
fn all_zero_sentinel_is_the_zero_instant() {
    for input in ["0000-00-00", "0000-00-00 00:00:00", "0000-00-00 00:00:00.000000"] {
        assert_eq!(parse_date_time(input, DEFAULT_ZONE).expect(input), zero_instant());
    }

    let mut stamp = NullTime::null();
    stamp
        .scan(ValueRef::Text(b"0000-00-00 00:00:00"))
        .expect("sentinel is not an error");
    assert!(!stamp.is_valid());
}

#[test]
fn the_earliest_real_instant_is_still_valid() {
    assert_eq!(
        parse_stamp("0000-00-00 00:00:00", Tz::UTC).unwrap(),
        Stamp::Zero
    );
    assert_eq!(
        parse_stamp("0001-01-01 00:00:00", Tz::UTC).unwrap(),
        Stamp::At(zero_instant())
    );

    let mut stamp = NullTime::null().with_location(Tz::UTC);
    stamp
        .scan(ValueRef::Text(b"0001-01-01 00:00:00"))
        .expect("real timestamp");
    assert!(stamp.is_valid());
    assert_eq!(*stamp.time(), zero_instant());

    stamp
        .scan(ValueRef::Integer(zero_instant().timestamp()))
        .expect("unix seconds");
    assert!(stamp.is_valid());
}

#[test]
fn skipped_local_times_move_forward() {
    // clocks in New York jump from 02:00 to 03:00 on this date
    let parsed = parse_date_time("2024-03-10 02:30:00", DEFAULT_ZONE).expect("gap");
    assert_eq!(parsed.hour(), 3);
    assert_eq!(parsed.minute(), 30);
}

#[test]
fn scanning_a_bare_date_switches_the_location() {
    let mut stamp = NullTime::null().with_location(Asia::Tokyo);
    stamp.scan(ValueRef::Text(b"2024-03-01")).expect("date");
    assert!(stamp.is_valid());
    assert_eq!(stamp.location(), Some(DEFAULT_ZONE));
    assert_eq!(
        stamp.time(),
        &DEFAULT_ZONE.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    );

    let mut stamp = NullTime::null().with_location(Asia::Tokyo);
    stamp.scan(ValueRef::Blob(b"2024-03-01 08:00:00")).expect("datetime");
    assert_eq!(stamp.location(), Some(Asia::Tokyo));
    assert_eq!(stamp.time().hour(), 8);
}

#[test]
fn scanning_integers_reads_unix_seconds() {
    let mut stamp = NullTime::null().with_location(Tz::UTC);
    stamp.scan(ValueRef::Integer(86_400)).expect("unix seconds");
    assert!(stamp.is_valid());
    assert_eq!(
        stamp.time(),
        &Tz::UTC.with_ymd_and_hms(1970, 1, 2, 0, 0, 0).unwrap()
    );
}

#[test]
fn scanning_reals_or_bad_text_fails() {
    let mut stamp = NullTime::null();
    let err = stamp.scan(ValueRef::Real(1.5)).expect_err("real");
    assert!(matches!(err, Error::Conversion { target: "NullTime", .. }));
    assert!(!stamp.is_valid());

    assert!(stamp.scan(ValueRef::Text(b"tomorrow")).is_err());
    assert!(!stamp.is_valid());
    assert_eq!(*stamp.time(), zero_instant());
}

#[test]
fn lenient_parse_accepts_common_form_layouts() {
    let midnight = DEFAULT_ZONE.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    assert_eq!(parse_date_multi("03/01/2024", DEFAULT_ZONE), Some(midnight));
    assert_eq!(parse_date_multi(" 2024-03-01 ", DEFAULT_ZONE), Some(midnight));
    assert_eq!(
        parse_date_multi("2024-03-01T09:30", DEFAULT_ZONE),
        Some(DEFAULT_ZONE.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
    );
    assert_eq!(
        parse_date_multi("2024-03-01T14:30:00Z", DEFAULT_ZONE),
        Some(DEFAULT_ZONE.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
    );
    assert_eq!(parse_date_multi("next tuesday", DEFAULT_ZONE), None);
}
