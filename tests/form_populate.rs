use bigdecimal::BigDecimal;
use chrono::TimeZone;
use chrono_tz::{Asia, Tz};
use lazy_static::lazy_static;
use sqlkit::datatype::{NullBool, NullDecimal, NullFloat64, NullInt64, NullString};
use sqlkit::datetime::{NullTime, DEFAULT_ZONE};
use sqlkit::form::{form_bool, populate, FormSchema, FormValues, FromForm, Tags};
use std::str::FromStr;

#[derive(Debug, Default)]
struct Profile {
    id: i64,
    name: String,
    email: NullString,
    age: NullInt64,
    score: f64,
    ratio: f32,
    rank: i32,
    subscribed: NullBool,
    balance: NullDecimal,
    weight: NullFloat64,
    born: NullTime,
    secret: NullString,
}

impl FromForm for Profile {
    fn form_schema() -> &'static FormSchema<Self> {
        lazy_static! {
            static ref SCHEMA: FormSchema<Profile> = FormSchema::new()
                .field(Tags::db("id"), |p: &mut Profile| &mut p.id)
                .field(Tags::db("name"), |p: &mut Profile| &mut p.name)
                .field(Tags::db("email").form("userEmail"), |p: &mut Profile| &mut p.email)
                .field(Tags::db("age"), |p: &mut Profile| &mut p.age)
                .field(Tags::db("score"), |p: &mut Profile| &mut p.score)
                .field(Tags::db("ratio"), |p: &mut Profile| &mut p.ratio)
                .field(Tags::db("rank"), |p: &mut Profile| &mut p.rank)
                .field(Tags::db("subscribed"), |p: &mut Profile| &mut p.subscribed)
                .field(Tags::db("balance"), |p: &mut Profile| &mut p.balance)
                .field(Tags::db("weight"), |p: &mut Profile| &mut p.weight)
                .field(Tags::db("born"), |p: &mut Profile| &mut p.born)
                .field(Tags::db("secret").form("-"), |p: &mut Profile| &mut p.secret);
        }
        &SCHEMA
    }
}

fn form(pairs: &[(&str, &str)]) -> FormValues {
    let mut values = FormValues::new();
    for (key, value) in pairs {
        values
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    values
}

#[test]
fn form_tag_overrides_the_db_tag() {
    let keys = Profile::form_schema().keys();
    assert!(keys.contains(&"userEmail"));
    assert!(!keys.contains(&"email"));
    assert!(!keys.contains(&"secret"));
    assert!(!keys.contains(&"-"));

    let mut profile = Profile::default();
    populate(&mut profile, &form(&[("email", "wrong@example.com")]), false, None).unwrap();
    assert!(!profile.email.is_valid());

    populate(&mut profile, &form(&[("userEmail", "ada@example.com")]), false, None).unwrap();
    assert_eq!(profile.email.as_option().map(String::as_str), Some("ada@example.com"));
}

#[test]
fn skipped_fields_are_never_touched() {
    let mut profile = Profile::default();
    populate(
        &mut profile,
        &form(&[("secret", "s3cret"), ("-", "dash")]),
        true,
        None,
    )
    .unwrap();
    assert!(!profile.secret.is_valid());
}

#[test]
fn values_convert_to_field_types() {
    let mut profile = Profile::default();
    let submitted = form(&[
        ("id", "12"),
        ("name", "Ada"),
        ("age", "36"),
        ("score", " 2.5 "),
        ("ratio", "0.25"),
        ("rank", "first"),
        ("subscribed", "on"),
        ("balance", "10.25"),
        ("weight", "61.5"),
        ("born", "1815-12-10"),
    ]);
    populate(&mut profile, &submitted, false, None).unwrap();

    assert_eq!(profile.id, 12);
    assert_eq!(profile.name, "Ada");
    assert_eq!(profile.age.as_option(), Some(&36));
    assert_eq!(profile.score, 2.5);
    assert_eq!(profile.ratio, 0.25);
    // unparseable numbers fall back to zero
    assert_eq!(profile.rank, 0);
    assert_eq!(profile.subscribed.as_option(), Some(&true));
    assert_eq!(
        profile.balance.as_option(),
        Some(&BigDecimal::from_str("10.25").unwrap())
    );
    assert_eq!(profile.weight.as_option(), Some(&61.5));
    assert_eq!(
        profile.born.as_option(),
        Some(&DEFAULT_ZONE.with_ymd_and_hms(1815, 12, 10, 0, 0, 0).unwrap())
    );
}

#[test]
fn timestamps_are_read_in_the_requested_location() {
    let mut profile = Profile::default();
    populate(
        &mut profile,
        &form(&[("born", "2024-03-01 08:00:00")]),
        false,
        Some(Asia::Tokyo),
    )
    .unwrap();
    assert_eq!(
        profile.born.as_option(),
        Some(&Asia::Tokyo.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
    );
    assert_eq!(profile.born.location(), Some(Asia::Tokyo));

    populate(&mut profile, &form(&[("born", "whenever")]), false, Some(Tz::UTC)).unwrap();
    assert!(!profile.born.is_valid());
    assert_eq!(profile.born.location(), Some(Tz::UTC));
}

#[test]
fn only_the_first_value_of_a_key_is_used() {
    let mut profile = Profile::default();
    populate(
        &mut profile,
        &form(&[("name", "first"), ("name", "second")]),
        false,
        None,
    )
    .unwrap();
    assert_eq!(profile.name, "first");

    let mut empty = FormValues::new();
    empty.insert("name".to_string(), Vec::new());
    populate(&mut profile, &empty, true, None).unwrap();
    assert_eq!(profile.name, "first");
}

#[test]
fn missing_keys_reset_only_when_processing_all_keys() {
    let mut profile = Profile {
        id: 5,
        subscribed: NullBool::new(true),
        email: NullString::new("kept@example.com".to_string()),
        ..Profile::default()
    };

    populate(&mut profile, &form(&[("name", "Ada")]), false, None).unwrap();
    assert_eq!(profile.id, 5);
    assert_eq!(profile.subscribed.as_option(), Some(&true));

    // an unchecked checkbox sends no key at all
    populate(&mut profile, &form(&[("name", "Ada")]), true, None).unwrap();
    assert_eq!(profile.id, 0);
    assert!(!profile.subscribed.is_valid());
    assert!(!profile.email.is_valid());
    assert_eq!(profile.name, "Ada");
}

#[test]
fn checkbox_truthiness() {
    for raw in ["1", "t", "TRUE", "on", "Yes", "y"] {
        assert!(form_bool(raw), "{raw}");
    }
    for raw in ["0", "off", "", "no", "nope"] {
        assert!(!form_bool(raw), "{raw}");
    }
}
