//! Options loading from TOML files.

use std::io::Write;
use tally_runtime::{Runtime, RuntimeOptions, TaggedLiteral};

#[test]
fn test_options_from_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "moment_millis = 50\ndefault_currency = \"EUR\"\nhealing_depth = 8\nmoment_budget = 4"
    )
    .unwrap();

    let options = RuntimeOptions::from_toml_file(file.path()).unwrap();
    assert_eq!(options.moment_millis, 50);
    assert_eq!(options.default_currency, "EUR");
    assert_eq!(options.healing_depth, 8);
    assert_eq!(options.moment_budget, Some(4));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let err = RuntimeOptions::from_toml_file("/no/such/options.toml").unwrap_err();
    assert!(err.to_string().contains("cannot read"));
}

#[test]
fn test_default_currency_reaches_money_literals() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "default_currency = \"GBP\"").unwrap();
    let options = RuntimeOptions::from_toml_file(file.path()).unwrap();

    let rt = Runtime::new(options);
    match rt.parse_literal("$12.34").unwrap() {
        TaggedLiteral::Money(m) => {
            assert_eq!(m.currency, "GBP");
            assert_eq!(m.amount, 123_400);
        }
        other => panic!("expected money, got {:?}", other),
    }
}

#[test]
fn test_literal_forms_dispatch() {
    let rt = Runtime::default();
    assert!(matches!(
        rt.parse_literal("2024-03-30").unwrap(),
        TaggedLiteral::Date(_)
    ));
    assert!(matches!(
        rt.parse_literal("09:30:00.250").unwrap(),
        TaggedLiteral::Time(_)
    ));
    assert!(matches!(
        rt.parse_literal("2024-03-30T09:30:00").unwrap(),
        TaggedLiteral::DateTime(_)
    ));
    assert!(rt.parse_literal("gibberish").is_err());
}
