//! Unit tests for configuration values.

use rstest::rstest;

use crate::{Config, DEFAULT_LOG_FILTER, LogFormat};

#[rstest]
#[case("json", LogFormat::Json)]
#[case("JSON", LogFormat::Json)]
#[case("compact", LogFormat::Compact)]
#[case("Compact", LogFormat::Compact)]
fn log_formats_parse_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
    assert_eq!(text.parse::<LogFormat>().expect("format should parse"), expected);
}

#[rstest]
fn unknown_log_format_is_rejected() {
    assert!("pretty".parse::<LogFormat>().is_err());
}

#[rstest]
#[case(LogFormat::Json, "json")]
#[case(LogFormat::Compact, "compact")]
fn log_formats_display_in_snake_case(#[case] format: LogFormat, #[case] expected: &str) {
    assert_eq!(format.to_string(), expected);
}

#[rstest]
#[case(LogFormat::Json, true)]
#[case(LogFormat::Compact, false)]
fn only_json_events_are_structured(#[case] format: LogFormat, #[case] expected: bool) {
    assert_eq!(format.is_structured(), expected);
}

#[rstest]
fn defaults_are_conservative() {
    let config = Config::default();
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    assert_eq!(config.log_format(), LogFormat::Json);
    assert!(config.search_path().is_empty());
    assert!(!config.fail_fast());
}
