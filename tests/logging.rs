// tests/logging.rs

use tracing::level_filters::LevelFilter;

use autoscripts::cli::LogLevel;
use autoscripts::logging::build_filter;

#[test]
fn defaults_to_info() {
    assert_eq!(build_filter(None, None).max_level_hint(), Some(LevelFilter::INFO));
    assert_eq!(build_filter(None, Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
}

#[test]
fn env_accepts_per_target_directives() {
    let filter = build_filter(None, Some("autoscripts::engine=trace,notify=warn"));

    assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
}

#[test]
fn cli_level_wins_over_env() {
    let filter = build_filter(Some(LogLevel::Debug), Some("autoscripts=trace"));

    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
}

#[test]
fn invalid_env_falls_back_to_info() {
    let filter = build_filter(None, Some("autoscripts=loudest"));

    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
}
