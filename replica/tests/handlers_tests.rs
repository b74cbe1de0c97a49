use clap::ArgMatches;
use replica::commands::command_argument_builder;
use replica::handlers::*;
use replica_capture::error::CaptureError;
use replica_capture::result::{CaptureFailure, CrawlSummary};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

fn clone_matches(args: &[&str]) -> ArgMatches {
    let mut argv = vec!["replica", "clone"];
    argv.extend_from_slice(args);
    let matches = command_argument_builder()
        .try_get_matches_from(argv)
        .unwrap();
    let (name, sub) = matches.subcommand().unwrap();
    assert_eq!(name, "clone");
    sub.clone()
}

// ============================================================================
// Argument Parsing Tests
// ============================================================================

#[test]
fn test_clone_defaults() {
    let matches = clone_matches(&["https://example.com"]);
    let options = clone_options_from_args(&matches).unwrap();

    assert_eq!(options.url.as_str(), "https://example.com/");
    assert_eq!(options.output_dir, None);
    assert_eq!(options.max_depth, 0);
    assert!(options.same_origin);
    assert!(options.human_behavior);
    assert!(options.headless);
    assert!(!options.anonymize);
    assert_eq!(options.proxy_port, 9050);
    assert_eq!(options.wait_time, Duration::from_secs(10));
    assert_eq!(options.dynamic_wait, Duration::from_secs(3));
    assert_eq!(options.asset_workers, 8);
    assert_eq!(options.pacing.min, Duration::from_secs(2));
    assert_eq!(options.pacing.max, Duration::from_secs(5));
    assert_eq!(options.seed, None);
}

#[test]
fn test_clone_all_flags() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("mirror");
    let out_str = out.to_str().unwrap();

    let matches = clone_matches(&[
        "https://example.com/start",
        "-o",
        out_str,
        "--depth",
        "3",
        "--wait-time",
        "20",
        "--dynamic-wait",
        "0.5",
        "--no-human-behavior",
        "--any-origin",
        "--tor",
        "--tor-port",
        "9150",
        "--no-headless",
        "--chrome-path",
        "/opt/chrome/chrome",
        "--user-agent",
        "Custom/1.0",
        "--screen-size",
        "1280x720",
        "--seed",
        "99",
        "--asset-timeout",
        "4",
        "--asset-workers",
        "2",
        "--min-delay",
        "0",
        "--max-delay",
        "1.5",
        "--format",
        "json",
    ]);
    let options = clone_options_from_args(&matches).unwrap();

    assert_eq!(options.output_dir, Some(out.clone()));
    assert_eq!(options.max_depth, 3);
    assert_eq!(options.wait_time, Duration::from_secs(20));
    assert_eq!(options.dynamic_wait, Duration::from_millis(500));
    assert!(!options.human_behavior);
    assert!(!options.same_origin);
    assert!(options.anonymize);
    assert_eq!(options.proxy_port, 9150);
    assert!(!options.headless);
    assert_eq!(options.chrome_path, Some(PathBuf::from("/opt/chrome/chrome")));
    assert_eq!(options.user_agent.as_deref(), Some("Custom/1.0"));
    assert_eq!(options.screen_size.unwrap().to_string(), "1280x720");
    assert_eq!(options.seed, Some(99));
    assert_eq!(options.asset_timeout, Duration::from_secs(4));
    assert_eq!(options.asset_workers, 2);
    assert_eq!(options.pacing.min, Duration::ZERO);
    assert_eq!(options.pacing.max, Duration::from_millis(1500));
    assert_eq!(matches.get_one::<String>("format").unwrap(), "json");
}

#[test]
fn test_crawl_flag_means_depth_two() {
    let matches = clone_matches(&["https://example.com", "--crawl"]);
    let options = clone_options_from_args(&matches).unwrap();
    assert_eq!(options.max_depth, 2);
}

#[test]
fn test_explicit_depth_beats_crawl_flag() {
    let matches = clone_matches(&["https://example.com", "--crawl", "--depth", "5"]);
    let options = clone_options_from_args(&matches).unwrap();
    assert_eq!(options.max_depth, 5);
}

#[test]
fn test_effective_depth() {
    assert_eq!(effective_depth(0, false), 0);
    assert_eq!(effective_depth(0, true), 2);
    assert_eq!(effective_depth(1, true), 1);
    assert_eq!(effective_depth(4, false), 4);
}

#[test]
fn test_invalid_screen_size_is_rejected() {
    let matches = clone_matches(&["https://example.com", "--screen-size", "wide"]);
    let err = clone_options_from_args(&matches).unwrap_err();
    assert!(err.contains("wide"));
}

#[test]
fn test_negative_delay_is_rejected() {
    let matches = clone_matches(&["https://example.com", "--min-delay=-1"]);
    let err = clone_options_from_args(&matches).unwrap_err();
    assert!(err.contains("min-delay"));
}

#[test]
fn test_url_is_required() {
    let result = command_argument_builder().try_get_matches_from(["replica", "clone"]);
    assert!(result.is_err());
}

#[test]
fn test_invalid_url_is_rejected() {
    let result =
        command_argument_builder().try_get_matches_from(["replica", "clone", "not a url"]);
    assert!(result.is_err());
}

#[test]
fn test_unknown_format_is_rejected() {
    let result = command_argument_builder().try_get_matches_from([
        "replica",
        "clone",
        "https://example.com",
        "--format",
        "xml",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_check_shares_clone_arguments() {
    let matches = command_argument_builder()
        .try_get_matches_from(["replica", "-q", "check", "https://example.com", "--tor"])
        .unwrap();
    assert!(matches.get_flag("quiet"));
    let (name, sub) = matches.subcommand().unwrap();
    assert_eq!(name, "check");

    let options = clone_options_from_args(sub).unwrap();
    assert!(options.anonymize);
}

// ============================================================================
// Helper Tests
// ============================================================================

#[test]
fn test_parse_screen_size() {
    let viewport = parse_screen_size("1920x1080").unwrap();
    assert_eq!(viewport.width, 1920);
    assert_eq!(viewport.height, 1080);
    assert!(parse_screen_size("1920").is_err());
    assert!(parse_screen_size("0x1080").is_err());
}

#[test]
fn test_expand_output_dir_plain_path() {
    assert_eq!(expand_output_dir("site_copy"), PathBuf::from("site_copy"));
}

#[test]
fn test_expand_output_dir_tilde() {
    let expanded = expand_output_dir("~/mirrors");
    assert!(expanded.ends_with("mirrors"));
}

#[test]
fn test_first_interrupt_cancels_second_forces_exit() {
    let cancel = tokio_util::sync::CancellationToken::new();

    assert_eq!(on_interrupt(1, &cancel), Interrupt::Cancel);
    assert!(cancel.is_cancelled());
    assert_eq!(on_interrupt(2, &cancel), Interrupt::ForceExit);
    assert_eq!(on_interrupt(3, &cancel), Interrupt::ForceExit);
}

// ============================================================================
// Exit Code Tests
// ============================================================================

fn summary() -> CrawlSummary {
    CrawlSummary::new(&Url::parse("https://example.com").unwrap(), 0)
}

#[test]
fn test_exit_code_clean_run() {
    assert_eq!(exit_code(&summary()), EXIT_OK);
}

#[test]
fn test_exit_code_with_page_failures() {
    let mut summary = summary();
    summary.failures.push(CaptureFailure::new(
        &Url::parse("https://example.com/broken").unwrap(),
        0,
        &CaptureError::render_failure("https://example.com/broken", "net::ERR_FAILED"),
    ));
    assert_eq!(exit_code(&summary), EXIT_PAGE_FAILURES);
}

#[test]
fn test_exit_code_cancelled_wins() {
    let mut summary = summary();
    summary.cancelled = true;
    summary.failures.push(CaptureFailure::new(
        &Url::parse("https://example.com/broken").unwrap(),
        0,
        &CaptureError::render_failure("https://example.com/broken", "net::ERR_FAILED"),
    ));
    assert_eq!(exit_code(&summary), EXIT_CANCELLED);
}
