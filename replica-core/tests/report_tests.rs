// Tests for run summary rendering

use chrono::Utc;
use replica_capture::error::CaptureError;
use replica_capture::profile::Profile;
use replica_capture::result::{
    AssetCategory, AssetManifest, CaptureFailure, CapturedPage, CrawlSummary, Viewport,
};
use replica_core::crawl::CloneOutcome;
use replica_core::report::{ReportFormat, SummaryReport, generate_summary_report};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

fn page(id: &str, url: &str, depth: usize) -> CapturedPage {
    let mut assets = AssetManifest::new();
    assets.push(AssetCategory::Css, PathBuf::from("css/app.css"));
    assets.push(AssetCategory::Img, PathBuf::from("img/logo.png"));
    CapturedPage {
        source_url: Url::parse(url).unwrap(),
        page_id: id.to_string(),
        depth,
        title: format!("Title of {}", id),
        html_path: PathBuf::from(format!("{}.html", id)),
        snapshot_path: PathBuf::from(format!("{}.png", id)),
        metadata_path: PathBuf::from(format!("{}_metadata.json", id)),
        assets,
        captured_at: Utc::now(),
        links: Vec::new(),
    }
}

fn outcome() -> CloneOutcome {
    let start = Url::parse("https://example.com/").unwrap();
    let mut summary = CrawlSummary::new(&start, 1);
    summary.pages.push(page("page_1", "https://example.com/", 0));
    summary.pages.push(page("page_2", "https://example.com/about", 1));
    summary.failures.push(CaptureFailure::new(
        &Url::parse("https://example.com/slow").unwrap(),
        1,
        &CaptureError::RenderTimeout {
            url: "https://example.com/slow".to_string(),
            timeout: Duration::from_secs(10),
        },
    ));
    summary.assets.increment(AssetCategory::Css);
    summary.assets.increment(AssetCategory::Img);
    summary.assets.increment(AssetCategory::Img);
    summary.elapsed = Duration::from_millis(12_500);

    CloneOutcome {
        output_root: PathBuf::from("example_com_20240101_000000"),
        profile: Profile {
            user_agent: "Mozilla/5.0 Test".to_string(),
            viewport: Viewport {
                width: 1920,
                height: 1080,
            },
            referer: None,
        },
        proxied: false,
        summary,
    }
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("json"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("txt"), Some(ReportFormat::Text));
}

#[test]
fn test_report_format_from_str_invalid() {
    assert!(ReportFormat::from_str("csv").is_none());
    assert!(ReportFormat::from_str("").is_none());
}

// ============================================================================
// Summary Data Tests
// ============================================================================

#[test]
fn test_summary_report_counts() {
    let report = SummaryReport::from_outcome(&outcome());

    assert_eq!(report.pages_captured, 2);
    assert_eq!(report.snapshots_taken, 2);
    assert_eq!(report.assets.css, 1);
    assert_eq!(report.assets.img, 2);
    assert_eq!(report.assets.total(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.viewport, "1920x1080");
    assert_eq!(report.pages[1].depth, 1);
    assert_eq!(report.pages[1].asset_count, 2);
    assert!(!report.cancelled);
}

// ============================================================================
// Rendering Tests
// ============================================================================

#[test]
fn test_text_report_lists_pages_assets_and_failures() {
    let text = generate_summary_report(&outcome(), ReportFormat::Text);

    assert!(text.contains("Pages captured: 2"));
    assert!(text.contains("Snapshots taken: 2"));
    assert!(text.contains("css/: 1 file(s)"));
    assert!(text.contains("img/: 2 file(s)"));
    assert!(text.contains("font/: 0 file(s)"));
    assert!(text.contains("https://example.com/about"));
    assert!(text.contains("https://example.com/slow"));
    assert!(text.contains("render-timeout"));
    assert!(text.contains("example_com_20240101_000000"));
    assert!(!text.contains("cancelled"));
}

#[test]
fn test_text_report_flags_cancellation() {
    let mut outcome = outcome();
    outcome.summary.cancelled = true;

    let text = generate_summary_report(&outcome, ReportFormat::Text);
    assert!(text.contains("cancelled"));
}

#[test]
fn test_json_report_is_machine_readable() {
    let json = generate_summary_report(&outcome(), ReportFormat::Json);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["start_url"], "https://example.com/");
    assert_eq!(value["pages_captured"], 2);
    assert_eq!(value["assets"]["img"], 2);
    assert_eq!(value["pages"][0]["html_file"], "page_1.html");
    assert_eq!(value["failures"][0]["kind"], "render-timeout");
    assert_eq!(value["elapsed_secs"], 12.5);
}
