// Run summaries for the terminal and for machines

use crate::crawl::CloneOutcome;
use colored::Colorize;
use replica_capture::result::{AssetCategory, AssetCounts, CaptureFailure};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEntry {
    pub page_id: String,
    pub url: String,
    pub depth: usize,
    pub title: String,
    pub html_file: String,
    pub snapshot_file: String,
    pub asset_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub start_url: String,
    pub output_dir: String,
    pub max_depth: usize,
    pub user_agent: String,
    pub viewport: String,
    pub proxied: bool,
    pub pages_captured: usize,
    pub snapshots_taken: usize,
    pub assets: AssetCounts,
    pub pages: Vec<PageEntry>,
    pub failures: Vec<CaptureFailure>,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl SummaryReport {
    pub fn from_outcome(outcome: &CloneOutcome) -> Self {
        let summary = &outcome.summary;
        let pages = summary
            .pages
            .iter()
            .map(|page| PageEntry {
                page_id: page.page_id.clone(),
                url: page.source_url.to_string(),
                depth: page.depth,
                title: page.title.clone(),
                html_file: display_path(&page.html_path),
                snapshot_file: display_path(&page.snapshot_path),
                asset_count: page.assets.len(),
            })
            .collect();

        Self {
            start_url: summary.start_url.clone(),
            output_dir: display_path(&outcome.output_root),
            max_depth: summary.max_depth,
            user_agent: outcome.profile.user_agent.clone(),
            viewport: outcome.profile.viewport.to_string(),
            proxied: outcome.proxied,
            pages_captured: summary.pages_captured(),
            snapshots_taken: summary.snapshots_taken(),
            assets: summary.assets,
            pages,
            failures: summary.failures.clone(),
            cancelled: summary.cancelled,
            elapsed_secs: summary.elapsed.as_secs_f64(),
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

/// Render the completion summary of a clone run
pub fn generate_summary_report(outcome: &CloneOutcome, format: ReportFormat) -> String {
    let report = SummaryReport::from_outcome(outcome);
    match format {
        ReportFormat::Json => {
            serde_json::to_string_pretty(&report).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
        ReportFormat::Text => generate_text_report(&report),
    }
}

fn generate_text_report(report: &SummaryReport) -> String {
    let divider = "━".repeat(52);
    let mut out = String::new();

    out.push_str(&format!("{}\n\n", divider.bright_blue()));
    out.push_str(&format!("{}\n", "# Summary:".bright_white().bold()));
    out.push_str(&format!("  Start URL: {}\n", report.start_url));
    out.push_str(&format!("  Output directory: {}\n", report.output_dir));
    out.push_str(&format!("  Max depth: {}\n", report.max_depth));
    out.push_str(&format!("  Pages captured: {}\n", report.pages_captured));
    out.push_str(&format!("  Snapshots taken: {}\n", report.snapshots_taken));
    out.push_str(&format!("  Elapsed: {:.1}s\n", report.elapsed_secs));
    if report.proxied {
        out.push_str("  Egress: Tor\n");
    }
    if report.cancelled {
        out.push_str(&format!("  {}\n", "Run was cancelled before the frontier emptied".yellow()));
    }

    out.push_str(&format!("\n{}\n", "# Assets:".bright_white().bold()));
    for category in AssetCategory::ALL {
        out.push_str(&format!(
            "  {}/: {} file(s)\n",
            category.dir_name(),
            report.assets.get(category)
        ));
    }

    if !report.pages.is_empty() {
        out.push_str(&format!("\n{}\n", "# Pages:".bright_white().bold()));
        for page in &report.pages {
            out.push_str(&format!(
                "  {} {} {} {}\n",
                "✓".green(),
                page.page_id,
                format!("[depth {}]", page.depth).dimmed(),
                page.url
            ));
        }
    }

    if !report.failures.is_empty() {
        out.push_str(&format!("\n{}\n", "# Failures:".bright_white().bold()));
        for failure in &report.failures {
            out.push_str(&format!(
                "  {} {} {} {}\n",
                "✗".red(),
                failure.url,
                format!("({})", failure.kind).yellow(),
                failure.error
            ));
        }
    }

    out.push_str(&format!("\n{}\n", divider.bright_blue()));
    out
}
