use clap::ArgMatches;
use colored::Colorize;
use replica_capture::config::Pacing;
use replica_capture::profile::parse_viewport;
use replica_capture::result::{CrawlSummary, Viewport};
use replica_core::crawl::{CloneOptions, CloneProgressCallback, execute_clone, run_check};
use replica_core::report::{ReportFormat, generate_summary_report};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use url::Url;

/// Depth used by `--crawl` when no explicit depth is given.
pub const CRAWL_FLAG_DEPTH: usize = 2;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_PAGE_FAILURES: i32 = 2;
pub const EXIT_CANCELLED: i32 = 130;

// Helper functions for the clone handler

pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    // A subscriber may already be installed (tests, repeated calls)
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Parse `WIDTHxHEIGHT`
pub fn parse_screen_size(value: &str) -> Result<Viewport, String> {
    parse_viewport(value).ok_or_else(|| {
        format!(
            "Invalid screen size '{}', expected WIDTHxHEIGHT (e.g. 1920x1080)",
            value
        )
    })
}

/// Expand `~` in a user supplied output directory
pub fn expand_output_dir(value: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(value).as_ref())
}

pub fn parse_seconds(value: f64, flag: &str) -> Result<Duration, String> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| format!("--{} must be a non-negative number of seconds", flag))
}

/// Effective depth: `--crawl` only applies when `--depth` was left at 0.
pub fn effective_depth(depth: usize, crawl: bool) -> usize {
    if depth == 0 && crawl {
        CRAWL_FLAG_DEPTH
    } else {
        depth
    }
}

/// Map parsed `clone`/`check` arguments onto run options
pub fn clone_options_from_args(args: &ArgMatches) -> Result<CloneOptions, String> {
    let url = args
        .get_one::<Url>("URL")
        .cloned()
        .ok_or_else(|| "A start URL is required".to_string())?;

    let mut options = CloneOptions::new(url);
    options.output_dir = args
        .get_one::<String>("output")
        .map(|dir| expand_output_dir(dir));

    let depth = args.get_one::<usize>("depth").copied().unwrap_or(0);
    options.max_depth = effective_depth(depth, args.get_flag("crawl"));
    options.same_origin = !args.get_flag("any-origin");
    options.human_behavior = !args.get_flag("no-human-behavior");
    options.headless = !args.get_flag("no-headless");
    options.anonymize = args.get_flag("tor");

    if let Some(port) = args.get_one::<u16>("tor-port") {
        options.proxy_port = *port;
    }
    if let Some(secs) = args.get_one::<u64>("wait-time") {
        options.wait_time = Duration::from_secs(*secs);
    }
    if let Some(secs) = args.get_one::<f64>("dynamic-wait") {
        options.dynamic_wait = parse_seconds(*secs, "dynamic-wait")?;
    }
    if let Some(secs) = args.get_one::<u64>("asset-timeout") {
        options.asset_timeout = Duration::from_secs(*secs);
    }
    if let Some(workers) = args.get_one::<usize>("asset-workers") {
        options.asset_workers = *workers;
    }

    let min_delay = args.get_one::<f64>("min-delay").copied().unwrap_or(2.0);
    let max_delay = args.get_one::<f64>("max-delay").copied().unwrap_or(5.0);
    options.pacing = Pacing::new(
        parse_seconds(min_delay, "min-delay")?,
        parse_seconds(max_delay, "max-delay")?,
    );

    options.chrome_path = args.get_one::<PathBuf>("chrome-path").cloned();
    options.user_agent = args.get_one::<String>("user-agent").cloned();
    options.screen_size = args
        .get_one::<String>("screen-size")
        .map(|s| parse_screen_size(s))
        .transpose()?;
    options.seed = args.get_one::<u64>("seed").copied();

    Ok(options)
}

/// Process exit status for a finished run
pub fn exit_code(summary: &CrawlSummary) -> i32 {
    if summary.cancelled {
        EXIT_CANCELLED
    } else if !summary.failures.is_empty() {
        EXIT_PAGE_FAILURES
    } else {
        EXIT_OK
    }
}

/// Response to the `count`-th Ctrl-C of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Stop after the page in flight.
    Cancel,
    /// Quit immediately.
    ForceExit,
}

pub fn on_interrupt(count: usize, cancel: &CancellationToken) -> Interrupt {
    if count > 1 {
        return Interrupt::ForceExit;
    }
    cancel.cancel();
    Interrupt::Cancel
}

/// Cancels `cancel` on the first Ctrl-C and exits with [`EXIT_CANCELLED`] on
/// the second.
pub async fn watch_interrupts(cancel: CancellationToken) {
    let mut received = 0;
    while tokio::signal::ctrl_c().await.is_ok() {
        received += 1;
        match on_interrupt(received, &cancel) {
            Interrupt::Cancel => {
                eprintln!("\n[!] Interrupted, finishing the current page (Ctrl-C again to quit)...");
            }
            Interrupt::ForceExit => {
                eprintln!("\n[!] Interrupted again, exiting now");
                std::process::exit(EXIT_CANCELLED);
            }
        }
    }
}

fn print_run_header(options: &CloneOptions) {
    let host = options.url.host_str().unwrap_or("unknown");
    println!("\n{} Cloning {}", "→".blue().bold(), host.bright_white().bold());
    println!("Max depth: {}", options.max_depth);
    println!(
        "Origin: {}",
        if options.same_origin {
            "same host only"
        } else {
            "any host"
        }
    );
    println!(
        "Human behavior: {}",
        if options.human_behavior { "on" } else { "off" }
    );
    if options.anonymize {
        println!("Proxy: Tor on 127.0.0.1:{}", options.proxy_port);
    }
    println!();
}

fn status_callback() -> CloneProgressCallback {
    Arc::new(|msg: String| {
        println!("{}", msg);
    })
}

pub async fn handle_clone(sub_matches: &ArgMatches, cancel: CancellationToken) -> i32 {
    init_logging(sub_matches.get_flag("verbose"));

    let mut options = match clone_options_from_args(sub_matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            return EXIT_FATAL;
        }
    };
    options.show_progress_bars = true;

    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    print_run_header(&options);

    let outcome = match execute_clone(options, Some(status_callback()), cancel.clone()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} Clone failed: {:#}", "✗".red().bold(), e);
            return if cancel.is_cancelled() {
                EXIT_CANCELLED
            } else {
                EXIT_FATAL
            };
        }
    };

    if outcome.summary.cancelled {
        println!("\n{} Clone interrupted\n", "⚠".yellow().bold());
    } else {
        println!("\n{} Clone complete!\n", "✓".green().bold());
    }

    print!("{}", generate_summary_report(&outcome, format));
    exit_code(&outcome.summary)
}

pub async fn handle_check(sub_matches: &ArgMatches) -> i32 {
    init_logging(sub_matches.get_flag("verbose"));

    let options = match clone_options_from_args(sub_matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            return EXIT_FATAL;
        }
    };

    print_run_header(&options);

    match run_check(options, Some(status_callback())).await {
        Ok(check) => {
            println!("{} Configuration valid", "✓".green().bold());
            println!("{} Browser: {}", "✓".green().bold(), check.browser.display());
            println!(
                "{} Profile: {} at {}",
                "✓".green().bold(),
                check.profile.user_agent,
                check.profile.viewport
            );
            println!(
                "{} Egress: {}",
                "✓".green().bold(),
                if check.proxied { "Tor" } else { "direct" }
            );
            println!(
                "{} Output would be written to {}",
                "→".blue(),
                check.output_root.display()
            );
            EXIT_OK
        }
        Err(e) => {
            eprintln!("{} Check failed: {:#}", "✗".red().bold(), e);
            EXIT_FATAL
        }
    }
}
