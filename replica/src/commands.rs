use clap::{Arg, arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

/// Arguments shared by `clone` and `check`.
fn session_args() -> Vec<Arg> {
    vec![
        arg!(<URL>)
            .help("The start URL to clone")
            .value_parser(clap::value_parser!(Url)),
        arg!(-o --"output" <DIR>)
            .required(false)
            .help("Output directory (default: <host>_<YYYYmmdd_HHMMSS>)"),
        arg!(--"depth" <N>)
            .required(false)
            .help("Maximum crawl depth; 0 captures the start page only")
            .value_parser(clap::value_parser!(usize))
            .default_value("0"),
        arg!(--"crawl")
            .required(false)
            .help("Follow links two levels deep (same as --depth 2)")
            .action(clap::ArgAction::SetTrue),
        arg!(--"wait-time" <SECONDS>)
            .required(false)
            .help("How long to wait for a page to become ready")
            .value_parser(clap::value_parser!(u64))
            .default_value("10"),
        arg!(--"dynamic-wait" <SECONDS>)
            .required(false)
            .help("Extra time for dynamic content after settling")
            .value_parser(clap::value_parser!(f64))
            .default_value("3.0"),
        arg!(--"no-human-behavior")
            .required(false)
            .help("Skip scrolling and mouse movement before capture")
            .action(clap::ArgAction::SetTrue),
        arg!(--"any-origin")
            .required(false)
            .help("Follow links to other hosts (default: same host and port only)")
            .action(clap::ArgAction::SetTrue),
        arg!(--"tor")
            .required(false)
            .help("Route browser and asset traffic through a local Tor SOCKS proxy")
            .action(clap::ArgAction::SetTrue),
        arg!(--"tor-port" <PORT>)
            .required(false)
            .help("Port of the local Tor SOCKS proxy")
            .value_parser(clap::value_parser!(u16))
            .default_value("9050"),
        arg!(--"no-headless")
            .required(false)
            .help("Show the browser window")
            .action(clap::ArgAction::SetTrue),
        arg!(--"chrome-path" <PATH>)
            .required(false)
            .help("Path to the Chrome/Chromium binary (default: auto-detect)")
            .value_parser(clap::value_parser!(std::path::PathBuf)),
        arg!(--"user-agent" <UA>)
            .required(false)
            .help("Override the randomly chosen user agent"),
        arg!(--"screen-size" <WxH>)
            .required(false)
            .help("Override the randomly chosen window size, e.g. 1920x1080"),
        arg!(--"seed" <N>)
            .required(false)
            .help("Seed for profile selection and browsing behavior")
            .value_parser(clap::value_parser!(u64)),
        arg!(--"asset-timeout" <SECONDS>)
            .required(false)
            .help("Timeout for each asset download")
            .value_parser(clap::value_parser!(u64))
            .default_value("10"),
        arg!(--"asset-workers" <N>)
            .required(false)
            .help("Concurrent asset downloads per page")
            .value_parser(clap::value_parser!(usize))
            .default_value("8"),
        arg!(--"min-delay" <SECONDS>)
            .required(false)
            .help("Minimum pause between pages")
            .value_parser(clap::value_parser!(f64))
            .default_value("2.0"),
        arg!(--"max-delay" <SECONDS>)
            .required(false)
            .help("Maximum pause between pages")
            .value_parser(clap::value_parser!(f64))
            .default_value("5.0"),
        arg!(-v --"verbose")
            .required(false)
            .help("Enable debug logging")
            .action(clap::ArgAction::SetTrue),
    ]
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("replica")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("replica")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("clone")
                .about(
                    "Render a site in a headless browser and archive its pages, snapshots and \
                assets locally.",
                )
                .args(session_args())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Summary format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("check")
                .about(
                    "Validate settings, verify the proxy and start the browser without \
                downloading anything.",
                )
                .args(session_args()),
        )
}
