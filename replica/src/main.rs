use replica::commands::command_argument_builder;
use replica::handlers::{handle_check, handle_clone, watch_interrupts};
use replica_core::print_banner;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    // Ctrl-C stops the crawl after the page in flight, a second one quits
    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    let code = match chosen_command.subcommand() {
        Some(("clone", primary_command)) => handle_clone(primary_command, cancel).await,
        Some(("check", primary_command)) => handle_check(primary_command).await,
        _ => unreachable!("clap should ensure we don't get here"),
    };

    std::process::exit(code);
}
