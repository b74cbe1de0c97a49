use colored::Colorize;

pub mod crawl;
pub mod report;

const BANNER: &str = r#"
                       ___
   ________  ____     / (_)________ _
  / ___/ _ \/ __ \   / / / ___/ __ `/
 / /  /  __/ /_/ /  / / / /__/ /_/ /
/_/   \___/ .___/  /_/_/\___/\__,_/
         /_/
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "replica".bright_white().bold(),
        format!("v{} - rendered site archiver", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
