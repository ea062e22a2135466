use clap::Parser;
use clustertest_runner::cli::Cli;
use colored::Colorize;

fn main() {
    let cli = Cli::parse();
    match clustertest_runner::run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}", format!("[ERROR] {}", e).red());
            std::process::exit(1);
        }
    }
}
