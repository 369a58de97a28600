use clap::Parser;
use study_cli::app::{run, AppConfig, Cli};

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = AppConfig::from_env().unwrap_or_default();
    match run(config, cli.command()) {
        Ok(output) => print!("{output}"),
        Err(err) => {
            eprintln!("study: {err:#}");
            std::process::exit(1);
        }
    }
}
