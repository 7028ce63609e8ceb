mod app;

use clap::Parser;

use crate::app::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Err(err) = app::run(cli).await {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}
