use clap::Parser;

mod analysis;
mod claude;
mod cli;
mod energy;
mod report;
mod shared;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let parsed = cli::Cli::parse();
    if let Err(e) = cli::run(parsed) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
