//! Zombie Dispatch CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use zombie_dispatch::cli::{commands, handle_error, Cli, Commands};
use zombie_dispatch::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    // `serve` installs the configured logger itself; one-shot commands only
    // report warnings on stderr.
    if !matches!(cli.command, Commands::Serve) {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let result = match cli.command {
        Commands::Serve => commands::serve::execute(config).await,
        Commands::Cleanup { days } => commands::cleanup::execute(&config, days, cli.json).await,
        Commands::History { agent, limit } => {
            commands::history::execute(&config, &agent, limit, cli.json).await
        }
        Commands::Config => commands::config::execute(&config, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
