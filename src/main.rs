use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ribbon::app::AppContext;
use ribbon::cli::{commands, Cli, Commands};
use ribbon::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Login => {
            commands::login(&ctx).await?;
        }
        Commands::Logout => {
            commands::logout(&ctx).await?;
        }
        Commands::List => {
            commands::list(&ctx).await?;
        }
        Commands::Add { title, url } => {
            commands::add(&ctx, &title, &url).await?;
        }
        Commands::Remove { id } => {
            commands::remove(&ctx, id).await?;
        }
        Commands::Status => {
            commands::status(&ctx).await?;
        }
        Commands::Tui => {
            ribbon::tui::run(Arc::new(ctx)).await?;
        }
    }

    Ok(())
}
