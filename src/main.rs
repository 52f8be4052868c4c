//! Querychat - SQL chat service CLI
//!
#![doc = "Querychat - SQL chat service CLI"]
#![doc = "Main entry point for the Querychat client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use querychat::cli::{Cli, Commands};
use querychat::commands;
use querychat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { resume, .. } => {
            if let Some(r) = &resume {
                tracing::debug!("Resuming chat: {}", r);
            }
            commands::chat::run_chat(config, resume).await?;
            Ok(())
        }
        Commands::Ask { question, chat, .. } => {
            tracing::info!("Sending a single question");
            commands::ask::run_ask(config, question, chat).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(config, command).await?;
            Ok(())
        }
        Commands::Schema {
            database,
            table,
            samples,
        } => {
            commands::schema::handle_schema(config, database, table, samples).await?;
            Ok(())
        }
        Commands::Login { username } => {
            commands::account::login(config, username).await?;
            Ok(())
        }
        Commands::Register {
            username,
            email,
            full_name,
        } => {
            commands::account::register(config, username, email, full_name).await?;
            Ok(())
        }
        Commands::ForgotPassword { email } => {
            commands::account::forgot_password(config, email).await?;
            Ok(())
        }
        Commands::ResetPassword { token } => {
            commands::account::reset_password(config, token).await?;
            Ok(())
        }
        Commands::Logout => {
            commands::account::logout(config).await?;
            Ok(())
        }
        Commands::Whoami => {
            commands::account::whoami(config)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter.
///
/// Logs go to stderr so they never mix with rendered tables.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "querychat=debug" } else { "querychat=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
