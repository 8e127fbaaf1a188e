//! Huddle CLI entry point

use std::path::Path;

use clap::Parser;
use tracing::{error, info};

use huddle_cli::{
    app::HuddleApp,
    cli::{Cli, Commands},
    config::{CliAppConfig, CliOverrides},
    error::Result,
    parse_attachment,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_example_config(output.as_deref());
    }

    let name = match &cli.command {
        Commands::Meeting { name, .. }
        | Commands::Chat { name, .. }
        | Commands::Interactive { name } => name.clone(),
        Commands::Config { .. } => None,
    };
    let overrides = CliOverrides {
        display_name: name,
        seed: cli.seed,
        no_simulation: cli.no_simulation,
        verbose: cli.verbose,
        json: cli.json,
    };
    let config = CliAppConfig::load_with_overrides(cli.config.as_deref().map(Path::new), &overrides)?;

    setup_logging(config.cli.verbose);
    info!("Starting Huddle as {}", config.session.display_name);

    let deny_media = matches!(cli.command, Commands::Meeting { deny_media: true, .. });
    let mut app = HuddleApp::new(config, deny_media).await?;

    let outcome = match cli.command {
        Commands::Meeting {
            duration,
            share_screen,
            ..
        } => app.run_meeting(duration, share_screen).await,
        Commands::Chat {
            attach,
            wait,
            messages,
            ..
        } => match attach.iter().map(|a| parse_attachment(a)).collect::<Result<Vec<_>>>() {
            Ok(uploads) => app.run_chat(messages, uploads, wait).await,
            Err(e) => Err(e),
        },
        Commands::Interactive { .. } => app.run_interactive().await,
        Commands::Config { .. } => Ok(()),
    };

    app.shutdown().await?;
    if let Err(e) = &outcome {
        error!("Command failed: {}", e);
    }
    outcome
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_example_config(output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            CliAppConfig::example().save_to_file(path)?;
            println!("Wrote example configuration to {}", path);
        }
        None => print!("{}", CliAppConfig::example_config()),
    }
    Ok(())
}
