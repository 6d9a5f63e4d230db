mod cli;
#[cfg(feature = "docx")]
mod docx;
mod error;
mod fmt;
mod generator;
mod importer;
mod invoice;
mod models;
mod opener;
#[cfg(feature = "pdf")]
mod pdf;
mod reports;
mod settings;
mod tui;
mod worker;

use std::sync::Once;

use clap::{CommandFactory, Parser};

use cli::{Cli, Commands, ConfigCommands};

static TRACING_INIT: Once = Once::new();

/// Diagnostics go to stderr, filtered by `RUST_LOG` (warnings by default).
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kdp_invoice=warn"));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    });
}

fn main() {
    let cli = Cli::parse();
    let config_path = settings::resolve_config_path(cli.config.as_deref());

    // The interactive app owns the terminal, so it runs without a subscriber.
    if !matches!(cli.command, None | Some(Commands::App)) {
        init_tracing();
    }

    let result = match cli.command {
        None | Some(Commands::App) => cli::app::run(&config_path),
        Some(Commands::Generate {
            file,
            year,
            month,
            format,
            number,
            payment_date,
            open,
        }) => cli::generate::run(
            cli::generate::GenerateArgs {
                file,
                year,
                month,
                format,
                number,
                payment_date,
                open,
            },
            &config_path,
        ),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => cli::config::show(&config_path),
            ConfigCommands::Path => cli::config::path(&config_path),
            ConfigCommands::Init { force } => cli::config::init(&config_path, force),
            ConfigCommands::Check => cli::config::check(&config_path),
            ConfigCommands::Set { key, value } => cli::config::set(&config_path, &key, &value),
        },
        Some(Commands::Info) => cli::about::run(),
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "kdp-invoice",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
