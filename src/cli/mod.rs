//! Command-line interface: argument parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

use crate::config::Settings;
use commands::ingest::IngestArgs;

/// Load settings for a CLI invocation.
///
/// `--config` replaces workspace discovery; environment overrides apply
/// either way.
pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let settings = match &cli.config {
        Some(path) => {
            let mut settings = Settings::load_from(path)?;
            if settings.workspace_root.is_none() {
                settings.workspace_root = path
                    .parent()
                    .and_then(|dir| dir.parent())
                    .map(|root| root.to_path_buf());
            }
            settings
        }
        None => Settings::load()?,
    };
    Ok(settings)
}

/// Run the parsed command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Init { force } = &cli.command {
        return commands::init::run_init(*force);
    }

    let settings = load_settings(&cli)?;
    crate::logging::init_with_config(&settings.logging, cli.verbose);
    settings.validate()?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Config { json } => commands::init::run_config(&settings, json),
        Commands::Ingest {
            path,
            mode,
            max_chunk_chars,
            overlap_chars,
            no_progress,
            json,
        } => {
            let args = IngestArgs {
                path,
                mode,
                max_chunk_chars,
                overlap_chars,
                show_progress: !no_progress,
                json,
            };
            commands::ingest::run(args, &settings).await
        }
        Commands::Query {
            question,
            top_k,
            sources,
            json,
        } => commands::query::run_query(&question, top_k, sources, json, &settings).await,
        Commands::Search { query, limit, json } => {
            commands::query::run_search(&query, limit, json, &settings).await
        }
        Commands::Status { json } => commands::status::run(&settings, json),
        #[cfg(feature = "http-server")]
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.server.bind.clone());
            crate::server::serve(settings, bind).await
        }
    }
}
