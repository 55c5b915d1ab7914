//! Init and Config commands.

use console::style;

use crate::config::Settings;

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow::anyhow!("{e}"))?;

    println!(
        "{} configuration at {}",
        style(if force { "Wrote" } else { "Created" }).green().bold(),
        path.display()
    );
    println!("Edit this file to choose models, chunk sizes and the index location.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(settings: &Settings, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(settings)?);
        return Ok(());
    }

    println!("{}", style("Current Configuration:").cyan().bold());
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}
