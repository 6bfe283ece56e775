use clap::Subcommand;
use relay_core::{cache::policy::PolicyTable, config::AppConfig};
use std::fs;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to config file
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },

    /// Print the effective TTL policy table
    ShowPolicies {
        /// Path to config file; built-in policies are shown when it does not exist
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },
}

pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
        ConfigCommands::ShowPolicies { file } => show_policies(&file),
    }
}

/// Loads `file` with environment overrides applied. A missing file yields defaults.
pub fn load_config(file: &str) -> CliResult<AppConfig> {
    AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))
}

fn validate_config(file: &str) -> CliResult<()> {
    if let Err(e) = fs::metadata(file) {
        print_error(&format!("Cannot read configuration file {file}: {e}"));
        return Err(e.into());
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = load_config(file)?;

    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");

    println!("Configuration Summary:");
    println!("  Environment: {}", config.environment);
    println!(
        "  Cache: {} (capacity {}, purge every {}s)",
        if config.cache.enabled { "enabled" } else { "disabled" },
        config.cache.memory_capacity,
        config.cache.purge_interval_seconds
    );
    if config.cache.policies.is_empty() {
        println!("  Policies: built-in");
    } else {
        println!("  Policies: {} entries", config.cache.policies.len());
    }
    println!(
        "  Pipeline: max batch {}, upstream timeout {}s",
        config.pipeline.max_batch_size, config.pipeline.upstream_timeout_seconds
    );
    println!("  Logging: {} ({})", config.logging.level, config.logging.format);

    Ok(())
}

fn show_policies(file: &str) -> CliResult<()> {
    let config = load_config(file)?;
    let table = config.policy_table().map_err(|e| CliError::Config(e.to_string()))?;
    print!("{}", render_policies(&table));
    Ok(())
}

/// One line per entry, catch-all first.
pub fn render_policies(table: &PolicyTable) -> String {
    let entries = table.entries();
    let width = entries.iter().map(|(prefix, _)| prefix.len()).max().unwrap_or(0).max(9);

    let mut out = String::new();
    for (prefix, ttl) in entries {
        let label = if prefix.is_empty() { "(default)" } else { prefix };
        out.push_str(&format!("{label:<width$}  {ttl}\n"));
    }
    out
}
