//! `intake config` command - Configuration management

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::config::KEYS;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., data_dir, draft_store)
    pub key: String,

    /// Value to set
    pub value: String,

    /// Set in global (user) config instead of the local config
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of the local config
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, _global: &GlobalOpts, config: &Config) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, config),
        ConfigCommands::Set(args) => run_set(args),
        ConfigCommands::Unset(args) => run_unset(args),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, config: &Config) -> Result<()> {
    if let Some(key) = &args.key {
        check_key(key)?;
        match config.get(key) {
            Some(v) => println!("{}", v),
            None => return Err(miette::miette!("Key '{}' is not set", key)),
        }
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _, _) in KEYS {
        match config.get(key) {
            Some(v) => println!("  {}: {}", style(key).cyan(), style(v).yellow()),
            None => println!("  {}: {}", style(key).cyan(), style("(not set)").dim()),
        }
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (INTAKE_*)");
    println!("  2. Local config (.intake/config.yaml)");
    println!("  3. Global config (~/.config/intake/config.yaml)");
    Ok(())
}

fn run_set(args: SetArgs) -> Result<()> {
    check_key(&args.key)?;
    check_value(&args.key, &args.value)?;

    let path = config_path(args.global)?;
    let mut map = read_mapping(&path)?;
    map.insert(
        serde_yml::Value::String(args.key.clone()),
        typed_value(&args.key, &args.value),
    );
    write_mapping(&path, map)?;

    println!(
        "{} Set {} {} {} in {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        scope(args.global)
    );
    Ok(())
}

fn run_unset(args: UnsetArgs) -> Result<()> {
    check_key(&args.key)?;
    let path = config_path(args.global)?;
    if !path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            path.display()
        ));
    }

    let mut map = read_mapping(&path)?;
    if map
        .remove(args.key.as_str())
        .is_none()
    {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }
    write_mapping(&path, map)?;

    println!(
        "{} Removed {} from {} config",
        style("✓").green(),
        style(&args.key).cyan(),
        scope(args.global)
    );
    Ok(())
}

fn run_path() -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!(
            "  {} {}",
            style("Global:").cyan(),
            style("(no home directory)").dim()
        ),
    }
    println!();
    print_path("Local:", &Config::local_config_path());
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, env, description) in KEYS {
        println!(
            "  {:<22} {:<24} {}",
            style(key).cyan(),
            style(env).yellow(),
            style(description).dim()
        );
    }

    println!();
    println!(
        "{}",
        style("Use 'intake config set <key> <value>' to set a value.").dim()
    );
    Ok(())
}

fn print_path(label: &str, path: &std::path::Path) {
    println!("  {} {}", style(label).cyan(), path.display());
    if path.exists() {
        println!("         {}", style("(exists)").green());
    } else {
        println!("         {}", style("(not created)").dim());
    }
}

fn scope(global: bool) -> &'static str {
    if global {
        "global"
    } else {
        "local"
    }
}

fn check_key(key: &str) -> Result<()> {
    if KEYS.iter().any(|(k, _, _)| *k == key) {
        Ok(())
    } else {
        Err(miette::miette!(
            help = "Run 'intake config keys' to list the valid keys",
            "Unknown configuration key '{}'",
            key
        ))
    }
}

fn check_value(key: &str, value: &str) -> Result<()> {
    match key {
        "draft_store" => value
            .parse::<crate::core::StoreKind>()
            .map(|_| ())
            .map_err(|e| miette::miette!("{}", e)),
        "submit_timeout_secs" => value
            .trim()
            .parse::<u64>()
            .map(|_| ())
            .map_err(|_| miette::miette!("submit_timeout_secs must be a whole number of seconds")),
        _ => Ok(()),
    }
}

/// Numbers are stored unquoted so the file deserializes into `Config`
fn typed_value(key: &str, value: &str) -> serde_yml::Value {
    match (key, value.trim().parse::<u64>()) {
        ("submit_timeout_secs", Ok(n)) => serde_yml::Value::Number(n.into()),
        _ => serde_yml::Value::String(value.to_string()),
    }
}

fn config_path(global: bool) -> Result<PathBuf> {
    if global {
        Config::global_config_path()
            .ok_or_else(|| miette::miette!("Could not determine global config directory"))
    } else {
        Ok(Config::local_config_path())
    }
}

fn read_mapping(path: &std::path::Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content).into_diagnostic()? {
        serde_yml::Value::Mapping(map) => Ok(map),
        serde_yml::Value::Null => Ok(serde_yml::Mapping::new()),
        _ => Err(miette::miette!(
            "{} does not contain a mapping",
            path.display()
        )),
    }
}

fn write_mapping(path: &std::path::Path, map: serde_yml::Mapping) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&serde_yml::Value::Mapping(map)).into_diagnostic()?;
    fs::write(path, yaml).into_diagnostic()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_check_key() {
        assert!(check_key("draft_store").is_ok());
        assert!(check_key("author").is_err());
    }

    #[test]
    fn test_check_value() {
        assert!(check_value("draft_store", "sqlite").is_ok());
        assert!(check_value("draft_store", "redis").is_err());
        assert!(check_value("submit_timeout_secs", "ten").is_err());
        assert!(check_value("data_dir", "/tmp/intake").is_ok());
    }

    #[test]
    fn test_mapping_round_trip_loads_as_config() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.yaml");

        let mut map = read_mapping(&path).unwrap();
        map.insert(
            serde_yml::Value::String("submit_timeout_secs".into()),
            typed_value("submit_timeout_secs", "5"),
        );
        map.insert(
            serde_yml::Value::String("draft_store".into()),
            typed_value("draft_store", "memory"),
        );
        write_mapping(&path, map).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let config: Config = serde_yml::from_str(&text).unwrap();
        assert_eq!(config.submit_timeout_secs, Some(5));
        assert_eq!(config.draft_store, Some(crate::core::StoreKind::Memory));
    }
}
