use anyhow::{Context, Result};
use sessiondeck_local_db::default_db_path;
use sessiondeck_runtime_config::{AppConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.config/sessiondeck/)
pub fn config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(".config").join("sessiondeck"))
}

/// Canonical config file path.
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the config file, falling back to defaults when it does not exist
/// or there is no home directory to look in.
pub fn load_config() -> Result<AppConfig> {
    match config_path() {
        Ok(path) => load_config_from(&path),
        Err(_) => Ok(AppConfig::default()),
    }
}

fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;
    AppConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config at {}", path.display()))
}

/// `--db` wins over `database.path`, which wins over the default location.
pub fn resolve_db_path(cli_override: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    if let Some(path) = cli_override {
        return Ok(path);
    }
    let configured = config.database.path.trim();
    if configured.is_empty() {
        return default_db_path();
    }
    let expanded = shellexpand::tilde(configured);
    Ok(PathBuf::from(expanded.as_ref()))
}

pub fn show_config(config: &AppConfig, db_path: &Path) -> Result<()> {
    let path = config_path()?;
    println!("# config file: {}", path.display());
    println!("# database:    {}", db_path.display());
    print!("{}", config.to_toml().context("serialize config")?);
    Ok(())
}
