//! `sanskara config`: Configuration commands.

use anyhow::Context;
use sanskara_config::AppConfig;
use std::path::Path;

/// Print the effective configuration (file plus environment overrides).
pub fn show(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };
    println!("# {source}");
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Write a default config file. An existing file is left untouched.
pub fn init(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, AppConfig::default_toml())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
