use std::path::{Path, PathBuf};

use super::types::WorkerConfig;

/// Get the default stagehand data directory: ~/.stagehand
pub fn get_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".stagehand"))
}

/// Loads the worker configuration and resolves the well-known directories.
///
/// Priority: `~/.stagehand/stagehand.toml`, then `./stagehand.toml`, then
/// built-in defaults. `STAGEHAND_BIN_DIR`, `STAGEHAND_WORK_DIR` and
/// `STAGEHAND_MODULE_DIR` override the path entries last.
pub fn load_default() -> anyhow::Result<WorkerConfig> {
    let data_dir = get_data_dir()?;
    let data_config = data_dir.join("stagehand.toml");

    let local_config = Path::new("stagehand.toml");

    let mut cfg: WorkerConfig = if data_config.exists() {
        let s = std::fs::read_to_string(&data_config)?;
        toml::from_str::<WorkerConfig>(&s)?
    } else if local_config.exists() {
        let s = std::fs::read_to_string(local_config)?;
        toml::from_str::<WorkerConfig>(&s)?
    } else {
        WorkerConfig::default()
    };

    // Resolve unset paths against the data directory.
    if is_unset(&cfg.paths.bin_dir) {
        cfg.paths.bin_dir = Some(data_dir.join("bin").to_string_lossy().to_string());
    }
    if is_unset(&cfg.paths.work_dir) {
        cfg.paths.work_dir = Some(data_dir.join("work").to_string_lossy().to_string());
    }
    if is_unset(&cfg.paths.module_dir) {
        cfg.paths.module_dir = Some(data_dir.join("modules").to_string_lossy().to_string());
    }

    // Default log directory lives under the data directory as well.
    if cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        let logs_dir = data_dir.join("logs");
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    // Environment variable overrides (highest priority).
    if let Ok(v) = std::env::var("STAGEHAND_BIN_DIR") {
        if !v.trim().is_empty() {
            cfg.paths.bin_dir = Some(v);
        }
    }
    if let Ok(v) = std::env::var("STAGEHAND_WORK_DIR") {
        if !v.trim().is_empty() {
            cfg.paths.work_dir = Some(v);
        }
    }
    if let Ok(v) = std::env::var("STAGEHAND_MODULE_DIR") {
        if !v.trim().is_empty() {
            cfg.paths.module_dir = Some(v);
        }
    }

    Ok(cfg)
}

fn is_unset(entry: &Option<String>) -> bool {
    entry.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}
