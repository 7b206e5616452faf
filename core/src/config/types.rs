use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub paths: PathsConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            runner: RunnerConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "stagehand_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Base name of the helper executable, without platform suffix.
    #[serde(default = "default_helper_name")]
    pub helper_name: String,

    /// Capacity of the channel carrying child output lines to the bridge.
    #[serde(default = "default_line_channel_capacity")]
    pub line_channel_capacity: usize,
}

fn default_helper_name() -> String {
    "stagehand-host".to_string()
}

fn default_line_channel_capacity() -> usize {
    256
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            helper_name: default_helper_name(),
            line_channel_capacity: default_line_channel_capacity(),
        }
    }
}

/// Well-known worker directories. Unset entries are resolved against the
/// stagehand data directory by `load_default`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the helper executable.
    #[serde(default)]
    pub bin_dir: Option<String>,

    /// Writable working directory for helper invocations.
    #[serde(default)]
    pub work_dir: Option<String>,

    /// Directory searched for plugin support modules during resolve.
    #[serde(default)]
    pub module_dir: Option<String>,
}
