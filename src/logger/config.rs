//! Runtime logger configuration, built from `[logger]` settings.

use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub console: ConsoleConfig,
    pub file: FileConfig,
    /// Level or full `EnvFilter` directive, e.g. `info` or `storefront_rs=debug,info`
    pub level: String,
}

impl LoggerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.console.enabled || self.file.enabled,
            "At least one output (console or file) must be enabled"
        );
        anyhow::ensure!(
            !self.file.enabled || !self.file.path.as_os_str().is_empty(),
            "File path cannot be empty when file output is enabled"
        );
        Ok(())
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            console: ConsoleConfig {
                enabled: true,
                colored: true,
            },
            file: FileConfig {
                enabled: false,
                path: PathBuf::from("logs/storefront.log"),
                append: true,
                format: LogFormat::Json,
            },
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Colors are only emitted when stdout is a terminal
    pub colored: bool,
}

#[derive(Debug, Clone)]
pub struct FileConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub append: bool,
    pub format: LogFormat,
}

/// Line format for the file output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

impl LogFormat {
    const ALL: [LogFormat; 3] = [LogFormat::Full, LogFormat::Compact, LogFormat::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Full => "full",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid log format '{}'. Valid formats are: full, compact, json",
                    s
                )
            })
    }
}
