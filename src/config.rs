/*
 * This file is part of qwiic-exporter.
 *
 * Copyright (C) 2025 qwiic-exporter contributors
 *
 * qwiic-exporter is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * qwiic-exporter is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with qwiic-exporter. If not, see <https://www.gnu.org/licenses/>.
 */

//! Configuration
//!
//! Settings come from built-in defaults, an optional JSON file and the
//! command line, in increasing order of precedence. Everything is merged
//! and validated here, before the exporter is constructed.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use qe_core::constants::protocol::{DEFAULT_BAUD_RATE, HEADER_REQUEST_DELAY};
use qe_error::{QwiicError, Result};

use crate::serial::SUPPORTED_BAUD_RATES;

/// Environment variable holding a raw tracing filter, e.g. `qe_core=trace`
pub const LOG_ENV: &str = "QWIIC_LOG";

const SYSTEM_CONFIG_PATH: &str = "/etc/qwiic-exporter/config.json";

#[derive(Parser, Debug, Default)]
#[command(name = "qwiic-exporter")]
#[command(version)]
#[command(about = "Exports metrics from SparkFun OpenLog Artemis sensors to the Prometheus node_exporter textfile collector path.")]
pub struct Cli {
    /// The path to the serial port where the SparkFun OpenLog Artemis is connected
    #[arg(value_name = "SERIALPORT")]
    pub serial_port: Option<PathBuf>,

    /// The textfile collector file to write output to. Remember the .prom suffix
    #[arg(value_name = "PROMPATH")]
    pub textfile_path: Option<PathBuf>,

    /// Debug mode. Equal to setting --log-level=debug
    #[arg(short, long, conflicts_with_all = ["log_level", "quiet"])]
    pub debug: bool,

    /// Logging level. Defaults to info
    #[arg(short, long, value_enum, ignore_case = true)]
    pub log_level: Option<LogLevel>,

    /// Quiet mode. No output at all if no errors are encountered. Equal to setting --log-level=warning
    #[arg(short, long, conflicts_with = "log_level")]
    pub quiet: bool,

    /// JSON configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Serial port baud rate
    #[arg(short, long)]
    pub baud_rate: Option<u32>,
}

impl Cli {
    /// Log level requested on the command line, if any
    pub fn requested_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            Some(LogLevel::Debug)
        } else if self.quiet {
            Some(LogLevel::Warning)
        } else {
            self.log_level
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// Equivalent tracing filter directive
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has no level above error
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_header_request_delay_ms() -> u64 {
    HEADER_REQUEST_DELAY.as_millis() as u64
}

/// On-disk configuration; every field is optional
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub serial_port: Option<PathBuf>,
    #[serde(default)]
    pub textfile_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_header_request_delay_ms")]
    pub header_request_delay_ms: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            textfile_path: None,
            log_level: default_log_level(),
            baud_rate: default_baud_rate(),
            header_request_delay_ms: default_header_request_delay_ms(),
        }
    }
}

/// Fully resolved configuration the exporter runs with
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExporterConfig {
    pub serial_port: PathBuf,
    pub textfile_path: PathBuf,
    pub log_level: LogLevel,
    /// Filter handed to tracing; `QWIIC_LOG` may override the level
    pub log_filter: String,
    pub baud_rate: u32,
    pub header_request_delay_ms: u64,
}

impl ExporterConfig {
    /// Merge file and command line settings, then validate
    pub fn resolve(cli: &Cli, file: FileConfig, log_env: Option<String>) -> Result<Self> {
        let serial_port = cli
            .serial_port
            .clone()
            .or(file.serial_port)
            .ok_or_else(|| QwiicError::MissingConfig("serial port (SERIALPORT)".into()))?;
        let textfile_path = cli
            .textfile_path
            .clone()
            .or(file.textfile_path)
            .ok_or_else(|| QwiicError::MissingConfig("textfile path (PROMPATH)".into()))?;

        let (log_level, log_filter) = match (cli.requested_log_level(), log_env) {
            (Some(level), _) => (level, level.as_filter().to_string()),
            (None, Some(filter)) if !filter.trim().is_empty() => (file.log_level, filter),
            (None, _) => (file.log_level, file.log_level.as_filter().to_string()),
        };

        let config = Self {
            serial_port,
            textfile_path,
            log_level,
            log_filter,
            baud_rate: cli.baud_rate.unwrap_or(file.baud_rate),
            header_request_delay_ms: file.header_request_delay_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial_port.as_os_str().is_empty() {
            return Err(QwiicError::invalid_config("serial_port", "must not be empty"));
        }
        if self.textfile_path.as_os_str().is_empty() {
            return Err(QwiicError::invalid_config("textfile_path", "must not be empty"));
        }
        if self.textfile_path.is_dir() {
            return Err(QwiicError::invalid_config("textfile_path", "is a directory"));
        }
        if let Some(parent) = self.textfile_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(QwiicError::invalid_config(
                    "textfile_path",
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }
        if self.baud_rate == 0 {
            return Err(QwiicError::invalid_config("baud_rate", "must be greater than zero"));
        }
        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            return Err(QwiicError::invalid_config(
                "baud_rate",
                format!("{} is not one of {:?}", self.baud_rate, SUPPORTED_BAUD_RATES),
            ));
        }
        Ok(())
    }

    /// Non-fatal problems worth logging once logging is up
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.textfile_path.extension().and_then(|e| e.to_str()) != Some("prom") {
            warnings.push(format!(
                "textfile path {} does not end in .prom, node_exporter will ignore it",
                self.textfile_path.display()
            ));
        }
        warnings
    }

    /// Whether log lines should carry source locations
    pub fn verbose_logging(&self) -> bool {
        self.log_level == LogLevel::Debug
    }
}

/// Default config file location: user config dir, then /etc
pub fn default_config_path() -> Option<PathBuf> {
    let user = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|base| base.join("qwiic-exporter").join("config.json"));

    user.filter(|p| p.exists())
        .or_else(|| Some(PathBuf::from(SYSTEM_CONFIG_PATH)).filter(|p| p.exists()))
}

/// Read a JSON config file
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let data = fs::read_to_string(path).map_err(|e| {
        QwiicError::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&data)?)
}

/// Config file from `--config`, else the default location, else defaults
///
/// An explicit path must exist; the default locations are optional.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    match explicit {
        Some(path) => load_file_config(path),
        None => match default_config_path() {
            Some(path) => load_file_config(&path),
            None => Ok(FileConfig::default()),
        },
    }
}
