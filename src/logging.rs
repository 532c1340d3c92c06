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

//! Logging setup
//!
//! Logs go to the systemd journal when the process runs as a service,
//! otherwise to stdout.

use std::env;
use std::path::Path;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const JOURNAL_SOCKET: &str = "/run/systemd/journal/socket";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Journal,
    Stdout,
}

impl LogTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTarget::Journal => "systemd journal",
            LogTarget::Stdout => "stdout",
        }
    }
}

/// Build the env filter, falling back to `info` on a bad directive
pub fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("Invalid log filter {:?}: {}, using info", directives, e);
        EnvFilter::new("info")
    })
}

/// Whether stdout/stderr are connected to the journal
///
/// systemd sets `JOURNAL_STREAM` for services whose output it captures.
pub fn journal_available() -> bool {
    env::var_os("JOURNAL_STREAM").is_some() && Path::new(JOURNAL_SOCKET).exists()
}

/// Install the global subscriber
///
/// `verbose` adds source file and line number to every stdout event.
pub fn init_logging(directives: &str, verbose: bool) -> LogTarget {
    if journal_available() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(build_filter(directives))
                    .init();
                return LogTarget::Journal;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(verbose)
        .with_level(true)
        .with_file(verbose)
        .with_line_number(verbose)
        .with_env_filter(build_filter(directives))
        .init();
    LogTarget::Stdout
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_build_filter_levels() {
        assert_eq!(build_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(build_filter("warn").max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(build_filter("error").max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_build_filter_falls_back() {
        assert_eq!(build_filter("qe_core=verbose").max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_target_names() {
        assert_eq!(LogTarget::Journal.as_str(), "systemd journal");
        assert_eq!(LogTarget::Stdout.as_str(), "stdout");
    }
}
