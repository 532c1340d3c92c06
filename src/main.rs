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

//! qwiic-exporter binary
//!
//! Configures the serial port, asks the logger for its header line and
//! then rewrites the textfile collector file after every reading.

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};

use qe_core::{Exporter, ExporterSettings, CORE_VERSION};
use qwiic_exporter::config::{load_config, Cli, ExporterConfig, LOG_ENV};
use qwiic_exporter::logging::init_logging;
use qwiic_exporter::serial::TtyPort;

const VERSION: &str = env!("CARGO_PKG_VERSION");

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn main() -> ExitCode {
    let cli = Cli::parse();

    // PHASE 1: Configuration
    let config = match load_config(cli.config.as_deref())
        .and_then(|file| ExporterConfig::resolve(&cli, file, std::env::var(LOG_ENV).ok()))
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("qwiic-exporter: {}", e);
            return ExitCode::from(2);
        }
    };

    // PHASE 2: Logging
    let target = init_logging(&config.log_filter, config.verbose_logging());
    info!("STARTUP: qwiic-exporter {} (core {}) starting", VERSION, CORE_VERSION);
    info!("STARTUP: Logging to {}", target.as_str());
    for warning in config.warnings() {
        warn!("{}", warning);
    }
    match serde_json::to_string(&config) {
        Ok(json) => debug!("Config: {}", json),
        Err(e) => debug!("Config could not be serialized: {}", e),
    }

    // PHASE 3: Signal handling
    if let Err(e) = ctrlc::set_handler(|| {
        info!("SIGNAL: Received SIGINT/SIGTERM, stopping after the current read");
        SHUTDOWN.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set signal handler: {}", e);
    }

    match run(&config) {
        Ok(()) => {
            info!("SHUTDOWN: qwiic-exporter stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ExporterConfig) -> Result<()> {
    // PHASE 4: Serial port
    let port = TtyPort::open(&config.serial_port, config.baud_rate)
        .with_context(|| format!("opening {}", config.serial_port.display()))?;
    info!(
        "STARTUP: Reading from {} at {} baud, writing {}",
        port.path().display(),
        config.baud_rate,
        config.textfile_path.display()
    );

    // PHASE 5: Read loop
    let settings = ExporterSettings::new(config.textfile_path.clone(), VERSION)
        .with_header_request_delay(Duration::from_millis(config.header_request_delay_ms));
    let mut exporter = Exporter::new(port, settings).context("initializing exporter")?;
    exporter.run(&SHUTDOWN).context("reading from the logger")?;
    Ok(())
}
