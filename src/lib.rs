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

//! qwiic-exporter
//!
//! Reads SparkFun OpenLog Artemis output from a serial port and keeps a
//! Prometheus textfile collector file up to date. The sensor logic lives
//! in `qe_core`; this crate adds configuration, logging and the TTY.

pub mod config;
pub mod logging;
pub mod serial;
