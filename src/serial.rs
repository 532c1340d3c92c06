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

//! Serial port access
//!
//! Opens the logger's TTY in raw mode with a one second read timeout and
//! splits the byte stream into lines for the read loop.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use qe_core::SerialLink;
use qe_error::{QwiicError, Result};

/// Baud rates the port can be configured with
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [9_600, 19_200, 38_400, 57_600, 115_200, 230_400];

/// Read timeout in tenths of a second
const READ_TIMEOUT_DECISECONDS: libc::cc_t = 10;

/// Longest partial line kept while waiting for a newline
const MAX_PENDING: usize = 4096;

const READ_CHUNK: usize = 256;

/// How long `read_line` waits for input before reporting a timeout
const POLL_TIMEOUT_MS: libc::c_int = 1000;

/// termios speed constant for a baud rate
pub fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    match baud {
        9_600 => Some(libc::B9600),
        19_200 => Some(libc::B19200),
        38_400 => Some(libc::B38400),
        57_600 => Some(libc::B57600),
        115_200 => Some(libc::B115200),
        230_400 => Some(libc::B230400),
        _ => None,
    }
}

/// Accumulates raw bytes and hands out complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING && !self.pending.contains(&b'\n') {
            warn!(bytes = self.pending.len(), "Discarding unterminated serial input");
            self.pending.clear();
        }
    }

    /// Next line without its terminator
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Raw mode TTY connected to the logger
pub struct TtyPort {
    path: PathBuf,
    file: File,
    buffer: LineBuffer,
}

impl TtyPort {
    pub fn open(path: &Path, baud: u32) -> Result<Self> {
        let speed = baud_constant(baud).ok_or_else(|| QwiicError::SerialConfigure {
            path: path.to_path_buf(),
            reason: format!("unsupported baud rate {}", baud),
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(path)
            .map_err(|source| QwiicError::SerialOpen {
                path: path.to_path_buf(),
                source,
            })?;

        configure_raw(&file, speed).map_err(|e| QwiicError::SerialConfigure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(port = %path.display(), baud, "Serial port configured");

        Ok(Self {
            path: path.to_path_buf(),
            file,
            buffer: LineBuffer::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn configure_raw(file: &File, speed: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: termios is plain old data; tcgetattr fully initializes it before use.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: fd is a valid open descriptor owned by `file` for the duration of these calls,
    // and every pointer passed refers to the local termios struct.
    unsafe {
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut tio);
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cc[libc::VMIN] = 0;
        tio.c_cc[libc::VTIME] = READ_TIMEOUT_DECISECONDS;
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        libc::tcflush(fd, libc::TCIFLUSH);
    }
    Ok(())
}

impl SerialLink for TtyPort {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(line) = self.buffer.next_line() {
                return Ok(Some(line));
            }
            if !wait_readable(&self.file)? {
                return Ok(None);
            }
            match self.file.read(&mut chunk) {
                // readable but empty: the device hung up
                Ok(0) => {
                    warn!(port = %self.path.display(), "Serial device disconnected");
                    return Err(disconnected());
                }
                Ok(n) => self.buffer.push(&chunk[..n]),
                // Signal delivery; let the caller check its shutdown flag
                Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn disconnected() -> QwiicError {
    QwiicError::Io(std::io::Error::new(
        ErrorKind::UnexpectedEof,
        "device reports readiness to read but returned no data",
    ))
}

/// Wait up to `POLL_TIMEOUT_MS` for input; `false` on timeout
///
/// A hangup counts as readable so the following read reports it.
fn wait_readable(file: &File) -> Result<bool> {
    let mut pfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: pfd is a single valid pollfd and the count passed is 1.
    let ready = unsafe { libc::poll(&mut pfd, 1, POLL_TIMEOUT_MS) };
    if ready < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err.into());
    }
    if ready == 0 {
        return Ok(false);
    }
    if pfd.revents & libc::POLLNVAL != 0 {
        return Err(QwiicError::Io(std::io::Error::from_raw_os_error(libc::EBADF)));
    }
    Ok(true)
}
