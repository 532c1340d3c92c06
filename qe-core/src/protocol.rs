//! OpenLog Artemis serial line protocol
//!
//! The logger prints three kinds of lines: a banner when it boots, a header
//! naming the active columns, and comma separated data lines.

use lazy_static::lazy_static;
use regex::Regex;

use crate::constants::protocol::{HEADER_PREFIX, REBOOT_BANNER_PREFIX, SEPARATOR};

lazy_static! {
    static ref FIRMWARE_RE: Option<Regex> = Regex::new(r"\bv(\d+(?:\.\d+)*)\b").ok();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Empty,
    /// Boot banner, with the firmware version when the banner carries one
    Reboot { firmware: Option<String> },
    Header,
    Data,
}

/// Decode raw serial bytes into a trimmed line
///
/// Returns `None` for anything that is not plain ASCII; line noise on the
/// link is dropped rather than parsed.
pub fn decode_line(bytes: &[u8]) -> Option<String> {
    if !bytes.is_ascii() {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    Some(text.trim().trim_matches(SEPARATOR).to_string())
}

pub fn classify(line: &str) -> LineKind {
    if line.is_empty() {
        LineKind::Empty
    } else if line.starts_with(REBOOT_BANNER_PREFIX) {
        LineKind::Reboot {
            firmware: firmware_version(line),
        }
    } else if line.starts_with(HEADER_PREFIX) {
        LineKind::Header
    } else {
        LineKind::Data
    }
}

/// Firmware version from a boot banner, e.g. `v2.3`
pub fn firmware_version(banner: &str) -> Option<String> {
    FIRMWARE_RE
        .as_ref()?
        .captures(banner)
        .and_then(|c| c.get(1))
        .map(|m| format!("v{}", m.as_str()))
}
