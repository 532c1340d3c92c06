//! Constants for the OpenLog Artemis line protocol and metric exposition
//!
//! Protocol prefixes, timings and label names live here so the resolver,
//! the ingestor and the read loop agree on them.

use std::time::Duration;

/// Serial line protocol
pub mod protocol {
    use super::Duration;

    /// Banner printed by the logger when it (re)boots
    pub const REBOOT_BANNER_PREFIX: &str = "Artemis OpenLog";

    /// Leading columns of the header line
    pub const HEADER_PREFIX: &str = "rtcDate,rtcTime";

    /// Column separator for header and data lines
    pub const SEPARATOR: char = ',';

    /// Number of leading date/time columns on every header and data line
    pub const DATE_TIME_COLUMNS: usize = 2;

    /// Opens the logger menu
    pub const MENU_OPEN: &[u8] = b"\n";

    /// Asks the logger menu to print the header line
    pub const HEADER_REQUEST: &[u8] = b"h";

    /// Time the menu needs after MENU_OPEN before it accepts a command
    pub const HEADER_REQUEST_DELAY: Duration = Duration::from_secs(1);

    /// Default baud rate of the OpenLog Artemis USB serial port
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
}

/// Metric exposition
pub mod metrics {
    /// Label carrying the sensor name
    pub const LABEL_SENSOR: &str = "sensor";

    /// Label carrying the 1-based sensor instance ordinal
    pub const LABEL_SENSOR_INDEX: &str = "sensorindex";

    /// Label carrying the sub-sensor name
    pub const LABEL_SUBSENSOR: &str = "subsensor";

    /// Label set of every sensor gauge, in order
    pub const SENSOR_LABELS: [&str; 3] = [LABEL_SENSOR, LABEL_SENSOR_INDEX, LABEL_SUBSENSOR];

    /// Name of the static build information metric
    pub const BUILD_INFO_NAME: &str = "qwiic_build_info";

    /// Help text of the build information metric
    pub const BUILD_INFO_HELP: &str = "Information about the qwiic_exporter itself.";

    /// File mode of the written textfile (readable by node_exporter)
    pub const TEXTFILE_MODE: u32 = 0o644;
}
