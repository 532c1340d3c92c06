//! Read loop
//!
//! Owns the serial link, the signature table, the metric registry and the
//! active header resolution, and dispatches every line the logger prints.
//! Everything runs on one thread; the resolution is swapped wholesale when
//! a new header resolves and is never edited in place.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::constants::protocol::{HEADER_REQUEST, HEADER_REQUEST_DELAY, MENU_OPEN};
use crate::error::Result;
use crate::ingest::{ingest, IngestOutcome};
use crate::metrics::MetricRegistry;
use crate::protocol::{classify, decode_line, LineKind};
use crate::resolver::{resolve_header, GaugeIndex, Resolution, SensorConfiguration};
use crate::signature::{build_signature_table, SignatureTable};

/// Version of the core library, published in build info
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Line oriented connection to the logger
pub trait SerialLink {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    /// Next complete line, or `None` when the read timed out first
    fn read_line(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Everything the exporter needs, fixed at construction
#[derive(Debug, Clone)]
pub struct ExporterSettings {
    /// Destination of the metrics snapshot
    pub textfile_path: PathBuf,
    /// Wait between opening the logger menu and asking for headers
    pub header_request_delay: Duration,
    /// Version published in `qwiic_build_info`
    pub version: String,
}

impl ExporterSettings {
    pub fn new(textfile_path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            textfile_path: textfile_path.into(),
            header_request_delay: HEADER_REQUEST_DELAY,
            version: version.into(),
        }
    }

    pub fn with_header_request_delay(mut self, delay: Duration) -> Self {
        self.header_request_delay = delay;
        self
    }
}

/// What handling one line did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not decodable as text, dropped
    Discarded,
    /// Blank, or data before any header was resolved
    Ignored,
    /// Boot banner seen, headers requested
    RebootDetected,
    /// New header resolved and activated
    Configured { sensors: usize, columns: usize },
    /// Header did not match the catalog, previous state kept
    HeaderRejected,
    /// Gauges set and snapshot flushed
    Updated { columns: usize },
    /// Data line did not fit the index, headers requested
    ResyncRequested,
}

pub struct Exporter<L: SerialLink> {
    link: L,
    settings: ExporterSettings,
    catalog: Catalog,
    table: SignatureTable,
    registry: MetricRegistry,
    active: Option<Resolution>,
}

impl<L: SerialLink> Exporter<L> {
    pub fn new(link: L, settings: ExporterSettings) -> Result<Self> {
        Self::with_catalog(link, settings, Catalog::builtin())
    }

    pub fn with_catalog(link: L, settings: ExporterSettings, catalog: Catalog) -> Result<Self> {
        debug!("Getting sensor signature lookup table...");
        let table = build_signature_table(&catalog);
        info!(
            sensors = catalog.sensors().len(),
            signatures = table.len(),
            "Sensor catalog loaded"
        );

        let mut registry = MetricRegistry::new();
        registry.register_build_info(&[
            ("version", settings.version.as_str()),
            ("core_version", CORE_VERSION),
        ])?;

        Ok(Self {
            link,
            settings,
            catalog,
            table,
            registry,
            active: None,
        })
    }

    /// Open the logger menu, wait for it, then ask for the header line
    pub fn request_header(&mut self) -> Result<()> {
        debug!("Requesting header line");
        self.link.write_bytes(MENU_OPEN)?;
        if !self.settings.header_request_delay.is_zero() {
            std::thread::sleep(self.settings.header_request_delay);
        }
        self.link.write_bytes(HEADER_REQUEST)
    }

    pub fn handle_line(&mut self, raw: &[u8]) -> Result<LineOutcome> {
        let Some(line) = decode_line(raw) else {
            return Ok(LineOutcome::Discarded);
        };
        debug!(line = %line, "Got line");

        match classify(&line) {
            LineKind::Empty => Ok(LineOutcome::Ignored),
            LineKind::Reboot { firmware } => {
                info!(firmware = firmware.as_deref().unwrap_or("unknown"), "Logger reboot detected");
                self.request_header()?;
                Ok(LineOutcome::RebootDetected)
            }
            LineKind::Header => self.apply_header(&line),
            LineKind::Data => self.apply_data(&line),
        }
    }

    fn apply_header(&mut self, line: &str) -> Result<LineOutcome> {
        debug!("Header line detected, parsing sensor config...");
        match resolve_header(line, &self.catalog, &self.table, &mut self.registry) {
            Ok(resolution) => {
                let sensors = resolution.configuration.len();
                let columns = resolution.index.len();
                for instance in resolution.configuration.instances() {
                    info!(sensor = instance.sensor, subsensors = ?instance.subsensors, "Sensor detected");
                }
                self.active = Some(resolution);
                Ok(LineOutcome::Configured { sensors, columns })
            }
            Err(e) if e.is_recoverable() => {
                error!(error = %e, "Header rejected, keeping previous sensor configuration");
                Ok(LineOutcome::HeaderRejected)
            }
            Err(e) => Err(e),
        }
    }

    fn apply_data(&mut self, line: &str) -> Result<LineOutcome> {
        let Some(active) = self.active.as_ref() else {
            debug!("No sensor configuration yet, skipping data line");
            return Ok(LineOutcome::Ignored);
        };

        match ingest(line, &active.index)? {
            IngestOutcome::Updated { columns } => {
                if let Err(e) = self.registry.write_textfile(&self.settings.textfile_path) {
                    warn!(error = %e, "Failed to write textfile collector file");
                }
                Ok(LineOutcome::Updated { columns })
            }
            IngestOutcome::ResyncRequired { expected, received } => {
                error!(
                    "Gauge index is out of sync (index has {} metrics, reading has {} metrics), getting new headers",
                    expected, received
                );
                self.request_header()?;
                Ok(LineOutcome::ResyncRequested)
            }
        }
    }

    /// Request headers, then read and dispatch lines until `shutdown` is set
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        self.request_header()?;

        while !shutdown.load(Ordering::SeqCst) {
            let Some(raw) = self.link.read_line()? else {
                continue;
            };
            if let Err(e) = self.handle_line(&raw) {
                error!(error = %e, "Stopping read loop");
                return Err(e);
            }
        }

        info!("Read loop stopped");
        Ok(())
    }

    pub fn sensor_configuration(&self) -> Option<&SensorConfiguration> {
        self.active.as_ref().map(|r| &r.configuration)
    }

    pub fn gauge_index(&self) -> Option<&GaugeIndex> {
        self.active.as_ref().map(|r| &r.index)
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn signature_table(&self) -> &SignatureTable {
        &self.table
    }
}
