//! qwiic-exporter core library
//!
//! Turns the serial output of a SparkFun OpenLog Artemis data logger into
//! Prometheus gauges, without being told which Qwiic sensors are attached.
//!
//! # Module Structure
//!
//! - `catalog` - Known sensors, sub-sensors and their columns
//! - `signature` - Every column signature a sensor can produce
//! - `resolver` - Header line to sensor configuration and gauge index
//! - `ingest` - Data line to gauge values
//! - `metrics` - Gauge registry and textfile exposition
//! - `protocol` - Serial line decoding and classification
//! - `exporter` - The read loop tying it together
//!
//! # Example
//!
//! ```
//! use qe_core::{build_signature_table, resolve_header, ingest, Catalog, MetricRegistry};
//!
//! let catalog = Catalog::builtin();
//! let table = build_signature_table(&catalog);
//! let mut registry = MetricRegistry::new();
//!
//! let resolution = resolve_header("rtcDate,rtcTime,output_Hz,", &catalog, &table, &mut registry).unwrap();
//! ingest("01/07/2000,16:18:45.54,1.00,", &resolution.index).unwrap();
//! ```

pub mod catalog;
pub mod constants;
pub mod error;
pub mod exporter;
pub mod ingest;
pub mod metrics;
pub mod protocol;
pub mod resolver;
pub mod signature;

pub use catalog::{Catalog, MetricDef, SensorDef, SubSensorDef};
pub use error::{QwiicError, Result};
pub use exporter::{Exporter, ExporterSettings, LineOutcome, SerialLink, CORE_VERSION};
pub use ingest::{data_readings, ingest, IngestOutcome};
pub use metrics::MetricRegistry;
pub use protocol::{classify, decode_line, firmware_version, LineKind};
pub use resolver::{
    header_columns, resolve_header, GaugeEntry, GaugeIndex, Resolution, SensorConfiguration,
    SensorInstance,
};
pub use signature::{build_signature_table, subsensor_signatures, SignatureCollision, SignatureTable};
