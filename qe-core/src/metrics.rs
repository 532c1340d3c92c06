//! Metric registry and textfile exposition
//!
//! Wraps a `prometheus::Registry` holding one labelled gauge family per
//! published metric name. Families are created the first time a resolved
//! header needs them and live for the rest of the process, so every gauge
//! index entry for a name shares the same handle.

use std::collections::HashMap;
use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{debug, trace};

use crate::catalog::MetricDef;
use crate::constants::metrics::{BUILD_INFO_HELP, BUILD_INFO_NAME, SENSOR_LABELS, TEXTFILE_MODE};
use crate::error::{QwiicError, Result};

/// Gauge families for every metric seen since startup
///
/// Series are never removed. After a new header drops a sensor instance,
/// its last values stay in the exposition until the process restarts.
pub struct MetricRegistry {
    registry: Registry,
    gauges: HashMap<String, GaugeVec>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            gauges: HashMap::new(),
        }
    }

    /// Get or create the gauge family for a metric
    ///
    /// The first definition registered for a name provides its help text.
    pub fn gauge(&mut self, def: &MetricDef) -> Result<GaugeVec> {
        if let Some(existing) = self.gauges.get(def.name) {
            return Ok(existing.clone());
        }

        let gauge = GaugeVec::new(Opts::new(def.name, def.help), &SENSOR_LABELS)?;
        self.registry.register(Box::new(gauge.clone()))?;
        debug!(metric = def.name, "Registered gauge");
        self.gauges.insert(def.name.to_string(), gauge.clone());
        Ok(gauge)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gauges.contains_key(name)
    }

    /// Names of all sensor gauge families, sorted
    pub fn gauge_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.gauges.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Publish static build information as an info-style gauge set to 1
    pub fn register_build_info(&mut self, labels: &[(&str, &str)]) -> Result<()> {
        let names: Vec<&str> = labels.iter().map(|(k, _)| *k).collect();
        let values: Vec<&str> = labels.iter().map(|(_, v)| *v).collect();

        let info = GaugeVec::new(Opts::new(BUILD_INFO_NAME, BUILD_INFO_HELP), &names)?;
        self.registry.register(Box::new(info.clone()))?;
        info.get_metric_with_label_values(&values)?.set(1.0);
        Ok(())
    }

    /// Current value of one series, if it has been set
    pub fn sample(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.registry
            .gather()
            .into_iter()
            .find(|family| family.get_name() == name)?
            .get_metric()
            .iter()
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && labels.iter().all(|(k, v)| {
                        pairs.iter().any(|p| p.get_name() == *k && p.get_value() == *v)
                    })
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Render the registry in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| QwiicError::generic(format!("non UTF-8 exposition: {}", e)))
    }

    /// Atomically replace the textfile collector file with a fresh snapshot
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let body = self.encode()?;
        let wrap = |source: std::io::Error| QwiicError::TextfileWrite {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        // temp file lives next to the target so the rename stays on one filesystem
        let mut tmp = tempfile::Builder::new()
            .prefix(".qwiic_exporter")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(wrap)?;
        tmp.write_all(body.as_bytes()).map_err(wrap)?;
        tmp.as_file()
            .set_permissions(Permissions::from_mode(TEXTFILE_MODE))
            .map_err(wrap)?;
        tmp.persist(path).map_err(|e| wrap(e.error))?;

        trace!(path = %path.display(), bytes = body.len(), "Wrote textfile");
        Ok(())
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEMP: MetricDef = MetricDef {
        column: "temp_degC",
        name: "qwiic_temperature_degrees",
        help: "The temperature in degrees celsius",
        multiplier: 1.0,
    };

    const IMU_TEMP: MetricDef = MetricDef {
        column: "imu_degC",
        name: "qwiic_temperature_degrees",
        help: "Temperature in degrees celsius",
        multiplier: 1.0,
    };

    #[test]
    fn test_gauge_get_or_create() {
        let mut registry = MetricRegistry::new();
        let first = registry.gauge(&TEMP).unwrap();
        let second = registry.gauge(&IMU_TEMP).unwrap();

        first.with_label_values(&["a", "1", "Temperature"]).set(21.5);
        // same family behind both handles
        assert_eq!(second.with_label_values(&["a", "1", "Temperature"]).get(), 21.5);
        assert_eq!(registry.gauge_names(), vec!["qwiic_temperature_degrees"]);
    }

    #[test]
    fn test_first_help_wins() {
        let mut registry = MetricRegistry::new();
        registry.gauge(&TEMP).unwrap().with_label_values(&["a", "1", "T"]).set(1.0);
        registry.gauge(&IMU_TEMP).unwrap();
        let text = registry.encode().unwrap();
        assert!(text.contains("# HELP qwiic_temperature_degrees The temperature in degrees celsius"));
        assert!(text.contains("# TYPE qwiic_temperature_degrees gauge"));
    }

    #[test]
    fn test_sample() {
        let mut registry = MetricRegistry::new();
        let gauge = registry.gauge(&TEMP).unwrap();
        gauge.with_label_values(&["BME", "2", "Temperature"]).set(-4.25);

        let labels = [("sensor", "BME"), ("sensorindex", "2"), ("subsensor", "Temperature")];
        assert_eq!(registry.sample("qwiic_temperature_degrees", &labels), Some(-4.25));

        let other = [("sensor", "BME"), ("sensorindex", "1"), ("subsensor", "Temperature")];
        assert_eq!(registry.sample("qwiic_temperature_degrees", &other), None);
        assert_eq!(registry.sample("qwiic_missing", &labels), None);
    }

    #[test]
    fn test_build_info() {
        let mut registry = MetricRegistry::new();
        registry
            .register_build_info(&[("version", "1.2.3"), ("core_version", "0.2.0")])
            .unwrap();
        let text = registry.encode().unwrap();
        assert!(text.contains("qwiic_build_info{core_version=\"0.2.0\",version=\"1.2.3\"} 1"));
        // registering twice is a duplicate collector
        assert!(registry.register_build_info(&[("version", "x")]).is_err());
    }

    #[test]
    fn test_write_textfile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qwiic.prom");

        let mut registry = MetricRegistry::new();
        registry.gauge(&TEMP).unwrap().with_label_values(&["s", "1", "Temperature"]).set(6.32);
        registry.write_textfile(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(
            "qwiic_temperature_degrees{sensor=\"s\",sensorindex=\"1\",subsensor=\"Temperature\"} 6.32"
        ));
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, TEXTFILE_MODE);

        // only the target remains in the directory
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_textfile_missing_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("qwiic.prom");
        let err = MetricRegistry::new().write_textfile(&path).unwrap_err();
        assert!(matches!(err, QwiicError::TextfileWrite { .. }));
    }
}
