//! Header resolver
//!
//! Turns a logger header line into the list of attached sensor instances
//! and a positional gauge index: entry `i` of the index describes data
//! column `i` (after the date/time prefix).
//!
//! Matching is greedy and longest-first. At each step the longest prefix
//! of the remaining columns that is a known signature is taken as one
//! sensor instance, so a sensor with several enabled sub-sensors is never
//! split into several false matches. The matched chunk is then walked in
//! the sensor's declared sub-sensor order to find which of them are on.

use std::fmt;

use prometheus::GaugeVec;
use tracing::{debug, error};

use crate::catalog::Catalog;
use crate::constants::protocol::{DATE_TIME_COLUMNS, SEPARATOR};
use crate::error::{QwiicError, Result};
use crate::metrics::MetricRegistry;
use crate::signature::SignatureTable;

/// One sensor found in a header line with its enabled sub-sensors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorInstance {
    pub sensor: &'static str,
    pub subsensors: Vec<&'static str>,
}

/// Sensor instances in header order; a sensor type may appear more than once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorConfiguration {
    instances: Vec<SensorInstance>,
}

impl SensorConfiguration {
    pub fn instances(&self) -> &[SensorInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// `(sensor, [sub-sensors])` pairs, handy for logging and assertions
    pub fn as_pairs(&self) -> Vec<(&'static str, Vec<&'static str>)> {
        self.instances
            .iter()
            .map(|i| (i.sensor, i.subsensors.clone()))
            .collect()
    }
}

/// Where one data column goes
#[derive(Clone)]
pub struct GaugeEntry {
    pub sensor: &'static str,
    /// 1-based position of the sensor instance in the configuration
    pub ordinal: usize,
    pub subsensor: &'static str,
    pub metric: &'static str,
    pub multiplier: f64,
    gauge: GaugeVec,
}

impl GaugeEntry {
    /// Scale a raw reading and publish it under this entry's labels
    pub fn set(&self, raw: f64) -> f64 {
        let value = raw * self.multiplier;
        let ordinal = self.ordinal.to_string();
        self.gauge
            .with_label_values(&[self.sensor, ordinal.as_str(), self.subsensor])
            .set(value);
        value
    }
}

impl fmt::Debug for GaugeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaugeEntry")
            .field("sensor", &self.sensor)
            .field("ordinal", &self.ordinal)
            .field("subsensor", &self.subsensor)
            .field("metric", &self.metric)
            .field("multiplier", &self.multiplier)
            .finish()
    }
}

/// Positional column-to-metric mapping for the current header
#[derive(Debug, Clone, Default)]
pub struct GaugeIndex {
    entries: Vec<GaugeEntry>,
}

impl GaugeIndex {
    pub fn entries(&self) -> &[GaugeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GaugeEntry> {
        self.entries.iter()
    }
}

/// Result of resolving one header line
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub configuration: SensorConfiguration,
    pub index: GaugeIndex,
}

/// Sensor columns of a header line: date/time dropped, blanks discarded
pub fn header_columns(header_line: &str) -> Vec<&str> {
    header_line
        .split(SEPARATOR)
        .skip(DATE_TIME_COLUMNS)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect()
}

fn unrecognized(remaining: &[&str]) -> QwiicError {
    QwiicError::UnrecognizedSignature {
        remaining: remaining.iter().map(|c| c.to_string()).collect(),
    }
}

/// Longest prefix of `columns` that is a known signature
fn longest_match(columns: &[&str], table: &SignatureTable) -> Option<(&'static str, usize)> {
    let longest = columns.len().min(table.longest_signature());
    (1..=longest)
        .rev()
        .find_map(|len| table.lookup(&columns[..len].join(",")).map(|sensor| (sensor, len)))
}

/// Resolve a header line into a sensor configuration and gauge index
///
/// Gauge families are created in `registry` for every enabled column. On
/// failure nothing is returned and the caller keeps whatever it had.
pub fn resolve_header(
    header_line: &str,
    catalog: &Catalog,
    table: &SignatureTable,
    registry: &mut MetricRegistry,
) -> Result<Resolution> {
    let columns = header_columns(header_line);
    let mut remaining: &[&str] = &columns;
    let mut resolution = Resolution::default();

    while !remaining.is_empty() {
        let Some((sensor_name, len)) = longest_match(remaining, table) else {
            error!(
                remaining = ?remaining,
                "Unable to find a matching sensor for header columns"
            );
            return Err(unrecognized(remaining));
        };

        let (mut chunk, rest) = remaining.split_at(len);
        debug!(
            sensor = sensor_name,
            columns = len,
            "Found signature matching sensor, finding enabled subsensors"
        );

        let sensor = catalog.sensor(sensor_name).ok_or_else(|| {
            QwiicError::generic(format!("sensor {} missing from catalog", sensor_name))
        })?;
        let ordinal = resolution.configuration.len() + 1;
        let mut instance = SensorInstance {
            sensor: sensor.name,
            subsensors: Vec::new(),
        };

        for sub in sensor.subsensors {
            let Some(sub_columns) = catalog.subsensor_columns(sensor.name, sub.name) else {
                continue;
            };
            if sub_columns.is_empty() || !chunk.starts_with(&sub_columns) {
                continue;
            }
            chunk = &chunk[sub_columns.len()..];
            debug!(
                sensor = sensor.name,
                subsensor = sub.name,
                signature = %sub.signature(),
                "Subsensor enabled, creating metrics"
            );
            instance.subsensors.push(sub.name);

            for def in sub.metrics {
                let gauge = registry.gauge(def)?;
                resolution.index.entries.push(GaugeEntry {
                    sensor: sensor.name,
                    ordinal,
                    subsensor: sub.name,
                    metric: def.name,
                    multiplier: def.multiplier,
                    gauge,
                });
            }
        }

        // the signature matched but the sub-sensors do not cover it
        if !chunk.is_empty() {
            let mut leftover = chunk.to_vec();
            leftover.extend_from_slice(rest);
            error!(
                sensor = sensor.name,
                remaining = ?leftover,
                "Matched signature is not made of whole subsensors"
            );
            return Err(unrecognized(&leftover));
        }

        resolution.configuration.instances.push(instance);
        remaining = rest;
    }

    debug!(
        sensors = resolution.configuration.len(),
        columns = resolution.index.len(),
        "Header resolved"
    );
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BME280, CCS811, ICM20948, MS8607, OPENLOG_ARTEMIS, VCNL4040};
    use crate::signature::build_signature_table;

    struct Fixture {
        catalog: Catalog,
        table: SignatureTable,
        registry: MetricRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = Catalog::builtin();
            let table = build_signature_table(&catalog);
            Self {
                catalog,
                table,
                registry: MetricRegistry::new(),
            }
        }

        fn resolve(&mut self, line: &str) -> Result<Resolution> {
            resolve_header(line, &self.catalog, &self.table, &mut self.registry)
        }
    }

    const FULL_HEADER: &str = "rtcDate,rtcTime,aX,aY,aZ,gX,gY,gZ,mX,mY,mZ,imu_degC,tvoc_ppb,co2_ppm,prox(no unit),ambient_lux,pressure_Pa,humidity_%,altitude_m,temp_degC,output_Hz,count,";

    #[test]
    fn test_header_columns() {
        assert_eq!(
            header_columns("rtcDate,rtcTime,aX,aY,,output_Hz,\r\n"),
            vec!["aX", "aY", "output_Hz"]
        );
        assert!(header_columns("rtcDate,rtcTime").is_empty());
        assert!(header_columns("").is_empty());
    }

    #[test]
    fn test_full_lineup() {
        let mut fx = Fixture::new();
        let res = fx.resolve(FULL_HEADER).unwrap();
        assert_eq!(
            res.configuration.as_pairs(),
            vec![
                (ICM20948, vec!["Accelerometer", "Gyro", "Magnetometer", "Temperature"]),
                (CCS811, vec!["TVOC", "CO2"]),
                (VCNL4040, vec!["Proximity", "Ambient Light"]),
                (BME280, vec!["Pressure", "Humidity", "Altitude", "Temperature"]),
                (OPENLOG_ARTEMIS, vec!["Frequency", "Counter"]),
            ]
        );
        assert_eq!(res.index.len(), 20);
        for name in [
            "qwiic_accelerometer_x_gs",
            "qwiic_gyroscope_z_degrees",
            "qwiic_magnetometer_y_teslas",
            "qwiic_temperature_degrees",
        ] {
            assert!(fx.registry.contains(name), "{} not registered", name);
        }
    }

    #[test]
    fn test_every_catalog_column_in_catalog_order() {
        let mut fx = Fixture::new();
        let header = format!("rtcDate,rtcTime,{}", fx.catalog.all_columns().join(","));
        let res = fx.resolve(&header).unwrap();

        let expected: Vec<_> = fx
            .catalog
            .sensors()
            .iter()
            .map(|s| (s.name, s.subsensors.iter().map(|sub| sub.name).collect::<Vec<_>>()))
            .collect();
        assert_eq!(res.configuration.as_pairs(), expected);
        assert_eq!(res.index.len(), fx.catalog.all_columns().len());
    }

    #[test]
    fn test_partial_lineup() {
        let mut fx = Fixture::new();
        let res = fx
            .resolve("rtcDate,rtcTime,aX,aY,aZ,gX,gY,gZ,co2_ppm,prox(no unit),ambient_lux,pressure_Pa,humidity_%,altitude_m,output_Hz,")
            .unwrap();
        assert_eq!(
            res.configuration.as_pairs(),
            vec![
                (ICM20948, vec!["Accelerometer", "Gyro"]),
                (CCS811, vec!["CO2"]),
                (VCNL4040, vec!["Proximity", "Ambient Light"]),
                (BME280, vec!["Pressure", "Humidity", "Altitude"]),
                (OPENLOG_ARTEMIS, vec!["Frequency"]),
            ]
        );
    }

    #[test]
    fn test_omitted_subsensor_keeps_catalog_order() {
        let mut fx = Fixture::new();
        let res = fx.resolve("rtcDate,rtcTime,aX,aY,aZ,mX,mY,mZ,imu_degC").unwrap();
        assert_eq!(
            res.configuration.as_pairs(),
            vec![(ICM20948, vec!["Accelerometer", "Magnetometer", "Temperature"])]
        );
    }

    #[test]
    fn test_duplicate_sensors() {
        let mut fx = Fixture::new();
        let res = fx
            .resolve("rtcDate,rtcTime,aX,aY,aZ,gX,gY,gZ,mX,mY,mZ,imu_degC,tvoc_ppb,co2_ppm,prox(no unit),ambient_lux,prox(no unit),ambient_lux,prox(no unit),ambient_lux,pressure_Pa,humidity_%,altitude_m,temp_degC,tvoc_ppb,co2_ppm,output_Hz,")
            .unwrap();
        assert_eq!(
            res.configuration.as_pairs(),
            vec![
                (ICM20948, vec!["Accelerometer", "Gyro", "Magnetometer", "Temperature"]),
                (CCS811, vec!["TVOC", "CO2"]),
                (VCNL4040, vec!["Proximity", "Ambient Light"]),
                (VCNL4040, vec!["Proximity", "Ambient Light"]),
                (VCNL4040, vec!["Proximity", "Ambient Light"]),
                (BME280, vec!["Pressure", "Humidity", "Altitude", "Temperature"]),
                (CCS811, vec!["TVOC", "CO2"]),
                (OPENLOG_ARTEMIS, vec!["Frequency"]),
            ]
        );

        let prox: Vec<usize> = res
            .index
            .iter()
            .filter(|e| e.metric == "qwiic_proximity")
            .map(|e| e.ordinal)
            .collect();
        assert_eq!(prox, vec![3, 4, 5]);
    }

    #[test]
    fn test_consecutive_duplicate_full_sensor() {
        let mut fx = Fixture::new();
        let res = fx.resolve("rtcDate,rtcTime,tvoc_ppb,co2_ppm,tvoc_ppb,co2_ppm").unwrap();
        assert_eq!(
            res.configuration.as_pairs(),
            vec![(CCS811, vec!["TVOC", "CO2"]), (CCS811, vec!["TVOC", "CO2"])]
        );
        let ordinals: Vec<usize> = res.index.iter().map(|e| e.ordinal).collect();
        assert_eq!(ordinals, vec![1, 1, 2, 2]);
    }

    #[test]
    fn test_only_frequency() {
        let mut fx = Fixture::new();
        let res = fx.resolve("rtcDate,rtcTime,output_Hz,").unwrap();
        assert_eq!(res.configuration.as_pairs(), vec![(OPENLOG_ARTEMIS, vec!["Frequency"])]);
        assert_eq!(res.index.len(), 1);
        assert_eq!(res.index.entries()[0].metric, "qwiic_output_hertz");
    }

    #[test]
    fn test_no_sensor_columns() {
        let mut fx = Fixture::new();
        let res = fx.resolve("rtcDate,rtcTime,").unwrap();
        assert!(res.configuration.is_empty());
        assert!(res.index.is_empty());
    }

    #[test]
    fn test_index_is_positional() {
        let mut fx = Fixture::new();
        let res = fx.resolve("rtcDate,rtcTime,aX,aY,aZ,imu_degC,output_Hz,count").unwrap();
        let described: Vec<_> = res
            .index
            .iter()
            .map(|e| (e.ordinal, e.subsensor, e.metric))
            .collect();
        assert_eq!(
            described,
            vec![
                (1, "Accelerometer", "qwiic_accelerometer_x_gs"),
                (1, "Accelerometer", "qwiic_accelerometer_y_gs"),
                (1, "Accelerometer", "qwiic_accelerometer_z_gs"),
                (1, "Temperature", "qwiic_temperature_degrees"),
                (2, "Frequency", "qwiic_output_hertz"),
                (2, "Counter", "qwiic_measurements_total"),
            ]
        );
        assert!((res.index.entries()[0].multiplier - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shared_humidity_signature_goes_to_later_sensor() {
        let mut fx = Fixture::new();
        let res = fx.resolve("rtcDate,rtcTime,humidity_%").unwrap();
        assert_eq!(res.configuration.as_pairs(), vec![(MS8607, vec!["Humidity"])]);
    }

    #[test]
    fn test_unknown_column_fails() {
        let mut fx = Fixture::new();
        let err = fx.resolve("rtcDate,rtcTime,aX,aY,aZ,bogus,count").unwrap_err();
        match err {
            QwiicError::UnrecognizedSignature { remaining } => {
                assert_eq!(remaining, vec!["bogus", "count"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_out_of_order_subsensors() {
        let mut fx = Fixture::new();
        // gyro before accelerometer splits into two IMU instances
        let res = fx.resolve("rtcDate,rtcTime,gX,gY,gZ,aX,aY,aZ").unwrap();
        assert_eq!(
            res.configuration.as_pairs(),
            vec![(ICM20948, vec!["Gyro"]), (ICM20948, vec!["Accelerometer"])]
        );
        // a partial sub-sensor never matches
        assert!(fx.resolve("rtcDate,rtcTime,aX,aY").is_err());
    }
}
