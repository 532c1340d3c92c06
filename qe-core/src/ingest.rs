//! Reading ingestor
//!
//! Applies one data line to the gauges described by the active index.
//! The line is checked and parsed in full before any gauge is touched, so
//! a rejected line never leaves the snapshot half updated.

use tracing::trace;

use crate::constants::protocol::{DATE_TIME_COLUMNS, SEPARATOR};
use crate::error::{QwiicError, Result};
use crate::resolver::GaugeIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Every gauge in the index was set
    Updated { columns: usize },
    /// Column count disagrees with the index; a fresh header is needed
    ResyncRequired { expected: usize, received: usize },
}

/// Reading tokens of a data line, without the date/time prefix
pub fn data_readings(data_line: &str) -> Vec<&str> {
    data_line
        .trim()
        .trim_matches(SEPARATOR)
        .split(SEPARATOR)
        .skip(DATE_TIME_COLUMNS)
        .collect()
}

/// Parse a data line and set every indexed gauge to `reading * multiplier`
///
/// A count mismatch is reported as [`IngestOutcome::ResyncRequired`]. A
/// token that is not a number is an error: the header already told us how
/// many numeric columns to expect, so this is stream corruption.
pub fn ingest(data_line: &str, index: &GaugeIndex) -> Result<IngestOutcome> {
    let readings = data_readings(data_line);
    if readings.len() != index.len() {
        return Ok(IngestOutcome::ResyncRequired {
            expected: index.len(),
            received: readings.len(),
        });
    }

    let values = readings
        .iter()
        .enumerate()
        .map(|(column, token)| {
            token.trim().parse::<f64>().map_err(|_| QwiicError::MalformedReading {
                column,
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    for (entry, raw) in index.iter().zip(values) {
        let value = entry.set(raw);
        trace!(
            metric = entry.metric,
            sensor = entry.sensor,
            ordinal = entry.ordinal,
            value,
            "Set gauge"
        );
    }

    Ok(IngestOutcome::Updated {
        columns: index.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CCS811, ICM20948, OPENLOG_ARTEMIS};
    use crate::metrics::MetricRegistry;
    use crate::resolver::{resolve_header, Resolution};
    use crate::signature::build_signature_table;

    fn setup(header: &str) -> (MetricRegistry, Resolution) {
        let catalog = Catalog::builtin();
        let table = build_signature_table(&catalog);
        let mut registry = MetricRegistry::new();
        let resolution = resolve_header(header, &catalog, &table, &mut registry).unwrap();
        (registry, resolution)
    }

    fn value(registry: &MetricRegistry, metric: &str, sensor: &str, ordinal: &str, sub: &str) -> Option<f64> {
        registry.sample(
            metric,
            &[("sensor", sensor), ("sensorindex", ordinal), ("subsensor", sub)],
        )
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-9).unwrap_or(false)
    }

    const IMU_LOGGER_HEADER: &str =
        "rtcDate,rtcTime,aX,aY,aZ,gX,gY,gZ,mX,mY,mZ,imu_degC,output_Hz,count,";
    const IMU_LOGGER_DATA: &str = "01/07/2000,16:18:45.54,-638.67,153.32,782.23,-1.69,1.47,-0.42,21.45,37.80,-5.85,9.77,1.00,2523,";

    #[test]
    fn test_data_readings() {
        assert_eq!(data_readings("d,t,1.0,2,\r\n"), vec!["1.0", "2"]);
        assert!(data_readings("d,t").is_empty());
        assert!(data_readings("").is_empty());
    }

    #[test]
    fn test_imu_and_logger() {
        let (registry, res) = setup(IMU_LOGGER_HEADER);
        assert_eq!(
            res.configuration.as_pairs(),
            vec![
                (ICM20948, vec!["Accelerometer", "Gyro", "Magnetometer", "Temperature"]),
                (OPENLOG_ARTEMIS, vec!["Frequency", "Counter"]),
            ]
        );

        let outcome = ingest(IMU_LOGGER_DATA, &res.index).unwrap();
        assert_eq!(outcome, IngestOutcome::Updated { columns: 12 });

        assert!(close(value(&registry, "qwiic_accelerometer_x_gs", ICM20948, "1", "Accelerometer"), -0.63867));
        assert!(close(value(&registry, "qwiic_accelerometer_y_gs", ICM20948, "1", "Accelerometer"), 0.15332));
        assert!(close(value(&registry, "qwiic_gyroscope_x_degrees", ICM20948, "1", "Gyro"), -1.69));
        assert!(close(value(&registry, "qwiic_magnetometer_x_teslas", ICM20948, "1", "Magnetometer"), 21.45e-6));
        assert!(close(value(&registry, "qwiic_temperature_degrees", ICM20948, "1", "Temperature"), 9.77));
        assert!(close(value(&registry, "qwiic_output_hertz", OPENLOG_ARTEMIS, "2", "Frequency"), 1.0));
        assert!(close(value(&registry, "qwiic_measurements_total", OPENLOG_ARTEMIS, "2", "Counter"), 2523.0));
    }

    #[test]
    fn test_duplicate_instances_get_their_own_columns() {
        let (registry, res) = setup("rtcDate,rtcTime,tvoc_ppb,co2_ppm,tvoc_ppb,co2_ppm,");
        ingest("d,t,10,400,20,800,", &res.index).unwrap();

        assert!(close(value(&registry, "qwiic_tvoc_ppb", CCS811, "1", "TVOC"), 10.0));
        assert!(close(value(&registry, "qwiic_co2_ppm", CCS811, "1", "CO2"), 400.0));
        assert!(close(value(&registry, "qwiic_tvoc_ppb", CCS811, "2", "TVOC"), 20.0));
        assert!(close(value(&registry, "qwiic_co2_ppm", CCS811, "2", "CO2"), 800.0));
    }

    #[test]
    fn test_only_frequency() {
        let (registry, res) = setup("rtcDate,rtcTime,output_Hz,");
        assert_eq!(ingest("d,t,4.00,", &res.index).unwrap(), IngestOutcome::Updated { columns: 1 });
        assert!(close(value(&registry, "qwiic_output_hertz", OPENLOG_ARTEMIS, "1", "Frequency"), 4.0));
        assert_eq!(registry.gauge_names(), vec!["qwiic_output_hertz"]);
    }

    #[test]
    fn test_column_count_mismatch_updates_nothing() {
        let (registry, res) = setup(IMU_LOGGER_HEADER);

        let short = "01/07/2000,16:18:45.54,-638.67,153.32,782.23,-1.69,1.47,-0.42,21.45,37.80,-5.85,9.77,1.00,";
        assert_eq!(
            ingest(short, &res.index).unwrap(),
            IngestOutcome::ResyncRequired { expected: 12, received: 11 }
        );
        let long = format!("{}7", IMU_LOGGER_DATA);
        assert_eq!(
            ingest(&long, &res.index).unwrap(),
            IngestOutcome::ResyncRequired { expected: 12, received: 13 }
        );
        assert_eq!(value(&registry, "qwiic_accelerometer_x_gs", ICM20948, "1", "Accelerometer"), None);
    }

    #[test]
    fn test_malformed_reading_is_an_error() {
        let (registry, res) = setup("rtcDate,rtcTime,output_Hz,count,");
        let err = ingest("d,t,1.00,lots,", &res.index).unwrap_err();
        match err {
            QwiicError::MalformedReading { column, token } => {
                assert_eq!(column, 1);
                assert_eq!(token, "lots");
            }
            other => panic!("unexpected error {other:?}"),
        }
        // parsing happens before any gauge is set
        assert_eq!(value(&registry, "qwiic_output_hertz", OPENLOG_ARTEMIS, "1", "Frequency"), None);
    }

    #[test]
    fn test_multiplier_applied() {
        let (registry, res) = setup("rtcDate,rtcTime,hPa,");
        ingest("d,t,1013.25", &res.index).unwrap();
        assert!(close(
            value(&registry, "qwiic_pressure_pascals", crate::catalog::MS8607, "1", "Pressure"),
            101325.0
        ));
    }
}
