//! Sensor catalog
//!
//! The fixed knowledge of every sensor the OpenLog Artemis can report on:
//! each sensor owns an ordered list of sub-sensors, and each sub-sensor an
//! ordered list of raw columns with the metric they are published as.
//! Column names and units follow the SparkFun OpenLog Artemis
//! `SENSOR_UNITS.md` document.
//!
//! Declaration order matters: sub-sensor order defines the order in which
//! the logger prints their columns, and sensor order decides which sensor
//! wins when two of them produce the same signature.

/// One raw column of a sub-sensor and the metric it feeds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDef {
    /// Column name as printed in the logger header line
    pub column: &'static str,
    /// Published metric name
    pub name: &'static str,
    /// Metric help text
    pub help: &'static str,
    /// Applied to the raw reading before publication
    pub multiplier: f64,
}

/// A group of columns that the logger enables or disables together
#[derive(Debug, Clone, Copy)]
pub struct SubSensorDef {
    pub name: &'static str,
    pub metrics: &'static [MetricDef],
}

impl SubSensorDef {
    /// Raw column names in logger order
    pub fn columns(&self) -> Vec<&'static str> {
        self.metrics.iter().map(|m| m.column).collect()
    }

    /// Comma-joined column names, e.g. `aX,aY,aZ`
    pub fn signature(&self) -> String {
        self.columns().join(",")
    }

    /// Number of columns this sub-sensor adds to a data line
    pub fn width(&self) -> usize {
        self.metrics.len()
    }
}

/// A physical sensor type
#[derive(Debug, Clone, Copy)]
pub struct SensorDef {
    pub name: &'static str,
    pub subsensors: &'static [SubSensorDef],
}

impl SensorDef {
    pub fn subsensor(&self, name: &str) -> Option<&'static SubSensorDef> {
        self.subsensors.iter().find(|s| s.name == name)
    }
}

/// Immutable set of known sensors
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    sensors: &'static [SensorDef],
}

impl Catalog {
    pub const fn new(sensors: &'static [SensorDef]) -> Self {
        Self { sensors }
    }

    /// Sensors supported by the OpenLog Artemis firmware
    pub const fn builtin() -> Self {
        Self::new(BUILTIN_SENSORS)
    }

    pub fn sensors(&self) -> &'static [SensorDef] {
        self.sensors
    }

    pub fn sensor(&self, name: &str) -> Option<&'static SensorDef> {
        self.sensors.iter().find(|s| s.name == name)
    }

    /// Raw column names of one sub-sensor of one sensor
    pub fn subsensor_columns(&self, sensor: &str, subsensor: &str) -> Option<Vec<&'static str>> {
        self.sensor(sensor)?.subsensor(subsensor).map(SubSensorDef::columns)
    }

    /// Every column of every sensor, in catalog order
    pub fn all_columns(&self) -> Vec<&'static str> {
        self.sensors
            .iter()
            .flat_map(|s| s.subsensors.iter())
            .flat_map(|sub| sub.metrics.iter().map(|m| m.column))
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

const fn metric(
    column: &'static str,
    name: &'static str,
    help: &'static str,
    multiplier: f64,
) -> MetricDef {
    MetricDef {
        column,
        name,
        help,
        multiplier,
    }
}

pub const BME280: &str = "BME280 atmospheric sensor";
pub const CCS811: &str = "CCS811 air quality sensor";
pub const ICM20948: &str = "ICM-20948 IMU";
pub const MS8607: &str = "MS8607 PHT sensor";
pub const OPENLOG_ARTEMIS: &str = "OpenLog Artemis";
pub const VCNL4040: &str = "VCNL4040 proximity sensor";

const BUILTIN_SENSORS: &[SensorDef] = &[
    SensorDef {
        name: BME280,
        subsensors: &[
            SubSensorDef {
                name: "Pressure",
                metrics: &[metric(
                    "pressure_Pa",
                    "qwiic_pressure_pascals",
                    "The ambient pressure in pascals",
                    1.0,
                )],
            },
            SubSensorDef {
                name: "Humidity",
                metrics: &[metric(
                    "humidity_%",
                    "qwiic_humidity_percent",
                    "The relative humidity in percent",
                    1.0,
                )],
            },
            SubSensorDef {
                name: "Altitude",
                metrics: &[metric(
                    "altitude_m",
                    "qwiic_altitude_meters",
                    "The altitude in meters",
                    1.0,
                )],
            },
            SubSensorDef {
                name: "Temperature",
                metrics: &[metric(
                    "temp_degC",
                    "qwiic_temperature_degrees",
                    "The temperature in degrees celsius",
                    1.0,
                )],
            },
        ],
    },
    SensorDef {
        name: CCS811,
        subsensors: &[
            SubSensorDef {
                name: "TVOC",
                metrics: &[metric(
                    "tvoc_ppb",
                    "qwiic_tvoc_ppb",
                    "TVOC (Total Volatile Organic Compounds) parts per billion",
                    1.0,
                )],
            },
            SubSensorDef {
                name: "CO2",
                metrics: &[metric("co2_ppm", "qwiic_co2_ppm", "CO2 parts per million", 1.0)],
            },
        ],
    },
    SensorDef {
        name: ICM20948,
        subsensors: &[
            // milli g
            SubSensorDef {
                name: "Accelerometer",
                metrics: &[
                    metric("aX", "qwiic_accelerometer_x_gs", "Acceleration on the X axis in gs", 0.001),
                    metric("aY", "qwiic_accelerometer_y_gs", "Acceleration on the Y axis in gs", 0.001),
                    metric("aZ", "qwiic_accelerometer_z_gs", "Acceleration on the Z axis in gs", 0.001),
                ],
            },
            SubSensorDef {
                name: "Gyro",
                metrics: &[
                    metric("gX", "qwiic_gyroscope_x_degrees", "Gyroscope X axis degrees per second", 1.0),
                    metric("gY", "qwiic_gyroscope_y_degrees", "Gyroscope Y axis degrees per second", 1.0),
                    metric("gZ", "qwiic_gyroscope_z_degrees", "Gyroscope Z axis degrees per second", 1.0),
                ],
            },
            // micro tesla
            SubSensorDef {
                name: "Magnetometer",
                metrics: &[
                    metric("mX", "qwiic_magnetometer_x_teslas", "Magnetometer X axis teslas", 0.000001),
                    metric("mY", "qwiic_magnetometer_y_teslas", "Magnetometer Y axis teslas", 0.000001),
                    metric("mZ", "qwiic_magnetometer_z_teslas", "Magnetometer Z axis teslas", 0.000001),
                ],
            },
            SubSensorDef {
                name: "Temperature",
                metrics: &[metric(
                    "imu_degC",
                    "qwiic_temperature_degrees",
                    "Temperature in degrees celsius",
                    1.0,
                )],
            },
        ],
    },
    SensorDef {
        name: MS8607,
        subsensors: &[
            SubSensorDef {
                name: "Humidity",
                metrics: &[metric(
                    "humidity_%",
                    "qwiic_humidity_percent",
                    "The relative humidity in percent",
                    1.0,
                )],
            },
            // hectopascal
            SubSensorDef {
                name: "Pressure",
                metrics: &[metric("hPa", "qwiic_pressure_pascals", "The pressure in pascals", 100.0)],
            },
            SubSensorDef {
                name: "Temperature",
                metrics: &[metric(
                    "degC",
                    "qwiic_temperature_degrees",
                    "The temperature in degrees celsius",
                    1.0,
                )],
            },
        ],
    },
    SensorDef {
        name: OPENLOG_ARTEMIS,
        subsensors: &[
            SubSensorDef {
                name: "Frequency",
                metrics: &[metric(
                    "output_Hz",
                    "qwiic_output_hertz",
                    "The actual frequency of output from OpenLog Artemis in hertz",
                    1.0,
                )],
            },
            SubSensorDef {
                name: "Counter",
                metrics: &[metric(
                    "count",
                    "qwiic_measurements_total",
                    "The number of measurements made by OpenLog Artemis",
                    1.0,
                )],
            },
        ],
    },
    SensorDef {
        name: VCNL4040,
        subsensors: &[
            SubSensorDef {
                name: "Proximity",
                metrics: &[metric(
                    "prox(no unit)",
                    "qwiic_proximity",
                    "The output of the proximity sensor (higher value=object closer)",
                    1.0,
                )],
            },
            SubSensorDef {
                name: "Ambient Light",
                metrics: &[metric("ambient_lux", "qwiic_light_lux", "The ambient light in Lux", 1.0)],
            },
        ],
    },
];
