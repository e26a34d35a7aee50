//! Turbine telemetry record

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why a telemetry record was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("field '{0}' is missing")]
    Missing(&'static str),

    #[error("field '{field}' is not finite ({value})")]
    NonFinite { field: &'static str, value: f64 },

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Braking system fitted to the rotor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrakingSystemType {
    #[default]
    Hydraulic,
    Electromechanical,
    Aerodynamic,
}

/// Tower construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TowerType {
    #[default]
    Tubular,
    Lattice,
    Hybrid,
}

/// Foundation construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoundationType {
    #[default]
    Gravity,
    Monopile,
    Jacket,
}

/// One snapshot of every turbine operating parameter.
///
/// The categorical fields (`braking_system_type`, `tower_type`,
/// `foundation_type`) are carried for display only; no scoring rule reads
/// them yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    // === Electrical ===
    /// Generator output (kW)
    pub generator_power: f64,
    /// Line voltage (V)
    pub voltage: f64,
    /// Line current (A)
    pub current: f64,
    /// Grid frequency (Hz)
    pub frequency: f64,
    /// Power factor, 0..=1
    pub power_factor: f64,

    // === Environmental ===
    /// Hub-height wind speed (m/s)
    pub wind_speed: f64,
    /// Wind direction (degrees from north)
    pub wind_direction: f64,
    /// Turbulence intensity (%)
    pub turbulence_intensity: f64,
    /// Air density (kg/m³)
    pub air_density: f64,
    /// Ambient temperature (°C)
    pub temperature: f64,
    /// Barometric pressure (hPa)
    pub pressure: f64,
    /// Relative humidity (%), 0..=100
    pub humidity: f64,

    // === Performance ===
    pub tip_speed_ratio: f64,
    /// Power coefficient Cp
    pub coefficient_performance: f64,
    /// Power-curve conformance (%)
    pub power_curve: f64,
    /// Capacity factor (%)
    pub capacity_factor: f64,

    // === Control ===
    pub cut_in_wind_speed: f64,
    pub rated_wind_speed: f64,
    pub cut_out_wind_speed: f64,
    pub braking_system_type: BrakingSystemType,

    // === Health ===
    /// Drivetrain vibration (mm/s RMS, scaled 0-100)
    pub vibration_levels: f64,
    /// Hottest monitored component (°C)
    pub component_temperatures: f64,
    /// Gearbox oil condition index (%), 100 = fresh
    pub gearbox_oil_condition: f64,
    /// Nacelle noise (dB)
    pub noise_levels: f64,

    // === Structural ===
    pub tower_type: TowerType,
    /// Tower steel elastic modulus (GPa)
    pub material_properties: f64,
    pub foundation_type: FoundationType,
}

impl Default for TelemetryRecord {
    /// Nominal operating point; scores `normal`.
    fn default() -> Self {
        Self {
            generator_power: 1800.0,
            voltage: 690.0,
            current: 1500.0,
            frequency: 50.0,
            power_factor: 0.95,
            wind_speed: 12.0,
            wind_direction: 270.0,
            turbulence_intensity: 12.0,
            air_density: 1.225,
            temperature: 15.0,
            pressure: 1013.25,
            humidity: 65.0,
            tip_speed_ratio: 7.5,
            coefficient_performance: 0.45,
            power_curve: 95.0,
            capacity_factor: 35.0,
            cut_in_wind_speed: 3.0,
            rated_wind_speed: 12.0,
            cut_out_wind_speed: 25.0,
            braking_system_type: BrakingSystemType::default(),
            vibration_levels: 35.0,
            component_temperatures: 65.0,
            gearbox_oil_condition: 85.0,
            noise_levels: 95.0,
            tower_type: TowerType::default(),
            material_properties: 210.0,
            foundation_type: FoundationType::default(),
        }
    }
}

impl TelemetryRecord {
    /// Wire names of every field, in declaration order.
    pub const FIELD_NAMES: [&'static str; 27] = [
        "generatorPower",
        "voltage",
        "current",
        "frequency",
        "powerFactor",
        "windSpeed",
        "windDirection",
        "turbulenceIntensity",
        "airDensity",
        "temperature",
        "pressure",
        "humidity",
        "tipSpeedRatio",
        "coefficientPerformance",
        "powerCurve",
        "capacityFactor",
        "cutInWindSpeed",
        "ratedWindSpeed",
        "cutOutWindSpeed",
        "brakingSystemType",
        "vibrationLevels",
        "componentTemperatures",
        "gearboxOilCondition",
        "noiseLevels",
        "towerType",
        "materialProperties",
        "foundationType",
    ];

    /// Every numeric field paired with its wire name.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 24] {
        [
            ("generatorPower", self.generator_power),
            ("voltage", self.voltage),
            ("current", self.current),
            ("frequency", self.frequency),
            ("powerFactor", self.power_factor),
            ("windSpeed", self.wind_speed),
            ("windDirection", self.wind_direction),
            ("turbulenceIntensity", self.turbulence_intensity),
            ("airDensity", self.air_density),
            ("temperature", self.temperature),
            ("pressure", self.pressure),
            ("humidity", self.humidity),
            ("tipSpeedRatio", self.tip_speed_ratio),
            ("coefficientPerformance", self.coefficient_performance),
            ("powerCurve", self.power_curve),
            ("capacityFactor", self.capacity_factor),
            ("cutInWindSpeed", self.cut_in_wind_speed),
            ("ratedWindSpeed", self.rated_wind_speed),
            ("cutOutWindSpeed", self.cut_out_wind_speed),
            ("vibrationLevels", self.vibration_levels),
            ("componentTemperatures", self.component_temperatures),
            ("gearboxOilCondition", self.gearbox_oil_condition),
            ("noiseLevels", self.noise_levels),
            ("materialProperties", self.material_properties),
        ]
    }

    /// Reject the record if any numeric field is NaN or infinite.
    pub fn validate(&self) -> Result<(), RecordError> {
        match self
            .numeric_fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite())
        {
            Some((field, value)) => Err(RecordError::NonFinite { field, value }),
            None => Ok(()),
        }
    }

    /// Build a record from a JSON object.
    ///
    /// Every field must be present; nothing is filled in from defaults.
    pub fn from_json(value: Value) -> Result<Self, RecordError> {
        let Value::Object(ref map) = value else {
            return Err(RecordError::Malformed("expected a JSON object".to_string()));
        };
        if let Some(missing) = Self::FIELD_NAMES
            .iter()
            .find(|name| map.get(**name).map_or(true, Value::is_null))
        {
            return Err(RecordError::Missing(*missing));
        }

        let record: Self =
            serde_json::from_value(value).map_err(|e| RecordError::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Render one field as text for tabular export.
    ///
    /// Returns `None` for an unknown field name.
    pub fn field_text(&self, name: &str) -> Option<String> {
        match name {
            "brakingSystemType" => Some(variant_name(&self.braking_system_type)),
            "towerType" => Some(variant_name(&self.tower_type)),
            "foundationType" => Some(variant_name(&self.foundation_type)),
            _ => self
                .numeric_fields()
                .into_iter()
                .find(|(field, _)| *field == name)
                .map(|(_, value)| value.to_string()),
        }
    }
}

/// Serialized name of a unit enum variant.
fn variant_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}
