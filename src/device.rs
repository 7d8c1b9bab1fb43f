//! Simulated flowerpot
//!
//! Sensor and actuator state behind the [`Handler`] contract. Real boards
//! replace this with ADC reads and a pump driver; the dispatcher only sees
//! `handle(command, qty)`.

use crate::config::Config;
use crate::dispatcher::Handler;
use crate::protocol::{Command, ServerStatus};

/// Latest sensor values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReadings {
    /// Ambient temperature (°C)
    pub temperature_c: f32,

    /// Ambient relative humidity (%)
    pub humidity_pct: f32,

    /// Light level (lux)
    pub light_lux: f32,

    /// Soil moisture content (%)
    pub moisture_pct: f32,

    /// Liquid fertilizer level (%)
    pub fertilizer_pct: f32,
}

impl Default for SensorReadings {
    fn default() -> Self {
        Self {
            temperature_c: 21.0,
            humidity_pct: 45.0,
            light_lux: 300.0,
            moisture_pct: 35.0,
            fertilizer_pct: 100.0,
        }
    }
}

/// In-memory flowerpot with a water reservoir
#[derive(Debug, Clone)]
pub struct SimulatedFlowerpot {
    readings: SensorReadings,

    /// Reservoir capacity (mL)
    capacity_ml: u32,

    /// Water left in the reservoir (mL)
    reservoir_ml: u32,

    /// Total water dispensed since start (mL)
    dispensed_ml: u64,
}

impl SimulatedFlowerpot {
    /// Create a flowerpot with a full reservoir of `capacity_ml`
    pub fn new(capacity_ml: u32, readings: SensorReadings) -> Self {
        Self {
            readings,
            capacity_ml,
            reservoir_ml: capacity_ml,
            dispensed_ml: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.reservoir_capacity_ml, SensorReadings::default())
    }

    pub fn readings(&self) -> &SensorReadings {
        &self.readings
    }

    /// Replace the sensor values, e.g. after a sampling pass
    pub fn set_readings(&mut self, readings: SensorReadings) {
        self.readings = readings;
    }

    pub fn reservoir_ml(&self) -> u32 {
        self.reservoir_ml
    }

    pub fn dispensed_ml(&self) -> u64 {
        self.dispensed_ml
    }

    /// Refill the reservoir to capacity
    pub fn refill(&mut self) {
        self.reservoir_ml = self.capacity_ml;
    }

    /// Reservoir level as a percentage of capacity
    pub fn water_level_pct(&self) -> f32 {
        if self.capacity_ml == 0 {
            return 0.0;
        }
        (f64::from(self.reservoir_ml) * 100.0 / f64::from(self.capacity_ml)) as f32
    }

    fn dispense(&mut self, ml: u8) -> ServerStatus {
        let Some(left) = self.reservoir_ml.checked_sub(u32::from(ml)) else {
            tracing::warn!(
                "Cannot dispense {} mL: only {} mL left in reservoir",
                ml,
                self.reservoir_ml
            );
            return ServerStatus::Err;
        };

        self.reservoir_ml = left;
        self.dispensed_ml += u64::from(ml);
        tracing::info!("Dispensed {} mL ({} mL left)", ml, left);
        ServerStatus::Ok
    }
}

impl Default for SimulatedFlowerpot {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Handler for SimulatedFlowerpot {
    fn handle(&mut self, command: Command, qty: u8) -> (ServerStatus, f32) {
        match command {
            Command::GetTemperature => (ServerStatus::Ok, self.readings.temperature_c),
            Command::GetHumidity => (ServerStatus::Ok, self.readings.humidity_pct),
            Command::GetLight => (ServerStatus::Ok, self.readings.light_lux),
            Command::GetWater => (ServerStatus::Ok, self.water_level_pct()),
            Command::GetMoisture => (ServerStatus::Ok, self.readings.moisture_pct),
            Command::GetFertilizer => (ServerStatus::Ok, self.readings.fertilizer_pct),
            Command::DispenseWater => (self.dispense(qty), 0.0),
            Command::Quit => (ServerStatus::Ok, 0.0),
        }
    }
}
