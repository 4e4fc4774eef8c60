//! Process-wide sampling intervals.

use std::sync::atomic::{AtomicU64, Ordering};

/// The two remotely configurable intervals, in seconds.
///
/// Single writer (the backend session manager applying `config_frequency`
/// messages), many readers (connection handlers echoing the sampling
/// interval, the publish loop pacing itself). Values are `f64` seconds
/// stored as raw bits in atomics; Acquire/Release ordering gives the
/// cross-task visibility guarantee without a lock.
#[derive(Debug)]
pub struct SamplingControl {
    telemetry_bits: AtomicU64,
    sensor_bits: AtomicU64,
}

impl SamplingControl {
    pub fn new(telemetry_secs: f64, sensor_secs: f64) -> Self {
        Self {
            telemetry_bits: AtomicU64::new(telemetry_secs.to_bits()),
            sensor_bits: AtomicU64::new(sensor_secs.to_bits()),
        }
    }

    /// Interval between telemetry publish cycles.
    pub fn telemetry_interval(&self) -> f64 {
        f64::from_bits(self.telemetry_bits.load(Ordering::Acquire))
    }

    pub fn set_telemetry_interval(&self, secs: f64) {
        self.telemetry_bits.store(secs.to_bits(), Ordering::Release);
    }

    /// Sampling interval echoed to the odometer and GNSS sensors.
    pub fn sensor_interval(&self) -> f64 {
        f64::from_bits(self.sensor_bits.load(Ordering::Acquire))
    }

    pub fn set_sensor_interval(&self, secs: f64) {
        self.sensor_bits.store(secs.to_bits(), Ordering::Release);
    }
}

impl Default for SamplingControl {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}
