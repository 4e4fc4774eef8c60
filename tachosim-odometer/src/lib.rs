//! TachoSim odometer simulator.
//!
//! Replays the speed segments received from the route generator as noisy
//! odometer readings toward the control unit, adopting the sampling
//! frequency echoed back on every exchange.

pub mod config;
pub mod simulator;
