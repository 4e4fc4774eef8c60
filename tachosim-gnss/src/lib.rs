//! TachoSim GNSS positioning simulator.
//!
//! Replays the position segments received from the route generator as
//! position/speed readings toward the control unit: intermediate fixes
//! pinned at each segment's origin, then one final fix at its destination.
//! Adopts the sampling frequency echoed back on every exchange.

pub mod config;
pub mod simulator;
