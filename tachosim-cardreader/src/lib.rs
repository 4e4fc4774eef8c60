//! TachoSim card reader simulator.
//!
//! Simulates the driver card slot: each cycle it draws a random driver
//! presence, reports it to the control unit, and pauses a random interval
//! before the next update. Unlike the odometer and GNSS simulators it needs
//! no route feed and ignores the frequency feedback; the control unit
//! answers card readings with an opaque ack token only.

pub mod config;
pub mod simulator;
