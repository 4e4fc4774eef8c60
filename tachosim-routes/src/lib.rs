//! TachoSim route generator.
//!
//! Queries an external routing API for a drive between two addresses,
//! decodes the returned polylines into position/speed segments, and feeds
//! them to the GNSS and odometer simulators over their route-feed listeners.
//! Pure data transformation: once both feeds have been delivered the process
//! exits.

pub mod config;
pub mod feeder;
pub mod route;
