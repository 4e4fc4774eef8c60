//! TachoSim control unit.
//!
//! The control unit is the aggregation core of the simulated vehicle: it
//! accepts long-lived TCP connections from the three sensor simulators,
//! fuses their readings into a single vehicle state, derives compliance
//! events on a fixed period, and relays state and events to the monitoring
//! backend over Zenoh once the backend has authorized the session.
//!
//! Module map:
//! - [`config`] - configuration surface (listen address, peers, backend)
//! - [`state`] - process-wide sampling intervals
//! - [`aggregator`] - shared vehicle state, buffers, and rule evaluation
//! - [`server`] - sensor listener and per-connection handlers
//! - [`backend`] - backend session: authorization, remote config, publication

pub mod aggregator;
pub mod backend;
pub mod config;
pub mod server;
pub mod state;
