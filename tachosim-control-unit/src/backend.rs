//! Backend session: authorization handshake, remote configuration, publication.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use zenoh::Session;
use zenoh::liveliness::LivelinessToken;

use tachosim_common::{
    AccessRequest, ConfigFrequencyMessage, ConfigItem, ConfigMessage, Format, Result,
    SessionStatus, UnitTopics, decode_auto, encode,
};

use crate::aggregator::Aggregator;
use crate::state::SamplingControl;

/// Lifecycle of the unit's relationship with the monitoring backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created at process start, before the broker connection exists.
    Unauthenticated,
    /// Access request published, verdict pending.
    AwaitingAuthorization,
    /// Backend granted access; publication is live.
    Authorized,
    /// Backend denied access; the process must halt.
    Rejected,
    /// Final state, reached only through shutdown.
    Terminated,
}

/// The session state machine, separated from the Zenoh plumbing.
///
/// Backend messages arrive on the subscriber task; the rejection path only
/// signals the shutdown watch channel here and lets the main select loop do
/// the actual teardown, so no lock is ever held while the process winds
/// down.
#[derive(Debug)]
pub struct SessionGate {
    unit_id: String,
    state: Mutex<SessionState>,
    shutdown_tx: watch::Sender<bool>,
}

impl SessionGate {
    pub fn new(unit_id: impl Into<String>, shutdown_tx: watch::Sender<bool>) -> Self {
        Self {
            unit_id: unit_id.into(),
            state: Mutex::new(SessionState::Unauthenticated),
            shutdown_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("session state lock poisoned")
    }

    pub fn is_authorized(&self) -> bool {
        self.state() == SessionState::Authorized
    }

    fn set_state(&self, next: SessionState) {
        *self.state.lock().expect("session state lock poisoned") = next;
    }

    /// The broker connection is up and the access request is out.
    pub fn mark_awaiting(&self) {
        self.set_state(SessionState::AwaitingAuthorization);
    }

    /// Apply an authorization verdict from the `config` key.
    ///
    /// Anything but an exact grant for this unit rejects the session: a
    /// rejected unit does not retry or degrade, it halts.
    pub fn apply_config(&self, msg: &ConfigMessage) {
        if msg.grants_access(&self.unit_id) {
            tracing::info!("Authorization granted");
            self.set_state(SessionState::Authorized);
        } else {
            tracing::warn!(
                for_unit = %msg.unit_id,
                authorization = %msg.authorization,
                "Authorization denied, shutting down"
            );
            self.set_state(SessionState::Rejected);
            let _ = self.shutdown_tx.send(true);
        }
    }

    /// Apply a sampling-rate update from the `config_frequency` key.
    ///
    /// Ignored unless the session is authorized and the message names this
    /// unit. Non-positive or non-finite values are discarded.
    pub fn apply_config_frequency(&self, msg: &ConfigFrequencyMessage, sampling: &SamplingControl) {
        if !self.is_authorized() {
            tracing::debug!("Frequency update before authorization, ignored");
            return;
        }
        if msg.unit_id != self.unit_id {
            tracing::debug!(for_unit = %msg.unit_id, "Frequency update for another unit, ignored");
            return;
        }
        if !msg.value.is_finite() || msg.value <= 0.0 {
            tracing::warn!(value = msg.value, "Discarding invalid frequency value");
            return;
        }

        match msg.item {
            ConfigItem::TelemetryFrequency => {
                sampling.set_telemetry_interval(msg.value);
                tracing::info!(secs = msg.value, "Telemetry frequency updated");
            }
            ConfigItem::SensorSamplingFrequency => {
                sampling.set_sensor_interval(msg.value);
                tracing::info!(secs = msg.value, "Sensor sampling frequency updated");
            }
        }
    }

    /// Enter the terminal state. Returns whether the session was authorized,
    /// i.e. whether a regulated-disconnection status is owed to the backend.
    pub fn terminate(&self) -> bool {
        let mut state = self.state.lock().expect("session state lock poisoned");
        let was_authorized = *state == SessionState::Authorized;
        *state = SessionState::Terminated;
        was_authorized
    }
}

/// Owns the backend relationship: handshake, subscriptions, publish cycle.
pub struct SessionManager {
    session: Arc<Session>,
    topics: UnitTopics,
    aggregator: Arc<Aggregator>,
    gate: SessionGate,
    format: Format,
    idle_poll: Duration,
    /// Dropped on session close; its DELETE is the backend's ungraceful-
    /// disconnect signal.
    _liveliness: LivelinessToken,
}

impl SessionManager {
    /// Establish the backend relationship over an open Zenoh session.
    ///
    /// Declares the liveliness token; the access request itself goes out
    /// from [`run_config_listener`](Self::run_config_listener) once the
    /// verdict subscriptions are in place, so a fast backend reply cannot be
    /// missed.
    pub async fn connect(
        session: Arc<Session>,
        topics: UnitTopics,
        aggregator: Arc<Aggregator>,
        format: Format,
        idle_poll: Duration,
        shutdown_tx: watch::Sender<bool>,
    ) -> Result<Arc<Self>> {
        let liveliness = session
            .liveliness()
            .declare_token(topics.session_liveliness())
            .await?;

        let gate = SessionGate::new(aggregator.unit_id(), shutdown_tx);

        Ok(Arc::new(Self {
            session,
            topics,
            aggregator,
            gate,
            format,
            idle_poll,
            _liveliness: liveliness,
        }))
    }

    pub fn state(&self) -> SessionState {
        self.gate.state()
    }

    /// Publish the access request and receive authorization and
    /// remote-configuration messages.
    ///
    /// Runs until the session closes. Undecodable payloads are logged and
    /// skipped; the backend channel is not a sensor connection and a bad
    /// message must not take the unit down.
    pub async fn run_config_listener(self: Arc<Self>) -> Result<()> {
        let config_sub = self
            .session
            .declare_subscriber(self.topics.config())
            .await?;
        let frequency_sub = self
            .session
            .declare_subscriber(self.topics.config_frequency())
            .await?;

        tracing::info!(
            config = %self.topics.config(),
            config_frequency = %self.topics.config_frequency(),
            "Subscribed to backend configuration"
        );

        let request = AccessRequest::new(self.aggregator.unit_id());
        self.session
            .put(self.topics.request_access(), serde_json::to_vec(&request)?)
            .await?;
        self.gate.mark_awaiting();

        tracing::info!(key = %self.topics.request_access(), "Access requested");

        loop {
            tokio::select! {
                sample = config_sub.recv_async() => {
                    let Ok(sample) = sample else { break };
                    match decode_auto::<ConfigMessage>(&sample.payload().to_bytes()) {
                        Ok(msg) => self.gate.apply_config(&msg),
                        Err(e) => {
                            tracing::warn!(key = %sample.key_expr(), error = %e, "Undecodable config message");
                        }
                    }
                }
                sample = frequency_sub.recv_async() => {
                    let Ok(sample) = sample else { break };
                    match decode_auto::<ConfigFrequencyMessage>(&sample.payload().to_bytes()) {
                        Ok(msg) => {
                            self.gate.apply_config_frequency(&msg, self.aggregator.sampling());
                        }
                        Err(e) => {
                            tracing::warn!(key = %sample.key_expr(), error = %e, "Undecodable frequency message");
                        }
                    }
                }
            }
        }

        tracing::debug!("Config listener stopped");
        Ok(())
    }

    /// Drain-and-publish cycle.
    ///
    /// While authorized, drains both buffers every telemetry interval and
    /// publishes the contents in order. Before authorization, idles on the
    /// longer poll interval. Publication is fire-and-forget: a failed put is
    /// logged and its payload is gone, the buffers were already swapped.
    pub async fn run_publish_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let pause = if self.gate.is_authorized() {
                self.publish_cycle().await;
                Duration::from_secs_f64(self.aggregator.sampling().telemetry_interval())
            } else {
                self.idle_poll
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Publish loop stopped");
    }

    async fn publish_cycle(&self) {
        let snapshots = self.aggregator.drain_telemetry();
        let telemetry_key = self.topics.telemetry();
        let mut published = 0usize;
        for snapshot in &snapshots {
            match encode(snapshot, self.format) {
                Ok(payload) => {
                    if let Err(e) = self.session.put(&telemetry_key, payload).await {
                        tracing::warn!(key = %telemetry_key, error = %e, "Failed to publish telemetry");
                    } else {
                        published += 1;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to encode telemetry"),
            }
        }

        let events = self.aggregator.drain_events();
        let event_key = self.topics.event();
        for event in &events {
            match encode(event, self.format) {
                Ok(payload) => {
                    if let Err(e) = self.session.put(&event_key, payload).await {
                        tracing::warn!(key = %event_key, error = %e, "Failed to publish event");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
            }
        }

        if !snapshots.is_empty() || !events.is_empty() {
            tracing::debug!(
                telemetry = published,
                events = events.len(),
                "Publish cycle complete"
            );
        }
    }

    /// Close the backend relationship.
    ///
    /// An authorized session announces a regulated disconnection and awaits
    /// its delivery before closing; a rejected or never-authorized session
    /// just closes, leaving the dropped liveliness token to tell the story.
    pub async fn shutdown(&self) -> Result<()> {
        if self.gate.terminate() {
            let status = SessionStatus::regulated_disconnection(self.aggregator.unit_id());
            self.session
                .put(self.topics.session(), serde_json::to_vec(&status)?)
                .await?;
            tracing::info!(key = %self.topics.session(), "Regulated disconnection announced");
        }

        self.session.close().await?;
        tracing::info!("Backend session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> (SessionGate, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (SessionGate::new("unit-1", tx), rx)
    }

    fn config_msg(unit: &str, authorization: &str) -> ConfigMessage {
        serde_json::from_str(&format!(
            r#"{{"tachograph_id":"{}","Authorization":"{}"}}"#,
            unit, authorization
        ))
        .unwrap()
    }

    fn frequency_msg(unit: &str, item: &str, value: f64) -> ConfigFrequencyMessage {
        serde_json::from_str(&format!(
            r#"{{"tachograph_id":"{}","Config_item":"{}","Config_Value":{}}}"#,
            unit, item, value
        ))
        .unwrap()
    }

    #[test]
    fn test_lifecycle_to_authorized() {
        let (gate, rx) = gate();
        assert_eq!(gate.state(), SessionState::Unauthenticated);

        gate.mark_awaiting();
        assert_eq!(gate.state(), SessionState::AwaitingAuthorization);

        gate.apply_config(&config_msg("unit-1", "True"));
        assert_eq!(gate.state(), SessionState::Authorized);
        assert!(!*rx.borrow());
    }

    #[test]
    fn test_rejection_signals_shutdown() {
        let (gate, rx) = gate();
        gate.mark_awaiting();

        gate.apply_config(&config_msg("unit-1", "False"));
        assert_eq!(gate.state(), SessionState::Rejected);
        assert!(*rx.borrow());

        // Rejected forces Terminated with no status message owed.
        assert!(!gate.terminate());
        assert_eq!(gate.state(), SessionState::Terminated);
    }

    #[test]
    fn test_grant_for_another_unit_rejects() {
        let (gate, rx) = gate();
        gate.mark_awaiting();

        gate.apply_config(&config_msg("unit-2", "True"));
        assert_eq!(gate.state(), SessionState::Rejected);
        assert!(*rx.borrow());
    }

    #[test]
    fn test_frequency_update_selects_scalar_by_item() {
        let (gate, _rx) = gate();
        let sampling = SamplingControl::new(1.0, 1.0);
        gate.mark_awaiting();
        gate.apply_config(&config_msg("unit-1", "True"));

        gate.apply_config_frequency(&frequency_msg("unit-1", "telemetry_frequency", 5.0), &sampling);
        assert_eq!(sampling.telemetry_interval(), 5.0);
        assert_eq!(sampling.sensor_interval(), 1.0);

        gate.apply_config_frequency(
            &frequency_msg("unit-1", "odometer_GNSS_frequency", 0.5),
            &sampling,
        );
        assert_eq!(sampling.sensor_interval(), 0.5);
        assert_eq!(sampling.telemetry_interval(), 5.0);
    }

    #[test]
    fn test_frequency_update_for_another_unit_ignored() {
        let (gate, _rx) = gate();
        let sampling = SamplingControl::new(1.0, 1.0);
        gate.mark_awaiting();
        gate.apply_config(&config_msg("unit-1", "True"));

        gate.apply_config_frequency(&frequency_msg("unit-2", "telemetry_frequency", 9.0), &sampling);
        assert_eq!(sampling.telemetry_interval(), 1.0);
    }

    #[test]
    fn test_frequency_update_before_authorization_ignored() {
        let (gate, _rx) = gate();
        let sampling = SamplingControl::new(1.0, 1.0);
        gate.mark_awaiting();

        gate.apply_config_frequency(&frequency_msg("unit-1", "telemetry_frequency", 9.0), &sampling);
        assert_eq!(sampling.telemetry_interval(), 1.0);
    }

    #[test]
    fn test_invalid_frequency_values_discarded() {
        let (gate, _rx) = gate();
        let sampling = SamplingControl::new(1.0, 1.0);
        gate.mark_awaiting();
        gate.apply_config(&config_msg("unit-1", "True"));

        gate.apply_config_frequency(&frequency_msg("unit-1", "telemetry_frequency", 0.0), &sampling);
        gate.apply_config_frequency(
            &frequency_msg("unit-1", "telemetry_frequency", -2.0),
            &sampling,
        );
        assert_eq!(sampling.telemetry_interval(), 1.0);
    }

    #[test]
    fn test_graceful_termination_from_authorized() {
        let (gate, _rx) = gate();
        gate.mark_awaiting();
        gate.apply_config(&config_msg("unit-1", "True"));

        // Authorized never reverts except through Terminated.
        assert!(gate.terminate());
        assert_eq!(gate.state(), SessionState::Terminated);
    }
}
