//! Shared vehicle state, telemetry/event buffers, and rule evaluation.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;

use tachosim_common::{
    ComplianceEvent, EventKind, Reading, TelemetrySnapshot, VehicleState, current_timestamp_millis,
};

use crate::state::SamplingControl;

/// Speed limit above which an Overspeed event fires, km/h.
const SPEED_LIMIT_KMH: f64 = 90.0;

/// Relative tolerance between odometer and GPS speed before a
/// SpeedDiscrepancy event fires.
const SPEED_DISCREPANCY_RATIO: f64 = 0.05;

/// The aggregation core: one vehicle state plus the two outbound buffers.
///
/// All sensor connections and the evaluator share one `Aggregator` by
/// reference. Locking discipline: the state lock is held only for a field
/// update plus the snapshot copy; the buffer locks only for an append or a
/// swap-drain. The two locks are never held at the same time and never
/// across I/O.
#[derive(Debug)]
pub struct Aggregator {
    unit_id: String,
    state: Mutex<VehicleState>,
    telemetry: Mutex<Vec<TelemetrySnapshot>>,
    events: Mutex<Vec<ComplianceEvent>>,
    sampling: SamplingControl,
}

impl Aggregator {
    pub fn new(unit_id: impl Into<String>, sampling: SamplingControl) -> Self {
        let unit_id = unit_id.into();
        Self {
            state: Mutex::new(VehicleState::new(&unit_id)),
            telemetry: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            sampling,
            unit_id,
        }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn sampling(&self) -> &SamplingControl {
        &self.sampling
    }

    /// Fold one reading into the vehicle state and buffer the snapshot.
    ///
    /// Each reading kind updates only the fields it owns; everything else is
    /// carried over untouched. The snapshot is copied out under the state
    /// lock and appended to the telemetry buffer under its own lock.
    pub fn apply_reading(&self, reading: &Reading) -> TelemetrySnapshot {
        let snapshot = {
            let mut state = self.state.lock().expect("state lock poisoned");
            state.last_update = current_timestamp_millis();

            match reading {
                Reading::Gnss {
                    position, speed, ..
                } => {
                    state.position = Some(*position);
                    state.gps_speed = *speed;
                }
                Reading::Odometer { speed, .. } => {
                    state.odometer_speed = *speed;
                }
                Reading::CardReader { driver_present, .. } => {
                    state.driver_present = driver_present.clone();
                }
            }

            state.clone()
        };

        self.telemetry
            .lock()
            .expect("telemetry lock poisoned")
            .push(snapshot.clone());

        tracing::debug!(
            driver = %snapshot.driver_present,
            odometer = snapshot.odometer_speed,
            gps = snapshot.gps_speed,
            "State updated"
        );

        snapshot
    }

    /// Copy of the current vehicle state.
    pub fn snapshot(&self) -> VehicleState {
        self.state.lock().expect("state lock poisoned").clone()
    }

    /// Swap the telemetry buffer for an empty one and return the contents.
    pub fn drain_telemetry(&self) -> Vec<TelemetrySnapshot> {
        std::mem::take(&mut *self.telemetry.lock().expect("telemetry lock poisoned"))
    }

    /// Swap the event buffer for an empty one and return the contents.
    pub fn drain_events(&self) -> Vec<ComplianceEvent> {
        std::mem::take(&mut *self.events.lock().expect("event lock poisoned"))
    }

    /// Run one evaluator cycle.
    ///
    /// `last_seen` is the state timestamp of the previous cycle; if the state
    /// has not advanced since, no rules run (a quiescent state never emits
    /// the same event twice). Returns the timestamp to pass to the next
    /// cycle.
    pub fn evaluate_events(&self, last_seen: i64) -> i64 {
        let state = self.snapshot();
        if state.last_update <= last_seen {
            return last_seen;
        }

        let kinds = check_rules(&state);
        if !kinds.is_empty() {
            let mut events = self.events.lock().expect("event lock poisoned");
            for kind in kinds {
                tracing::info!(event = %kind, odometer = state.odometer_speed, "Compliance event");
                events.push(ComplianceEvent::new(&self.unit_id, state.position, kind));
            }
        }

        state.last_update
    }
}

/// Evaluate the three compliance rules against a state snapshot.
///
/// The checks are independent and may all fire on the same cycle.
pub fn check_rules(state: &VehicleState) -> Vec<EventKind> {
    let mut kinds = Vec::new();

    if !state.has_driver() && state.odometer_speed > 0.0 {
        kinds.push(EventKind::MovementWithoutDriver);
    }

    if state.odometer_speed > SPEED_LIMIT_KMH {
        kinds.push(EventKind::Overspeed);
    }

    if (state.odometer_speed - state.gps_speed).abs()
        > SPEED_DISCREPANCY_RATIO * state.odometer_speed
    {
        kinds.push(EventKind::SpeedDiscrepancy);
    }

    kinds
}

/// Periodic rule evaluation, independent of reading arrival.
pub async fn run_evaluator(
    aggregator: Arc<Aggregator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut last_seen = 0i64;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(period) => {
                last_seen = aggregator.evaluate_events(last_seen);
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Evaluator stopped");
}
