//! Segment delivery to the simulator feed listeners.

use serde::Serialize;

use tachosim_common::{PositionSegment, SpeedSegment};
use tachosim_sensor_framework::{RequestLink, Result};

/// A feed segment that knows its own traversal time.
pub trait TimedSegment: Serialize {
    fn duration_secs(&self) -> f64;
}

impl TimedSegment for PositionSegment {
    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

impl TimedSegment for SpeedSegment {
    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

/// Deliver the segments to one feed listener, in order.
///
/// Every segment is acknowledged before the feeder sleeps out the segment's
/// traversal time, so the simulators receive the route roughly in real time.
pub async fn feed_segments<T: TimedSegment>(
    addr: String,
    label: &'static str,
    segments: Vec<T>,
) -> Result<()> {
    let mut link = RequestLink::connect(&addr).await?;

    tracing::info!(feed = label, count = segments.len(), "Feeding segments");

    for segment in &segments {
        let ack = link.exchange(segment).await?;
        tracing::debug!(feed = label, ack = %ack, "Segment delivered");

        let pause = segment.duration_secs().max(0.0);
        tokio::time::sleep(std::time::Duration::from_secs_f64(pause)).await;
    }

    tracing::info!(feed = label, "Feed complete");

    Ok(())
}
