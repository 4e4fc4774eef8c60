//! Position fix simulation loop.

use tachosim_common::{
    GeoPosition, GnssFrequencyUpdate, PositionSegment, Reading, current_timestamp_millis,
};
use tachosim_sensor_framework::{RequestLink, Result, RouteFeed};

use crate::config::GnssSettings;

/// Replays route position segments as GNSS fixes.
pub struct GnssSimulator {
    link: RequestLink,
    feed: RouteFeed<PositionSegment>,
    frequency_secs: f64,
}

impl GnssSimulator {
    pub fn new(link: RequestLink, feed: RouteFeed<PositionSegment>, settings: GnssSettings) -> Self {
        Self {
            link,
            feed,
            frequency_secs: settings.initial_frequency_secs,
        }
    }

    /// Run the simulation loop until the connection drops.
    ///
    /// Iterates snapshots of the accumulated segments, replaying the route
    /// from the start once the end is reached. Waits quietly while no
    /// segments have arrived yet.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let segments = self.feed.snapshot();
            if segments.is_empty() {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }

            for segment in segments {
                self.replay_segment(&segment).await?;
            }
        }
    }

    /// Emit the fixes covering one segment at the current frequency.
    ///
    /// Intermediate fixes stay pinned at the segment origin; the last fix of
    /// the segment reports the destination.
    async fn replay_segment(&mut self, segment: &PositionSegment) -> Result<()> {
        let mut intermediate = intermediate_fixes(segment.duration_secs, self.frequency_secs);

        while intermediate > 0 {
            self.report_fix(segment.origin, segment.speed).await?;
            intermediate -= 1;
        }

        self.report_fix(segment.destination, segment.speed).await
    }

    async fn report_fix(&mut self, position: GeoPosition, speed: f64) -> Result<()> {
        let reading = Reading::Gnss {
            position,
            speed,
            timestamp: current_timestamp_millis(),
        };

        let reply: GnssFrequencyUpdate = self.link.exchange_json(&reading).await?;
        self.adopt_frequency(reply.new_gnss_frequency);

        tracing::debug!(
            latitude = position.latitude,
            longitude = position.longitude,
            next_in = self.frequency_secs,
            "Position reported"
        );
        tokio::time::sleep(std::time::Duration::from_secs_f64(self.frequency_secs)).await;

        Ok(())
    }

    fn adopt_frequency(&mut self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.frequency_secs = secs;
        } else {
            tracing::warn!(secs = secs, "Ignoring invalid frequency from control unit");
        }
    }
}

/// Number of origin-pinned fixes before the destination fix of a segment.
pub fn intermediate_fixes(duration_secs: f64, frequency_secs: f64) -> u64 {
    (duration_secs / frequency_secs).trunc() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intermediate_fixes() {
        assert_eq!(intermediate_fixes(10.0, 1.0), 10);
        // A short segment still yields its destination fix, just nothing
        // before it.
        assert_eq!(intermediate_fixes(0.5, 1.0), 0);
        assert_eq!(intermediate_fixes(3.0, 2.0), 1);
    }
}
