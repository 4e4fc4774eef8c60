//! Speed reading simulation loop.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use tachosim_common::{
    OdometerFrequencyUpdate, Reading, SpeedSegment, current_timestamp_millis,
};
use tachosim_sensor_framework::{RequestLink, Result, RouteFeed};

use crate::config::OdometerSettings;

/// Replays route speed segments as noisy odometer readings.
pub struct OdometerSimulator {
    link: RequestLink,
    feed: RouteFeed<SpeedSegment>,
    settings: OdometerSettings,
    frequency_secs: f64,
}

impl OdometerSimulator {
    pub fn new(link: RequestLink, feed: RouteFeed<SpeedSegment>, settings: OdometerSettings) -> Self {
        let frequency_secs = settings.initial_frequency_secs;
        Self {
            link,
            feed,
            settings,
            frequency_secs,
        }
    }

    /// Run the simulation loop until the connection drops.
    ///
    /// Iterates snapshots of the accumulated segments, replaying the route
    /// from the start once the end is reached. Waits quietly while no
    /// segments have arrived yet.
    pub async fn run(mut self) -> Result<()> {
        let mut rng = SmallRng::from_os_rng();

        loop {
            let segments = self.feed.snapshot();
            if segments.is_empty() {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }

            for segment in segments {
                self.replay_segment(&segment, &mut rng).await?;
            }
        }
    }

    /// Emit the readings covering one segment at the current frequency.
    async fn replay_segment(&mut self, segment: &SpeedSegment, rng: &mut SmallRng) -> Result<()> {
        let jitter = self.settings.speed_jitter_kmh;
        let mut remaining = readings_in(segment.duration_secs, self.frequency_secs);
        let mut speed = segment.speed + rng.random_range(-jitter..=jitter);

        while remaining > 0 {
            speed += rng.random_range(-jitter..=jitter);
            let reading = Reading::Odometer {
                speed,
                timestamp: current_timestamp_millis(),
            };

            let reply: OdometerFrequencyUpdate = self.link.exchange_json(&reading).await?;
            self.adopt_frequency(reply.new_odometer_frequency);

            tracing::debug!(
                speed = speed,
                next_in = self.frequency_secs,
                "Speed reported"
            );
            tokio::time::sleep(std::time::Duration::from_secs_f64(self.frequency_secs)).await;
            remaining -= 1;
        }

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

/// Number of readings covering a segment at a sampling interval.
pub fn readings_in(duration_secs: f64, frequency_secs: f64) -> u64 {
    (duration_secs / frequency_secs).trunc() as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readings_in() {
        assert_eq!(readings_in(10.0, 1.0), 11);
        assert_eq!(readings_in(0.5, 1.0), 1);
        assert_eq!(readings_in(3.0, 2.0), 2);
        // Faster sampling means more readings per segment.
        assert_eq!(readings_in(3.0, 0.5), 7);
    }
}
