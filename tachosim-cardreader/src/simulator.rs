//! Driver presence simulation loop.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use tachosim_common::{NO_DRIVER, Reading, current_timestamp_millis};
use tachosim_sensor_framework::{RequestLink, Result};

use crate::config::CardReaderSettings;

/// Simulates the card slot toward the control unit.
pub struct CardReaderSimulator {
    link: RequestLink,
    settings: CardReaderSettings,
}

impl CardReaderSimulator {
    pub fn new(link: RequestLink, settings: CardReaderSettings) -> Self {
        Self { link, settings }
    }

    /// Run the simulation loop until the connection drops.
    pub async fn run(mut self) -> Result<()> {
        let mut rng = SmallRng::from_os_rng();

        loop {
            let reading = draw_reading(&mut rng, self.settings.driver_count);
            let ack = self.link.exchange(&reading).await?;
            tracing::debug!(ack = %ack, "Card state reported");

            let pause = rng.random_range(0.0..self.settings.max_pause_secs);
            tracing::debug!(secs = pause, "Next card update in");
            tokio::time::sleep(std::time::Duration::from_secs_f64(pause)).await;
        }
    }
}

/// Draw one card reading: a coin flip for presence, then a driver identity.
fn draw_reading(rng: &mut impl Rng, driver_count: u32) -> Reading {
    let timestamp = current_timestamp_millis();

    if rng.random_bool(0.5) {
        let driver = rng.random_range(1..=driver_count);
        Reading::CardReader {
            is_driver: 1,
            driver_present: format!("Driver {}", driver),
            timestamp,
        }
    } else {
        Reading::CardReader {
            is_driver: 0,
            driver_present: NO_DRIVER.to_string(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawn_readings_are_consistent() {
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..200 {
            match draw_reading(&mut rng, 3) {
                Reading::CardReader {
                    is_driver,
                    driver_present,
                    ..
                } => {
                    if is_driver == 1 {
                        let id: u32 = driver_present
                            .strip_prefix("Driver ")
                            .expect("driver identity format")
                            .parse()
                            .expect("numeric driver id");
                        assert!((1..=3).contains(&id));
                    } else {
                        assert_eq!(driver_present, NO_DRIVER);
                    }
                }
                other => panic!("card reader drew {:?}", other),
            }
        }
    }

    #[test]
    fn test_both_presence_outcomes_occur() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut present = 0;
        let mut absent = 0;

        for _ in 0..100 {
            match draw_reading(&mut rng, 3) {
                Reading::CardReader { is_driver: 1, .. } => present += 1,
                _ => absent += 1,
            }
        }

        assert!(present > 0);
        assert!(absent > 0);
    }
}
