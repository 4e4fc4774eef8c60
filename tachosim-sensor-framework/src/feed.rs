//! Route-feed listener shared by the odometer and GNSS simulators.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use tachosim_common::ack_token;

use crate::error::{Result, SensorError};

/// Accumulates route segments received from the route generator.
///
/// The generator connects over TCP and sends one JSON segment per line; each
/// accepted segment is appended to a shared list and acknowledged with an
/// `ok-<secs>` token. The simulator loop iterates snapshots of the list,
/// replaying the route as it grows.
#[derive(Debug)]
pub struct RouteFeed<T> {
    segments: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for RouteFeed<T> {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
        }
    }
}

impl<T> Default for RouteFeed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteFeed<T> {
    pub fn new() -> Self {
        Self {
            segments: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of segments received so far.
    pub fn len(&self) -> usize {
        self.segments.lock().expect("feed lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> RouteFeed<T> {
    /// Copy of the segments received so far, in arrival order.
    pub fn snapshot(&self) -> Vec<T> {
        self.segments.lock().expect("feed lock poisoned").clone()
    }
}

impl<T: DeserializeOwned + Send + 'static> RouteFeed<T> {
    /// Bind the feed listener and accept feeder connections, one at a time.
    ///
    /// Runs until the task is cancelled. A malformed segment line terminates
    /// the current feeder connection; the listener then waits for the next.
    pub async fn listen(&self, bind: &str) -> Result<()> {
        let listener = TcpListener::bind(bind).await.map_err(|e| {
            SensorError::Connection(format!("failed to bind route feed to {}: {}", bind, e))
        })?;

        tracing::info!(bind = %bind, "Route feed listening");

        loop {
            let (stream, addr) = listener.accept().await?;
            tracing::info!(peer = %addr, "Route generator connected");

            if let Err(e) = self.handle_feeder(stream).await {
                tracing::warn!(peer = %addr, error = %e, "Route feed connection failed");
            } else {
                tracing::info!(peer = %addr, "Route generator disconnected");
            }
        }
    }

    async fn handle_feeder(&self, stream: tokio::net::TcpStream) -> Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        while let Some(line) = lines.next_line().await? {
            let segment: T = serde_json::from_str(&line)
                .map_err(|e| SensorError::protocol(format!("bad segment '{}': {}", line, e)))?;

            self.segments
                .lock()
                .expect("feed lock poisoned")
                .push(segment);

            write_half
                .write_all(format!("{}\n", ack_token()).as_bytes())
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tachosim_common::SpeedSegment;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_feed_accumulates_segments_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let feed: RouteFeed<SpeedSegment> = RouteFeed::new();
        let accept_feed = feed.clone();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = accept_feed.handle_feeder(stream).await;
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        for speed in [40.0, 55.0] {
            let line = format!(r#"{{"Speed":{},"Time":3.0}}"#, speed);
            write_half
                .write_all(format!("{}\n", line).as_bytes())
                .await
                .unwrap();
            let ack = lines.next_line().await.unwrap().unwrap();
            assert!(ack.starts_with("ok-"));
        }
        drop(write_half);

        // Both segments acked, so both are visible.
        let segments = feed.snapshot();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].speed, 40.0);
        assert_eq!(segments[1].speed, 55.0);
    }

    #[tokio::test]
    async fn test_malformed_segment_ends_feeder() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let feed: RouteFeed<SpeedSegment> = RouteFeed::new();
        let accept_feed = feed.clone();
        let handler = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            accept_feed.handle_feeder(stream).await
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"not json\n").await.unwrap();

        let result = handler.await.unwrap();
        assert!(matches!(result, Err(SensorError::Protocol(_))));
        assert!(feed.is_empty());
    }
}
