//! Persistent line-oriented request/response link.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::{Result, SensorError};

/// A persistent, line-oriented request/response connection.
///
/// Sensors hold one toward the control unit; the route generator holds one
/// toward each sensor's feed listener. Each cycle writes one JSON payload
/// terminated by a newline and blocks on the single reply line. The
/// connection is held for the process lifetime; on loss the caller exits and
/// reconnection happens at the next process start.
pub struct RequestLink {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    peer: String,
}

impl RequestLink {
    /// Connect to the given listener address.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            SensorError::Connection(format!("failed to connect to {}: {}", addr, e))
        })?;

        tracing::info!(peer = %addr, "Connected");

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            peer: addr.to_string(),
        })
    }

    /// The address this link is connected to.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Send one reading and block on the raw reply line.
    pub async fn exchange<T: Serialize>(&mut self, reading: &T) -> Result<String> {
        let mut line = serde_json::to_string(reading)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let mut reply = String::new();
        let n = self.reader.read_line(&mut reply).await?;
        if n == 0 {
            return Err(SensorError::Disconnected);
        }

        Ok(reply.trim_end().to_string())
    }

    /// Send one reading and decode the JSON reply.
    pub async fn exchange_json<T: Serialize, R: DeserializeOwned>(
        &mut self,
        reading: &T,
    ) -> Result<R> {
        let reply = self.exchange(reading).await?;
        serde_json::from_str(&reply)
            .map_err(|e| SensorError::protocol(format!("unexpected reply '{}': {}", reply, e)))
    }
}
