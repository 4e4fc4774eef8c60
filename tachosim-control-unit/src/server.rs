//! Sensor listener: connection acceptance, peer classification, ingestion.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use tachosim_common::{
    Error, GnssFrequencyUpdate, OdometerFrequencyUpdate, Reading, Result, SensorKind, ack_token,
    current_timestamp_millis,
};

use crate::aggregator::Aggregator;
use crate::config::PeersConfig;

/// Maps connecting peers to the sensor kind they are expected to be.
///
/// Built once at startup from the configured sensor host names (forward
/// resolved) and the explicit ip -> kind aliases. A peer whose address
/// matches nothing is not a sensor and its connection is dropped.
#[derive(Debug, Default)]
pub struct SensorPeers {
    by_ip: HashMap<IpAddr, SensorKind>,
}

impl SensorPeers {
    /// Resolve the configured peers into an address map.
    pub async fn resolve(config: &PeersConfig) -> Result<Self> {
        let mut peers = Self::default();

        for (host, kind) in [
            (&config.odometer, SensorKind::Odometer),
            (&config.gnss, SensorKind::Gnss),
            (&config.card_reader, SensorKind::CardReader),
        ] {
            if let Some(host) = host {
                peers.add_host(host, kind).await?;
            }
        }

        for (ip, kind) in &config.aliases {
            let ip: IpAddr = ip
                .parse()
                .map_err(|e| Error::Config(format!("bad peer alias '{}': {}", ip, e)))?;
            peers.by_ip.insert(ip, *kind);
        }

        if peers.by_ip.is_empty() {
            return Err(Error::Config(
                "no sensor peers configured; every connection would be rejected".to_string(),
            ));
        }

        tracing::info!(peers = peers.by_ip.len(), "Sensor peers resolved");

        Ok(peers)
    }

    async fn add_host(&mut self, host: &str, kind: SensorKind) -> Result<()> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            self.by_ip.insert(ip, kind);
            return Ok(());
        }

        let addrs = tokio::net::lookup_host((host, 0)).await.map_err(|e| {
            Error::Config(format!("cannot resolve {} host '{}': {}", kind, host, e))
        })?;

        for addr in addrs {
            self.by_ip.insert(addr.ip(), kind);
        }

        Ok(())
    }

    /// Classify a connecting peer by its address.
    pub fn classify(&self, ip: &IpAddr) -> Option<SensorKind> {
        self.by_ip.get(ip).copied()
    }
}

/// Accept sensor connections until shutdown.
///
/// One handler task per accepted connection; at most one live connection per
/// sensor kind in this domain.
pub async fn run_server(
    listener: TcpListener,
    aggregator: Arc<Aggregator>,
    peers: SensorPeers,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(listen = %addr, "Sensor listener started");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        match peers.classify(&addr.ip()) {
                            Some(kind) => {
                                tracing::info!(peer = %addr, kind = %kind, "Sensor connected");
                                let aggregator = aggregator.clone();
                                let shutdown = shutdown.clone();
                                tokio::spawn(async move {
                                    if let Err(e) =
                                        handle_sensor(stream, addr, kind, aggregator, shutdown).await
                                    {
                                        tracing::error!(peer = %addr, kind = %kind, error = %e, "Sensor connection failed");
                                    }
                                });
                            }
                            None => {
                                tracing::warn!(peer = %addr, "Connection from unrecognized peer, dropping");
                                drop(stream);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Sensor listener stopped");
}

/// Ingest readings from one sensor connection until it disconnects.
///
/// Each received line is decoded, folded into the shared state, and answered
/// with the reply the sensor kind expects: an `ok-<secs>` token for the card
/// reader, the current sampling interval for GNSS and odometer. A decode
/// failure is fatal to the connection.
pub async fn handle_sensor(
    stream: TcpStream,
    addr: SocketAddr,
    kind: SensorKind,
    aggregator: Arc<Aggregator>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        let Some(line) = line else {
            // Zero-length read: the sensor went away.
            tracing::info!(peer = %addr, kind = %kind, "Sensor disconnected");
            break;
        };

        let reading: Reading = serde_json::from_str(&line)
            .map_err(|e| Error::Protocol(format!("undecodable reading '{}': {}", line, e)))?;

        aggregator.apply_reading(&reading);

        let mut reply = match kind {
            SensorKind::CardReader => ack_token(),
            SensorKind::Gnss => serde_json::to_string(&GnssFrequencyUpdate {
                new_gnss_frequency: aggregator.sampling().sensor_interval(),
                timestamp: current_timestamp_millis(),
            })?,
            SensorKind::Odometer => serde_json::to_string(&OdometerFrequencyUpdate {
                new_odometer_frequency: aggregator.sampling().sensor_interval(),
                timestamp: current_timestamp_millis(),
            })?,
        };
        reply.push('\n');
        write_half.write_all(reply.as_bytes()).await?;
    }

    Ok(())
}
