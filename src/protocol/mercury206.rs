//! # Mercury 206 Codec
//!
//! The unauthenticated protocol family. Devices are addressed directly by
//! their serial number; no session handshake is required, reads can be
//! issued immediately after the bridge connection is up.

use crate::constants::*;
use crate::error::MercuryError;
use crate::protocol::frame::{bcd_to_u64, pack_206_request, parse_206_response};
use crate::record::{MetricValue, Metrics};
use crate::transport::{BridgeHandle, BridgeLink};
use async_trait::async_trait;

/// Typed read operations of the Mercury 206 protocol.
#[async_trait]
pub trait Mercury206Codec: Send {
    /// Reads instantaneous voltage (V), current (A) and active power (W).
    async fn read_vap(&mut self, serial: u32) -> Result<(f64, f64, f64), MercuryError>;

    /// Reads the network frequency (Hz).
    async fn read_frequency(&mut self, serial: u32) -> Result<f64, MercuryError>;

    /// Reads the four tariff energy counters (kWh).
    async fn read_energy(&mut self, serial: u32) -> Result<Metrics, MercuryError>;
}

/// Mercury 206 codec over a bridge link.
pub struct Mercury206Handle<L: BridgeLink> {
    bridge: BridgeHandle<L>,
}

impl<L: BridgeLink> Mercury206Handle<L> {
    pub fn new(bridge: BridgeHandle<L>) -> Self {
        Mercury206Handle { bridge }
    }

    pub async fn shutdown(&mut self) {
        self.bridge.shutdown().await;
    }

    async fn command(&mut self, serial: u32, command: u8) -> Result<Vec<u8>, MercuryError> {
        let request = pack_206_request(serial, command, &[]);
        let response = self.bridge.exchange(&request).await?;
        let data = parse_206_response(&response, serial, command)?;
        Ok(data.to_vec())
    }
}

#[async_trait]
impl<L: BridgeLink> Mercury206Codec for Mercury206Handle<L> {
    async fn read_vap(&mut self, serial: u32) -> Result<(f64, f64, f64), MercuryError> {
        let data = self.command(serial, M206_CMD_READ_VAP).await?;
        if data.len() != 7 {
            return Err(MercuryError::MalformedData(format!(
                "V/A/P payload is {} bytes, expected 7",
                data.len()
            )));
        }
        // BCD: U in 0.1 V, I in 0.01 A, P in W
        let voltage = bcd_to_u64(&data[0..2])? as f64 / 10.0;
        let current = bcd_to_u64(&data[2..4])? as f64 / 100.0;
        let power = bcd_to_u64(&data[4..7])? as f64;
        Ok((voltage, current, power))
    }

    async fn read_frequency(&mut self, serial: u32) -> Result<f64, MercuryError> {
        let data = self.command(serial, M206_CMD_READ_FREQUENCY).await?;
        if data.len() != 2 {
            return Err(MercuryError::MalformedData(format!(
                "frequency payload is {} bytes, expected 2",
                data.len()
            )));
        }
        Ok(bcd_to_u64(&data)? as f64 / 100.0)
    }

    async fn read_energy(&mut self, serial: u32) -> Result<Metrics, MercuryError> {
        let data = self.command(serial, M206_CMD_READ_ENERGY).await?;
        if data.len() != 16 {
            return Err(MercuryError::MalformedData(format!(
                "energy payload is {} bytes, expected 16",
                data.len()
            )));
        }
        // Four tariff counters, 4 BCD bytes each, in 0.01 kWh
        let mut metrics = Metrics::new();
        for tariff in 0..4usize {
            let counter = bcd_to_u64(&data[tariff * 4..tariff * 4 + 4])?;
            metrics.push((
                format!("T{}", tariff + 1),
                MetricValue::Float(counter as f64 / 100.0),
            ));
        }
        Ok(metrics)
    }
}
