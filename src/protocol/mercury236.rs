//! # Mercury 236 Codec
//!
//! The authenticated protocol family. A device accepts queries only after an
//! open-channel request carrying an access level and a 6-character password;
//! the channel is closed again when the session ends.

use crate::constants::*;
use crate::error::MercuryError;
use crate::protocol::frame::{describe_status, pack_236_request, parse_236_response, status_code};
use crate::record::{MetricValue, Metrics};
use crate::transport::{BridgeHandle, BridgeLink};
use crate::ArrayNumber;
use async_trait::async_trait;

/// Privilege tier used by the open-channel handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    User,
    Admin,
}

impl AccessLevel {
    /// Wire-level access level code.
    pub fn code(self) -> u8 {
        match self {
            AccessLevel::User => 0x01,
            AccessLevel::Admin => 0x02,
        }
    }

    /// Vendor default credential for this level.
    pub fn default_password(self) -> &'static str {
        match self {
            AccessLevel::User => DEFAULT_USER_PASSWORD,
            AccessLevel::Admin => DEFAULT_ADMIN_PASSWORD,
        }
    }
}

/// Typed operations of the Mercury 236 protocol.
#[async_trait]
pub trait Mercury236Codec: Send {
    /// Confirms the device answers on the given bus address.
    async fn check_connect(&mut self, address: u8) -> Result<(), MercuryError>;

    /// Opens the communication channel at the given access level.
    async fn open_channel(
        &mut self,
        address: u8,
        level: AccessLevel,
        password: &str,
    ) -> Result<(), MercuryError>;

    /// Closes the communication channel.
    async fn close_channel(&mut self, address: u8) -> Result<(), MercuryError>;

    /// Reads the accumulated active/reactive totals of an energy array (kWh).
    async fn read_energy_total(
        &mut self,
        address: u8,
        array: ArrayNumber,
    ) -> Result<Metrics, MercuryError>;

    /// Reads the per-tariff active/reactive energy of an array (kWh).
    async fn read_energy_tariffs(
        &mut self,
        address: u8,
        array: ArrayNumber,
    ) -> Result<Metrics, MercuryError>;

    /// Reads the accumulated active energy per phase (kWh).
    async fn read_energy_by_phase(&mut self, address: u8) -> Result<Metrics, MercuryError>;

    /// Reads the per-tariff active energy per phase (kWh).
    async fn read_energy_tariffs_by_phase(
        &mut self,
        address: u8,
    ) -> Result<Metrics, MercuryError>;

    /// Reads instantaneous voltage/current per phase and total power.
    async fn read_instrumentation(&mut self, address: u8) -> Result<Metrics, MercuryError>;

    /// Reads the network frequency (Hz).
    async fn read_frequency(&mut self, address: u8) -> Result<f64, MercuryError>;
}

/// Decodes one 4-byte energy counter in the vendor 2-1-4-3 byte order.
/// An all-ones counter means the channel is not supported by the meter.
fn energy_counter(bytes: &[u8]) -> Option<u32> {
    let value = ((bytes[1] as u32) << 24)
        | ((bytes[0] as u32) << 16)
        | ((bytes[3] as u32) << 8)
        | bytes[2] as u32;
    if value == u32::MAX {
        None
    } else {
        Some(value)
    }
}

/// Decodes a 3-byte auxiliary parameter value. The top two bits of the
/// first byte carry direction flags and are masked off.
fn aux_value(data: &[u8]) -> Result<u32, MercuryError> {
    match data {
        [b0, b1, b2] => Ok((((b0 & 0x3F) as u32) << 16) | ((*b2 as u32) << 8) | *b1 as u32),
        _ => Err(MercuryError::MalformedData(format!(
            "auxiliary payload is {} bytes, expected 3",
            data.len()
        ))),
    }
}

/// Mercury 236 codec over a bridge link.
pub struct Mercury236Handle<L: BridgeLink> {
    bridge: BridgeHandle<L>,
}

impl<L: BridgeLink> Mercury236Handle<L> {
    pub fn new(bridge: BridgeHandle<L>) -> Self {
        Mercury236Handle { bridge }
    }

    pub async fn shutdown(&mut self) {
        self.bridge.shutdown().await;
    }

    async fn request(&mut self, address: u8, payload: &[u8]) -> Result<Vec<u8>, MercuryError> {
        let request = pack_236_request(address, payload);
        let response = self.bridge.exchange(&request).await?;
        let data = parse_236_response(&response, address)?;
        Ok(data.to_vec())
    }

    /// Issues a request expected to answer with a single status byte.
    async fn status_request(&mut self, address: u8, payload: &[u8]) -> Result<u8, MercuryError> {
        let data = self.request(address, payload).await?;
        status_code(&data)
    }

    /// Reads one 16-byte A+/A-/R+/R- energy record.
    async fn energy_record(
        &mut self,
        address: u8,
        array: u8,
        tariff: u8,
        prefix: &str,
    ) -> Result<Metrics, MercuryError> {
        let data = self
            .request(address, &[M236_REQ_READ_ENERGY, array << 4, tariff])
            .await?;
        if data.len() == 1 {
            return Err(MercuryError::MalformedData(format!(
                "energy read refused: {}",
                describe_status(status_code(&data)?)
            )));
        }
        if data.len() != 16 {
            return Err(MercuryError::MalformedData(format!(
                "energy payload is {} bytes, expected 16",
                data.len()
            )));
        }
        let mut metrics = Metrics::new();
        for (i, key) in ["A+", "A-", "R+", "R-"].iter().enumerate() {
            if let Some(wh) = energy_counter(&data[i * 4..i * 4 + 4]) {
                metrics.push((
                    format!("{prefix}{key}"),
                    MetricValue::Float(wh as f64 / 1000.0),
                ));
            }
        }
        Ok(metrics)
    }

    /// Reads one 12-byte per-phase active energy record.
    async fn phase_record(
        &mut self,
        address: u8,
        tariff: u8,
        prefix: &str,
    ) -> Result<Metrics, MercuryError> {
        let data = self
            .request(
                address,
                &[M236_REQ_READ_ENERGY, M236_ARRAY_BY_PHASE << 4, tariff],
            )
            .await?;
        if data.len() != 12 {
            return Err(MercuryError::MalformedData(format!(
                "per-phase payload is {} bytes, expected 12",
                data.len()
            )));
        }
        let mut metrics = Metrics::new();
        for phase in 0..3usize {
            if let Some(wh) = energy_counter(&data[phase * 4..phase * 4 + 4]) {
                metrics.push((
                    format!("{prefix}phase{}", phase + 1),
                    MetricValue::Float(wh as f64 / 1000.0),
                ));
            }
        }
        Ok(metrics)
    }

    /// Reads one instantaneous value by its BWRI code.
    async fn aux_read(&mut self, address: u8, bwri: u8) -> Result<u32, MercuryError> {
        let data = self
            .request(address, &[M236_REQ_READ_AUX, M236_AUX_PARAMS, bwri])
            .await?;
        aux_value(&data)
    }
}

#[async_trait]
impl<L: BridgeLink> Mercury236Codec for Mercury236Handle<L> {
    async fn check_connect(&mut self, address: u8) -> Result<(), MercuryError> {
        let status = self.status_request(address, &[M236_REQ_TEST]).await?;
        if status != M236_STATUS_OK {
            return Err(MercuryError::Connection(format!(
                "device {address} rejected connect: {}",
                describe_status(status)
            )));
        }
        Ok(())
    }

    async fn open_channel(
        &mut self,
        address: u8,
        level: AccessLevel,
        password: &str,
    ) -> Result<(), MercuryError> {
        if password.len() != PASSWORD_LEN || !password.is_ascii() {
            return Err(MercuryError::Authentication(format!(
                "password must be {PASSWORD_LEN} ASCII characters"
            )));
        }
        let mut payload = vec![M236_REQ_OPEN_CHANNEL, level.code()];
        payload.extend_from_slice(password.as_bytes());

        let status = self.status_request(address, &payload).await?;
        if status != M236_STATUS_OK {
            return Err(MercuryError::Authentication(format!(
                "open channel refused: {}",
                describe_status(status)
            )));
        }
        Ok(())
    }

    async fn close_channel(&mut self, address: u8) -> Result<(), MercuryError> {
        let status = self
            .status_request(address, &[M236_REQ_CLOSE_CHANNEL])
            .await?;
        if status != M236_STATUS_OK {
            return Err(MercuryError::MalformedData(format!(
                "close channel refused: {}",
                describe_status(status)
            )));
        }
        Ok(())
    }

    async fn read_energy_total(
        &mut self,
        address: u8,
        array: ArrayNumber,
    ) -> Result<Metrics, MercuryError> {
        self.energy_record(address, array.code(), 0, "").await
    }

    async fn read_energy_tariffs(
        &mut self,
        address: u8,
        array: ArrayNumber,
    ) -> Result<Metrics, MercuryError> {
        let mut metrics = Metrics::new();
        for tariff in crate::arrays::tariff_numbers() {
            let prefix = format!("T{tariff}.");
            metrics.extend(
                self.energy_record(address, array.code(), tariff, &prefix)
                    .await?,
            );
        }
        Ok(metrics)
    }

    async fn read_energy_by_phase(&mut self, address: u8) -> Result<Metrics, MercuryError> {
        self.phase_record(address, 0, "").await
    }

    async fn read_energy_tariffs_by_phase(
        &mut self,
        address: u8,
    ) -> Result<Metrics, MercuryError> {
        let mut metrics = Metrics::new();
        for tariff in crate::arrays::tariff_numbers() {
            let prefix = format!("T{tariff}.");
            metrics.extend(self.phase_record(address, tariff, &prefix).await?);
        }
        Ok(metrics)
    }

    async fn read_instrumentation(&mut self, address: u8) -> Result<Metrics, MercuryError> {
        let mut metrics = Metrics::new();
        for phase in 0..3u8 {
            let raw = self.aux_read(address, M236_BWRI_VOLTAGE_PHASE1 + phase).await?;
            metrics.push((
                format!("U{}", phase + 1),
                MetricValue::Float(raw as f64 / 100.0),
            ));
        }
        for phase in 0..3u8 {
            let raw = self.aux_read(address, M236_BWRI_CURRENT_PHASE1 + phase).await?;
            metrics.push((
                format!("I{}", phase + 1),
                MetricValue::Float(raw as f64 / 1000.0),
            ));
        }
        let raw = self.aux_read(address, M236_BWRI_POWER_SUM).await?;
        metrics.push(("P".to_string(), MetricValue::Float(raw as f64 / 100.0)));
        Ok(metrics)
    }

    async fn read_frequency(&mut self, address: u8) -> Result<f64, MercuryError> {
        let raw = self.aux_read(address, M236_BWRI_FREQUENCY).await?;
        Ok(raw as f64 / 100.0)
    }
}
