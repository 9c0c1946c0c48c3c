//! # Polling Orchestrator
//!
//! Iterates a batch of device serials strictly in order, opens one fresh
//! bridge connection per device, drives the protocol flow for the configured
//! family, and records one result slot per serial. A device failure is
//! confined to its own slot and never aborts the batch.

use crate::address::{resolve_address, ProtocolFamily};
use crate::arrays::{read_plan, ArrayNumber};
use crate::constants::{DEFAULT_BRIDGE_PORT, DEFAULT_EXCHANGE_TIMEOUT};
use crate::logging::{log_info, log_warn};
use crate::protocol::mercury206::{Mercury206Codec, Mercury206Handle};
use crate::protocol::mercury236::{AccessLevel, Mercury236Codec, Mercury236Handle};
use crate::record::{BatchResult, DeviceReport, DeviceResult, MetricGroup};
use crate::session::Session;
use crate::transport::BridgeHandle;
use std::future::Future;
use std::time::Duration;

/// Process-wide polling configuration. Passed explicitly so the orchestrator
/// stays reentrant; nothing here is global state.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub family: ProtocolFamily,
    pub host: String,
    pub port: u16,
    pub access_level: AccessLevel,
    pub password: Option<String>,
    pub array: ArrayNumber,
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(family: ProtocolFamily, host: &str) -> Self {
        PollConfig {
            family,
            host: host.to_string(),
            port: DEFAULT_BRIDGE_PORT,
            access_level: AccessLevel::User,
            password: None,
            array: ArrayNumber::SinceReset,
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        }
    }
}

/// Polls every serial in input order against the configured bridge.
///
/// One slot per input serial, always: a device that fails at any point
/// appears with its classified error instead of vanishing.
pub async fn poll(serials: &[u32], config: &PollConfig) -> BatchResult {
    poll_with(serials, |serial| poll_device(serial, config)).await
}

/// The structured fold underlying [`poll`]: runs `poll_one` per serial,
/// strictly sequentially, and assembles the batch in input order. Public so
/// tests can inject per-device flows.
pub async fn poll_with<F, Fut>(serials: &[u32], mut poll_one: F) -> BatchResult
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = DeviceResult>,
{
    let mut reports = Vec::with_capacity(serials.len());
    for &serial in serials {
        let result = poll_one(serial).await;
        if let Some(e) = &result.error {
            log_warn(&format!("device {serial}: {e}"));
        }
        reports.push(DeviceReport { serial, result });
    }
    BatchResult { reports }
}

/// Polls a single device over a fresh bridge connection. The socket is
/// released on every path before the next device is touched.
async fn poll_device(serial: u32, config: &PollConfig) -> DeviceResult {
    log_info(&format!("polling device {serial}"));
    let bridge = match BridgeHandle::connect(&config.host, config.port, config.timeout).await {
        Ok(bridge) => bridge,
        Err(e) => return DeviceResult::failed(e),
    };

    match config.family {
        ProtocolFamily::Simple => {
            let mut codec = Mercury206Handle::new(bridge);
            let result = poll_simple(&mut codec, serial).await;
            codec.shutdown().await;
            result
        }
        ProtocolFamily::Authenticated => {
            let address = resolve_address(serial, ProtocolFamily::Authenticated) as u8;
            let mut codec = Mercury236Handle::new(bridge);
            let result = poll_authenticated(
                &mut codec,
                address,
                config.access_level,
                config.password.as_deref(),
                config.array,
            )
            .await;
            codec.shutdown().await;
            result
        }
    }
}

/// Simple-family flow: fixed read sequence, no session. The first failed
/// read truncates the rest; groups read before it are preserved.
pub async fn poll_simple<C: Mercury206Codec>(codec: &mut C, serial: u32) -> DeviceResult {
    let address = resolve_address(serial, ProtocolFamily::Simple);
    let mut result = DeviceResult::default();
    let mut info = MetricGroup::new("info");

    match codec.read_vap(address).await {
        Ok((voltage, current, power)) => {
            info.push("V", voltage);
            info.push("A", current);
            info.push("P", power);
        }
        Err(e) => {
            result.push_group(info);
            result.error = Some(e);
            return result;
        }
    }

    match codec.read_frequency(address).await {
        Ok(freq) => info.push("freq", freq),
        Err(e) => {
            result.push_group(info);
            result.error = Some(e);
            return result;
        }
    }
    result.push_group(info);

    match codec.read_energy(address).await {
        Ok(metrics) => result.push_metrics("energy", metrics),
        Err(e) => result.error = Some(e),
    }
    result
}

/// Authenticated-family flow: connect, authenticate, run the array-derived
/// read plan fail-fast, close. The close is attempted whenever the session
/// got past connect, including after a read failure.
pub async fn poll_authenticated<C: Mercury236Codec>(
    codec: &mut C,
    address: u8,
    level: AccessLevel,
    password: Option<&str>,
    array: ArrayNumber,
) -> DeviceResult {
    let mut result = DeviceResult::default();
    let mut session = Session::new(codec, address);

    if let Err(e) = session.connect().await {
        return DeviceResult::failed(e);
    }
    if let Err(e) = session.authenticate(level, password).await {
        result.error = Some(e);
        session.close().await;
        return result;
    }

    for step in read_plan(array) {
        match session.read(step.op).await {
            Ok(metrics) => result.push_metrics(&step.group, metrics),
            Err(e) => {
                result.error = Some(e);
                break;
            }
        }
    }
    session.close().await;
    result
}
