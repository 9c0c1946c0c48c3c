//! # Mercury 236 Session
//!
//! State machine driving one authenticated session against one device:
//! connect (check-connect handshake), authenticate (open channel), any
//! number of reads, close (best effort). A session belongs to exactly one
//! device for one polling iteration and is never reused.

use crate::arrays::ReadOp;
use crate::error::MercuryError;
use crate::logging::{log_debug, log_warn};
use crate::protocol::mercury236::{AccessLevel, Mercury236Codec};
use crate::record::{MetricValue, Metrics};

/// Lifecycle states of a session. `Failed` is absorbing for the handshake
/// steps; a failed read leaves the session `Authenticated` (the caller
/// decides whether to continue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Authenticated,
    Closed,
    Failed,
}

/// One authenticated session over a borrowed codec.
pub struct Session<'a, C: Mercury236Codec> {
    codec: &'a mut C,
    address: u8,
    state: SessionState,
    reached_connected: bool,
}

impl<'a, C: Mercury236Codec> Session<'a, C> {
    pub fn new(codec: &'a mut C, address: u8) -> Self {
        Session {
            codec,
            address,
            state: SessionState::Disconnected,
            reached_connected: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Verifies the device acknowledges its bus address. Any failure here,
    /// timeout included, is classified as a connection error.
    pub async fn connect(&mut self) -> Result<(), MercuryError> {
        if self.state != SessionState::Disconnected {
            return Err(MercuryError::Unexpected(format!(
                "connect called in state {:?}",
                self.state
            )));
        }
        match self.codec.check_connect(self.address).await {
            Ok(()) => {
                self.state = SessionState::Connected;
                self.reached_connected = true;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(match e {
                    MercuryError::Connection(_) => e,
                    other => MercuryError::Connection(format!(
                        "check connect failed: {other}"
                    )),
                })
            }
        }
    }

    /// Opens the communication channel. A missing password falls back to the
    /// access level's vendor default. Any failure is classified as an
    /// authentication error.
    pub async fn authenticate(
        &mut self,
        level: AccessLevel,
        password: Option<&str>,
    ) -> Result<(), MercuryError> {
        if self.state != SessionState::Connected {
            return Err(MercuryError::Unexpected(format!(
                "authenticate called in state {:?}",
                self.state
            )));
        }
        let password = password.unwrap_or_else(|| level.default_password());
        match self.codec.open_channel(self.address, level, password).await {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(match e {
                    MercuryError::Authentication(_) => e,
                    other => MercuryError::Authentication(format!(
                        "open channel failed: {other}"
                    )),
                })
            }
        }
    }

    /// Issues one read operation. A failure does not change the session
    /// state; the channel stays open for further reads or the close.
    pub async fn read(&mut self, op: ReadOp) -> Result<Metrics, MercuryError> {
        if self.state != SessionState::Authenticated {
            return Err(MercuryError::Unexpected(format!(
                "read called in state {:?}",
                self.state
            )));
        }
        match op {
            ReadOp::EnergyTotal(array) => {
                self.codec.read_energy_total(self.address, array).await
            }
            ReadOp::EnergyTariffs(array) => {
                self.codec.read_energy_tariffs(self.address, array).await
            }
            ReadOp::EnergyByPhase => self.codec.read_energy_by_phase(self.address).await,
            ReadOp::EnergyTariffsByPhase => {
                self.codec.read_energy_tariffs_by_phase(self.address).await
            }
            ReadOp::Instrumentation => self.codec.read_instrumentation(self.address).await,
            ReadOp::Frequency => {
                let freq = self.codec.read_frequency(self.address).await?;
                Ok(vec![("freq".to_string(), MetricValue::Float(freq))])
            }
        }
    }

    /// Best-effort close. Attempted whenever the session reached `Connected`
    /// at some point, even after a later failure; a close failure is logged
    /// and never escalated.
    pub async fn close(&mut self) {
        if !self.reached_connected || self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self.codec.close_channel(self.address).await {
            log_warn(&format!(
                "close channel for address {} failed: {e}",
                self.address
            ));
        } else {
            log_debug(&format!("channel closed for address {}", self.address));
        }
        self.state = SessionState::Closed;
    }
}
