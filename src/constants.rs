//! Mercury Protocol Constants
//!
//! This module defines constants used by the Mercury 206 and Mercury 236
//! meter protocols, based on the vendor protocol descriptions.

use std::time::Duration;

// ----------------------------------------------------------------------------
// Mercury 206 command codes (4-byte serial address + command + CRC16)
// ----------------------------------------------------------------------------

/// Read voltage, current and active power (7 BCD data bytes: U, I, P)
pub const M206_CMD_READ_VAP: u8 = 0x63;

/// Read network frequency (2 BCD data bytes, 0.01 Hz)
pub const M206_CMD_READ_FREQUENCY: u8 = 0x81;

/// Read tariff energy counters (4 x 4 BCD data bytes, 0.01 kWh)
pub const M206_CMD_READ_ENERGY: u8 = 0x27;

// ----------------------------------------------------------------------------
// Mercury 236 request codes (1-byte bus address + request + CRC16)
// ----------------------------------------------------------------------------

/// Test connection ("check connect" handshake)
pub const M236_REQ_TEST: u8 = 0x00;

/// Open communication channel (access level + 6-byte password)
pub const M236_REQ_OPEN_CHANNEL: u8 = 0x01;

/// Close communication channel
pub const M236_REQ_CLOSE_CHANNEL: u8 = 0x02;

/// Read energy accumulation arrays
pub const M236_REQ_READ_ENERGY: u8 = 0x05;

/// Read auxiliary parameters (instantaneous values)
pub const M236_REQ_READ_AUX: u8 = 0x08;

/// Auxiliary sub-request: instantaneous value selected by a BWRI code
pub const M236_AUX_PARAMS: u8 = 0x11;

// BWRI codes for auxiliary parameter reads. Phase variants are the base
// code plus the zero-based phase index.
pub const M236_BWRI_POWER_SUM: u8 = 0x00;
pub const M236_BWRI_VOLTAGE_PHASE1: u8 = 0x11;
pub const M236_BWRI_CURRENT_PHASE1: u8 = 0x21;
pub const M236_BWRI_FREQUENCY: u8 = 0x40;

/// Energy array number carrying per-phase active energy
pub const M236_ARRAY_BY_PHASE: u8 = 0x06;

/// Number of tariff registers in the energy arrays
pub const TARIFF_COUNT: u8 = 4;

// Mercury 236 status codes returned in single-byte replies
pub const M236_STATUS_OK: u8 = 0x00;
pub const M236_STATUS_BAD_REQUEST: u8 = 0x01;
pub const M236_STATUS_INTERNAL_ERROR: u8 = 0x02;
pub const M236_STATUS_ACCESS_DENIED: u8 = 0x03;
pub const M236_STATUS_CLOCK_CORRECTED: u8 = 0x04;
pub const M236_STATUS_CHANNEL_CLOSED: u8 = 0x05;

// ----------------------------------------------------------------------------
// Addressing and credentials
// ----------------------------------------------------------------------------

/// Highest directly usable Mercury 236 bus address. Serial tails above this
/// collapse to their last two decimal digits.
pub const M236_ADDRESS_LIMIT: u32 = 240;

/// Vendor default password for the User access level (not a secret)
pub const DEFAULT_USER_PASSWORD: &str = "111111";

/// Vendor default password for the Admin access level (not a secret)
pub const DEFAULT_ADMIN_PASSWORD: &str = "222222";

/// Required password length on the wire
pub const PASSWORD_LEN: usize = 6;

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

/// Default TCP port of an RS485-TCP/IP bridge
pub const DEFAULT_BRIDGE_PORT: u16 = 50;

/// Bound on every connect/read operation against the bridge
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single response frame
pub const MAX_RESPONSE_LEN: usize = 256;
