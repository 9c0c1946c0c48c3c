//! # Device Addressing
//!
//! Maps a raw meter serial number to the address used on the bus. The rule
//! depends on the protocol family and is applied per device.

use crate::constants::M236_ADDRESS_LIMIT;

/// The two supported Mercury protocol families. Fixed for a whole polling
/// run, not per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    /// Mercury 206: unauthenticated, addressed directly by serial number.
    Simple,
    /// Mercury 236: open-channel handshake with access level and password.
    Authenticated,
}

/// Resolves the bus address for a device. Pure and total.
///
/// For the Simple family the address is the serial number itself. For the
/// Authenticated family the address is derived from the last three decimal
/// digits of the serial: an all-zero tail defaults to address 1, and tails
/// above 240 collapse to their last two digits. The collapsed value may
/// itself be 0; the vendor rule does not re-map that case to 1, and neither
/// do we.
pub fn resolve_address(serial: u32, family: ProtocolFamily) -> u32 {
    match family {
        ProtocolFamily::Simple => serial,
        ProtocolFamily::Authenticated => {
            let tail = serial % 1000;
            if tail == 0 {
                1
            } else if tail > M236_ADDRESS_LIMIT {
                tail % 100
            } else {
                tail
            }
        }
    }
}
