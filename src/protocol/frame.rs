//! # Mercury Frame Codec
//!
//! Byte-level framing shared by both protocol families. Every Mercury frame
//! ends with a CRC16/MODBUS checksum transmitted low byte first; the part in
//! front of it differs per family:
//!
//! - Mercury 206: 4-byte big-endian serial number, command byte, data
//! - Mercury 236: 1-byte bus address, data
//!
//! Responses echo the addressing header, which is verified here so a reply
//! from the wrong device on a shared bus is rejected as malformed data.

use crate::error::MercuryError;
use bytes::{BufMut, BytesMut};
use nom::number::complete::{be_u32, be_u8};
use nom::sequence::tuple;
use nom::IResult;

/// Computes the CRC16/MODBUS checksum (poly 0xA001, init 0xFFFF).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Splits the trailing checksum off a received frame and verifies it.
/// Returns the frame body without the CRC.
pub fn verify_crc(frame: &[u8]) -> Result<&[u8], MercuryError> {
    if frame.len() < 3 {
        return Err(MercuryError::MalformedData(format!(
            "frame too short: {} bytes",
            frame.len()
        )));
    }
    let (body, crc_bytes) = frame.split_at(frame.len() - 2);
    let expected = u16::from_le_bytes([crc_bytes[0], crc_bytes[1]]);
    let calculated = crc16(body);
    if expected != calculated {
        return Err(MercuryError::InvalidChecksum {
            expected,
            calculated,
        });
    }
    Ok(body)
}

/// Packs a Mercury 206 request: serial, command, parameters, CRC.
pub fn pack_206_request(serial: u32, command: u8, params: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(7 + params.len());
    buf.put_u32(serial);
    buf.put_u8(command);
    buf.put_slice(params);
    let crc = crc16(&buf);
    buf.put_u16_le(crc);
    buf.to_vec()
}

fn parse_206_header(input: &[u8]) -> IResult<&[u8], (u32, u8)> {
    tuple((be_u32, be_u8))(input)
}

/// Verifies a Mercury 206 response against the request it answers and
/// returns the data payload.
pub fn parse_206_response<'a>(
    frame: &'a [u8],
    serial: u32,
    command: u8,
) -> Result<&'a [u8], MercuryError> {
    let body = verify_crc(frame)?;
    let (data, (echo_serial, echo_command)) = parse_206_header(body)
        .map_err(|_| MercuryError::MalformedData("truncated response header".to_string()))?;
    if echo_serial != serial {
        return Err(MercuryError::MalformedData(format!(
            "serial echo mismatch: got {echo_serial}, expected {serial}"
        )));
    }
    if echo_command != command {
        return Err(MercuryError::MalformedData(format!(
            "command echo mismatch: got {echo_command:#04X}, expected {command:#04X}"
        )));
    }
    Ok(data)
}

/// Packs a Mercury 236 request: bus address, payload, CRC.
pub fn pack_236_request(address: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(3 + payload.len());
    buf.put_u8(address);
    buf.put_slice(payload);
    let crc = crc16(&buf);
    buf.put_u16_le(crc);
    buf.to_vec()
}

/// Verifies a Mercury 236 response and returns the data payload.
pub fn parse_236_response(frame: &[u8], address: u8) -> Result<&[u8], MercuryError> {
    let body = verify_crc(frame)?;
    let (data, echo_address) = be_u8::<_, nom::error::Error<&[u8]>>(body)
        .map_err(|_| MercuryError::MalformedData("empty response body".to_string()))?;
    if echo_address != address {
        return Err(MercuryError::MalformedData(format!(
            "address echo mismatch: got {echo_address}, expected {address}"
        )));
    }
    Ok(data)
}

/// Extracts the status code from a single-byte Mercury 236 reply.
pub fn status_code(payload: &[u8]) -> Result<u8, MercuryError> {
    match payload {
        [code] => Ok(code & 0x0F),
        _ => Err(MercuryError::MalformedData(format!(
            "expected 1 status byte, got {}",
            payload.len()
        ))),
    }
}

/// Human-readable meaning of a Mercury 236 status code.
pub fn describe_status(code: u8) -> &'static str {
    use crate::constants::*;
    match code {
        M236_STATUS_OK => "OK",
        M236_STATUS_BAD_REQUEST => "invalid request or parameter",
        M236_STATUS_INTERNAL_ERROR => "internal meter error",
        M236_STATUS_ACCESS_DENIED => "access level denied",
        M236_STATUS_CLOCK_CORRECTED => "clock already corrected today",
        M236_STATUS_CHANNEL_CLOSED => "communication channel not open",
        _ => "unknown status",
    }
}

/// Decodes packed BCD bytes into an integer. A nibble above 9 is rejected.
pub fn bcd_to_u64(bytes: &[u8]) -> Result<u64, MercuryError> {
    let mut value: u64 = 0;
    for &byte in bytes {
        let hi = byte >> 4;
        let lo = byte & 0x0F;
        if hi > 9 || lo > 9 {
            return Err(MercuryError::MalformedData(format!(
                "invalid BCD byte {byte:#04X}"
            )));
        }
        value = value * 100 + (hi as u64) * 10 + lo as u64;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_crc16_check_value() {
        // Standard CRC-16/MODBUS check value
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_206_round_trip() {
        let frame = pack_206_request(34197359, 0x63, &[]);
        assert_eq!(frame.len(), 7);
        // A response with the same header and extra data parses back
        let mut response = frame[..5].to_vec();
        response.extend_from_slice(&[0x02, 0x30, 0x00, 0x15, 0x00, 0x13, 0x50]);
        let crc = crc16(&response);
        response.extend_from_slice(&crc.to_le_bytes());

        let data = parse_206_response(&response, 34197359, 0x63).unwrap();
        assert_eq!(data.len(), 7);
        assert_eq!(data[0], 0x02);
    }

    #[test]
    fn test_206_serial_echo_mismatch() {
        let mut response = pack_206_request(1001, 0x27, &[]);
        response.truncate(response.len() - 2);
        let crc = crc16(&response);
        response.extend_from_slice(&crc.to_le_bytes());

        let err = parse_206_response(&response, 1002, 0x27).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn test_corrupted_crc_detected() {
        let mut frame = pack_236_request(101, &[0x00]);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;

        let err = verify_crc(&frame).unwrap_err();
        assert!(matches!(err, MercuryError::InvalidChecksum { .. }));
    }

    #[test]
    fn test_236_round_trip() {
        let frame = pack_236_request(101, &[0x00]);
        let data = parse_236_response(&frame, 101).unwrap();
        assert_eq!(data, &[0x00]);
    }

    #[test]
    fn test_236_address_echo_mismatch() {
        let frame = pack_236_request(102, &[0x00]);
        let err = parse_236_response(&frame, 101).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn test_status_code_extraction() {
        assert_eq!(status_code(&[0x00]).unwrap(), 0);
        assert_eq!(status_code(&[0x03]).unwrap(), 3);
        assert!(status_code(&[]).is_err());
        assert!(status_code(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_bcd_decoding() {
        assert_eq!(bcd_to_u64(&[0x23, 0x01]).unwrap(), 2301);
        assert_eq!(bcd_to_u64(&[0x00]).unwrap(), 0);
        assert_eq!(bcd_to_u64(&[0x99, 0x99]).unwrap(), 9999);
        assert!(bcd_to_u64(&[0x2A]).is_err());
    }
}
