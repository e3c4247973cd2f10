use crate::error::{Error, Result};
use crate::protocol::primitive::*;

/// Both directions frame their JSON payload the same way:
///
/// ```text
/// 8   query token (little-endian u64)
/// 4   payload length (little-endian u32)
/// n   payload (UTF-8 JSON)
/// ```
pub const FRAME_HEADER_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub token: u64,
    pub payload_len: u32,
}

/// Parse the 12-byte frame header.
pub fn read_frame_header(data: &[u8]) -> Result<FrameHeader> {
    let (token, rest) = read_int_8(data)?;
    let (payload_len, _rest) = read_int_4(rest)?;
    Ok(FrameHeader { token, payload_len })
}

/// Append a complete query frame for `token` to `out`.
pub fn write_frame(out: &mut Vec<u8>, token: u64, payload: &[u8]) -> Result<()> {
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| Error::Protocol(format!("query payload too large: {} bytes", payload.len())))?;
    out.reserve(FRAME_HEADER_LEN + payload.len());
    write_int_8(out, token);
    write_int_4(out, payload_len);
    out.extend_from_slice(payload);
    Ok(())
}
