use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{U32 as U32LE, U64 as U64LE};

/// Read 4-byte little-endian integer
pub fn read_int_4(data: &[u8]) -> Result<(u32, &[u8])> {
    if data.len() < 4 {
        return Err(Error::Protocol("unexpected end of frame".to_string()));
    }
    let value = U32LE::ref_from_bytes(&data[..4])
        .map_err(|_| Error::Protocol("misaligned u32 read".to_string()))?
        .get();
    Ok((value, &data[4..]))
}

/// Read 8-byte little-endian integer
pub fn read_int_8(data: &[u8]) -> Result<(u64, &[u8])> {
    if data.len() < 8 {
        return Err(Error::Protocol("unexpected end of frame".to_string()));
    }
    let value = U64LE::ref_from_bytes(&data[..8])
        .map_err(|_| Error::Protocol("misaligned u64 read".to_string()))?
        .get();
    Ok((value, &data[8..]))
}

/// Write 4-byte little-endian integer
pub fn write_int_4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_int_8(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}
