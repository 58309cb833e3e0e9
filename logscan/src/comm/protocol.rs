use std::io::{self, Read, Write};

use crate::errors::{ScanError, ScanResult};

/// Version tag sent by every worker when it connects. The coordinator
/// refuses anything else, so mixed builds fail loudly instead of
/// misreading each other's frames.
pub const PROTOCOL_VERSION: u64 = 1;

/// Upper bound for a single line frame. A length prefix beyond this is
/// treated as a corrupted stream rather than an allocation request.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Environment contract between the coordinator and the worker processes
/// it spawns. A process with `LOGSCAN_RANK` set resolves to the worker
/// role once at startup.
pub const ENV_RANK: &str = "LOGSCAN_RANK";
pub const ENV_WORLD_SIZE: &str = "LOGSCAN_WORLD_SIZE";
pub const ENV_COORDINATOR: &str = "LOGSCAN_COORDINATOR";
pub const ENV_THREADS: &str = "LOGSCAN_THREADS";

/// Writes a scalar as 8 little-endian bytes
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Reads a scalar written by `write_u64`
pub fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Writes a length-prefixed frame: a `u32` little-endian byte count, then
/// exactly that many payload bytes.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> ScanResult<()> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(ScanError::protocol(format!(
            "refusing to send a {} byte frame, cap is {} bytes",
            payload.len(),
            MAX_FRAME_LEN
        )));
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads a frame written by `write_frame`, allocating exactly the
/// announced length.
pub fn read_frame<R: Read>(reader: &mut R) -> ScanResult<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ScanError::protocol(format!(
            "peer announced a {len} byte frame, cap is {MAX_FRAME_LEN} bytes"
        )));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
