// Length-delimited framing for the control channel.
//
// One frame = 4-byte big-endian length prefix + JSON payload. `write_frame`
// and `read_frame` operate on raw bytes — callers serialize the message
// separately, keeping this module format-agnostic.
//
// `MAX_FRAME_LEN` caps allocation from malformed or hostile length prefixes.
// The largest legitimate frames are `PlayerSessionPage` replies; 1 MB holds
// thousands of player sessions with room to spare.

use std::io::{self, Read, Write};

/// Maximum allowed frame length (1 MB).
pub const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Write one frame: 4-byte big-endian length, then payload.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = payload.len();
    if len > MAX_FRAME_LEN as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame too large: {len} bytes (max {MAX_FRAME_LEN})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes before or during a frame,
/// `InvalidData` if the length prefix exceeds `MAX_FRAME_LEN`.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes (max {MAX_FRAME_LEN})"),
        ));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}
