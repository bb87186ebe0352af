use thiserror::Error;

/// Probe wire size: a single signed 64-bit nanosecond timestamp.
pub const PROBE_LEN: usize = 8;

/// Codec failure on the receive path.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The datagram cannot contain a timestamp; the caller must drop
    /// it without touching any counter.
    #[error("probe too short: {len} bytes, need {PROBE_LEN}")]
    Malformed { len: usize },
}

/// Encode a monotonic send timestamp into `buf`.
///
/// The wire format is exactly 8 bytes: the timestamp, big-endian, at
/// offset 0. Both ends of the probe exchange must use this encoding.
pub fn encode_probe(buf: &mut [u8; PROBE_LEN], send_timestamp_nanos: i64) {
    buf.copy_from_slice(&send_timestamp_nanos.to_be_bytes());
}

/// Decode the send timestamp out of a received datagram.
pub fn decode_probe(buf: &[u8]) -> Result<i64, CodecError> {
    let head: [u8; PROBE_LEN] = buf
        .get(..PROBE_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or(CodecError::Malformed { len: buf.len() })?;
    Ok(i64::from_be_bytes(head))
}
