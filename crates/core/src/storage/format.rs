use crate::errors::CoreError;

/// Magic bytes identifying an IVST (Invest Tracker) snapshot file.
pub const MAGIC: &[u8; 4] = b"IVST";

/// Current snapshot format version. Bumped whenever the serialized record
/// shape changes incompatibly; `read_file` hands the stored version back so
/// the decode site can migrate older payloads in one place.
pub const CURRENT_VERSION: u16 = 1;

/// Minimum header size in bytes: magic(4) + version(2) + payload_len(8) = 14
pub const MIN_HEADER_SIZE: usize = 14;

/// Write a complete snapshot file to bytes.
///
/// Layout:
/// ```text
/// [IVST: 4B] [version: 2B LE] [payload_len: 8B LE] [payload: variable]
/// ```
pub fn write_file(version: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MIN_HEADER_SIZE + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Parse the header from raw file bytes.
/// Returns the stored version and the payload slice.
pub fn read_file(data: &[u8]) -> Result<(u16, &[u8]), CoreError> {
    if data.len() < MIN_HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be a valid IVST snapshot".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes, not an IVST snapshot".into(),
        ));
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let payload_len = u64::from_le_bytes(
        data[6..14]
            .try_into()
            .map_err(|_| CoreError::InvalidFileFormat("Failed to read payload length".into()))?,
    );

    // Compare against the available bytes in u64 before any index
    // arithmetic: a corrupt header can declare a length near u64::MAX.
    let available = (data.len() - MIN_HEADER_SIZE) as u64;
    if payload_len > available {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {payload_len} bytes of payload, got {available}"
        )));
    }

    let expected_end = MIN_HEADER_SIZE + payload_len as usize;
    Ok((version, &data[MIN_HEADER_SIZE..expected_end]))
}
