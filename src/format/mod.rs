//! Binary artifact format for checkpoints and trained models.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header (16 bytes, fixed)                │
//! │   magic "NMFR" · version · kind · size  │
//! ├─────────────────────────────────────────┤
//! │ Payload (bincode)                       │
//! ├─────────────────────────────────────────┤
//! │ CRC32 (4 bytes, over header + payload)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. `load` verifies size, checksum, magic,
//! version and artifact kind before deserializing.

use crate::error::{NmfRecError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic number: "NMFR" in ASCII
pub const MAGIC: [u8; 4] = *b"NMFR";

/// Current format version (1.0)
pub const FORMAT_VERSION: (u8, u8) = (1, 0);

/// Header size in bytes
pub const HEADER_SIZE: usize = 16;

/// Maximum payload size (1GB safety limit)
pub const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024 * 1024;

/// What an artifact contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ArtifactKind {
    /// Completed grid search result
    SearchCheckpoint = 0x0001,
    /// Fitted recommender
    TrainedModel = 0x0002,
}

impl ArtifactKind {
    /// Convert from u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::SearchCheckpoint),
            0x0002 => Some(Self::TrainedModel),
            _ => None,
        }
    }
}

/// Fixed-size artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Format version (major, minor)
    pub version: (u8, u8),
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Payload size in bytes
    pub payload_size: u32,
}

impl Header {
    /// Create a header for the current format version
    #[must_use]
    pub fn new(kind: ArtifactKind, payload_size: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            kind,
            payload_size,
        }
    }

    /// Serialize header to bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&MAGIC);
        bytes[4] = self.version.0;
        bytes[5] = self.version.1;
        bytes[6..8].copy_from_slice(&(self.kind as u16).to_le_bytes());
        bytes[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        // Reserved (12-15) - already zero
        bytes
    }

    /// Parse header from bytes
    ///
    /// # Errors
    ///
    /// Returns an error for a short buffer, wrong magic, newer major
    /// version, unknown kind or oversized payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(bytes) = bytes.get(..HEADER_SIZE) else {
            return Err(NmfRecError::FormatError {
                message: format!(
                    "Header too short: {} bytes, expected {HEADER_SIZE}",
                    bytes.len()
                ),
            });
        };

        if bytes[0..4] != MAGIC {
            return Err(NmfRecError::FormatError {
                message: format!(
                    "Invalid magic number: {:02X}{:02X}{:02X}{:02X}, expected NMFR",
                    bytes[0], bytes[1], bytes[2], bytes[3]
                ),
            });
        }

        let version = (bytes[4], bytes[5]);
        if version.0 > FORMAT_VERSION.0 {
            return Err(NmfRecError::UnsupportedVersion {
                found: version,
                supported: FORMAT_VERSION,
            });
        }

        let kind_raw = u16::from_le_bytes([bytes[6], bytes[7]]);
        let kind = ArtifactKind::from_u16(kind_raw).ok_or_else(|| NmfRecError::FormatError {
            message: format!("Unknown artifact kind: 0x{kind_raw:04X}"),
        })?;

        let payload_size = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        if payload_size > MAX_PAYLOAD_SIZE {
            return Err(NmfRecError::FormatError {
                message: format!("Payload size {payload_size} exceeds maximum {MAX_PAYLOAD_SIZE}"),
            });
        }

        Ok(Self {
            version,
            kind,
            payload_size,
        })
    }
}

/// CRC32 checksum (IEEE polynomial)
fn crc32(data: &[u8]) -> u32 {
    // CRC32 lookup table (IEEE polynomial 0xEDB88320)
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ TABLE[idx];
    }
    !crc
}

/// Encodes `value` as a complete artifact (header, payload, checksum).
///
/// # Errors
///
/// Returns an error if serialization fails or the payload is too large.
pub fn to_bytes<M: Serialize>(value: &M, kind: ArtifactKind) -> Result<Vec<u8>> {
    let payload = bincode::serialize(value)
        .map_err(|e| NmfRecError::Serialization(format!("Failed to serialize {kind:?}: {e}")))?;
    let payload_size = u32::try_from(payload.len())
        .ok()
        .filter(|&size| size <= MAX_PAYLOAD_SIZE)
        .ok_or_else(|| NmfRecError::FormatError {
            message: format!("Payload of {} bytes is too large", payload.len()),
        })?;

    let mut content = Vec::with_capacity(HEADER_SIZE + payload.len() + 4);
    content.extend_from_slice(&Header::new(kind, payload_size).to_bytes());
    content.extend_from_slice(&payload);

    let checksum = crc32(&content);
    content.extend_from_slice(&checksum.to_le_bytes());
    Ok(content)
}

/// Decodes an artifact produced by [`to_bytes`].
///
/// # Errors
///
/// Returns `FormatError`, `ChecksumMismatch`, `UnsupportedVersion` or
/// `Serialization` for malformed or mismatched data.
pub fn from_bytes<M: DeserializeOwned>(content: &[u8], expected: ArtifactKind) -> Result<M> {
    if content.len() < HEADER_SIZE + 4 {
        return Err(NmfRecError::FormatError {
            message: format!("File too small: {} bytes", content.len()),
        });
    }

    // Checksum first: a corrupt header is reported as corruption
    let (body, trailer) = content.split_at(content.len() - 4);
    let stored_checksum = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let computed_checksum = crc32(body);
    if stored_checksum != computed_checksum {
        return Err(NmfRecError::ChecksumMismatch {
            expected: stored_checksum,
            actual: computed_checksum,
        });
    }

    let header = Header::from_bytes(body)?;
    if header.kind != expected {
        return Err(NmfRecError::FormatError {
            message: format!(
                "Artifact kind mismatch: file contains {:?}, expected {expected:?}",
                header.kind
            ),
        });
    }

    let payload = &body[HEADER_SIZE..];
    if payload.len() != header.payload_size as usize {
        return Err(NmfRecError::FormatError {
            message: format!(
                "Payload size mismatch: header says {}, found {}",
                header.payload_size,
                payload.len()
            ),
        });
    }

    bincode::deserialize(payload)
        .map_err(|e| NmfRecError::Serialization(format!("Failed to deserialize {expected:?}: {e}")))
}

/// Saves `value` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns an error on I/O failure or serialization error.
pub fn save<M: Serialize>(value: &M, kind: ArtifactKind, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = to_bytes(value, kind)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&content)?;
    writer.flush()?;

    tracing::debug!(path = %path.display(), kind = ?kind, bytes = content.len(), "artifact saved");
    Ok(())
}

/// Loads a value of the expected kind from `path`.
///
/// # Errors
///
/// Returns an error on I/O failure, format error, or kind mismatch.
pub fn load<M: DeserializeOwned>(path: impl AsRef<Path>, expected: ArtifactKind) -> Result<M> {
    let path = path.as_ref();

    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    tracing::debug!(path = %path.display(), kind = ?expected, bytes = content.len(), "artifact read");
    from_bytes(&content, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Matrix;

    #[test]
    fn test_crc32_known_value() {
        // Standard check value for "123456789"
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_header_layout() {
        let bytes = Header::new(ArtifactKind::TrainedModel, 0x0102_0304).to_bytes();
        assert_eq!(&bytes[0..4], b"NMFR");
        assert_eq!((bytes[4], bytes[5]), FORMAT_VERSION);
        assert_eq!(&bytes[6..8], &[0x02, 0x00]);
        assert_eq!(&bytes[8..12], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[12..16], &[0; 4]);

        let parsed = Header::from_bytes(&bytes).expect("valid header");
        assert_eq!(parsed.kind, ArtifactKind::TrainedModel);
        assert_eq!(parsed.payload_size, 0x0102_0304);
    }

    #[test]
    fn test_header_rejects_bad_magic_and_kind() {
        let mut bytes = Header::new(ArtifactKind::SearchCheckpoint, 0).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(NmfRecError::FormatError { .. })
        ));

        let mut bytes = Header::new(ArtifactKind::SearchCheckpoint, 0).to_bytes();
        bytes[6] = 0x7F;
        let err = Header::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("Unknown artifact kind"));

        assert!(Header::from_bytes(&bytes[..8]).is_err());
    }

    #[test]
    fn test_newer_major_version_rejected() {
        let mut bytes = Header::new(ArtifactKind::SearchCheckpoint, 0).to_bytes();
        bytes[4] = FORMAT_VERSION.0 + 1;
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(NmfRecError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_bytes_round_trip() {
        let m = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).expect("2x2");
        let bytes = to_bytes(&m, ArtifactKind::TrainedModel).expect("encode");
        let back: Matrix<f32> = from_bytes(&bytes, ArtifactKind::TrainedModel).expect("decode");
        assert_eq!(back, m);
    }

    #[test]
    fn test_corruption_detected() {
        let m = Matrix::filled(3, 3, 0.5);
        let mut bytes = to_bytes(&m, ArtifactKind::TrainedModel).expect("encode");
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        assert!(matches!(
            from_bytes::<Matrix<f32>>(&bytes, ArtifactKind::TrainedModel),
            Err(NmfRecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_kind_mismatch_and_truncation() {
        let bytes = to_bytes(&vec![1u32, 2, 3], ArtifactKind::SearchCheckpoint).expect("encode");
        let err = from_bytes::<Vec<u32>>(&bytes, ArtifactKind::TrainedModel).unwrap_err();
        assert!(err.to_string().contains("kind mismatch"));

        assert!(matches!(
            from_bytes::<Vec<u32>>(&bytes[..10], ArtifactKind::SearchCheckpoint),
            Err(NmfRecError::FormatError { .. })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("matrix.pkl");
        let m = Matrix::from_fn(3, 2, |i, j| (i * 2 + j) as f32);

        save(&m, ArtifactKind::TrainedModel, &path).expect("save");
        let back: Matrix<f32> = load(&path, ArtifactKind::TrainedModel).expect("load");
        assert_eq!(back, m);

        let missing = load::<Matrix<f32>>(dir.path().join("absent.pkl"), ArtifactKind::TrainedModel);
        assert!(matches!(missing, Err(NmfRecError::Io(_))));
    }
}
