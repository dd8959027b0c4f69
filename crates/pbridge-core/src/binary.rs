//! Binary serialization for resolved pools.
//!
//! Layout: a 16-byte header followed by a postcard payload.
//! - 0-3: magic `PBDP`
//! - 4-7: format version (LE)
//! - 8-11: CRC32 of the payload (LE)
//! - 12-15: payload length in bytes (LE)

use crate::error::PoolError;
use crate::pool::DescriptorPool;

pub const BINARY_MAGIC: [u8; 4] = *b"PBDP";
pub const BINARY_VERSION: u32 = 1;
pub const BINARY_HEADER_SIZE: usize = 16;

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl DescriptorPool {
    /// Deserialize a pool from binary format.
    ///
    /// The decoded pool is checked for internal consistency before it is
    /// returned.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, PoolError> {
        if bytes.len() < BINARY_HEADER_SIZE {
            return Err(PoolError::Truncated {
                expected: BINARY_HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[0..4] != BINARY_MAGIC {
            return Err(PoolError::InvalidMagic);
        }

        let version = read_u32(bytes, 4);
        if version != BINARY_VERSION {
            return Err(PoolError::UnsupportedVersion(version));
        }

        let checksum = read_u32(bytes, 8);
        let len = read_u32(bytes, 12) as usize;
        let payload = &bytes[BINARY_HEADER_SIZE..];
        if payload.len() < len {
            return Err(PoolError::Truncated {
                expected: BINARY_HEADER_SIZE + len,
                actual: bytes.len(),
            });
        }
        let payload = &payload[..len];

        let actual = crc32fast::hash(payload);
        if actual != checksum {
            return Err(PoolError::ChecksumMismatch {
                expected: checksum,
                actual,
            });
        }

        let pool: Self = postcard::from_bytes(payload).map_err(PoolError::Binary)?;
        pool.validate()?;
        Ok(pool)
    }

    /// Serialize the pool to binary format.
    pub fn to_binary(&self) -> Vec<u8> {
        let payload = postcard::to_allocvec(self).expect("serialization should not fail");

        let mut out = Vec::with_capacity(BINARY_HEADER_SIZE + payload.len());
        out.extend_from_slice(&BINARY_MAGIC);
        out.extend_from_slice(&BINARY_VERSION.to_le_bytes());
        out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }
}
