use blake2b_simd::{Params, State};
use std::io::{Result as IOResult, Write};

use crate::hashes::marked::{Digest32, MarkedDigestWriter};

/// A blake2b256 digest.
pub type Blake2b256Digest = Digest32;

/// A struct that exposes a Blake2b256 `Write` interface. Zcash uses 16-byte personalization
/// strings to domain-separate every digest, so the writer may be personalized at creation.
///
/// ```
/// # use std::io::{Result};
/// use std::io::Write;
/// use utxo_core::hashes::{Blake2b256Writer, MarkedDigestWriter};
///
/// # fn main() -> Result<()> {
/// let mut w = Blake2b256Writer::personalized(b"ZTxIdHeadersHash");
/// # let data = [0u8; 32];
///
/// // Writing more than once will update the hasher.
/// w.write(&data)?;
///
/// // Call finish to consume the hasher and produce the digest.
/// let digest = w.finish();
/// # Ok(())
/// }
/// ```
pub struct Blake2b256Writer {
    internal: State,
}

impl Blake2b256Writer {
    /// Instantiate a writer with a 16-byte personalization
    pub fn personalized(personal: &[u8; 16]) -> Self {
        Self {
            internal: Params::new().hash_length(32).personal(personal).to_state(),
        }
    }
}

impl Default for Blake2b256Writer {
    fn default() -> Blake2b256Writer {
        Blake2b256Writer {
            internal: Params::new().hash_length(32).to_state(),
        }
    }
}

impl Write for Blake2b256Writer {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IOResult<()> {
        Ok(())
    }
}

impl MarkedDigestWriter for Blake2b256Writer {
    fn finish(self) -> Blake2b256Digest {
        let result = self.internal.finalize();

        let mut digest = Blake2b256Digest::default();
        digest.copy_from_slice(result.as_bytes());
        digest
    }
}

/// Convenience function computing a personalized blake2b256 of a byte slice
pub fn blake2b256(personal: &[u8; 16], data: &[u8]) -> Blake2b256Digest {
    let mut w = Blake2b256Writer::personalized(personal);
    w.internal.update(data);
    w.finish()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_hashes_blake2b256() {
        let mut w = Blake2b256Writer::default();
        w.write_all(&[00, 00]).unwrap();
        let result = w.finish();
        assert_eq!(
            hex::encode(result),
            "9ee6dfb61a2fb903df487c401663825643bb825d41695e63df8af6162ab145a6"
        );
    }

    #[test]
    fn it_personalizes_the_empty_digest() {
        assert_eq!(
            hex::encode(blake2b256(b"ZTxIdSaplingHash", &[])),
            "6f2fc8f98feafd94e74a0df4bed74391ee0b5a69945e4ced8ca8a095206f00ae"
        );
    }
}
