use sha2::{Digest, Sha256};
use std::io::{Result as IOResult, Write};

use crate::hashes::marked::{Digest32, MarkedDigestWriter};

/// A Bitcoin-style double-sha256 digest.
pub type Hash256Digest = Digest32;

/// A struct that exposes a Bitcoin-style Hash256 `Write` interface by wrapping an internal SHA2
/// instance.
///
/// ```
/// # use std::io::{Result};
/// use std::io::Write;
/// use utxo_core::hashes::{Hash256Writer, MarkedDigestWriter};
///
/// # fn main() -> Result<()> {
/// let mut w = Hash256Writer::default();
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
#[derive(Default)]
pub struct Hash256Writer {
    internal: Sha256,
}

impl Write for Hash256Writer {
    fn write(&mut self, buf: &[u8]) -> IOResult<usize> {
        self.internal.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> IOResult<()> {
        Ok(())
    }
}

impl MarkedDigestWriter for Hash256Writer {
    fn finish(self) -> Hash256Digest {
        let first = self.internal.finalize();
        let second = Sha256::digest(first);
        let mut digest = Hash256Digest::default();
        digest.copy_from_slice(&second[..]);
        digest
    }
}

/// Convenience function computing the double-sha256 of a byte slice
pub fn hash256(data: &[u8]) -> Hash256Digest {
    let mut w = Hash256Writer::default();
    w.internal.update(data);
    w.finish()
}
