use std::io::Write;

/// A 32-byte digest. Every hash function used by the supported chains produces one of these.
pub type Digest32 = [u8; 32];

/// A marked digest is a newtype around a digest, used to differentiate between digests produced
/// for different purposes (e.g. a txid and a sighash).
pub trait MarkedDigest: Default + Copy + Clone + Eq + PartialEq + std::fmt::Debug {
    /// The underlying digest type
    type Digest: Default + Copy + AsRef<[u8]> + AsMut<[u8]>;

    /// Wrap a digest in the marker
    fn new(hash: Self::Digest) -> Self;

    /// Return a copy of the underlying digest
    fn internal(&self) -> Self::Digest;

    /// Return a clone of the underlying bytes
    fn bytes(&self) -> Vec<u8> {
        self.internal().as_ref().to_vec()
    }

    /// Return a copy of the marked digest with its bytes reversed. Bitcoin-style block explorers
    /// show digests in this order.
    fn reversed(&self) -> Self {
        let mut digest = self.internal();
        digest.as_mut().reverse();
        Self::new(digest)
    }
}

/// An interface for a hasher that accepts writes and produces a 32-byte digest.
pub trait MarkedDigestWriter: Write {
    /// Consume the writer and produce the digest
    fn finish(self) -> Digest32;

    /// Consume the writer and produce a marked digest
    fn finish_marked<M: MarkedDigest<Digest = Digest32>>(self) -> M
    where
        Self: Sized,
    {
        MarkedDigest::new(self.finish())
    }
}
