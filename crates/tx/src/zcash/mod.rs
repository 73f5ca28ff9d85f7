//! Zcash and Zcash-derived chains.
//!
//! The codec supports the transparent subset of transaction versions 1 through 5. Shielded
//! bundles must be empty. Transactions carrying join-splits, Sapling spends or outputs, a nonzero
//! value balance or Orchard actions are refused with `UnsupportedTransaction`.
//!
//! Signature digests follow the version: the legacy digest before Overwinter, ZIP143/ZIP243 for
//! v3 and v4, and ZIP244 for v5.

pub mod codec;
pub mod consensus;
pub mod zip243;
pub mod zip244;

pub use codec::ZcashCodec;
pub use consensus::*;

/// Build a 16-byte personalization from a 12-byte tag and a consensus branch id
pub(crate) fn branch_personalization(tag: &[u8; 12], branch_id: u32) -> [u8; 16] {
    let mut personal = [0u8; 16];
    personal[..12].copy_from_slice(tag);
    personal[12..].copy_from_slice(&branch_id.to_le_bytes());
    personal
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_appends_branch_ids_to_personalizations() {
        let personal = branch_personalization(b"ZcashSigHash", SAPLING_BRANCH_ID);
        assert_eq!(&personal[..12], b"ZcashSigHash");
        assert_eq!(&personal[12..], &[0xbb, 0x09, 0xb8, 0x76]);
    }
}
