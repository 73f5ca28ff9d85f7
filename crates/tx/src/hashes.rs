//! This module holds `MarkedDigest` types used by UTXO transactions. A signature digest is kept
//! as a marked type as well, so it cannot be confused with a txid.

use utxo_core::mark_32_byte_hash;

mark_32_byte_hash!(
    /// A marked digest representing transaction IDs
    TXID
);
mark_32_byte_hash!(
    /// A marked digest representing witness transaction IDs
    WTXID
);
mark_32_byte_hash!(
    /// A marked digest representing a signature hash. Legacy, BIP143, ZIP243 and ZIP244 digests
    /// all produce one of these.
    SighashDigest
);
