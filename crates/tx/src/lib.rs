//! # UTXO Tx
//!
//! `utxo-tx` parses and serializes transactions for Bitcoin and its forked chains, and computes
//! the signature digest a signer must produce for each of them.
//!
//! ## Crate Layout
//!
//! - `nets` identifies networks and holds their protocol constants.
//! - `tx` and `types` hold the transaction model. Family-specific fields live in an `Extension`.
//! - `legacy` and `witness` implement the Bitcoin wire format and the legacy and BIP143 digests.
//! - `forkid` adds fork-id digests for Bitcoin Cash, eCash, Bitcoin SV and Bitcoin Gold.
//! - `dash` and `zcash` implement the Dash and Zcash codecs and digests.
//! - `dispatch` selects the codec by network family. Its functions are the main entry points.
//! - `builder` constructs transactions for any network.
//! - `amount` converts between `u64` and `ethnum::U256` output values.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

pub mod amount;
pub mod builder;
pub mod dash;
pub mod dispatch;
pub mod error;
pub mod forkid;
pub mod hashes;
pub mod legacy;
pub mod nets;
pub mod prelude;
pub mod tx;
pub mod types;
pub mod witness;
pub mod zcash;

pub use builder::*;
pub use dispatch::*;
pub use error::*;
pub use nets::*;
pub use tx::*;
