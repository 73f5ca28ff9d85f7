//! # UTXO PSBT
//!
//! BIP174 Partially Signed Transactions for every network `utxo-tx` supports.
//!
//! The unsigned transaction is decoded with its network's codec, so Dash payloads and Zcash
//! envelope fields round-trip. Fields a serialized transaction cannot express travel in BIP174
//! proprietary keys. The Zcash consensus branch id of a v4 transaction is the one such field.
//!
//! ```
//! use utxo_psbt::prelude::*;
//!
//! let mut psbt = new_psbt(Network::Zcash, &BuildOptions::default()).unwrap();
//! let bytes = serialize_psbt(&mut psbt).unwrap();
//! let parsed = parse_psbt(&bytes, Network::Zcash, &ParseOptions::default()).unwrap();
//! assert_eq!(parsed, psbt);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

#[macro_use]
mod macros;

/// Common data structures
pub mod common;
pub mod dispatch;
/// Global KV store
pub mod global;
/// Per-Input KV store
pub mod input;
/// Per-Output KV store
pub mod output;
pub mod prelude;
pub mod proprietary;
pub mod psbt;
/// BIP174 schema validation functions
pub mod schema;
pub mod zcash;

pub use common::*;
pub use dispatch::*;
pub use psbt::*;
pub use zcash::ZcashPsbt;
