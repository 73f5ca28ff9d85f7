//! # UTXO Core
//!
//! `utxo-core` contains the serialization traits, hash writers and macros shared by the
//! `utxo-tx` and `utxo-psbt` crates.
//!
//! ## Crate Layout
//!
//! ### Hashes
//!
//! The hashes module provides `Write`-based hashers for Bitcoin's double-sha2 and for Zcash's
//! personalized blake2b256, as well as the `MarkedDigest` trait. Marked digests are newtypes
//! intended to be used for a specific purpose. E.g. a `TXID` should never be confused with a
//! signature digest, even though both are 32 bytes.
//!
//! ### ByteFormat trait
//!
//! The `ByteFormat` trait is a simple serialization API using `std::io::{Read, Write}`.
//! Implementers define the binary serialization format of the type. The transaction types must
//! implement `ByteFormat`, as the provided txid and sighash logic assumes access to the
//! `write_to` method.
//!
//! `ByteFormat` has an associated `Error` type. Most basic types can simply use the provided
//! `SerError`. However, more complex (de)serialization will want to implement a custom error type
//! to handle (e.g.) invalid transactions. These types must be easily instantiated from a
//! `SerError` or an `std::io::Error`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(unused_extern_crates)]

#[macro_use]
pub mod macros;

pub mod hashes;
pub mod prelude;
pub mod ser;

#[doc(hidden)]
pub use hex;
