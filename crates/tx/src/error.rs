//! The transaction error type.

use std::io::Error as IOError;
use thiserror::Error;

use utxo_core::ser::SerError;

/// An Error type for transaction objects
#[derive(Debug, Error)]
pub enum UtxoError {
    /// Serialization-related errors
    #[error(transparent)]
    SerError(#[from] SerError),

    /// IOError bubbled up from a `Write` passed to a `ByteFormat::write_to` implementation.
    #[error(transparent)]
    IOError(#[from] IOError),

    /// The network is unknown, or unsupported at this dispatch point.
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Conflicting or out-of-range arguments, or a missing committed value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The transaction is structurally valid, but carries content this codec refuses to drop
    /// silently (e.g. shielded data).
    #[error("Unsupported transaction: {0}")]
    UnsupportedTransaction(String),

    /// Strict parsing left unaccounted bytes.
    #[error("Trailing data after transaction. Parsed {parsed} of {total} bytes")]
    TrailingData {
        /// Bytes consumed by the parser
        parsed: usize,
        /// Bytes supplied by the caller
        total: usize,
    },

    /// A family-specific code path was reached for a non-matching family. This is a dispatch
    /// defect, not bad input.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Attempted mutation of a field committed to by existing signatures.
    #[error("Mutation would invalidate existing signatures: {0}")]
    SignatureInvalidation(String),

    /// Caller provided an unknown sighash type
    #[error("Unknown Sighash: {0:#04x}")]
    UnknownSighash(u8),

    /// Got an unknown flag where we expected a witness flag.
    #[error("Witness flag not as expected. Got {:?}. Expected {:?}.", .0, [0u8, 1u8])]
    BadWitnessFlag([u8; 2]),

    /// A witness-based hash was requested for a family without segwit.
    #[error("Witness hashing is not supported on {0}")]
    WitnessUnsupported(String),
}

/// Type alias for result with UtxoError
pub type UtxoResult<T> = Result<T, UtxoError>;
