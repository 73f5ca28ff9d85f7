//! Re-exports of common traits.
pub use crate::{
    hashes::{Digest32, Hash256Digest, MarkedDigest, MarkedDigestWriter},
    ser::{ByteFormat, SerError, SerResult},
};
