//! Output values. A transaction uses a single value representation for all of its outputs:
//! either `u64` or the arbitrary-precision `U256`.

use ethnum::U256;
use std::fmt::Debug;

use crate::error::{UtxoError, UtxoResult};

/// A numeric output value representation.
pub trait Amount: Copy + Clone + Debug + Default + Eq + PartialEq + Send + Sync + 'static {
    /// A short name for error messages
    const NAME: &'static str;

    /// Convert from a `u64`. Never fails.
    fn from_u64(value: u64) -> Self;

    /// Convert from a `U256`. Fails if the value does not fit.
    fn from_u256(value: U256) -> UtxoResult<Self>;

    /// Parse a base-10 string.
    fn from_decimal(s: &str) -> UtxoResult<Self>;

    /// The value as a `u64`, if it fits losslessly.
    fn to_u64(&self) -> Option<u64>;

    /// The value as a `U256`.
    fn to_u256(&self) -> U256;

    /// The value as a `u64`, or an `InvalidArgument` error. The wire format stores 8 bytes.
    fn as_wire_value(&self) -> UtxoResult<u64> {
        self.to_u64().ok_or_else(|| {
            UtxoError::InvalidArgument(format!("value {:?} does not fit in 8 bytes", self))
        })
    }
}

impl Amount for u64 {
    const NAME: &'static str = "u64";

    fn from_u64(value: u64) -> Self {
        value
    }

    fn from_u256(value: U256) -> UtxoResult<Self> {
        if value > U256::from(u64::MAX) {
            return Err(UtxoError::InvalidArgument(format!(
                "value {} is not a safe u64",
                value
            )));
        }
        Ok(value.as_u64())
    }

    fn from_decimal(s: &str) -> UtxoResult<Self> {
        s.parse::<u64>()
            .map_err(|e| UtxoError::InvalidArgument(format!("cannot parse {:?} as u64: {}", s, e)))
    }

    fn to_u64(&self) -> Option<u64> {
        Some(*self)
    }

    fn to_u256(&self) -> U256 {
        U256::from(*self)
    }
}

impl Amount for U256 {
    const NAME: &'static str = "U256";

    fn from_u64(value: u64) -> Self {
        U256::from(value)
    }

    fn from_u256(value: U256) -> UtxoResult<Self> {
        Ok(value)
    }

    fn from_decimal(s: &str) -> UtxoResult<Self> {
        U256::from_str_radix(s, 10)
            .map_err(|e| UtxoError::InvalidArgument(format!("cannot parse {:?} as U256: {}", s, e)))
    }

    fn to_u64(&self) -> Option<u64> {
        if *self > U256::from(u64::MAX) {
            None
        } else {
            Some(self.as_u64())
        }
    }

    fn to_u256(&self) -> U256 {
        *self
    }
}

/// An untyped value supplied by a caller, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountInput<'a> {
    /// A fixed-width integer
    U64(u64),
    /// An arbitrary-precision integer
    BigInt(U256),
    /// A base-10 numeric string
    Decimal(&'a str),
}

impl From<u64> for AmountInput<'_> {
    fn from(v: u64) -> Self {
        AmountInput::U64(v)
    }
}

impl From<U256> for AmountInput<'_> {
    fn from(v: U256) -> Self {
        AmountInput::BigInt(v)
    }
}

impl<'a> From<&'a str> for AmountInput<'a> {
    fn from(v: &'a str) -> Self {
        AmountInput::Decimal(v)
    }
}

/// Normalize a caller-supplied value to the requested representation.
///
/// ## Errors
///
/// - `InvalidArgument` if the value is absent.
/// - `InvalidArgument` if the value cannot be represented losslessly as `V`.
pub fn to_amount<V: Amount>(input: Option<AmountInput<'_>>) -> UtxoResult<V> {
    match input {
        None => Err(UtxoError::InvalidArgument(format!(
            "expected a value for conversion to {}",
            V::NAME
        ))),
        Some(AmountInput::U64(v)) => Ok(V::from_u64(v)),
        Some(AmountInput::BigInt(v)) => V::from_u256(v),
        Some(AmountInput::Decimal(s)) => V::from_decimal(s),
    }
}

/// Convert between two representations.
pub fn convert_amount<V: Amount, W: Amount>(value: V) -> UtxoResult<W> {
    W::from_u256(value.to_u256())
}
