//! The sighash type. A one-byte bitfield selecting which parts of the transaction a signature
//! commits to.
//!
//! The low five bits select the base mode (ALL, NONE or SINGLE). `0x80` is ANYONECANPAY. `0x40`
//! requests the fork-id digest on chains that support it, and Bitcoin Gold additionally honors
//! `0x10` for the same purpose.

use std::fmt;

use crate::{
    error::{UtxoError, UtxoResult},
    nets::NetworkFamily,
};

/// A sighash type byte.
#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SighashType(pub u8);

impl SighashType {
    /// Sign ALL inputs and ALL outputs
    pub const ALL: SighashType = SighashType(0x01);
    /// Sign ALL inputs and NO outputs
    pub const NONE: SighashType = SighashType(0x02);
    /// Sign ALL inputs and the output at the signed input's index
    pub const SINGLE: SighashType = SighashType(0x03);
    /// Request the fork-id digest
    pub const FORKID: SighashType = SighashType(0x40);
    /// Sign ONLY the signed input
    pub const ANYONECANPAY: SighashType = SighashType(0x80);
    /// The alternate fork-id request flag honored by Bitcoin Gold
    pub const ALT_FORKID: SighashType = SighashType(0x10);
    /// ALL | FORKID
    pub const ALL_FORKID: SighashType = SighashType(0x41);

    /// The mask of the base mode bits
    pub const BASE_MASK: u8 = 0x1f;

    /// Validate a raw byte for the given family.
    ///
    /// - Fork-id families accept any byte whose base mode is ALL, NONE or SINGLE.
    /// - Bitcoin Gold clears the alternate fork-id flag before checking the base mode.
    /// - Every other family accepts a base mode with an optional ANYONECANPAY flag.
    pub fn from_u8(family: NetworkFamily, byte: u8) -> UtxoResult<SighashType> {
        let sighash = SighashType(byte);
        let base_ok = matches!(sighash.base(), 1..=3);
        let valid = match family {
            NetworkFamily::BitcoinGold => matches!(
                byte & !(Self::FORKID.0 | Self::ALT_FORKID.0 | Self::ANYONECANPAY.0),
                1..=3
            ),
            NetworkFamily::BitcoinCash | NetworkFamily::Ecash | NetworkFamily::BitcoinSv => {
                base_ok
            }
            NetworkFamily::Bitcoin
            | NetworkFamily::Litecoin
            | NetworkFamily::Dogecoin
            | NetworkFamily::Dash
            | NetworkFamily::Zcash => base_ok && byte & !(Self::ANYONECANPAY.0 | 0x03) == 0,
        };
        if valid {
            Ok(sighash)
        } else {
            Err(UtxoError::UnknownSighash(byte))
        }
    }

    /// The raw byte
    pub fn to_u8(self) -> u8 {
        self.0
    }

    /// The base mode. 1 is ALL, 2 is NONE, 3 is SINGLE.
    pub fn base(self) -> u8 {
        self.0 & Self::BASE_MASK
    }

    /// True if the ANYONECANPAY flag is set
    pub fn anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONECANPAY.0 != 0
    }

    /// True if the standard fork-id flag is set
    pub fn has_fork_id(self) -> bool {
        self.0 & Self::FORKID.0 != 0
    }

    /// True if the alternate fork-id flag is set
    pub fn has_alt_fork_id(self) -> bool {
        self.0 & Self::ALT_FORKID.0 != 0
    }

    /// True if the base mode is NONE
    pub fn is_none(self) -> bool {
        self.base() == Self::NONE.0
    }

    /// True if the base mode is SINGLE
    pub fn is_single(self) -> bool {
        self.base() == Self::SINGLE.0
    }
}

impl Default for SighashType {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Debug for SighashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SighashType({:#04x})", self.0)
    }
}

impl From<SighashType> for u8 {
    fn from(s: SighashType) -> u8 {
        s.0
    }
}
