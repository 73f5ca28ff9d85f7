//! BIP174 proprietary keys.
//!
//! A proprietary key is `0xfc || compact(len(identifier)) || identifier || compact(subtype) ||
//! key_data`. The value is opaque to BIP174. Chain-specific fields that a PSBT cannot otherwise
//! express are carried under the `BITGO` identifier, e.g. the Zcash consensus branch id, which a
//! v4 transaction does not serialize.

use std::convert::TryFrom;

use utxo_core::ser::{read_compact_int, write_compact_int};

use crate::common::{PsbtError, PsbtKey, PsbtResult, PsbtValue, PROPRIETARY_KEY_TYPE};

/// The identifier of the proprietary keys this crate reads and writes
pub const BITGO: &[u8] = b"BITGO";

/// Subtypes under the `BITGO` identifier
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProprietaryKeySubtype {
    /// The 4-byte LE consensus branch id of a Zcash transaction. Global map.
    ZecConsensusBranchId = 0x00,
}

impl TryFrom<u8> for ProprietaryKeySubtype {
    type Error = PsbtError;

    fn try_from(subtype: u8) -> PsbtResult<Self> {
        match subtype {
            0x00 => Ok(ProprietaryKeySubtype::ZecConsensusBranchId),
            _ => Err(PsbtError::InvalidPsbt(format!(
                "unknown proprietary subtype {:#04x}",
                subtype
            ))),
        }
    }
}

/// A parsed proprietary key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProprietaryKey {
    /// The identifier of the key's owner
    pub identifier: Vec<u8>,
    /// The owner-defined subtype
    pub subtype: u8,
    /// Any trailing key data
    pub key_data: Vec<u8>,
}

impl ProprietaryKey {
    /// A `BITGO` key with no key data
    pub fn bitgo(subtype: ProprietaryKeySubtype) -> Self {
        Self {
            identifier: BITGO.to_vec(),
            subtype: subtype as u8,
            key_data: vec![],
        }
    }

    /// True if the key belongs to the `BITGO` identifier
    pub fn is_bitgo(&self) -> bool {
        self.identifier == BITGO
    }

    /// The typed subtype of a `BITGO` key, if known
    pub fn bitgo_subtype(&self) -> Option<ProprietaryKeySubtype> {
        if self.is_bitgo() {
            ProprietaryKeySubtype::try_from(self.subtype).ok()
        } else {
            None
        }
    }

    /// Serialize the key, including its `0xfc` type byte
    pub fn to_key(&self) -> PsbtResult<PsbtKey> {
        let mut key = vec![PROPRIETARY_KEY_TYPE];
        write_compact_int(&mut key, self.identifier.len() as u64)?;
        key.extend_from_slice(&self.identifier);
        write_compact_int(&mut key, self.subtype as u64)?;
        key.extend_from_slice(&self.key_data);
        Ok(key.into())
    }

    /// Parse a PSBT key as a proprietary key
    ///
    /// ## Errors
    ///
    /// - `WrongKeyType` if the key type is not `0xfc`.
    /// - `SerError` if the identifier or subtype is truncated.
    pub fn from_key(key: &PsbtKey) -> PsbtResult<Self> {
        if key.key_type() != PROPRIETARY_KEY_TYPE {
            return Err(PsbtError::WrongKeyType {
                expected: PROPRIETARY_KEY_TYPE,
                got: key.key_type(),
            });
        }
        let mut rest = &key.items()[1..];
        let id_len = read_compact_int(&mut rest)? as usize;
        if rest.len() < id_len {
            return Err(PsbtError::WrongKeyLength {
                expected: key.len() - rest.len() + id_len + 1,
                got: key.len(),
            });
        }
        let identifier = rest[..id_len].to_vec();
        rest = &rest[id_len..];
        let subtype = read_compact_int(&mut rest)?;
        let subtype = u8::try_from(subtype).map_err(|_| {
            PsbtError::InvalidPsbt(format!("proprietary subtype {} out of range", subtype))
        })?;
        Ok(Self {
            identifier,
            subtype,
            key_data: rest.to_vec(),
        })
    }
}

/// Read a 4-byte little-endian `u32` value
pub fn try_val_as_u32(val: &PsbtValue) -> PsbtResult<u32> {
    if val.len() != 4 {
        return Err(PsbtError::WrongValueLength {
            expected: 4,
            got: val.len(),
        });
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(val.items());
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_encodes_bitgo_keys() {
        let key = ProprietaryKey::bitgo(ProprietaryKeySubtype::ZecConsensusBranchId)
            .to_key()
            .unwrap();
        assert_eq!(hex::encode(key.items()), "fc05424954474f00");

        let parsed = ProprietaryKey::from_key(&key).unwrap();
        assert!(parsed.is_bitgo());
        assert_eq!(
            parsed.bitgo_subtype(),
            Some(ProprietaryKeySubtype::ZecConsensusBranchId)
        );
        assert!(parsed.key_data.is_empty());
    }

    #[test]
    fn it_keeps_key_data_and_foreign_identifiers() {
        let key = PsbtKey::new(hex::decode("fc03616263070102").unwrap());
        let parsed = ProprietaryKey::from_key(&key).unwrap();
        assert_eq!(parsed.identifier, b"abc".to_vec());
        assert_eq!(parsed.subtype, 7);
        assert_eq!(parsed.key_data, vec![1, 2]);
        assert!(!parsed.is_bitgo());
        assert_eq!(parsed.bitgo_subtype(), None);
        assert_eq!(parsed.to_key().unwrap(), key);
    }

    #[test]
    fn it_rejects_malformed_keys() {
        assert!(matches!(
            ProprietaryKey::from_key(&PsbtKey::new(vec![0x02, 0x05])),
            Err(PsbtError::WrongKeyType { expected: 0xfc, got: 0x02 })
        ));
        assert!(matches!(
            ProprietaryKey::from_key(&PsbtKey::new(hex::decode("fc0542495447").unwrap())),
            Err(PsbtError::WrongKeyLength { .. })
        ));
    }

    #[test]
    fn it_reads_u32_values() {
        assert_eq!(try_val_as_u32(&vec![0xb4, 0xd0, 0xd6, 0xc2].into()).unwrap(), 0xc2d6_d0b4);
        assert!(matches!(
            try_val_as_u32(&vec![1, 2, 3].into()),
            Err(PsbtError::WrongValueLength { expected: 4, got: 3 })
        ));
    }
}
