use std::{collections::btree_map, io::Error as IOError, ops::RangeBounds};

use thiserror::Error;

use utxo_core::{ser::SerError, wrap_prefixed_byte_vector};
use utxo_tx::{Network, UtxoError};

use crate::{proprietary::ProprietaryKey, schema};

/// An Error type for PSBT objects
#[derive(Debug, Error)]
pub enum PsbtError {
    /// Serialization-related errors
    #[error(transparent)]
    SerError(#[from] SerError),

    /// IOError bubbled up from a `Write` passed to a `ByteFormat::write_to` implementation.
    #[error(transparent)]
    IOError(#[from] IOError),

    /// Bubbled up from the transaction codecs. Also carries `SignatureInvalidation` from guarded
    /// setters.
    #[error(transparent)]
    UtxoError(#[from] UtxoError),

    /// Returned by convenience functions that attempt to read a non-existant key
    #[error("Attempted to get missing singleton key {0:#04x}")]
    MissingKey(u8),

    /// Returned when attempting to deserialize an invalid PSBT with duplicate keys
    #[error("Attempted to deserialize PSBT with duplicate key {0:?}")]
    DuplicateKey(PsbtKey),

    /// PSBT Prefix does not match the expected value
    #[error("Bad PSBT Prefix. Expected psbt with 0xff separator.")]
    BadPrefix,

    /// The PSBT is well-formed but its contents contradict each other
    #[error("Invalid PSBT: {0}")]
    InvalidPsbt(String),

    /// The tx contained a non-empty scriptsig.
    #[error("PSBT tx contains non-empty scriptsig.")]
    ScriptSigInTx,

    /// Returned from schema validation when the key size is unexpected
    #[error("Key failed validation. Wrong length. Expected {expected} bytes. Got {got} bytes")]
    WrongKeyLength {
        /// The expected key length
        expected: usize,
        /// The actual key length
        got: usize,
    },

    /// Returned from schema validation when the value size is unexpected
    #[error("Value failed validation. Wrong length. Expected {expected} bytes. Got {got} bytes")]
    WrongValueLength {
        /// The expected value length
        expected: usize,
        /// The actual value length
        got: usize,
    },

    /// Returned from schema validation when the key type is unexpected
    #[error("Key failed validation. Wrong type. Expected {expected}. Got {got}")]
    WrongKeyType {
        /// The expected key type
        expected: u8,
        /// The actual key type
        got: u8,
    },

    /// Returned when a serialized bip32 derivation is invalid.
    #[error("Invalid bip32 derivation.")]
    InvalidBip32Path,

    /// Returned when a PSBT_GLOBAL_XPUB's stated depth does not match its provided derivation path.
    #[error("Master pubkey depth did not match derivation path elements")]
    Bip32DepthMismatch,

    /// Returned when a PSBT's `Input` map vec length doesn't match its transaction's vin length
    #[error("Vin length mismatch. Tx has {tx_ins} inputs. PSBT has {maps} input maps")]
    VinLengthMismatch {
        /// The number of inputs in the transaction.
        tx_ins: usize,
        /// The number of input maps in the PSBT
        maps: usize,
    },

    /// Returned when a PSBT's `Output` map vec length doesn't match its transaction's vout length
    #[error("Vout length mismatch. Tx has {tx_outs} outputs. PSBT has {maps} output maps")]
    VoutLengthMismatch {
        /// The number of outputs in the transaction.
        tx_outs: usize,
        /// The number of output maps in the PSBT
        maps: usize,
    },

    /// Attempted to extract a tx when at least 1 index is unfinalized. Contains the index of the
    /// first unfinalized input
    #[error("Can't extract Tx. Input {0} is not finalized.")]
    UnfinalizedInput(usize),

    /// Missing info for some processing step
    #[error("Missing required info: {0}")]
    MissingInfo(String),
}

/// Type alias for result with PsbtError
pub type PsbtResult<T> = Result<T, PsbtError>;

wrap_prefixed_byte_vector!(
    /// A PSBT Key. The first byte is the key type, the rest is key data.
    PsbtKey
);

wrap_prefixed_byte_vector!(
    /// A PSBT Value
    PsbtValue
);

impl PsbtKey {
    /// The BIP174 type of the key (its first byte)
    pub fn key_type(&self) -> u8 {
        if self.is_empty() {
            0
        } else {
            self[0]
        }
    }
}

/// The BIP174 key type reserved for proprietary use in every map
pub const PROPRIETARY_KEY_TYPE: u8 = 0xfc;

/// Common methods for our Global, Input, and Output maps
pub trait PstMap {
    /// Returns a reference to the value corresponding to the key.
    fn get(&self, key: &PsbtKey) -> Option<&PsbtValue>;

    /// Returns true if the map contains a value for the specified key.
    fn contains_key(&self, key: &PsbtKey) -> bool;

    /// Return an iterator of the keys of the map
    fn keys(&self) -> btree_map::Keys<'_, PsbtKey, PsbtValue>;

    /// Remove a key from the map
    fn remove(&mut self, key: &PsbtKey) -> Option<PsbtValue>;

    /// Returns a range object over the specified range bounds.
    fn range<R>(&self, range: R) -> btree_map::Range<'_, PsbtKey, PsbtValue>
    where
        R: RangeBounds<PsbtKey>;

    /// Returns a mutable reference to the value corresponding to the key.
    fn get_mut(&mut self, key: &PsbtKey) -> Option<&mut PsbtValue>;

    /// Gets an iterator over the entries of the map, sorted by key.
    fn iter(&self) -> btree_map::Iter<'_, PsbtKey, PsbtValue>;

    /// Gets a mutable iterator over the entries of the map, sorted by key
    fn iter_mut(&mut self) -> btree_map::IterMut<'_, PsbtKey, PsbtValue>;

    /// Insert a key into the map. Return the previous value if any
    fn insert(&mut self, key: PsbtKey, value: PsbtValue) -> Option<PsbtValue>;

    /// The number of entries in the map
    fn len(&self) -> usize;

    /// True if the map has no entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a range of KV pairs whose key type is `key_type`
    fn range_by_key_type(&self, key_type: u8) -> btree_map::Range<'_, PsbtKey, PsbtValue> {
        let start: PsbtKey = vec![key_type].into();
        match key_type.checked_add(1) {
            Some(next) => {
                let end: PsbtKey = vec![next].into();
                self.range(start..end)
            }
            None => self.range(start..),
        }
    }

    /// Return the value or a MissingKey error
    fn must_get(&self, key: &PsbtKey) -> PsbtResult<&PsbtValue> {
        self.get(key)
            .ok_or_else(|| PsbtError::MissingKey(key.key_type()))
    }

    /// Return a range containing any proprietary KV pairs
    fn proprietary(&self) -> btree_map::Range<'_, PsbtKey, PsbtValue> {
        self.range_by_key_type(PROPRIETARY_KEY_TYPE)
    }

    /// Return the parsed proprietary keys and their values. Malformed proprietary keys are
    /// skipped.
    fn proprietary_entries(&self) -> Vec<(ProprietaryKey, &PsbtValue)> {
        self.proprietary()
            .filter_map(|(k, v)| ProprietaryKey::from_key(k).ok().map(|pk| (pk, v)))
            .collect()
    }

    /// Get the value stored under a proprietary key
    fn get_proprietary(&self, key: &ProprietaryKey) -> PsbtResult<Option<&PsbtValue>> {
        Ok(self.get(&key.to_key()?))
    }

    /// Insert a value under a proprietary key. Return the previous value if any
    fn insert_proprietary(
        &mut self,
        key: &ProprietaryKey,
        value: PsbtValue,
    ) -> PsbtResult<Option<PsbtValue>> {
        Ok(self.insert(key.to_key()?, value))
    }

    /// Remove a proprietary key from the map
    fn remove_proprietary(&mut self, key: &ProprietaryKey) -> PsbtResult<Option<PsbtValue>> {
        Ok(self.remove(&key.to_key()?))
    }
}

/// Common methods for validating our PSBT maps
pub trait PsbtValidate: PstMap {
    /// Return a standard BIP174 KV-pair validation schema. Predicates that decode transactions
    /// or sighash flags do so for `network`.
    fn standard_schema(network: Network) -> schema::KvTypeSchema;

    /// Check for consistency across multiple KV pairs
    fn consistency_checks(&self) -> PsbtResult<()>;

    /// Validate every KV pair whose key type has a predicate in the schema
    fn validate_schema(&self, schema: schema::KvTypeSchema) -> PsbtResult<()> {
        let mut key_types: Vec<&u8> = schema.0.keys().collect();
        key_types.sort();
        for key_type in key_types {
            for (k, v) in self.range_by_key_type(*key_type) {
                schema.0[key_type](k, v)?;
            }
        }
        Ok(())
    }

    /// Run standard validation on the map, then its consistency checks
    fn validate(&self, network: Network) -> PsbtResult<()> {
        self.validate_schema(Self::standard_schema(network))?;
        self.consistency_checks()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::input::PsbtInput;

    #[test]
    fn it_ranges_by_key_type() {
        let mut map = PsbtInput::default();
        map.insert(vec![2, 0xaa].into(), vec![1].into());
        map.insert(vec![2, 0xbb].into(), vec![2].into());
        map.insert(vec![3].into(), vec![3].into());
        map.insert(vec![0xff, 1].into(), vec![4].into());

        assert_eq!(map.range_by_key_type(2).count(), 2);
        assert_eq!(map.range_by_key_type(3).count(), 1);
        assert_eq!(map.range_by_key_type(0xff).count(), 1);
        assert_eq!(map.range_by_key_type(4).count(), 0);
    }

    #[test]
    fn it_stores_values_under_proprietary_keys() {
        use crate::proprietary::ProprietaryKeySubtype;

        let mut map = PsbtInput::default();
        let key = ProprietaryKey::bitgo(ProprietaryKeySubtype::ZecConsensusBranchId);
        assert_eq!(map.insert_proprietary(&key, vec![1].into()).unwrap(), None);
        map.insert(vec![0xfc, 0x01].into(), vec![2].into());

        assert_eq!(map.get_proprietary(&key).unwrap(), Some(&PsbtValue::new(vec![1])));
        assert_eq!(map.proprietary().count(), 2);
        assert_eq!(map.proprietary_entries().len(), 1);
        assert_eq!(
            map.remove_proprietary(&key).unwrap(),
            Some(PsbtValue::new(vec![1]))
        );
        assert_eq!(map.get_proprietary(&key).unwrap(), None);
    }

    #[test]
    fn it_reports_missing_keys_by_type() {
        let map = PsbtInput::default();
        match map.must_get(&vec![5].into()) {
            Err(PsbtError::MissingKey(5)) => {}
            e => panic!("expected MissingKey, got {:?}", e),
        }
    }
}
