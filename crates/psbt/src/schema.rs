use std::collections::HashMap;

use utxo_core::ser::{self, ByteFormat};
use utxo_tx::{
    prelude::{SighashType, TxOut, Witness, WitnessStackItem},
    parse_transaction, Network, NetworkFamily, ParseOptions, UtxoError, UtxoTransaction,
};

use crate::common::{PsbtError, PsbtKey, PsbtResult, PsbtValue};

/// A PSBT key/value validation function. Returns `Ok(())` if the KV pair is valid, otherwise an
/// error.
pub type KvPredicate = Box<dyn Fn(&PsbtKey, &PsbtValue) -> PsbtResult<()>>;

/// The map key is the PSBT key-type to be validated. The value is a boxed function that performs
/// validation.
#[derive(Default)]
pub struct KvTypeSchema(pub HashMap<u8, KvPredicate>);

impl KvTypeSchema {
    /// Insert a predicate into the map. This creates a composition with any predicate already in
    /// the map. Which is to say, multiple inserts at the same key additive. They are ALL
    /// enforced.
    ///
    /// Custom schemas can be built manually, or made by getting the standard schema for a type
    /// and then updating it.
    pub fn insert(&mut self, key_type: u8, new: KvPredicate) {
        let existing = self.0.remove(&key_type);
        let updated: KvPredicate = match existing {
            Some(predicate) => Box::new(move |k: &PsbtKey, v: &PsbtValue| {
                predicate(k, v)?;
                new(k, v)
            }),
            None => new,
        };
        self.0.insert(key_type, updated);
    }

    /// Remove the (potentially composed) predicate at any key
    pub fn remove(&mut self, key_type: u8) {
        self.0.remove(&key_type);
    }
}

/// A BIP32 key origin: the master key fingerprint and the derivation path below it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyDerivation {
    /// The first 4 bytes of the master key's hash160
    pub fingerprint: [u8; 4],
    /// The derivation path. Hardened indices have the high bit set.
    pub path: Vec<u32>,
}

impl KeyDerivation {
    /// Serialize as a PSBT value: the fingerprint, then each index as u32 LE
    pub fn to_value(&self) -> PsbtValue {
        let mut val = self.fingerprint.to_vec();
        for index in self.path.iter() {
            val.extend_from_slice(&index.to_le_bytes());
        }
        val.into()
    }
}

/// Check that a value can be interpreted as a bip32 fingerprint + derivation
pub fn try_val_as_key_derivation(val: &PsbtValue) -> PsbtResult<KeyDerivation> {
    if val.is_empty() || val.len() % 4 != 0 {
        return Err(PsbtError::InvalidBip32Path);
    }
    let mut fingerprint = [0u8; 4];
    fingerprint.copy_from_slice(&val[0..4]);
    let path = val.items()[4..]
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(KeyDerivation { fingerprint, path })
}

/// Validate that a key is a fixed length
pub fn validate_fixed_key_length(key: &PsbtKey, length: usize) -> PsbtResult<()> {
    if key.len() != length {
        Err(PsbtError::WrongKeyLength {
            expected: length,
            got: key.len(),
        })
    } else {
        Ok(())
    }
}

/// Validate that a value is a fixed length
pub fn validate_fixed_val_length(val: &PsbtValue, length: usize) -> PsbtResult<()> {
    if val.len() != length {
        Err(PsbtError::WrongValueLength {
            expected: length,
            got: val.len(),
        })
    } else {
        Ok(())
    }
}

/// Ensure that a key is exactly 1 byte
pub fn validate_single_byte_key_type(key: &PsbtKey) -> PsbtResult<()> {
    validate_fixed_key_length(key, 1)
}

/// Ensure that a key has the expected key type
pub fn validate_expected_key_type(key: &PsbtKey, key_type: u8) -> PsbtResult<()> {
    if key.key_type() != key_type {
        Err(PsbtError::WrongKeyType {
            expected: key_type,
            got: key.key_type(),
        })
    } else {
        Ok(())
    }
}

/// Compares an xpub key to its derivation, and ensure the depth marker matches the stated
/// derivation depth
pub fn validate_xpub_depth(key: &PsbtKey, val: &PsbtValue) -> PsbtResult<()> {
    let deriv = try_val_as_key_derivation(val)?;
    // type byte, then 4 version bytes, then the depth
    match key.items().get(5) {
        Some(depth) if *depth as usize == deriv.path.len() => Ok(()),
        _ => Err(PsbtError::Bip32DepthMismatch),
    }
}

/// Ensure that a key is a type byte followed by a compressed or uncompressed pubkey. Reports the
/// length of the `preferred` form on failure.
pub fn validate_pubkey_key(key: &PsbtKey, preferred: usize) -> PsbtResult<()> {
    let other = if preferred == 34 { 66 } else { 34 };
    if validate_fixed_key_length(key, other).is_err() {
        validate_fixed_key_length(key, preferred)?;
    }
    Ok(())
}

/// Attempt to deserialize a value as a transaction of `network`
pub fn try_val_as_tx(val: &PsbtValue, network: Network) -> PsbtResult<UtxoTransaction> {
    Ok(parse_transaction(val.items(), network, &ParseOptions::default())?)
}

/// Attempt to deserialize a value as an output
pub fn try_val_as_tx_out(val: &PsbtValue) -> PsbtResult<TxOut> {
    let mut out_bytes = val.items();
    let tx_out = TxOut::read_from(&mut out_bytes, 0)?;
    if !out_bytes.is_empty() {
        return Err(PsbtError::WrongValueLength {
            expected: tx_out.serialized_length(),
            got: val.len(),
        });
    }
    Ok(tx_out)
}

/// Attempt to deserialize a value as a sighash flag accepted by `family`
pub fn try_val_as_sighash(val: &PsbtValue, family: NetworkFamily) -> PsbtResult<SighashType> {
    validate_fixed_val_length(val, 4)?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&val.items()[..4]);
    let sighash = u32::from_le_bytes(buf);
    if sighash > 0xff {
        // bits higher than the first byte should be empty
        return Err(UtxoError::UnknownSighash(0xff).into());
    }
    Ok(SighashType::from_u8(family, sighash as u8)?)
}

/// Split a partial signature value into the DER signature and its trailing sighash byte. The DER
/// encoding is checked only for its sequence tag and length byte.
pub fn try_val_as_signature(val: &PsbtValue) -> PsbtResult<(&[u8], u8)> {
    let (sighash_flag, sig_bytes) = val.items().split_last().ok_or(PsbtError::WrongValueLength {
        got: 0,
        expected: 72,
    })?;
    if sig_bytes.len() < 8 || sig_bytes[0] != 0x30 || sig_bytes[1] as usize != sig_bytes.len() - 2 {
        return Err(PsbtError::InvalidPsbt(format!(
            "malformed DER signature {}",
            hex::encode(sig_bytes)
        )));
    }
    Ok((sig_bytes, *sighash_flag))
}

/// Attempt to deserialize a value as a script Witness
pub fn try_val_as_witness(val: &PsbtValue) -> PsbtResult<Witness> {
    let mut wit_bytes = val.items();
    let number = ser::read_compact_int(&mut wit_bytes)? as usize;
    let mut witness = Witness::with_capacity(number);
    for _ in 0..number {
        witness.push(WitnessStackItem::read_from(&mut wit_bytes, 0)?);
    }
    Ok(witness)
}

/// Serialize a witness as a PSBT value
pub fn witness_to_value(witness: &[WitnessStackItem]) -> PsbtResult<PsbtValue> {
    let mut val = vec![];
    ser::write_compact_int(&mut val, witness.len() as u64)?;
    for item in witness.iter() {
        item.write_to(&mut val)?;
    }
    Ok(val.into())
}

/// Validation functions for PSBT Global maps
pub mod global {
    use super::*;

    /// Validate the key of a `PSBT_GLOBAL_UNSIGNED_TX` pair. The transaction itself is decoded
    /// when the PSBT is read.
    pub fn validate_tx(key: &PsbtKey, _val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 0)?;
        validate_single_byte_key_type(key)
    }

    /// Validate PSBT_GLOBAL_XPUB kv pairs. Checks that the xpub is 78 bytes long, and that the
    /// value can be interpreted as a 4-byte fingerprint with a list of 32-bit integers.
    pub fn validate_xpub(key: &PsbtKey, val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 1)?;
        validate_fixed_key_length(key, 79)?;
        validate_xpub_depth(key, val)
    }

    /// Validate version kv pair. Checks whether the version is exactly 4 bytes.
    pub fn validate_version(key: &PsbtKey, val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 0xfb)?;
        validate_single_byte_key_type(key)?;
        validate_fixed_val_length(val, 4)
    }
}

/// Validation functions for PSBT Output maps
pub mod output {
    use super::*;

    /// Validate PSBT_OUT_REDEEM_SCRIPT kv pair.
    pub fn validate_redeem_script(key: &PsbtKey, _val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 0)?;
        validate_single_byte_key_type(key)
    }

    /// Validate PSBT_OUT_WITNESS_SCRIPT kv pair.
    pub fn validate_witness_script(key: &PsbtKey, _val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 1)?;
        validate_single_byte_key_type(key)
    }

    /// Validate PSBT_OUT_BIP32_DERIVATION kv pairs. Checks that the key is a pubkey, and that
    /// the value can be interpreted as a 4-byte fingerprint with a list of 0-or-more 32-bit
    /// integers.
    pub fn validate_bip32_derivations(key: &PsbtKey, val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 2)?;
        validate_pubkey_key(key, 34)?;
        try_val_as_key_derivation(val).map(|_| ())
    }
}

/// Validation functions for PSBT Input maps
pub mod input {
    use super::*;

    /// Validate a PSBT_IN_NON_WITNESS_UTXO key-value pair in an input map
    pub fn validate_in_non_witness(
        key: &PsbtKey,
        val: &PsbtValue,
        network: Network,
    ) -> PsbtResult<()> {
        validate_expected_key_type(key, 0)?;
        validate_single_byte_key_type(key)?;
        try_val_as_tx(val, network).map(|_| ())
    }

    /// Validate a PSBT_IN_WITNESS_UTXO key-value pair in an input map
    pub fn validate_in_witness(key: &PsbtKey, val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 1)?;
        validate_single_byte_key_type(key)?;
        try_val_as_tx_out(val).map(|_| ())
    }

    /// Validate a PSBT_IN_PARTIAL_SIG key-value pair in an input map
    pub fn validate_in_partial_sig(
        key: &PsbtKey,
        val: &PsbtValue,
        family: NetworkFamily,
    ) -> PsbtResult<()> {
        validate_expected_key_type(key, 2)?;
        validate_pubkey_key(key, 66)?;
        let (_, sighash) = try_val_as_signature(val)?;
        SighashType::from_u8(family, sighash)?;
        Ok(())
    }

    /// Validate a PSBT_IN_SIGHASH_TYPE key-value pair in an input map
    pub fn validate_sighash_type(
        key: &PsbtKey,
        val: &PsbtValue,
        family: NetworkFamily,
    ) -> PsbtResult<()> {
        validate_expected_key_type(key, 3)?;
        validate_single_byte_key_type(key)?;
        try_val_as_sighash(val, family).map(|_| ())
    }

    /// Validate PSBT_IN_REDEEM_SCRIPT kv pair.
    pub fn validate_redeem_script(key: &PsbtKey, _val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 4)?;
        validate_single_byte_key_type(key)
    }

    /// Validate PSBT_IN_WITNESS_SCRIPT kv pair.
    pub fn validate_witness_script(key: &PsbtKey, _val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 5)?;
        validate_single_byte_key_type(key)
    }

    /// Validate PSBT_IN_BIP32_DERIVATION kv pairs. Checks that the key is a pubkey, and that
    /// the value can be interpreted as a 4-byte fingerprint with a list of 0-or-more 32-bit
    /// integers.
    pub fn validate_bip32_derivations(key: &PsbtKey, val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 6)?;
        validate_pubkey_key(key, 34)?;
        try_val_as_key_derivation(val).map(|_| ())
    }

    /// Validate PSBT_IN_FINAL_SCRIPTSIG kv pair.
    pub fn validate_finalized_script_sig(key: &PsbtKey, _val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 7)?;
        validate_single_byte_key_type(key)
    }

    /// Validate PSBT_IN_FINAL_SCRIPTWITNESS kv pair.
    pub fn validate_finalized_script_witness(key: &PsbtKey, val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 8)?;
        validate_single_byte_key_type(key)?;
        try_val_as_witness(val).map(|_| ())
    }

    /// Validate PSBT_IN_POR_COMMITMENT kv pair.
    pub fn validate_por_commitment(key: &PsbtKey, _val: &PsbtValue) -> PsbtResult<()> {
        validate_expected_key_type(key, 9)?;
        validate_single_byte_key_type(key)
    }
}
