use std::collections::btree_map;

use utxo_tx::{
    prelude::{Outpoint, Script, ScriptSig, SighashType, TxOut, Witness, WitnessStackItem},
    serialize_transaction, txid, Network, NetworkFamily, UtxoTransaction,
};

use utxo_core::ser::ByteFormat;

use crate::{
    common::{PsbtError, PsbtKey, PsbtResult, PsbtValidate, PsbtValue, PstMap},
    schema,
};

psbt_map!(
    /// A PSBT input map
    PsbtInput
);

/// PSBT Input Key Types
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum InputKey {
    /// Input key type for PSBT_IN_NON_WITNESS_UTXO as defined in BIP174
    NonWitnessUtxo = 0,
    /// Input key type for PSBT_IN_WITNESS_UTXO as defined in BIP174
    WitnessUtxo = 1,
    /// Input key type for PSBT_IN_PARTIAL_SIG as defined in BIP174
    PartialSig = 2,
    /// Input key type for PSBT_IN_SIGHASH_TYPE as defined in BIP174
    SighashType = 3,
    /// Input key type for PSBT_IN_REDEEM_SCRIPT as defined in BIP174
    RedeemScript = 4,
    /// Input key type for PSBT_IN_WITNESS_SCRIPT as defined in BIP174
    WitnessScript = 5,
    /// Input key type for PSBT_IN_BIP32_DERIVATION as defined in BIP174
    Bip32Derivation = 6,
    /// Input key type for PSBT_IN_FINAL_SCRIPTSIG as defined in BIP174
    FinalScriptSig = 7,
    /// Input key type for PSBT_IN_FINAL_SCRIPTWITNESS as defined in BIP174
    FinalScriptWitness = 8,
    /// Input key type for PSBT_IN_POR_COMMITMENT as defined in BIP174
    PorCommitment = 9,
    /// Input key type for PSBT_IN_PROPRIETARY as defined in BIP174
    Proprietary = 0xfc,
}

impl From<InputKey> for PsbtKey {
    fn from(k: InputKey) -> PsbtKey {
        vec![k as u8].into()
    }
}

/// A partial signature: the signer's pubkey, its DER signature, and the sighash byte appended
/// to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSig {
    /// The 33- or 65-byte public key
    pub pubkey: Vec<u8>,
    /// The DER-encoded signature, without the sighash byte
    pub signature: Vec<u8>,
    /// The sighash byte
    pub sighash: SighashType,
}

impl PsbtValidate for PsbtInput {
    fn consistency_checks(&self) -> PsbtResult<()> {
        // Signatures must use the requested sighash type
        if let Some(val) = self.get(&InputKey::SighashType.into()) {
            let requested = crate::proprietary::try_val_as_u32(val)?;
            for sig in self.partial_sigs() {
                if sig.sighash.0 as u32 != requested {
                    return Err(PsbtError::InvalidPsbt(format!(
                        "partial signature uses sighash {:#04x}, input requests {:#04x}",
                        sig.sighash.0, requested
                    )));
                }
            }
        }
        Ok(())
    }

    fn standard_schema(network: Network) -> schema::KvTypeSchema {
        let family = network.family();
        let mut s: schema::KvTypeSchema = Default::default();
        s.insert(
            InputKey::NonWitnessUtxo as u8,
            Box::new(move |k, v| (schema::input::validate_in_non_witness(k, v, network))),
        );
        s.insert(
            InputKey::WitnessUtxo as u8,
            Box::new(|k, v| schema::input::validate_in_witness(k, v)),
        );
        s.insert(
            InputKey::PartialSig as u8,
            Box::new(move |k, v| (schema::input::validate_in_partial_sig(k, v, family))),
        );
        s.insert(
            InputKey::SighashType as u8,
            Box::new(move |k, v| (schema::input::validate_sighash_type(k, v, family))),
        );
        s.insert(
            InputKey::RedeemScript as u8,
            Box::new(|k, v| schema::input::validate_redeem_script(k, v)),
        );
        s.insert(
            InputKey::WitnessScript as u8,
            Box::new(|k, v| schema::input::validate_witness_script(k, v)),
        );
        s.insert(
            InputKey::Bip32Derivation as u8,
            Box::new(|k, v| schema::input::validate_bip32_derivations(k, v)),
        );
        s.insert(
            InputKey::FinalScriptSig as u8,
            Box::new(|k, v| schema::input::validate_finalized_script_sig(k, v)),
        );
        s.insert(
            InputKey::FinalScriptWitness as u8,
            Box::new(|k, v| schema::input::validate_finalized_script_witness(k, v)),
        );
        s.insert(
            InputKey::PorCommitment as u8,
            Box::new(|k, v| schema::input::validate_por_commitment(k, v)),
        );
        s
    }
}

impl PsbtInput {
    /// Returns true if the map has a non-witness utxo in it.
    pub fn has_non_witness_utxo(&self) -> bool {
        self.contains_key(&InputKey::NonWitnessUtxo.into())
    }

    /// Returns the BIP174 PSBT_IN_NON_WITNESS_UTXO transaction if present and valid.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    /// - Returns a `PsbtError::UtxoError` error if the value is not a valid `network` tx.
    pub fn non_witness_utxo(&self, network: Network) -> PsbtResult<UtxoTransaction> {
        let tx_val = self.must_get(&InputKey::NonWitnessUtxo.into())?;
        schema::try_val_as_tx(tx_val, network)
    }

    /// Add a non-witness UTXO to the mapping. This function does not run consistency checks
    pub fn insert_non_witness_utxo(&mut self, tx: &UtxoTransaction) -> PsbtResult<()> {
        let val = serialize_transaction(tx)?;
        self.insert(InputKey::NonWitnessUtxo.into(), val.into());
        Ok(())
    }

    /// Returns true if the map has a witness utxo in it.
    pub fn has_witness_utxo(&self) -> bool {
        self.contains_key(&InputKey::WitnessUtxo.into())
    }

    /// Returns the BIP174 PSBT_IN_WITNESS_UTXO TxOut if present and valid.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    /// - Returns a `PsbtError::SerError` if the value at that key is not a valid tx out.
    pub fn witness_utxo(&self) -> PsbtResult<TxOut> {
        let out_val = self.must_get(&InputKey::WitnessUtxo.into())?;
        schema::try_val_as_tx_out(out_val)
    }

    /// Add a witness UTXO to the mapping. This function does not run consistency checks
    pub fn insert_witness_utxo(&mut self, tx_out: &TxOut) -> PsbtResult<()> {
        let val = tx_out.serialize_bytes()?;
        self.insert(InputKey::WitnessUtxo.into(), val.into());
        Ok(())
    }

    /// True if the PSBT knows its utxo, false otherwise
    pub fn has_utxo(&self) -> bool {
        self.has_witness_utxo() || self.has_non_witness_utxo()
    }

    /// The output spent by this input. Taken from the previous transaction if present, which
    /// must hash to the outpoint's txid, otherwise from the witness UTXO.
    ///
    /// ## Errors
    ///
    /// - `MissingKey(0)` if neither UTXO key is present.
    /// - `InvalidPsbt` if the previous transaction does not match the outpoint.
    pub fn spent_output(&self, outpoint: &Outpoint, network: Network) -> PsbtResult<TxOut> {
        if !self.has_non_witness_utxo() && self.has_witness_utxo() {
            return self.witness_utxo();
        }
        let prevout_tx = self.non_witness_utxo(network)?;
        if txid(&prevout_tx)? != outpoint.txid {
            return Err(PsbtError::InvalidPsbt(format!(
                "non-witness utxo does not match outpoint {}",
                outpoint.txid.to_be_hex()
            )));
        }
        prevout_tx
            .outputs
            .get(outpoint.idx as usize)
            .cloned()
            .ok_or_else(|| {
                PsbtError::InvalidPsbt(format!(
                    "non-witness utxo has no output {}",
                    outpoint.idx
                ))
            })
    }

    /// Returns a range containing any PSBT_IN_PARTIAL_SIG
    pub fn raw_partial_sigs(&self) -> btree_map::Range<'_, PsbtKey, PsbtValue> {
        self.range_by_key_type(InputKey::PartialSig as u8)
    }

    /// Returns the parsed partial signatures. Malformed entries are skipped.
    pub fn partial_sigs(&self) -> Vec<PartialSig> {
        self.raw_partial_sigs()
            .filter_map(|(k, v)| {
                let (sig, sighash) = schema::try_val_as_signature(v).ok()?;
                Some(PartialSig {
                    pubkey: k.items()[1..].to_vec(),
                    signature: sig.to_vec(),
                    sighash: SighashType(sighash),
                })
            })
            .collect()
    }

    /// Inserts a signature into the map. `der_sig` excludes the sighash byte.
    pub fn insert_partial_sig(
        &mut self,
        pubkey: &[u8],
        der_sig: &[u8],
        sighash: SighashType,
    ) -> PsbtResult<()> {
        let mut key = vec![InputKey::PartialSig as u8];
        key.extend_from_slice(pubkey);
        let key: PsbtKey = key.into();
        schema::validate_pubkey_key(&key, 66)?;

        let mut val = der_sig.to_vec();
        val.push(sighash.to_u8());
        let val: PsbtValue = val.into();
        schema::try_val_as_signature(&val)?;

        self.insert(key, val);
        Ok(())
    }

    /// True if any partial signature is present
    pub fn has_partial_sigs(&self) -> bool {
        self.raw_partial_sigs().next().is_some()
    }

    /// Returns the BIP174 PSBT_IN_SIGHASH_TYPE if present and valid for `family`.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    /// - Returns a `PsbtError::UtxoError(UtxoError::UnknownSighash)` if the sighash is abnormal
    pub fn sighash(&self, family: NetworkFamily) -> PsbtResult<SighashType> {
        let val = self.must_get(&InputKey::SighashType.into())?;
        schema::try_val_as_sighash(val, family)
    }

    /// Set the PSBT_IN_SIGHASH_TYPE
    pub fn insert_sighash(&mut self, sighash: SighashType) {
        self.insert(
            InputKey::SighashType.into(),
            (sighash.to_u8() as u32).to_le_bytes().to_vec().into(),
        );
    }

    /// Returns the BIP174 PSBT_IN_REDEEM_SCRIPT if present.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    pub fn redeem_script(&self) -> PsbtResult<Script> {
        let script_bytes = self.must_get(&InputKey::RedeemScript.into())?.items();
        Ok(script_bytes.into())
    }

    /// True if the map has a redeem script, else false.
    pub fn has_redeem_script(&self) -> bool {
        self.contains_key(&InputKey::RedeemScript.into())
    }

    /// Set the PSBT_IN_REDEEM_SCRIPT
    pub fn insert_redeem_script(&mut self, script: &Script) {
        self.insert(InputKey::RedeemScript.into(), script.items().into());
    }

    /// Returns the BIP174 PSBT_IN_WITNESS_SCRIPT if present.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    pub fn witness_script(&self) -> PsbtResult<Script> {
        let script_bytes = self.must_get(&InputKey::WitnessScript.into())?.items();
        Ok(script_bytes.into())
    }

    /// True if the map has a witness script, else false.
    pub fn has_witness_script(&self) -> bool {
        self.contains_key(&InputKey::WitnessScript.into())
    }

    /// Set the PSBT_IN_WITNESS_SCRIPT
    pub fn insert_witness_script(&mut self, script: &Script) {
        self.insert(InputKey::WitnessScript.into(), script.items().into());
    }

    /// Returns a range containing any PSBT_IN_BIP32_DERIVATION
    pub fn raw_bip32_derivations(&self) -> btree_map::Range<'_, PsbtKey, PsbtValue> {
        self.range_by_key_type(InputKey::Bip32Derivation as u8)
    }

    /// Returns the pubkeys and key origins of every PSBT_IN_BIP32_DERIVATION
    pub fn bip32_derivations(&self) -> PsbtResult<Vec<(Vec<u8>, schema::KeyDerivation)>> {
        self.raw_bip32_derivations()
            .map(|(k, v)| Ok((k.items()[1..].to_vec(), schema::try_val_as_key_derivation(v)?)))
            .collect()
    }

    /// Insert a PSBT_IN_BIP32_DERIVATION
    pub fn insert_bip32_derivation(
        &mut self,
        pubkey: &[u8],
        deriv: &schema::KeyDerivation,
    ) -> PsbtResult<()> {
        let mut key = vec![InputKey::Bip32Derivation as u8];
        key.extend_from_slice(pubkey);
        let key: PsbtKey = key.into();
        schema::validate_pubkey_key(&key, 34)?;
        self.insert(key, deriv.to_value());
        Ok(())
    }

    /// Returns the BIP174 PSBT_IN_FINAL_SCRIPTSIG if present.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    pub fn finalized_script_sig(&self) -> PsbtResult<ScriptSig> {
        let script_bytes = self.must_get(&InputKey::FinalScriptSig.into())?.items();
        Ok(script_bytes.into())
    }

    /// Set the PSBT_IN_FINAL_SCRIPTSIG
    pub fn insert_script_sig(&mut self, script_sig: &ScriptSig) {
        self.insert(InputKey::FinalScriptSig.into(), script_sig.items().into());
    }

    /// Returns the BIP174 PSBT_IN_FINAL_SCRIPTWITNESS if present and valid.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    /// - Returns a `PsbtError::SerError` if the value is not a valid witness.
    pub fn finalized_script_witness(&self) -> PsbtResult<Witness> {
        let wit_val = self.must_get(&InputKey::FinalScriptWitness.into())?;
        schema::try_val_as_witness(wit_val)
    }

    /// Set the PSBT_IN_FINAL_SCRIPTWITNESS
    pub fn insert_witness(&mut self, witness: &[WitnessStackItem]) -> PsbtResult<()> {
        let val = schema::witness_to_value(witness)?;
        self.insert(InputKey::FinalScriptWitness.into(), val);
        Ok(())
    }

    /// True if the input has a final script sig or a final witness
    pub fn is_finalized(&self) -> bool {
        self.contains_key(&InputKey::FinalScriptSig.into())
            || self.contains_key(&InputKey::FinalScriptWitness.into())
    }

    /// True if the input carries any signature, partial or final
    pub fn has_signatures(&self) -> bool {
        self.has_partial_sigs() || self.is_finalized()
    }

    /// Record the final script sig and witness, then drop the signing data that the finalized
    /// input no longer needs. UTXO entries are kept.
    pub fn finalize(&mut self, script_sig: &ScriptSig, witness: &[WitnessStackItem]) -> PsbtResult<()> {
        let stale: Vec<PsbtKey> = self
            .keys()
            .filter(|k| {
                matches!(
                    k.key_type(),
                    2..=6 // partial sigs, sighash, scripts and derivations
                )
            })
            .cloned()
            .collect();
        for key in stale.iter() {
            self.remove(key);
        }
        if !script_sig.is_empty() {
            self.insert_script_sig(script_sig);
        }
        if !witness.is_empty() {
            self.insert_witness(witness)?;
        }
        Ok(())
    }
}
