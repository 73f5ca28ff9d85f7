use std::collections::btree_map;

use utxo_tx::{prelude::Script, Network};

use crate::{
    common::{PsbtKey, PsbtResult, PsbtValidate, PsbtValue, PstMap},
    schema,
};

psbt_map!(
    /// A PSBT output map
    PsbtOutput
);

/// PSBT Output Key Types
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum OutputKey {
    /// Output key type for PSBT_OUT_REDEEM_SCRIPT as defined in BIP174
    RedeemScript = 0,
    /// Output key type for PSBT_OUT_WITNESS_SCRIPT as defined in BIP174
    WitnessScript = 1,
    /// Output key type for PSBT_OUT_BIP32_DERIVATION as defined in BIP174
    Bip32Derivation = 2,
    /// Output key type for PSBT_OUT_PROPRIETARY as defined in BIP174
    Proprietary = 0xfc,
}

impl From<OutputKey> for PsbtKey {
    fn from(k: OutputKey) -> PsbtKey {
        vec![k as u8].into()
    }
}

impl PsbtValidate for PsbtOutput {
    fn consistency_checks(&self) -> PsbtResult<()> {
        // No current checks
        Ok(())
    }

    fn standard_schema(_network: Network) -> schema::KvTypeSchema {
        let mut s: schema::KvTypeSchema = Default::default();
        s.insert(
            OutputKey::RedeemScript as u8,
            Box::new(|k, v| schema::output::validate_redeem_script(k, v)),
        );
        s.insert(
            OutputKey::WitnessScript as u8,
            Box::new(|k, v| schema::output::validate_witness_script(k, v)),
        );
        s.insert(
            OutputKey::Bip32Derivation as u8,
            Box::new(|k, v| schema::output::validate_bip32_derivations(k, v)),
        );
        s
    }
}

impl PsbtOutput {
    /// Returns the BIP174 PSBT_OUT_REDEEM_SCRIPT if present.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    pub fn redeem_script(&self) -> PsbtResult<Script> {
        let script_bytes = self.must_get(&OutputKey::RedeemScript.into())?.items();
        Ok(script_bytes.into())
    }

    /// Set the PSBT_OUT_REDEEM_SCRIPT
    pub fn insert_redeem_script(&mut self, script: &Script) {
        self.insert(OutputKey::RedeemScript.into(), script.items().into());
    }

    /// Returns the BIP174 PSBT_OUT_WITNESS_SCRIPT if present.
    ///
    /// ## Errors
    ///
    /// - Returns a `PsbtError::MissingKey` error if no value at that key.
    pub fn witness_script(&self) -> PsbtResult<Script> {
        let script_bytes = self.must_get(&OutputKey::WitnessScript.into())?.items();
        Ok(script_bytes.into())
    }

    /// Set the PSBT_OUT_WITNESS_SCRIPT
    pub fn insert_witness_script(&mut self, script: &Script) {
        self.insert(OutputKey::WitnessScript.into(), script.items().into());
    }

    /// Returns a range containing any PSBT_OUT_BIP32_DERIVATION.
    pub fn raw_bip32_derivations(&self) -> btree_map::Range<'_, PsbtKey, PsbtValue> {
        self.range_by_key_type(OutputKey::Bip32Derivation as u8)
    }

    /// Returns the pubkeys and key origins of every PSBT_OUT_BIP32_DERIVATION
    pub fn bip32_derivations(&self) -> PsbtResult<Vec<(Vec<u8>, schema::KeyDerivation)>> {
        self.raw_bip32_derivations()
            .map(|(k, v)| Ok((k.items()[1..].to_vec(), schema::try_val_as_key_derivation(v)?)))
            .collect()
    }

    /// Insert a PSBT_OUT_BIP32_DERIVATION
    pub fn insert_bip32_derivation(
        &mut self,
        pubkey: &[u8],
        deriv: &schema::KeyDerivation,
    ) -> PsbtResult<()> {
        let mut key = vec![OutputKey::Bip32Derivation as u8];
        key.extend_from_slice(pubkey);
        let key: PsbtKey = key.into();
        schema::validate_pubkey_key(&key, 34)?;
        self.insert(key, deriv.to_value());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::PsbtError;

    #[test]
    fn it_stores_scripts_and_derivations() {
        let mut output = PsbtOutput::default();
        let script = Script::new(vec![0x51, 0x21]);
        output.insert_witness_script(&script);
        assert_eq!(output.witness_script().unwrap(), script);
        assert!(matches!(output.redeem_script(), Err(PsbtError::MissingKey(0))));

        let deriv = schema::KeyDerivation {
            fingerprint: [0xaa; 4],
            path: vec![1, 2],
        };
        let pubkey = [0x03u8; 33];
        output.insert_bip32_derivation(&pubkey, &deriv).unwrap();
        assert_eq!(
            output.bip32_derivations().unwrap(),
            vec![(pubkey.to_vec(), deriv)]
        );
        assert!(output.validate(Network::Bitcoin).is_ok());

        assert!(matches!(
            output.insert_bip32_derivation(&pubkey[..20], &schema::KeyDerivation {
                fingerprint: [0; 4],
                path: vec![],
            }),
            Err(PsbtError::WrongKeyLength { expected: 34, got: 21 })
        ));
    }
}
