//! Zcash PSBTs.
//!
//! A v4 (and v3) Zcash transaction does not serialize its consensus branch id, but the ZIP243
//! digest commits to it. The branch id travels in the global map under the `BITGO`
//! proprietary key `ZecConsensusBranchId`. It is moved onto the transaction on parse and written
//! back only for the duration of a serialization. v5 transactions carry the branch id natively,
//! so the key must not appear alongside them.

use utxo_tx::{
    hashes::SighashDigest,
    prelude::SighashType,
    zcash::consensus::MAX_VERSION,
    BuildOptions, Network, NetworkFamily, ParseOptions, UtxoTransaction,
};

use crate::{
    common::{PsbtError, PsbtResult, PsbtValue, PstMap},
    proprietary::{try_val_as_u32, ProprietaryKey, ProprietaryKeySubtype},
    psbt::UtxoPsbt,
};

fn branch_id_key() -> ProprietaryKey {
    ProprietaryKey::bitgo(ProprietaryKeySubtype::ZecConsensusBranchId)
}

/// A PSBT on a Zcash-family network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZcashPsbt {
    psbt: UtxoPsbt,
}

impl ZcashPsbt {
    /// Wrap a PSBT whose unsigned transaction already carries its branch id. Any branch id
    /// entry left in the global map is moved onto the transaction.
    ///
    /// ## Errors
    ///
    /// - `InvalidPsbt` if the network is not a Zcash-family network, or a v5 transaction has a
    ///   branch id entry.
    /// - `MissingKey(0xfc)` if an overwintered pre-v5 transaction has none.
    pub fn from_psbt(mut psbt: UtxoPsbt) -> PsbtResult<Self> {
        if psbt.network().family() != NetworkFamily::Zcash {
            return Err(PsbtError::InvalidPsbt(format!(
                "{} is not a Zcash network",
                psbt.network()
            )));
        }
        let key = branch_id_key();
        let version = psbt.tx().version;
        let overwintered = psbt.tx().zcash().map(|z| z.overwintered).unwrap_or(false);

        match psbt.global_map_mut().remove_proprietary(&key)? {
            Some(_) if version as u32 >= MAX_VERSION => {
                return Err(PsbtError::InvalidPsbt(
                    "v5 transactions carry their own consensus branch id".to_owned(),
                ));
            }
            Some(value) => {
                let branch_id = try_val_as_u32(&value)?;
                tracing::debug!(branch_id, version, "read consensus branch id from psbt");
                if let Some(zcash) = psbt.tx_mut().zcash_mut() {
                    zcash.consensus_branch_id = branch_id;
                }
            }
            None if overwintered && (version as u32) < MAX_VERSION => {
                return Err(PsbtError::MissingKey(crate::common::PROPRIETARY_KEY_TYPE));
            }
            None => {}
        }
        Ok(Self { psbt })
    }

    fn wrap_unsigned(psbt: UtxoPsbt) -> PsbtResult<Self> {
        if psbt.network().family() != NetworkFamily::Zcash {
            return Err(PsbtError::InvalidPsbt(format!(
                "{} is not a Zcash network",
                psbt.network()
            )));
        }
        Ok(Self { psbt })
    }

    /// An empty PSBT. `options.version` may be a wire version or an upgrade selector like 450.
    pub fn new(network: Network, options: &BuildOptions) -> PsbtResult<Self> {
        Self::wrap_unsigned(UtxoPsbt::new(network, options)?)
    }

    /// A PSBT for `tx`. Script sigs are moved to the finalized keys. The branch id stays on the
    /// transaction.
    pub fn from_transaction(tx: &UtxoTransaction) -> PsbtResult<Self> {
        Self::wrap_unsigned(UtxoPsbt::from_transaction(tx)?)
    }

    /// Parse a Zcash PSBT. `options.version` selects the branch id for a v4 transaction only
    /// until the proprietary entry overrides it.
    pub fn parse(bytes: &[u8], network: Network, options: &ParseOptions) -> PsbtResult<Self> {
        Self::from_psbt(UtxoPsbt::parse(bytes, network, options)?)
    }

    /// Parse a hex-encoded Zcash PSBT
    pub fn parse_hex(s: &str, network: Network, options: &ParseOptions) -> PsbtResult<Self> {
        Self::from_psbt(UtxoPsbt::parse_hex(s, network, options)?)
    }

    /// Parse a base64-encoded Zcash PSBT
    pub fn parse_base64(s: &str, network: Network, options: &ParseOptions) -> PsbtResult<Self> {
        Self::from_psbt(UtxoPsbt::parse_base64(s, network, options)?)
    }

    fn needs_branch_id_entry(&self) -> bool {
        let tx = self.psbt.tx();
        (tx.version as u32) < MAX_VERSION && tx.zcash().map(|z| z.overwintered).unwrap_or(false)
    }

    fn with_branch_id_entry<T>(&mut self, f: impl FnOnce(&UtxoPsbt) -> PsbtResult<T>) -> PsbtResult<T> {
        if !self.needs_branch_id_entry() {
            return f(&self.psbt);
        }
        let value: PsbtValue = self.consensus_branch_id().to_le_bytes().to_vec().into();
        self.psbt
            .with_global_entry(branch_id_key().to_key()?, value, f)
    }

    /// Serialize the PSBT. For pre-v5 transactions the branch id is written under its
    /// proprietary key. The global map is left as it was.
    pub fn serialize(&mut self) -> PsbtResult<Vec<u8>> {
        self.with_branch_id_entry(|psbt| psbt.serialize())
    }

    /// Serialize the PSBT as hex
    pub fn serialize_hex(&mut self) -> PsbtResult<String> {
        self.with_branch_id_entry(|psbt| psbt.serialize_hex())
    }

    /// Serialize the PSBT as base64
    pub fn serialize_base64(&mut self) -> PsbtResult<String> {
        self.with_branch_id_entry(|psbt| psbt.serialize_base64())
    }

    /// The consensus branch id the signature digests commit to
    pub fn consensus_branch_id(&self) -> u32 {
        self.psbt
            .tx()
            .zcash()
            .map(|z| z.consensus_branch_id)
            .unwrap_or_default()
    }

    /// The version group id
    pub fn version_group_id(&self) -> u32 {
        self.psbt
            .tx()
            .zcash()
            .map(|z| z.version_group_id)
            .unwrap_or_default()
    }

    /// The expiry height
    pub fn expiry_height(&self) -> u32 {
        self.psbt
            .tx()
            .zcash()
            .map(|z| z.expiry_height)
            .unwrap_or_default()
    }

    fn update_envelope(&mut self, field: &str, f: impl FnOnce(&mut utxo_tx::ZcashExtension)) -> PsbtResult<()> {
        if self.psbt.has_signatures() {
            return Err(utxo_tx::UtxoError::SignatureInvalidation(format!(
                "cannot change the {} of a PSBT with signatures",
                field
            ))
            .into());
        }
        let zcash = self.psbt.tx_mut().zcash_mut().ok_or_else(|| {
            PsbtError::InvalidPsbt("transaction has no Zcash envelope".to_owned())
        })?;
        f(zcash);
        Ok(())
    }

    /// Set the consensus branch id. Refused once any input is signed.
    pub fn set_consensus_branch_id(&mut self, branch_id: u32) -> PsbtResult<()> {
        self.update_envelope("consensus branch id", |z| z.consensus_branch_id = branch_id)
    }

    /// Set the version group id. Refused once any input is signed.
    pub fn set_version_group_id(&mut self, version_group_id: u32) -> PsbtResult<()> {
        self.update_envelope("version group id", |z| z.version_group_id = version_group_id)
    }

    /// Set the expiry height. Refused once any input is signed.
    pub fn set_expiry_height(&mut self, expiry_height: u32) -> PsbtResult<()> {
        self.update_envelope("expiry height", |z| z.expiry_height = expiry_height)
    }

    /// Calculate the signature digest of input `index`.
    ///
    /// Unlike the base PSBT, a witness UTXO is enough to sign a transparent Zcash input. Both
    /// ZIP243 and ZIP244 commit to the spent value, so a misreported value only produces an
    /// invalid signature. This exception applies to Zcash alone.
    pub fn signature_hash(
        &self,
        index: usize,
        sighash: Option<SighashType>,
    ) -> PsbtResult<SighashDigest> {
        self.psbt.signature_hash_with(index, sighash, true)
    }

    /// The wrapped PSBT
    pub fn psbt(&self) -> &UtxoPsbt {
        &self.psbt
    }

    /// The wrapped PSBT, mutably. Envelope fields should be changed through the guarded setters.
    pub fn psbt_mut(&mut self) -> &mut UtxoPsbt {
        &mut self.psbt
    }

    /// Unwrap the PSBT. Its global map does not hold the branch id.
    pub fn into_inner(self) -> UtxoPsbt {
        self.psbt
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use utxo_tx::{
        prelude::{Outpoint, ScriptSig, TxIn, TxOut},
        zcash::consensus::{CANOPY_BRANCH_ID, NU5_BRANCH_ID},
        UtxoError,
    };

    use crate::common::PsbtKey;

    fn v4_psbt() -> ZcashPsbt {
        let mut psbt = ZcashPsbt::new(Network::Zcash, &BuildOptions::default()).unwrap();
        psbt.psbt_mut()
            .add_input(TxIn::new(Outpoint::null(), ScriptSig::null(), 0xffff_ffff));
        psbt.psbt_mut().add_output(TxOut::new(5000u64, vec![0x51u8]));
        psbt
    }

    #[test]
    fn it_round_trips_v4_without_duplicating_the_branch_id() {
        let mut psbt = v4_psbt();
        assert_eq!(psbt.consensus_branch_id(), NU5_BRANCH_ID);
        psbt.set_consensus_branch_id(CANOPY_BRANCH_ID).unwrap();

        let first = psbt.serialize().unwrap();
        let second = psbt.serialize().unwrap();
        assert_eq!(first, second);
        assert!(psbt.psbt().global_map().is_empty());

        let key = hex::decode("fc05424954474f00").unwrap();
        assert_eq!(first.windows(key.len()).filter(|w| *w == &key[..]).count(), 1);

        let mut parsed = ZcashPsbt::parse(&first, Network::Zcash, &ParseOptions::default()).unwrap();
        assert_eq!(parsed.consensus_branch_id(), CANOPY_BRANCH_ID);
        assert!(parsed.psbt().global_map().is_empty());
        assert_eq!(parsed.serialize().unwrap(), first);
    }

    #[test]
    fn it_writes_no_branch_id_for_v5() {
        let mut psbt = ZcashPsbt::new(Network::Zcash, &BuildOptions { version: Some(5) }).unwrap();
        let bytes = psbt.serialize().unwrap();
        let key = hex::decode("fc05424954474f").unwrap();
        assert!(!bytes.windows(key.len()).any(|w| w == &key[..]));
        assert!(ZcashPsbt::parse(&bytes, Network::Zcash, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn it_rejects_misplaced_branch_ids() {
        let missing = v4_psbt().into_inner().serialize().unwrap();
        assert!(matches!(
            ZcashPsbt::parse(&missing, Network::Zcash, &ParseOptions::default()),
            Err(PsbtError::MissingKey(0xfc))
        ));

        let mut v5 = UtxoPsbt::new(Network::Zcash, &BuildOptions { version: Some(5) })
            .unwrap();
        v5.global_map_mut().insert(
            PsbtKey::new(hex::decode("fc05424954474f00").unwrap()),
            PsbtValue::new(NU5_BRANCH_ID.to_le_bytes().to_vec()),
        );
        let bytes = v5.serialize().unwrap();
        assert!(matches!(
            ZcashPsbt::parse(&bytes, Network::Zcash, &ParseOptions::default()),
            Err(PsbtError::InvalidPsbt(_))
        ));
    }

    #[test]
    fn it_refuses_envelope_changes_after_signing() {
        let mut psbt = v4_psbt();
        psbt.set_expiry_height(100).unwrap();
        psbt.set_version_group_id(0x892f_2085).unwrap();
        assert_eq!(psbt.expiry_height(), 100);

        psbt.psbt_mut().input_maps_mut()[0]
            .insert_partial_sig(&[0x02; 33], &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01], SighashType::ALL)
            .unwrap();
        assert!(matches!(
            psbt.set_expiry_height(200),
            Err(PsbtError::UtxoError(UtxoError::SignatureInvalidation(_)))
        ));
        assert!(psbt.set_consensus_branch_id(CANOPY_BRANCH_ID).is_err());
        assert_eq!(psbt.expiry_height(), 100);
    }

    #[test]
    fn it_signs_with_only_a_witness_utxo() {
        let mut psbt = v4_psbt();
        let spent = TxOut::new(10_000u64, hex::decode("76a914000000000000000000000000000000000000000088ac").unwrap());
        psbt.psbt_mut().input_maps_mut()[0]
            .insert_witness_utxo(&spent)
            .unwrap();

        let digest = psbt.signature_hash(0, None).unwrap();
        assert_ne!(digest, SighashDigest::default());
        assert!(matches!(
            psbt.psbt().signature_hash(0, None),
            Err(PsbtError::MissingKey(0))
        ));
    }

    #[test]
    fn it_rejects_other_networks() {
        let psbt = UtxoPsbt::new(Network::Bitcoin, &BuildOptions::default()).unwrap();
        assert!(matches!(ZcashPsbt::from_psbt(psbt), Err(PsbtError::InvalidPsbt(_))));
    }
}
