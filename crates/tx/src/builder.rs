//! A transaction builder for every supported network.
//!
//! The builder starts from the network's default version, or a version chosen from its
//! allow-list. On Zcash networks the version may be an upgrade selector, which also fixes the
//! consensus branch id. Family-specific setters fail with `IllegalState` on other families.
//!
//! ```
//! use utxo_tx::prelude::*;
//!
//! let tx: UtxoTransaction = UtxoTxBuilder::for_network(Network::Zcash, &BuildOptions { version: Some(500) })
//!     .unwrap()
//!     .spend(Outpoint::null(), 0xffff_ffff)
//!     .pay_script_pubkey(10_000, vec![0x51u8])
//!     .expiry_height(2_000_000)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let bytes = serialize_transaction(&tx).unwrap();
//! assert_eq!(&bytes[..4], &[0x05, 0x00, 0x00, 0x80]);
//! ```

use crate::{
    amount::Amount,
    dash::DashTxType,
    dispatch::resolve_build_version,
    error::{UtxoError, UtxoResult},
    nets::Network,
    tx::{BuildOptions, DashExtension, Extension, UtxoTransaction, ZcashExtension},
    types::{Outpoint, ScriptPubkey, ScriptSig, TxIn, TxOut},
    zcash::consensus::{default_version_group_id, resolve_version},
};

/// A builder for `UtxoTransaction`s.
///
/// Note: the order of inputs and outputs may be semantically meaningful. E.g. when signing with
/// the SIGHASH_SINGLE mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoTxBuilder<V: Amount = u64> {
    network: Network,
    version: i32,
    inputs: Vec<TxIn<V>>,
    outputs: Vec<TxOut<V>>,
    locktime: u32,
    extension: Extension,
}

impl<V: Amount> UtxoTxBuilder<V> {
    /// Start an empty transaction on `network`.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument` if `options.version` is not on the network's allow-list.
    pub fn for_network(network: Network, options: &BuildOptions) -> UtxoResult<Self> {
        let builder = Self {
            network,
            version: 0,
            inputs: vec![],
            outputs: vec![],
            locktime: 0,
            extension: Extension::for_family(network.family()),
        };
        builder.apply_version(resolve_build_version(network, options)?)
    }

    /// Start from an existing transaction. The family fields (Zcash envelope, Dash type and
    /// payload) are carried over.
    pub fn from_tx(tx: UtxoTransaction<V>) -> Self {
        Self {
            network: tx.network,
            version: tx.version,
            inputs: tx.inputs,
            outputs: tx.outputs,
            locktime: tx.locktime,
            extension: tx.extension,
        }
    }

    /// Start from a reference to an existing transaction. Inputs are deep-copied.
    pub fn from_tx_ref(tx: &UtxoTransaction<V>) -> Self {
        Self::from_tx(tx.clone())
    }

    /// Change the version. The same allow-list as `for_network` applies. On Zcash networks this
    /// resets the version group id and branch id to the defaults for the new version.
    pub fn version(self, version: u32) -> UtxoResult<Self> {
        let network = self.network;
        self.apply_version(resolve_build_version(
            network,
            &BuildOptions {
                version: Some(version),
            },
        )?)
    }

    fn apply_version(mut self, version: u32) -> UtxoResult<Self> {
        let network = self.network;
        match &mut self.extension {
            Extension::Zcash(ext) => {
                let selection = resolve_version(version)?;
                let table = network.params().branch_ids.ok_or_else(|| {
                    UtxoError::IllegalState(format!("{} has no consensus branch ids", network))
                })?;
                let wire = selection.wire_version;
                *ext = ZcashExtension {
                    overwintered: wire >= 3,
                    version_group_id: default_version_group_id(wire),
                    expiry_height: if wire >= 3 { ext.expiry_height } else { 0 },
                    consensus_branch_id: match selection.branch_id {
                        Some(id) => id,
                        None => table.branch_id(wire)?,
                    },
                };
                tracing::debug!(
                    network = %network,
                    version = wire,
                    branch_id = ext.consensus_branch_id,
                    "selected zcash version"
                );
                self.version = wire as i32;
            }
            _ => self.version = version as i32,
        }
        Ok(self)
    }

    /// Spend an outpoint. The script sig starts empty.
    pub fn spend<I>(mut self, prevout: I, sequence: u32) -> Self
    where
        I: Into<Outpoint>,
    {
        self.inputs
            .push(TxIn::new(prevout.into(), ScriptSig::null(), sequence));
        self
    }

    /// Spend an outpoint, recording the value and locking script of the spent output. Digest
    /// routines use the recorded value when none is passed explicitly.
    pub fn spend_with_value<I, S>(mut self, prevout: I, sequence: u32, value: V, script_pubkey: S) -> Self
    where
        I: Into<Outpoint>,
        S: Into<ScriptPubkey>,
    {
        let mut input = TxIn::new(prevout.into(), ScriptSig::null(), sequence);
        input.set_prevout(value, script_pubkey.into());
        self.inputs.push(input);
        self
    }

    /// Insert an input at `index`. Appends if `index` is past the end.
    pub fn insert_input(mut self, index: usize, input: TxIn<V>) -> Self {
        let index = std::cmp::min(index, self.inputs.len());
        self.inputs.insert(index, input);
        self
    }

    /// Add a set of inputs
    pub fn extend_inputs<I>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = TxIn<V>>,
    {
        self.inputs.extend(inputs);
        self
    }

    /// Add an output paying `value` to `script_pubkey`
    pub fn pay_script_pubkey<S>(mut self, value: V, script_pubkey: S) -> Self
    where
        S: Into<ScriptPubkey>,
    {
        self.outputs.push(TxOut::new(value, script_pubkey));
        self
    }

    /// Insert an output at `index`. Appends if `index` is past the end.
    pub fn insert_output(mut self, index: usize, output: TxOut<V>) -> Self {
        let index = std::cmp::min(index, self.outputs.len());
        self.outputs.insert(index, output);
        self
    }

    /// Add a set of outputs
    pub fn extend_outputs<I>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = TxOut<V>>,
    {
        self.outputs.extend(outputs);
        self
    }

    /// Set the locktime
    pub fn locktime(mut self, locktime: u32) -> Self {
        self.locktime = locktime;
        self
    }

    fn zcash_mut(&mut self, op: &str) -> UtxoResult<&mut ZcashExtension> {
        match &mut self.extension {
            Extension::Zcash(ext) => Ok(ext),
            _ => Err(UtxoError::IllegalState(format!(
                "{} on non-zcash network {}",
                op, self.network
            ))),
        }
    }

    fn dash_mut(&mut self, op: &str) -> UtxoResult<&mut DashExtension> {
        match &mut self.extension {
            Extension::Dash(ext) => Ok(ext),
            _ => Err(UtxoError::IllegalState(format!(
                "{} on non-dash network {}",
                op, self.network
            ))),
        }
    }

    /// Set the Zcash expiry height
    pub fn expiry_height(mut self, height: u32) -> UtxoResult<Self> {
        self.zcash_mut("expiry_height")?.expiry_height = height;
        Ok(self)
    }

    /// Override the Zcash version group id
    pub fn version_group_id(mut self, version_group_id: u32) -> UtxoResult<Self> {
        self.zcash_mut("version_group_id")?.version_group_id = version_group_id;
        Ok(self)
    }

    /// Override the Zcash consensus branch id
    pub fn consensus_branch_id(mut self, branch_id: u32) -> UtxoResult<Self> {
        self.zcash_mut("consensus_branch_id")?.consensus_branch_id = branch_id;
        Ok(self)
    }

    /// Set the Dash special-transaction type
    pub fn dash_type(mut self, tx_type: DashTxType) -> UtxoResult<Self> {
        self.dash_mut("dash_type")?.tx_type = tx_type;
        Ok(self)
    }

    /// Set the Dash special-transaction payload
    pub fn extra_payload(mut self, payload: Vec<u8>) -> UtxoResult<Self> {
        self.dash_mut("extra_payload")?.extra_payload = Some(payload);
        Ok(self)
    }

    /// Consume the builder, producing a transaction
    pub fn build(self) -> UtxoResult<UtxoTransaction<V>> {
        UtxoTransaction::new(
            self.network,
            self.version,
            self.inputs,
            self.outputs,
            self.locktime,
            self.extension,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        dispatch::{compute_signature_hash, parse_transaction, serialize_transaction},
        tx::ParseOptions,
        types::{Script, SighashType},
        zcash::consensus::*,
    };

    fn zcash(version: Option<u32>) -> UtxoTxBuilder<u64> {
        UtxoTxBuilder::for_network(Network::Zcash, &BuildOptions { version })
            .unwrap()
            .spend(Outpoint::null(), 0xffff_ffff)
            .pay_script_pubkey(10_000u64, vec![0x51u8])
    }

    #[test]
    fn it_builds_fresh_v5_transactions() {
        let tx = zcash(Some(VERSION5_BRANCH_NU5)).build().unwrap();
        let ext = tx.zcash().unwrap();
        assert_eq!(tx.version, 5);
        assert!(ext.overwintered);
        assert_eq!(ext.version_group_id, ZIP225_VERSION_GROUP_ID);
        assert_eq!(ext.consensus_branch_id, NU5_BRANCH_ID);

        let bytes = serialize_transaction(&tx).unwrap();
        assert_eq!(&bytes[..4], &[0x05, 0x00, 0x00, 0x80]);
        assert_eq!(&bytes[4..8], &ZIP225_VERSION_GROUP_ID.to_le_bytes());
        assert_eq!(&bytes[8..12], &NU5_BRANCH_ID.to_le_bytes());
    }

    #[test]
    fn it_defaults_to_v4_with_the_nu5_branch() {
        let tx = zcash(None).build().unwrap();
        assert_eq!(tx.version, 4);
        assert_eq!(tx.zcash().unwrap().consensus_branch_id, NU5_BRANCH_ID);
        assert_eq!(tx.zcash().unwrap().version_group_id, SAPLING_VERSION_GROUP_ID);

        let canopy = zcash(Some(VERSION4_BRANCH_CANOPY)).build().unwrap();
        assert_eq!(canopy.zcash().unwrap().consensus_branch_id, CANOPY_BRANCH_ID);

        let komodo = UtxoTxBuilder::<u64>::for_network(Network::Komodo, &BuildOptions::default())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(komodo.zcash().unwrap().consensus_branch_id, SAPLING_BRANCH_ID);
    }

    #[test]
    fn it_rejects_versions_off_the_allow_list() {
        assert!(matches!(
            UtxoTxBuilder::<u64>::for_network(Network::BitcoinCash, &BuildOptions { version: Some(4) }),
            Err(UtxoError::InvalidArgument(_))
        ));
        assert!(matches!(
            zcash(None).version(3),
            Err(UtxoError::InvalidArgument(_))
        ));
        let tx = zcash(None).version(VERSION5_BRANCH_NU6).unwrap().build().unwrap();
        assert_eq!(tx.version, 5);
        assert_eq!(tx.zcash().unwrap().consensus_branch_id, NU6_BRANCH_ID);
    }

    #[test]
    fn it_refuses_family_fields_on_other_families() {
        let btc = UtxoTxBuilder::<u64>::for_network(Network::Bitcoin, &BuildOptions::default())
            .unwrap();
        assert!(matches!(
            btc.clone().expiry_height(1),
            Err(UtxoError::IllegalState(_))
        ));
        assert!(matches!(
            btc.dash_type(DashTxType::Coinbase),
            Err(UtxoError::IllegalState(_))
        ));
        assert!(matches!(
            zcash(None).extra_payload(vec![1]),
            Err(UtxoError::IllegalState(_))
        ));
    }

    #[test]
    fn it_carries_family_fields_through_rebuilds() {
        let tx = UtxoTxBuilder::<u64>::for_network(Network::DashTest, &BuildOptions { version: Some(3) })
            .unwrap()
            .spend(Outpoint::null(), 0)
            .dash_type(DashTxType::ProviderRegister)
            .unwrap()
            .extra_payload(vec![1, 2, 3])
            .unwrap()
            .build()
            .unwrap();
        let rebuilt = UtxoTxBuilder::from_tx_ref(&tx).locktime(7).build().unwrap();
        assert_eq!(rebuilt.dash(), tx.dash());
        assert_eq!(rebuilt.locktime, 7);

        let bytes = serialize_transaction(&rebuilt).unwrap();
        let parsed: UtxoTransaction<u64> =
            parse_transaction(&bytes, Network::DashTest, &ParseOptions::default()).unwrap();
        assert_eq!(parsed, rebuilt);
    }

    #[test]
    fn it_records_spent_values() {
        let script = Script::new(vec![0x76, 0xa9]);
        let tx = UtxoTxBuilder::<u64>::for_network(Network::BitcoinCash, &BuildOptions::default())
            .unwrap()
            .spend_with_value(Outpoint::null(), 0xffff_ffff, 5_000u64, vec![0x76u8, 0xa9])
            .pay_script_pubkey(4_000u64, vec![0x51u8])
            .build()
            .unwrap();
        assert_eq!(tx.inputs[0].value(), Some(5_000));

        let cached = compute_signature_hash(&tx, 0, &script, SighashType::ALL_FORKID, None).unwrap();
        let explicit =
            compute_signature_hash(&tx, 0, &script, SighashType::ALL_FORKID, Some(5_000u64)).unwrap();
        assert_eq!(cached, explicit);
    }

    #[test]
    fn it_inserts_at_clamped_indices() {
        let tx = UtxoTxBuilder::<u64>::for_network(Network::Litecoin, &BuildOptions::default())
            .unwrap()
            .pay_script_pubkey(1u64, vec![0x51u8])
            .insert_output(10, TxOut::new(2u64, vec![0x52u8]))
            .insert_output(0, TxOut::new(3u64, vec![0x53u8]))
            .insert_input(5, TxIn::new(Outpoint::null(), ScriptSig::null(), 1))
            .build()
            .unwrap();
        let values: Vec<u64> = tx.outputs.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![3, 1, 2]);
        assert_eq!(tx.inputs.len(), 1);
    }
}
