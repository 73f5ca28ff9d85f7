//! Select the concrete PSBT type for a network.
//!
//! Zcash-family networks get a `ZcashPsbt`. Every other family, Dash included, uses the base
//! `UtxoPsbt`, whose transaction codec already carries the family's fields.

use utxo_tx::{
    hashes::SighashDigest, prelude::SighashType, BuildOptions, Network, NetworkFamily,
    ParseOptions, UtxoTransaction,
};

use crate::{common::PsbtResult, psbt::UtxoPsbt, zcash::ZcashPsbt};

/// A PSBT of whichever concrete type its network uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyPsbt {
    /// Bitcoin, its forks, Dash, Dogecoin and Litecoin
    Utxo(UtxoPsbt),
    /// Zcash and Komodo
    Zcash(ZcashPsbt),
}

fn uses_zcash_psbt(network: Network) -> bool {
    match network.family() {
        NetworkFamily::Zcash => true,
        NetworkFamily::Bitcoin
        | NetworkFamily::BitcoinCash
        | NetworkFamily::Ecash
        | NetworkFamily::BitcoinSv
        | NetworkFamily::BitcoinGold
        | NetworkFamily::Dash
        | NetworkFamily::Dogecoin
        | NetworkFamily::Litecoin => false,
    }
}

impl AnyPsbt {
    /// The network of the unsigned transaction
    pub fn network(&self) -> Network {
        self.psbt().network()
    }

    /// The base PSBT
    pub fn psbt(&self) -> &UtxoPsbt {
        match self {
            AnyPsbt::Utxo(psbt) => psbt,
            AnyPsbt::Zcash(psbt) => psbt.psbt(),
        }
    }

    /// The base PSBT, mutably
    pub fn psbt_mut(&mut self) -> &mut UtxoPsbt {
        match self {
            AnyPsbt::Utxo(psbt) => psbt,
            AnyPsbt::Zcash(psbt) => psbt.psbt_mut(),
        }
    }

    /// Calculate the signature digest of input `index` with the rules of the concrete type
    pub fn signature_hash(
        &self,
        index: usize,
        sighash: Option<SighashType>,
    ) -> PsbtResult<SighashDigest> {
        match self {
            AnyPsbt::Utxo(psbt) => psbt.signature_hash(index, sighash),
            AnyPsbt::Zcash(psbt) => psbt.signature_hash(index, sighash),
        }
    }

    /// Serialize the PSBT
    pub fn serialize(&mut self) -> PsbtResult<Vec<u8>> {
        match self {
            AnyPsbt::Utxo(psbt) => psbt.serialize(),
            AnyPsbt::Zcash(psbt) => psbt.serialize(),
        }
    }
}

impl From<UtxoPsbt> for AnyPsbt {
    fn from(psbt: UtxoPsbt) -> Self {
        AnyPsbt::Utxo(psbt)
    }
}

impl From<ZcashPsbt> for AnyPsbt {
    fn from(psbt: ZcashPsbt) -> Self {
        AnyPsbt::Zcash(psbt)
    }
}

/// Parse a PSBT for `network`.
///
/// ## Errors
///
/// - Any error of `UtxoPsbt::parse`, or of `ZcashPsbt::parse` on Zcash-family networks.
#[tracing::instrument(skip_all, fields(network = %network, len = bytes.len()), err)]
pub fn parse_psbt(bytes: &[u8], network: Network, options: &ParseOptions) -> PsbtResult<AnyPsbt> {
    if uses_zcash_psbt(network) {
        Ok(ZcashPsbt::parse(bytes, network, options)?.into())
    } else {
        Ok(UtxoPsbt::parse(bytes, network, options)?.into())
    }
}

/// Create a PSBT for `tx`. Script sigs and witnesses become finalized entries.
pub fn psbt_from_transaction(tx: &UtxoTransaction) -> PsbtResult<AnyPsbt> {
    if uses_zcash_psbt(tx.network) {
        Ok(ZcashPsbt::from_transaction(tx)?.into())
    } else {
        Ok(UtxoPsbt::from_transaction(tx)?.into())
    }
}

/// Create an empty PSBT for `network`.
///
/// ## Errors
///
/// - `UtxoError::InvalidArgument` if `options.version` is not allowed on the network.
pub fn new_psbt(network: Network, options: &BuildOptions) -> PsbtResult<AnyPsbt> {
    if uses_zcash_psbt(network) {
        Ok(ZcashPsbt::new(network, options)?.into())
    } else {
        Ok(UtxoPsbt::new(network, options)?.into())
    }
}

/// Serialize a PSBT. The in-memory maps are left unchanged.
#[tracing::instrument(skip_all, fields(network = %psbt.network()), err)]
pub fn serialize_psbt(psbt: &mut AnyPsbt) -> PsbtResult<Vec<u8>> {
    psbt.serialize()
}
