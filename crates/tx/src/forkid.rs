//! Signature digests for the base codec families, including the fork-id convention.
//!
//! Bitcoin Cash, eCash, Bitcoin SV and Bitcoin Gold reuse the BIP143 digest for every input
//! when the sighash type requests it. The 24-bit fork id of the network is folded into bits
//! 8-31 of the committed hash type, while the signature itself still carries one byte.

use crate::{
    amount::Amount,
    dash::DashCodec,
    error::{UtxoError, UtxoResult},
    hashes::SighashDigest,
    legacy::{legacy_signature_hash, BitcoinCodec},
    nets::{Network, NetworkFamily},
    tx::UtxoTransaction,
    types::{Script, SighashType},
    witness::witness_v0_signature_hash,
};

/// True if `sighash` requests the fork-id digest on `network`. The standard flag and, where
/// the network honors it, the alternate flag are both accepted.
pub fn requests_fork_id(network: Network, sighash: SighashType) -> bool {
    let params = network.params();
    sighash.has_fork_id() || (params.supports_alt_fork_id_flag && sighash.has_alt_fork_id())
}

/// Fold the network's fork id into the hash type, if the fork-id digest is requested.
/// Otherwise return the hash type unchanged.
///
/// ```
/// use utxo_tx::{forkid::add_fork_id, nets::Network, types::SighashType};
///
/// assert_eq!(add_fork_id(Network::BitcoinCash, SighashType(0x41)), 0x41);
/// assert_eq!(add_fork_id(Network::BitcoinGold, SighashType(0x41)), 0x4f41);
/// assert_eq!(add_fork_id(Network::BitcoinGold, SighashType(0x01)), 0x01);
/// ```
pub fn add_fork_id(network: Network, sighash: SighashType) -> u32 {
    let hash_type = sighash.0 as u32;
    if requests_fork_id(network, sighash) {
        hash_type | (network.params().fork_id << 8)
    } else {
        hash_type
    }
}

/// Calculate the digest of input `index` by network family.
///
/// - Zcash-family transactions are an `IllegalState`. They use the Zcash codec's digests.
/// - Fork-id families use BIP143 with the adjusted hash type when the fork id is requested. A
///   value is then required.
/// - Everything else uses the legacy digest, serialized with the family's codec.
pub fn hash_for_signature_by_network<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    sighash: SighashType,
    value: Option<V>,
) -> UtxoResult<SighashDigest> {
    match tx.network.family() {
        NetworkFamily::Zcash => Err(UtxoError::IllegalState(format!(
            "{} transactions must use the zcash signature digests",
            tx.network
        ))),
        NetworkFamily::BitcoinCash
        | NetworkFamily::Ecash
        | NetworkFamily::BitcoinSv
        | NetworkFamily::BitcoinGold
            if requests_fork_id(tx.network, sighash) =>
        {
            let value = value.ok_or_else(|| {
                UtxoError::InvalidArgument(
                    "fork-id signature digests commit to the spent value, which is required"
                        .to_owned(),
                )
            })?;
            let hash_type = add_fork_id(tx.network, sighash);
            tracing::trace!(hash_type, index, "fork-id digest");
            witness_v0_signature_hash(tx, index, prevout_script, value, hash_type)
        }
        NetworkFamily::BitcoinCash
        | NetworkFamily::Ecash
        | NetworkFamily::BitcoinSv
        | NetworkFamily::BitcoinGold
        | NetworkFamily::Bitcoin
        | NetworkFamily::Litecoin
        | NetworkFamily::Dogecoin => {
            legacy_signature_hash::<BitcoinCodec, V>(tx, index, prevout_script, sighash.0 as u32)
        }
        NetworkFamily::Dash => {
            legacy_signature_hash::<DashCodec, V>(tx, index, prevout_script, sighash.0 as u32)
        }
    }
}

/// Calculate the digest of input `index`, falling back to the input's recorded prevout value
/// when `value` is `None`.
pub fn hash_for_signature<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    sighash: SighashType,
    value: Option<V>,
) -> UtxoResult<SighashDigest> {
    let value = value.or_else(|| tx.inputs.get(index).and_then(|input| input.value()));
    hash_for_signature_by_network(tx, index, prevout_script, sighash, value)
}

/// Calculate the BIP143 digest of a native segwit input. On Bitcoin Gold the fork id is folded
/// in as usual.
///
/// ## Errors
///
/// - `WitnessUnsupported` if the network has no segwit.
/// - `InvalidArgument` if no value is given or recorded.
pub fn compute_witness_v0_signature_hash<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    sighash: SighashType,
    value: Option<V>,
) -> UtxoResult<SighashDigest> {
    if !tx.network.params().supports_segwit {
        return Err(UtxoError::WitnessUnsupported(tx.network.to_string()));
    }
    let value = value
        .or_else(|| tx.inputs.get(index).and_then(|input| input.value()))
        .ok_or_else(|| {
            UtxoError::InvalidArgument(format!("no value given or recorded for input {}", index))
        })?;
    witness_v0_signature_hash(
        tx,
        index,
        prevout_script,
        value,
        add_fork_id(tx.network, sighash),
    )
}
