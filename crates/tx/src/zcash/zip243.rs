//! The Overwinter (ZIP143) and Sapling (ZIP243) signature digests.
//!
//! Both are BIP143 restructured around personalized BLAKE2b-256. The shielded components are
//! always empty here, so their digests are 32 zero bytes and the value balance is zero.
//!
//! - https://zips.z.cash/zip-0143
//! - https://zips.z.cash/zip-0243

use std::io::Write;

use utxo_core::{
    hashes::{Blake2b256Digest, Blake2b256Writer, MarkedDigestWriter},
    ser::ByteFormat,
};

use crate::{
    amount::Amount,
    error::{UtxoError, UtxoResult},
    hashes::SighashDigest,
    legacy::write_u32,
    tx::UtxoTransaction,
    types::{Script, SighashType},
    zcash::{branch_personalization, codec::header},
};

const PREVOUTS_PERSONALIZATION: &[u8; 16] = b"ZcashPrevoutHash";
const SEQUENCE_PERSONALIZATION: &[u8; 16] = b"ZcashSequencHash";
const OUTPUTS_PERSONALIZATION: &[u8; 16] = b"ZcashOutputsHash";
const SIGHASH_TAG: &[u8; 12] = b"ZcashSigHash";

fn hash_prevouts<V: Amount>(
    tx: &UtxoTransaction<V>,
    sighash: SighashType,
) -> UtxoResult<Blake2b256Digest> {
    if sighash.anyone_can_pay() {
        return Ok(Blake2b256Digest::default());
    }
    let mut w = Blake2b256Writer::personalized(PREVOUTS_PERSONALIZATION);
    for input in tx.inputs.iter() {
        input.outpoint.write_to(&mut w)?;
    }
    Ok(w.finish())
}

fn hash_sequence<V: Amount>(
    tx: &UtxoTransaction<V>,
    sighash: SighashType,
) -> UtxoResult<Blake2b256Digest> {
    if sighash.anyone_can_pay() || sighash.is_single() || sighash.is_none() {
        return Ok(Blake2b256Digest::default());
    }
    let mut w = Blake2b256Writer::personalized(SEQUENCE_PERSONALIZATION);
    for input in tx.inputs.iter() {
        write_u32(&mut w, input.sequence)?;
    }
    Ok(w.finish())
}

fn hash_outputs<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    sighash: SighashType,
) -> UtxoResult<Blake2b256Digest> {
    if !sighash.is_single() && !sighash.is_none() {
        let mut w = Blake2b256Writer::personalized(OUTPUTS_PERSONALIZATION);
        for output in tx.outputs.iter() {
            output.write_to(&mut w)?;
        }
        Ok(w.finish())
    } else if sighash.is_single() && index < tx.outputs.len() {
        let mut w = Blake2b256Writer::personalized(OUTPUTS_PERSONALIZATION);
        tx.outputs[index].write_to(&mut w)?;
        Ok(w.finish())
    } else {
        Ok(Blake2b256Digest::default())
    }
}

/// Calculate the ZIP143 (v3) or ZIP243 (v4) digest of input `index`. The digest is personalized
/// with the transaction's consensus branch id.
pub fn signature_digest<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    value: V,
    sighash: SighashType,
) -> UtxoResult<SighashDigest> {
    let ext = tx.require_zcash("zip243::signature_digest")?;
    let input = tx.inputs.get(index).ok_or_else(|| {
        UtxoError::InvalidArgument(format!(
            "input index {} out of range for {} inputs",
            index,
            tx.inputs.len()
        ))
    })?;
    let sapling = tx.version == 4;

    let personal = branch_personalization(SIGHASH_TAG, ext.consensus_branch_id);
    let mut w = Blake2b256Writer::personalized(&personal);
    write_u32(&mut w, header(tx, ext)?)?;
    write_u32(&mut w, ext.version_group_id)?;
    w.write_all(&hash_prevouts(tx, sighash)?)?;
    w.write_all(&hash_sequence(tx, sighash)?)?;
    w.write_all(&hash_outputs(tx, index, sighash)?)?;
    w.write_all(&[0u8; 32])?; // join-splits
    if sapling {
        w.write_all(&[0u8; 64])?; // shielded spends and outputs
    }
    write_u32(&mut w, tx.locktime)?;
    write_u32(&mut w, ext.expiry_height)?;
    if sapling {
        w.write_all(&0i64.to_le_bytes())?; // value balance
    }
    write_u32(&mut w, sighash.0 as u32)?;

    input.outpoint.write_to(&mut w)?;
    prevout_script.write_to(&mut w)?;
    w.write_all(&value.as_wire_value()?.to_le_bytes())?;
    write_u32(&mut w, input.sequence)?;
    Ok(w.finish_marked())
}
