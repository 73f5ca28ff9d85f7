//! The v5 transaction id and signature digests (ZIP244).
//!
//! The digest is a tree of personalized BLAKE2b-256 hashes: a header digest, a transparent
//! digest, and the Sapling and Orchard bundle digests, combined under a tag carrying the
//! consensus branch id. Both shielded bundles are empty here.
//!
//! - https://zips.z.cash/zip-0244

use std::io::Write;

use utxo_core::{
    hashes::{blake2b256, Blake2b256Digest, Blake2b256Writer, MarkedDigestWriter},
    ser::{write_prefix_bytes, ByteFormat},
};

use crate::{
    amount::Amount,
    error::{UtxoError, UtxoResult},
    hashes::{SighashDigest, TXID},
    legacy::write_u32,
    tx::{UtxoTransaction, ZcashExtension},
    types::{Script, SighashType, TxIn},
    zcash::{branch_personalization, codec::header},
};

const HEADERS_PERSONALIZATION: &[u8; 16] = b"ZTxIdHeadersHash";
const TRANSPARENT_PERSONALIZATION: &[u8; 16] = b"ZTxIdTranspaHash";
const PREVOUTS_PERSONALIZATION: &[u8; 16] = b"ZTxIdPrevoutHash";
const SEQUENCE_PERSONALIZATION: &[u8; 16] = b"ZTxIdSequencHash";
const OUTPUTS_PERSONALIZATION: &[u8; 16] = b"ZTxIdOutputsHash";
const SAPLING_PERSONALIZATION: &[u8; 16] = b"ZTxIdSaplingHash";
const ORCHARD_PERSONALIZATION: &[u8; 16] = b"ZTxIdOrchardHash";
const AMOUNTS_PERSONALIZATION: &[u8; 16] = b"ZTxTrAmountsHash";
const SCRIPTS_PERSONALIZATION: &[u8; 16] = b"ZTxTrScriptsHash";
const TXIN_PERSONALIZATION: &[u8; 16] = b"Zcash___TxInHash";
const TX_HASH_TAG: &[u8; 12] = b"ZcashTxHash_";

fn header_digest<V: Amount>(
    tx: &UtxoTransaction<V>,
    ext: &ZcashExtension,
) -> UtxoResult<Blake2b256Digest> {
    let mut w = Blake2b256Writer::personalized(HEADERS_PERSONALIZATION);
    write_u32(&mut w, header(tx, ext)?)?;
    write_u32(&mut w, ext.version_group_id)?;
    write_u32(&mut w, ext.consensus_branch_id)?;
    write_u32(&mut w, tx.locktime)?;
    write_u32(&mut w, ext.expiry_height)?;
    Ok(w.finish())
}

fn prevouts_digest<V: Amount>(inputs: &[TxIn<V>]) -> UtxoResult<Blake2b256Digest> {
    let mut w = Blake2b256Writer::personalized(PREVOUTS_PERSONALIZATION);
    for input in inputs.iter() {
        input.outpoint.write_to(&mut w)?;
    }
    Ok(w.finish())
}

fn sequence_digest<V: Amount>(inputs: &[TxIn<V>]) -> UtxoResult<Blake2b256Digest> {
    let mut w = Blake2b256Writer::personalized(SEQUENCE_PERSONALIZATION);
    for input in inputs.iter() {
        write_u32(&mut w, input.sequence)?;
    }
    Ok(w.finish())
}

fn outputs_digest<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<Blake2b256Digest> {
    let mut w = Blake2b256Writer::personalized(OUTPUTS_PERSONALIZATION);
    for output in tx.outputs.iter() {
        output.write_to(&mut w)?;
    }
    Ok(w.finish())
}

fn transparent_digest<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<Blake2b256Digest> {
    if tx.inputs.is_empty() && tx.outputs.is_empty() {
        return Ok(blake2b256(TRANSPARENT_PERSONALIZATION, &[]));
    }
    let mut w = Blake2b256Writer::personalized(TRANSPARENT_PERSONALIZATION);
    w.write_all(&prevouts_digest(&tx.inputs)?)?;
    w.write_all(&sequence_digest(&tx.inputs)?)?;
    w.write_all(&outputs_digest(tx)?)?;
    Ok(w.finish())
}

fn combine(
    ext: &ZcashExtension,
    header: &Blake2b256Digest,
    transparent: &Blake2b256Digest,
) -> UtxoResult<Blake2b256Digest> {
    let personal = branch_personalization(TX_HASH_TAG, ext.consensus_branch_id);
    let mut w = Blake2b256Writer::personalized(&personal);
    w.write_all(header)?;
    w.write_all(transparent)?;
    w.write_all(&blake2b256(SAPLING_PERSONALIZATION, &[]))?;
    w.write_all(&blake2b256(ORCHARD_PERSONALIZATION, &[]))?;
    Ok(w.finish())
}

/// Calculate the txid of a v5 transaction.
pub fn txid_digest<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<TXID> {
    let ext = tx.require_zcash("zip244::txid_digest")?;
    let digest = combine(ext, &header_digest(tx, ext)?, &transparent_digest(tx)?)?;
    Ok(TXID(digest))
}

/// The value and prevout script of every input. The signed input uses the given ones, every other
/// input must have them recorded with `TxIn::set_prevout`.
fn spent_outputs<'a, V: Amount>(
    tx: &'a UtxoTransaction<V>,
    index: usize,
    prevout_script: &'a Script,
    value: V,
) -> UtxoResult<Vec<(V, &'a [u8])>> {
    tx.inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            if i == index {
                return Ok((value, prevout_script.items()));
            }
            match (input.value(), input.prevout_script()) {
                (Some(value), Some(script)) => Ok((value, script.items())),
                _ => Err(UtxoError::InvalidArgument(format!(
                    "zip244 digests commit to every spent output, input {} has none recorded",
                    i
                ))),
            }
        })
        .collect()
}

fn transparent_sig_digest<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    value: V,
    sighash: SighashType,
) -> UtxoResult<Blake2b256Digest> {
    let input = tx.inputs.get(index).ok_or_else(|| {
        UtxoError::InvalidArgument(format!(
            "input index {} out of range for {} inputs",
            index,
            tx.inputs.len()
        ))
    })?;
    let acp = sighash.anyone_can_pay();

    let (prevouts, amounts, scripts, sequences) = if acp {
        (
            prevouts_digest::<V>(&[])?,
            blake2b256(AMOUNTS_PERSONALIZATION, &[]),
            blake2b256(SCRIPTS_PERSONALIZATION, &[]),
            sequence_digest::<V>(&[])?,
        )
    } else {
        let spent = spent_outputs(tx, index, prevout_script, value)?;
        let mut amounts = Blake2b256Writer::personalized(AMOUNTS_PERSONALIZATION);
        let mut scripts = Blake2b256Writer::personalized(SCRIPTS_PERSONALIZATION);
        for (value, script) in spent.iter() {
            amounts.write_all(&value.as_wire_value()?.to_le_bytes())?;
            write_prefix_bytes(&mut scripts, script)?;
        }
        (
            prevouts_digest(&tx.inputs)?,
            amounts.finish(),
            scripts.finish(),
            sequence_digest(&tx.inputs)?,
        )
    };

    let outputs = if !sighash.is_single() && !sighash.is_none() {
        outputs_digest(tx)?
    } else if sighash.is_single() && index < tx.outputs.len() {
        let mut w = Blake2b256Writer::personalized(OUTPUTS_PERSONALIZATION);
        tx.outputs[index].write_to(&mut w)?;
        w.finish()
    } else {
        blake2b256(OUTPUTS_PERSONALIZATION, &[])
    };

    let mut txin = Blake2b256Writer::personalized(TXIN_PERSONALIZATION);
    input.outpoint.write_to(&mut txin)?;
    txin.write_all(&value.as_wire_value()?.to_le_bytes())?;
    prevout_script.write_to(&mut txin)?;
    write_u32(&mut txin, input.sequence)?;

    let mut w = Blake2b256Writer::personalized(TRANSPARENT_PERSONALIZATION);
    w.write_all(&[sighash.0])?;
    w.write_all(&prevouts)?;
    w.write_all(&amounts)?;
    w.write_all(&scripts)?;
    w.write_all(&sequences)?;
    w.write_all(&outputs)?;
    w.write_all(&txin.finish())?;
    Ok(w.finish())
}

/// Calculate the signature digest of transparent input `index` of a v5 transaction.
///
/// Unless the sighash type is ANYONECANPAY, the digest commits to the value and script of every
/// spent output. The other inputs must carry them.
pub fn signature_digest<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    value: V,
    sighash: SighashType,
) -> UtxoResult<SighashDigest> {
    let ext = tx.require_zcash("zip244::signature_digest")?;
    let transparent = transparent_sig_digest(tx, index, prevout_script, value, sighash)?;
    let digest = combine(ext, &header_digest(tx, ext)?, &transparent)?;
    Ok(SighashDigest(digest))
}
