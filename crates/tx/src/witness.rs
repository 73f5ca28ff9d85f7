//! The BIP143 signature digest. Used for native segwit inputs, and by the fork-id families for
//! every input.
//!
//! For BIP143 (Witness and Compatibility sighash) documentation, see here:
//!
//! - https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki

use std::io::Write;

use utxo_core::{
    hashes::{Hash256Digest, Hash256Writer, MarkedDigestWriter},
    ser::ByteFormat,
};

use crate::{
    amount::Amount,
    error::{UtxoError, UtxoResult},
    hashes::SighashDigest,
    legacy::write_u32,
    tx::UtxoTransaction,
    types::{Script, SighashType},
};

/// Calculates `hash_prevouts` according to BIP143 semantics.
pub(crate) fn hash_prevouts<V: Amount>(
    tx: &UtxoTransaction<V>,
    sighash: SighashType,
) -> UtxoResult<Hash256Digest> {
    if sighash.anyone_can_pay() {
        return Ok(Hash256Digest::default());
    }
    let mut w = Hash256Writer::default();
    for input in tx.inputs.iter() {
        input.outpoint.write_to(&mut w)?;
    }
    Ok(w.finish())
}

/// Calculates `hash_sequence` according to BIP143 semantics.
pub(crate) fn hash_sequence<V: Amount>(
    tx: &UtxoTransaction<V>,
    sighash: SighashType,
) -> UtxoResult<Hash256Digest> {
    if sighash.anyone_can_pay() || sighash.is_single() || sighash.is_none() {
        return Ok(Hash256Digest::default());
    }
    let mut w = Hash256Writer::default();
    for input in tx.inputs.iter() {
        write_u32(&mut w, input.sequence)?;
    }
    Ok(w.finish())
}

/// Calculates `hash_outputs` according to BIP143 semantics.
pub(crate) fn hash_outputs<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    sighash: SighashType,
) -> UtxoResult<Hash256Digest> {
    if !sighash.is_single() && !sighash.is_none() {
        let mut w = Hash256Writer::default();
        for output in tx.outputs.iter() {
            output.write_to(&mut w)?;
        }
        Ok(w.finish())
    } else if sighash.is_single() && index < tx.outputs.len() {
        let mut w = Hash256Writer::default();
        tx.outputs[index].write_to(&mut w)?;
        Ok(w.finish())
    } else {
        Ok(Hash256Digest::default())
    }
}

/// Calculate the BIP143 digest of input `index`. `hash_type` is the full 32-bit value to commit
/// to. Fork-id families pass the sighash byte with the fork id folded in.
pub fn witness_v0_signature_hash<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    value: V,
    hash_type: u32,
) -> UtxoResult<SighashDigest> {
    let input = tx.inputs.get(index).ok_or_else(|| {
        UtxoError::InvalidArgument(format!(
            "input index {} out of range for {} inputs",
            index,
            tx.inputs.len()
        ))
    })?;
    let sighash = SighashType(hash_type as u8);

    let mut w = Hash256Writer::default();
    write_u32(&mut w, tx.version as u32)?;
    w.write_all(&hash_prevouts(tx, sighash)?)?;
    w.write_all(&hash_sequence(tx, sighash)?)?;
    input.outpoint.write_to(&mut w)?;
    prevout_script.write_to(&mut w)?;
    w.write_all(&value.as_wire_value()?.to_le_bytes())?;
    write_u32(&mut w, input.sequence)?;
    w.write_all(&hash_outputs(tx, index, sighash)?)?;
    write_u32(&mut w, tx.locktime)?;
    write_u32(&mut w, hash_type)?;
    Ok(w.finish_marked())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        dispatch::TxCodec,
        legacy::BitcoinCodec,
        nets::Network,
        tx::ParseOptions,
    };

    #[test]
    fn it_calculates_witness_sighashes() {
        let tx_hex = "02000000000101ee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffff0173d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f18700cafd0700";
        let bytes = hex::decode(tx_hex).unwrap();
        let tx: UtxoTransaction<u64> =
            BitcoinCodec::decode(&mut bytes.as_slice(), Network::Testnet, &ParseOptions::default())
                .unwrap();
        let script = Script::deserialize_hex("160014758ce550380d964051086798d6546bebdca27a73").unwrap();

        let cases = [
            (0x01, "135754ab872e4943f7a9c30d6143c4c7187e33d0f63c75ec82a7f9a15e2f2d00"),
            (0x81, "cc7438d5b15e93ba612dcd227cf1937c35273675b3aa7d1b771573667376ddf6"),
            (0x03, "d04631d2742e6fd8e80e2e4309dece65becca41d37fd6bc0bcba041c52d824d5"),
            (0x83, "ffea9cdda07170af9bc9967cedf485e9fe15b78a622e0c196c0b6fc64f40c615"),
        ];
        for (hash_type, expected) in cases.iter() {
            let digest = witness_v0_signature_hash(&tx, 0, &script, 120_000u64, *hash_type).unwrap();
            assert_eq!(hex::encode(digest.0), *expected);
        }
    }

    #[test]
    fn it_rejects_out_of_range_witness_inputs() {
        let tx = UtxoTransaction::<u64>::new(
            Network::Bitcoin,
            2,
            vec![],
            vec![],
            0,
            crate::tx::Extension::None,
        )
        .unwrap();
        assert!(matches!(
            witness_v0_signature_hash(&tx, 0, &Script::null(), 1u64, 1),
            Err(UtxoError::InvalidArgument(_))
        ));
    }
}
