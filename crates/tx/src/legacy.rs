//! The legacy base codec, shared wire helpers, and the legacy signature digest.
//!
//! The base wire format is used unchanged by Bitcoin, its fork-id forks, Litecoin and Dogecoin.
//! The Dash and Zcash codecs reuse its input, output and witness helpers.

use std::io::{Read, Write};

use utxo_core::{
    hashes::{Hash256Writer, MarkedDigestWriter},
    ser::{prefix_byte_len, read_compact_int, write_compact_int, ByteFormat},
};

use crate::{
    amount::Amount,
    dispatch::{SignatureHasher, TxCodec},
    error::{UtxoError, UtxoResult},
    forkid,
    hashes::{SighashDigest, TXID, WTXID},
    nets::Network,
    tx::{Extension, ParseOptions, UtxoTransaction},
    types::{Script, ScriptSig, SighashType, TxIn, TxOut, Witness, WitnessStackItem},
};

/// The digest returned by the legacy algorithm when the input index is out of range, or when
/// SIGHASH_SINGLE has no matching output. The reference node signs this value instead of failing.
pub const SIGHASH_ONE: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> UtxoResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_i64<R: Read>(reader: &mut R) -> UtxoResult<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, number: u32) -> UtxoResult<usize> {
    writer.write_all(&number.to_le_bytes())?;
    Ok(4)
}

pub(crate) fn read_inputs<V: Amount, R: Read>(reader: &mut R) -> UtxoResult<Vec<TxIn<V>>> {
    let count = read_compact_int(reader)?;
    let mut inputs = vec![];
    for _ in 0..count {
        inputs.push(TxIn::read_from(reader, 0)?);
    }
    Ok(inputs)
}

pub(crate) fn read_outputs<V: Amount, R: Read>(reader: &mut R) -> UtxoResult<Vec<TxOut<V>>> {
    let count = read_compact_int(reader)?;
    let mut outputs = vec![];
    for _ in 0..count {
        outputs.push(TxOut::read_from(reader, 0)?);
    }
    Ok(outputs)
}

pub(crate) fn read_witness<R: Read>(reader: &mut R) -> UtxoResult<Witness> {
    let count = read_compact_int(reader)?;
    let mut witness = vec![];
    for _ in 0..count {
        witness.push(WitnessStackItem::read_from(reader, 0)?);
    }
    Ok(witness)
}

pub(crate) fn write_inputs<V: Amount, W: Write>(
    writer: &mut W,
    inputs: &[TxIn<V>],
) -> UtxoResult<usize> {
    let mut len = write_compact_int(writer, inputs.len() as u64)?;
    for input in inputs.iter() {
        len += input.write_to(writer)?;
    }
    Ok(len)
}

pub(crate) fn write_outputs<V: Amount, W: Write>(
    writer: &mut W,
    outputs: &[TxOut<V>],
) -> UtxoResult<usize> {
    let mut len = write_compact_int(writer, outputs.len() as u64)?;
    for output in outputs.iter() {
        len += output.write_to(writer)?;
    }
    Ok(len)
}

pub(crate) fn write_witnesses<V: Amount, W: Write>(
    writer: &mut W,
    inputs: &[TxIn<V>],
) -> UtxoResult<usize> {
    let mut len = 0;
    for input in inputs.iter() {
        len += write_compact_int(writer, input.witness.len() as u64)?;
        for item in input.witness.iter() {
            len += item.write_to(writer)?;
        }
    }
    Ok(len)
}

pub(crate) fn inputs_length<V: Amount>(inputs: &[TxIn<V>]) -> usize {
    prefix_byte_len(inputs.len() as u64) as usize
        + inputs.iter().map(ByteFormat::serialized_length).sum::<usize>()
}

pub(crate) fn outputs_length<V: Amount>(outputs: &[TxOut<V>]) -> usize {
    prefix_byte_len(outputs.len() as u64) as usize
        + outputs.iter().map(ByteFormat::serialized_length).sum::<usize>()
}

pub(crate) fn witnesses_length<V: Amount>(inputs: &[TxIn<V>]) -> usize {
    inputs
        .iter()
        .map(|input| {
            prefix_byte_len(input.witness.len() as u64) as usize
                + input.witness.iter().map(ByteFormat::serialized_length).sum::<usize>()
        })
        .sum()
}

/// The byte length of everything the base codec writes after the version field: inputs,
/// outputs, optional witnesses and the locktime. The segwit marker is not included.
pub fn body_length<V: Amount>(tx: &UtxoTransaction<V>, with_witness: bool) -> usize {
    let mut len = inputs_length(&tx.inputs);
    len += outputs_length(&tx.outputs);
    if with_witness {
        len += witnesses_length(&tx.inputs);
    }
    len + 4 // locktime
}

/// Write inputs, outputs, optional witnesses and the locktime.
pub(crate) fn write_body<V: Amount, W: Write>(
    tx: &UtxoTransaction<V>,
    writer: &mut W,
    with_witness: bool,
) -> UtxoResult<usize> {
    let mut len = write_inputs(writer, &tx.inputs)?;
    len += write_outputs(writer, &tx.outputs)?;
    if with_witness {
        len += write_witnesses(writer, &tx.inputs)?;
    }
    len += write_u32(writer, tx.locktime)?;
    Ok(len)
}

/// The codec for the plain Bitcoin wire format, with BIP144 witness support on segwit networks.
#[derive(Debug, Clone, Copy)]
pub struct BitcoinCodec;

impl BitcoinCodec {
    /// Calculate the witness txid. Equal to the txid for transactions without witnesses.
    pub fn wtxid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<WTXID> {
        let mut w = Hash256Writer::default();
        Self::encode(tx, &mut w, true)?;
        Ok(w.finish_marked())
    }

    /// Decode the non-witness serialization. A zero byte after the version is an empty input
    /// vector, never a segwit marker.
    pub fn decode_without_witness<V: Amount>(
        reader: &mut &[u8],
        network: Network,
    ) -> UtxoResult<UtxoTransaction<V>> {
        Self::decode_base(reader, network, false)
    }

    fn decode_base<V: Amount>(
        reader: &mut &[u8],
        network: Network,
        allow_witness: bool,
    ) -> UtxoResult<UtxoTransaction<V>> {
        let version = read_u32(reader)? as i32;

        let mut segwit = false;
        if allow_witness && network.params().supports_segwit && reader.first() == Some(&0) {
            let mut flag = [0u8; 2];
            reader.read_exact(&mut flag)?;
            if flag != [0u8, 1u8] {
                return Err(UtxoError::BadWitnessFlag(flag));
            }
            segwit = true;
        }

        let mut inputs: Vec<TxIn<V>> = read_inputs(reader)?;
        let outputs = read_outputs(reader)?;
        if segwit {
            for input in inputs.iter_mut() {
                input.witness = read_witness(reader)?;
            }
        }
        let locktime = read_u32(reader)?;
        tracing::trace!(version, segwit, inputs = inputs.len(), "decoded base transaction");

        Ok(UtxoTransaction {
            network,
            version,
            inputs,
            outputs,
            locktime,
            extension: Extension::None,
        })
    }
}

impl TxCodec for BitcoinCodec {
    fn decode<V: Amount>(
        reader: &mut &[u8],
        network: Network,
        _options: &ParseOptions,
    ) -> UtxoResult<UtxoTransaction<V>> {
        Self::decode_base(reader, network, true)
    }

    fn encode<V: Amount, W: Write>(
        tx: &UtxoTransaction<V>,
        writer: &mut W,
        with_witness: bool,
    ) -> UtxoResult<usize> {
        let with_witness = with_witness && tx.has_witnesses();
        let mut len = write_u32(writer, tx.version as u32)?;
        if with_witness {
            writer.write_all(&[0u8, 1u8])?;
            len += 2;
        }
        len += write_body(tx, writer, with_witness)?;
        Ok(len)
    }

    fn byte_length<V: Amount>(tx: &UtxoTransaction<V>, with_witness: bool) -> UtxoResult<usize> {
        let with_witness = with_witness && tx.has_witnesses();
        let marker = if with_witness { 2 } else { 0 };
        Ok(4 + marker + body_length(tx, with_witness))
    }
}

impl SignatureHasher for BitcoinCodec {
    fn signature_hash<V: Amount>(
        tx: &UtxoTransaction<V>,
        index: usize,
        prevout_script: &Script,
        sighash: SighashType,
        value: Option<V>,
    ) -> UtxoResult<SighashDigest> {
        forkid::hash_for_signature(tx, index, prevout_script, sighash, value)
    }

    fn txid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<TXID> {
        let mut w = Hash256Writer::default();
        Self::encode(tx, &mut w, false)?;
        Ok(w.finish_marked())
    }
}

/// Calculate the legacy (pre-segwit) signature digest, serializing the modified transaction with
/// the family codec `C`.
///
/// `OP_CODESEPARATOR`s are removed from the script before it is committed to. An out-of-range
/// `index`, or SIGHASH_SINGLE without a matching output, yields `SIGHASH_ONE`.
///
/// For Legacy sighash documentation, see here:
///
/// - https://en.bitcoin.it/wiki/OP_CHECKSIG
pub fn legacy_signature_hash<C: TxCodec, V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    hash_type: u32,
) -> UtxoResult<SighashDigest> {
    let sighash = SighashType(hash_type as u8);
    if index >= tx.inputs.len() || (sighash.is_single() && index >= tx.outputs.len()) {
        return Ok(SighashDigest(SIGHASH_ONE));
    }

    let script_code: ScriptSig = (&prevout_script.without_code_separators()).into();
    let mut copy_tx = tx.clone();

    if sighash.is_none() {
        copy_tx.outputs.clear();
        zero_other_sequences(&mut copy_tx.inputs, index);
    } else if sighash.is_single() {
        copy_tx.outputs.truncate(index + 1);
        for output in copy_tx.outputs[..index].iter_mut() {
            *output = TxOut::null();
        }
        zero_other_sequences(&mut copy_tx.inputs, index);
    }

    if sighash.anyone_can_pay() {
        let mut input = copy_tx.inputs.swap_remove(index);
        input.script_sig = script_code;
        copy_tx.inputs = vec![input];
    } else {
        for (i, input) in copy_tx.inputs.iter_mut().enumerate() {
            input.script_sig = if i == index {
                script_code.clone()
            } else {
                ScriptSig::null()
            };
        }
    }

    let mut w = Hash256Writer::default();
    C::encode(&copy_tx, &mut w, false)?;
    w.write_all(&hash_type.to_le_bytes())?;
    Ok(w.finish_marked())
}

fn zero_other_sequences<V: Amount>(inputs: &mut [TxIn<V>], index: usize) {
    for (i, input) in inputs.iter_mut().enumerate() {
        if i != index {
            input.sequence = 0;
        }
    }
}
