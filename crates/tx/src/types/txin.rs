//! Outpoint and TxIn types.

use std::io::{Read, Write};

use utxo_core::ser::{ByteFormat, SerError, SerResult};

use crate::{
    amount::{convert_amount, Amount},
    error::UtxoResult,
    hashes::TXID,
    types::script::{ScriptPubkey, ScriptSig, Witness},
};

/// An Outpoint. This is a unique identifier for a UTXO, and is composed of a transaction ID (in
/// Bitcoin-style LE format), and the index of the output being spent within that transactions
/// output vector (vout).
///
/// `Outpoint::null()` and `Outpoint::default()` return the null Outpoint, which references a txid
/// of all 0, and a index 0xffff_ffff. This null outpoint is used in every coinbase transaction.
#[derive(serde::Serialize, serde::Deserialize, Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Outpoint {
    /// The txid that created the UTXO being pointed to.
    pub txid: TXID,
    /// The index of that UTXO in the transaction's output vector.
    pub idx: u32,
}

impl Outpoint {
    /// Returns a new Outpoint from a digest and index
    pub fn new(txid: TXID, idx: u32) -> Self {
        Self { txid, idx }
    }

    /// Returns the `default`, or `null` Outpoint. This is used in the coinbase input.
    pub fn null() -> Self {
        Outpoint {
            txid: TXID::default(),
            idx: 0xffff_ffff,
        }
    }

    /// Instantiate an outpoint from a block explorer (big-endian) txid hex string
    pub fn from_explorer_format(txid_be: &str, idx: u32) -> SerResult<Self> {
        Ok(Self {
            txid: TXID::from_be_hex(txid_be)?,
            idx,
        })
    }
}

impl Default for Outpoint {
    fn default() -> Self {
        Outpoint::null()
    }
}

impl ByteFormat for Outpoint {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        36
    }

    fn read_from<T>(reader: &mut T, _limit: usize) -> SerResult<Self>
    where
        T: Read,
        Self: std::marker::Sized,
    {
        Ok(Outpoint {
            txid: TXID::read_from(reader, 0)?,
            idx: Self::read_u32_le(reader)?,
        })
    }

    fn write_to<T>(&self, writer: &mut T) -> SerResult<usize>
    where
        T: Write,
    {
        let mut len = self.txid.write_to(writer)?;
        len += Self::write_u32_le(writer, self.idx)?;
        Ok(len)
    }
}

/// A transaction input. This data structure contains an outpoint referencing an existing UTXO,
/// a `script_sig`, a sequence number, and the input's witness stack.
///
/// An input may also carry the value and locking script of the output it spends. These are
/// never serialized. They are populated only by `set_prevout`, by the transaction builder, or by
/// PSBT signing, and the codecs never fill them in on parse. Digest routines fall back to them
/// when the caller does not supply a value.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct TxIn<V: Amount = u64> {
    /// The Outpoint identifying the UTXO being spent.
    pub outpoint: Outpoint,
    /// For Legacy transactions, the authorization information necessary to spend the UTXO.
    pub script_sig: ScriptSig,
    /// The nSequence field
    pub sequence: u32,
    /// The witness stack. Empty for non-witness inputs.
    pub witness: Witness,
    pub(crate) value: Option<V>,
    pub(crate) prevout_script: Option<ScriptPubkey>,
}

impl<V: Amount> TxIn<V> {
    /// Instantiate a new TxIn
    pub fn new<T>(outpoint: Outpoint, script_sig: T, sequence: u32) -> Self
    where
        T: Into<ScriptSig>,
    {
        TxIn {
            outpoint,
            script_sig: script_sig.into(),
            sequence,
            witness: vec![],
            value: None,
            prevout_script: None,
        }
    }

    /// Copy the input, stripping the scriptsig and witness information.
    pub fn unsigned(&self) -> TxIn<V> {
        TxIn {
            script_sig: ScriptSig::null(),
            witness: vec![],
            ..self.clone()
        }
    }

    /// Record the value and locking script of the spent output.
    pub fn set_prevout(&mut self, value: V, script_pubkey: ScriptPubkey) {
        self.value = Some(value);
        self.prevout_script = Some(script_pubkey);
    }

    /// Forget the recorded spent output.
    pub fn clear_prevout(&mut self) {
        self.value = None;
        self.prevout_script = None;
    }

    /// The recorded value of the spent output, if any
    pub fn value(&self) -> Option<V> {
        self.value
    }

    /// The recorded locking script of the spent output, if any
    pub fn prevout_script(&self) -> Option<&ScriptPubkey> {
        self.prevout_script.as_ref()
    }

    /// True if the input carries a non-empty witness stack
    pub fn has_witness(&self) -> bool {
        !self.witness.is_empty()
    }

    /// Deep-copy the input, converting the recorded value.
    pub fn convert_amount<W: Amount>(&self) -> UtxoResult<TxIn<W>> {
        Ok(TxIn {
            outpoint: self.outpoint,
            script_sig: self.script_sig.clone(),
            sequence: self.sequence,
            witness: self.witness.clone(),
            value: self.value.map(convert_amount::<V, W>).transpose()?,
            prevout_script: self.prevout_script.clone(),
        })
    }
}

impl<V: Amount> ByteFormat for TxIn<V> {
    type Error = SerError;

    fn serialized_length(&self) -> usize {
        let mut len = self.outpoint.serialized_length();
        len += self.script_sig.serialized_length();
        len += 4; // sequence
        len
    }

    fn read_from<T>(reader: &mut T, _limit: usize) -> SerResult<Self>
    where
        T: Read,
        Self: std::marker::Sized,
    {
        Ok(TxIn::new(
            Outpoint::read_from(reader, 0)?,
            ScriptSig::read_from(reader, 0)?,
            Self::read_u32_le(reader)?,
        ))
    }

    fn write_to<T>(&self, writer: &mut T) -> SerResult<usize>
    where
        T: Write,
    {
        let mut len = self.outpoint.write_to(writer)?;
        len += self.script_sig.write_to(writer)?;
        len += Self::write_u32_le(writer, self.sequence)?;
        Ok(len)
    }
}
