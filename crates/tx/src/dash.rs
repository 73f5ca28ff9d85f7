//! The Dash special-transaction codec.
//!
//! Dash splits the 4-byte version field into two little-endian halves. The low half is the real
//! version and the high half is a special-transaction type. Special transactions append one
//! length-prefixed payload after the locktime. Dash has no segwit.

use std::{convert::TryFrom, io::Write};

use utxo_core::{
    hashes::{Hash256Digest, Hash256Writer, MarkedDigestWriter},
    ser::{prefix_bytes_len, read_prefix_bytes, write_prefix_bytes, ByteFormat},
};

use crate::{
    amount::Amount,
    dispatch::{SignatureHasher, TxCodec},
    error::{UtxoError, UtxoResult},
    hashes::{SighashDigest, TXID, WTXID},
    legacy::{body_length, legacy_signature_hash, read_inputs, read_outputs, read_u32, write_body, write_u32},
    nets::Network,
    tx::{DashExtension, Extension, ParseOptions, UtxoTransaction},
    types::{Script, SighashType},
};

/// Dash special-transaction types.
#[repr(u16)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DashTxType {
    /// A classic transaction. Carries no payload on the wire unless one was present when parsed.
    #[default]
    Normal = 0,
    /// Masternode registration
    ProviderRegister = 1,
    /// Masternode service update
    ProviderUpdateService = 2,
    /// Masternode registrar update
    ProviderUpdateRegistrar = 3,
    /// Masternode revocation
    ProviderUpdateRevoke = 4,
    /// Coinbase payload carrier
    Coinbase = 5,
    /// LLMQ quorum commitment
    QuorumCommitment = 6,
}

impl TryFrom<u16> for DashTxType {
    type Error = UtxoError;

    fn try_from(value: u16) -> UtxoResult<Self> {
        match value {
            0 => Ok(DashTxType::Normal),
            1 => Ok(DashTxType::ProviderRegister),
            2 => Ok(DashTxType::ProviderUpdateService),
            3 => Ok(DashTxType::ProviderUpdateRegistrar),
            4 => Ok(DashTxType::ProviderUpdateRevoke),
            5 => Ok(DashTxType::Coinbase),
            6 => Ok(DashTxType::QuorumCommitment),
            _ => Err(UtxoError::UnsupportedTransaction(format!(
                "unknown dash special transaction type {}",
                value
            ))),
        }
    }
}

impl From<DashTxType> for u16 {
    fn from(t: DashTxType) -> u16 {
        t as u16
    }
}

/// Pack a version and a type into the wire version field
pub fn pack_version(version: i32, tx_type: DashTxType) -> u32 {
    (version as u32 & 0xffff) | ((u16::from(tx_type) as u32) << 16)
}

/// Split the wire version field into a version and a type.
///
/// ## Errors
///
/// - `UnsupportedTransaction` if the type is unknown.
pub fn unpack_version(packed: u32) -> UtxoResult<(i32, DashTxType)> {
    let tx_type = DashTxType::try_from((packed >> 16) as u16)?;
    Ok(((packed & 0xffff) as i32, tx_type))
}

/// The number of bytes the payload occupies on the wire, including its length prefix.
pub fn payload_length(payload: &Option<Vec<u8>>) -> usize {
    payload.as_deref().map(prefix_bytes_len).unwrap_or(0)
}

/// The Dash codec.
#[derive(Debug, Clone, Copy)]
pub struct DashCodec;

impl DashCodec {
    /// Double-SHA256 of every outpoint, or 32 zero bytes under ANYONECANPAY.
    pub fn prevout_hash<V: Amount>(
        tx: &UtxoTransaction<V>,
        sighash: SighashType,
    ) -> UtxoResult<Hash256Digest> {
        tx.require_dash("DashCodec::prevout_hash")?;
        if sighash.anyone_can_pay() {
            return Ok(Hash256Digest::default());
        }
        let mut w = Hash256Writer::default();
        for input in tx.inputs.iter() {
            input.outpoint.write_to(&mut w)?;
        }
        Ok(w.finish())
    }

    /// Dash has no segwit, so there is no witness txid.
    pub fn wtxid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<WTXID> {
        Err(UtxoError::WitnessUnsupported(tx.network.to_string()))
    }
}

impl TxCodec for DashCodec {
    fn decode<V: Amount>(
        reader: &mut &[u8],
        network: Network,
        options: &ParseOptions,
    ) -> UtxoResult<UtxoTransaction<V>> {
        let (version, tx_type) = unpack_version(read_u32(reader)?)?;
        let inputs = read_inputs(reader)?;
        let outputs = read_outputs(reader)?;
        let locktime = read_u32(reader)?;

        let extra_payload = if !reader.is_empty() && (options.strict || tx_type != DashTxType::Normal)
        {
            let payload = read_prefix_bytes(reader)?;
            tracing::debug!(?tx_type, len = payload.len(), "read dash payload");
            Some(payload)
        } else {
            None
        };

        Ok(UtxoTransaction {
            network,
            version,
            inputs,
            outputs,
            locktime,
            extension: Extension::Dash(DashExtension {
                tx_type,
                extra_payload,
            }),
        })
    }

    fn encode<V: Amount, W: Write>(
        tx: &UtxoTransaction<V>,
        writer: &mut W,
        _with_witness: bool,
    ) -> UtxoResult<usize> {
        let ext = tx.require_dash("DashCodec::encode")?;
        let mut len = write_u32(writer, pack_version(tx.version, ext.tx_type))?;
        len += write_body(tx, writer, false)?;
        if let Some(payload) = &ext.extra_payload {
            len += write_prefix_bytes(writer, payload)?;
        }
        Ok(len)
    }

    fn byte_length<V: Amount>(tx: &UtxoTransaction<V>, _with_witness: bool) -> UtxoResult<usize> {
        let ext = tx.require_dash("DashCodec::byte_length")?;
        Ok(4 + body_length(tx, false) + payload_length(&ext.extra_payload))
    }
}

impl SignatureHasher for DashCodec {
    fn signature_hash<V: Amount>(
        tx: &UtxoTransaction<V>,
        index: usize,
        prevout_script: &Script,
        sighash: SighashType,
        _value: Option<V>,
    ) -> UtxoResult<SighashDigest> {
        tx.require_dash("DashCodec::signature_hash")?;
        legacy_signature_hash::<DashCodec, V>(tx, index, prevout_script, sighash.0 as u32)
    }

    fn txid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<TXID> {
        let mut w = Hash256Writer::default();
        Self::encode(tx, &mut w, false)?;
        Ok(w.finish_marked())
    }
}
