//! The Zcash versioned transaction codec.

use std::io::{Read, Write};

use utxo_core::{
    hashes::{Hash256Writer, MarkedDigestWriter},
    ser::read_compact_int,
};

use crate::{
    amount::Amount,
    dispatch::{SignatureHasher, TxCodec},
    error::{UtxoError, UtxoResult},
    hashes::{SighashDigest, TXID},
    legacy::{
        inputs_length, legacy_signature_hash, outputs_length, read_i64, read_inputs, read_outputs,
        read_u32, write_inputs, write_outputs, write_u32,
    },
    nets::Network,
    tx::{Extension, ParseOptions, UtxoTransaction, ZcashExtension},
    types::{Script, SighashType},
    zcash::{consensus::resolve_version, zip243, zip244, MAX_VERSION},
};

const OVERWINTERED_FLAG: u32 = 1 << 31;

/// The Zcash codec. Handles every Zcash-family network, including Komodo.
#[derive(Debug, Clone, Copy)]
pub struct ZcashCodec;

/// Check that a version is one the codec can write
fn checked_version(version: i32) -> UtxoResult<u32> {
    match version {
        1..=5 => Ok(version as u32),
        _ => Err(UtxoError::UnsupportedTransaction(format!(
            "zcash transaction version {}",
            version
        ))),
    }
}

/// The 4-byte header: the version with the overwintered bit on top.
///
/// The bit must be set exactly when the version is 3 or later. Anything else would not parse
/// back.
pub(crate) fn header<V: Amount>(tx: &UtxoTransaction<V>, ext: &ZcashExtension) -> UtxoResult<u32> {
    let version = checked_version(tx.version)?;
    if ext.overwintered != (version >= 3) {
        return Err(UtxoError::InvalidArgument(format!(
            "overwintered flag {} with version {}",
            ext.overwintered, version
        )));
    }
    Ok(if ext.overwintered {
        version | OVERWINTERED_FLAG
    } else {
        version
    })
}

fn require_empty<R: Read>(reader: &mut R, what: &str) -> UtxoResult<()> {
    let count = read_compact_int(reader)?;
    if count != 0 {
        return Err(UtxoError::UnsupportedTransaction(format!(
            "{} {} present",
            count, what
        )));
    }
    Ok(())
}

fn write_empty<W: Write>(writer: &mut W, count: usize) -> UtxoResult<usize> {
    writer.write_all(&vec![0u8; count])?;
    Ok(count)
}

/// Pick the consensus branch id of a pre-v5 transaction
fn assign_branch_id(network: Network, version: u32, options: &ParseOptions) -> UtxoResult<u32> {
    let table = network.params().branch_ids.ok_or_else(|| {
        UtxoError::IllegalState(format!("{} has no consensus branch ids", network))
    })?;
    let branch_id = match options.version {
        Some(selector) => {
            let selection = resolve_version(selector)?;
            if selection.wire_version != version {
                return Err(UtxoError::InvalidArgument(format!(
                    "requested version {} but transaction has version {}",
                    selector, version
                )));
            }
            match selection.branch_id {
                Some(branch_id) => branch_id,
                None => table.branch_id(version)?,
            }
        }
        None => table.branch_id(version)?,
    };
    tracing::debug!(version, branch_id, "assigned consensus branch id");
    Ok(branch_id)
}

impl TxCodec for ZcashCodec {
    fn decode<V: Amount>(
        reader: &mut &[u8],
        network: Network,
        options: &ParseOptions,
    ) -> UtxoResult<UtxoTransaction<V>> {
        let raw_header = read_u32(reader)?;
        let overwintered = raw_header & OVERWINTERED_FLAG != 0;
        let version = raw_header & !OVERWINTERED_FLAG;
        if version == 0 || version > MAX_VERSION {
            return Err(UtxoError::UnsupportedTransaction(format!(
                "zcash transaction version {}",
                version
            )));
        }
        if overwintered != (version >= 3) {
            return Err(UtxoError::UnsupportedTransaction(format!(
                "overwintered flag {} with version {}",
                overwintered, version
            )));
        }

        let version_group_id = if version >= 3 { read_u32(reader)? } else { 0 };

        let (mut consensus_branch_id, mut locktime, mut expiry_height) = (0, 0, 0);
        if version == 5 {
            consensus_branch_id = read_u32(reader)?;
            locktime = read_u32(reader)?;
            expiry_height = read_u32(reader)?;
        }

        let inputs = read_inputs(reader)?;
        let outputs = read_outputs(reader)?;

        if version < 5 {
            locktime = read_u32(reader)?;
            if version >= 3 {
                expiry_height = read_u32(reader)?;
            }
        }

        if version == 4 {
            let value_balance = read_i64(reader)?;
            if value_balance != 0 {
                return Err(UtxoError::UnsupportedTransaction(format!(
                    "sapling value balance {}",
                    value_balance
                )));
            }
            require_empty(reader, "sapling spends")?;
            require_empty(reader, "sapling outputs")?;
        }
        if (2..=4).contains(&version) {
            require_empty(reader, "join-splits")?;
        }
        if version == 5 {
            require_empty(reader, "sapling spends")?;
            require_empty(reader, "sapling outputs")?;
            require_empty(reader, "orchard actions")?;
            if let Some(selector) = options.version {
                let selection = resolve_version(selector)?;
                if selection.wire_version != version {
                    return Err(UtxoError::InvalidArgument(format!(
                        "requested version {} but transaction has version {}",
                        selector, version
                    )));
                }
            }
        } else {
            consensus_branch_id = assign_branch_id(network, version, options)?;
        }

        Ok(UtxoTransaction {
            network,
            version: version as i32,
            inputs,
            outputs,
            locktime,
            extension: Extension::Zcash(ZcashExtension {
                overwintered,
                version_group_id,
                expiry_height,
                consensus_branch_id,
            }),
        })
    }

    fn encode<V: Amount, W: Write>(
        tx: &UtxoTransaction<V>,
        writer: &mut W,
        _with_witness: bool,
    ) -> UtxoResult<usize> {
        let ext = tx.require_zcash("ZcashCodec::encode")?;
        let header = header(tx, ext)?;
        let version = header & !OVERWINTERED_FLAG;

        let mut len = write_u32(writer, header)?;
        if version >= 3 {
            len += write_u32(writer, ext.version_group_id)?;
        }
        if version == 5 {
            len += write_u32(writer, ext.consensus_branch_id)?;
            len += write_u32(writer, tx.locktime)?;
            len += write_u32(writer, ext.expiry_height)?;
        }

        len += write_inputs(writer, &tx.inputs)?;
        len += write_outputs(writer, &tx.outputs)?;

        if version < 5 {
            len += write_u32(writer, tx.locktime)?;
            if version >= 3 {
                len += write_u32(writer, ext.expiry_height)?;
            }
        }
        len += write_empty(writer, empty_bundle_length(version))?;
        Ok(len)
    }

    fn byte_length<V: Amount>(tx: &UtxoTransaction<V>, _with_witness: bool) -> UtxoResult<usize> {
        let ext = tx.require_zcash("ZcashCodec::byte_length")?;
        let version = header(tx, ext)? & !OVERWINTERED_FLAG;

        let mut len = 4; // header
        if version >= 3 {
            len += 8; // version group id and expiry height
        }
        if version == 5 {
            len += 4; // consensus branch id
        }
        len += inputs_length(&tx.inputs);
        len += outputs_length(&tx.outputs);
        len += 4; // locktime
        len += empty_bundle_length(version);
        Ok(len)
    }
}

/// The number of bytes written after the transparent fields to mark every shielded bundle empty.
fn empty_bundle_length(version: u32) -> usize {
    match version {
        // value balance, spends, outputs, join-splits
        4 => 8 + 1 + 1 + 1,
        2 | 3 => 1,
        // sapling spends, sapling outputs, orchard actions
        5 => 3,
        _ => 0,
    }
}

impl SignatureHasher for ZcashCodec {
    fn signature_hash<V: Amount>(
        tx: &UtxoTransaction<V>,
        index: usize,
        prevout_script: &Script,
        sighash: SighashType,
        value: Option<V>,
    ) -> UtxoResult<SighashDigest> {
        tx.require_zcash("ZcashCodec::signature_hash")?;
        match checked_version(tx.version)? {
            1 | 2 => {
                legacy_signature_hash::<ZcashCodec, V>(tx, index, prevout_script, sighash.0 as u32)
            }
            version => {
                let value = value
                    .or_else(|| tx.inputs.get(index).and_then(|input| input.value()))
                    .ok_or_else(|| {
                        UtxoError::InvalidArgument(format!(
                            "zcash v{} digests commit to the value of input {}, which is required",
                            version, index
                        ))
                    })?;
                if version == 5 {
                    zip244::signature_digest(tx, index, prevout_script, value, sighash)
                } else {
                    zip243::signature_digest(tx, index, prevout_script, value, sighash)
                }
            }
        }
    }

    fn txid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<TXID> {
        tx.require_zcash("ZcashCodec::txid")?;
        if tx.version == 5 {
            return zip244::txid_digest(tx);
        }
        let mut w = Hash256Writer::default();
        Self::encode(tx, &mut w, false)?;
        Ok(w.finish_marked())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::zcash::consensus::*;
    use utxo_core::ser::ByteFormat;

    // A transparent v4 mainnet transaction
    static V4_TX: &str = "0400008085202f8901f3f783c96b13300b5e367932bf6b1564a70618533a560883c45135befcd34ae4000000006b483045022100d87c30f166735d066c042102dfc84cacd752d52d120b8d8874befd311e929b620220232a98a43fa5caaaa632ce2d146b33eeab03a0745e3053499d331a077fb3c0c2012103f9a7e5382eebb78faacfd5670b03510157818d5167e1e193a860cdced855971cfeffffff02f04902000000000017a914b6d8b6eb2655e56e5d98dcd6f4e4e7c80d20f2bb8729260b3b000000001976a914a767bab91d8ce7a869d69cd956e35a526d45d82888aca5110000c41100000000000000000000000000";

    pub(crate) fn decode_with(hex_tx: &str, options: &ParseOptions) -> UtxoResult<UtxoTransaction<u64>> {
        let bytes = hex::decode(hex_tx).unwrap();
        let mut reader = bytes.as_slice();
        let tx = ZcashCodec::decode(&mut reader, Network::Zcash, options)?;
        assert!(reader.is_empty());
        Ok(tx)
    }

    fn encode(tx: &UtxoTransaction<u64>) -> String {
        let mut buf = vec![];
        let len = ZcashCodec::encode(tx, &mut buf, false).unwrap();
        assert_eq!(len, buf.len());
        assert_eq!(ZcashCodec::byte_length(tx, false).unwrap(), len);
        hex::encode(buf)
    }

    #[test]
    fn it_round_trips_v4_transactions() {
        let tx = decode_with(V4_TX, &ParseOptions::default()).unwrap();
        let ext = tx.zcash().unwrap();
        assert_eq!(tx.version, 4);
        assert!(ext.overwintered);
        assert_eq!(ext.version_group_id, SAPLING_VERSION_GROUP_ID);
        assert_eq!(ext.expiry_height, 4548);
        assert_eq!(ext.consensus_branch_id, NU5_BRANCH_ID);
        assert_eq!(tx.locktime, 4517);
        assert_eq!(tx.inputs[0].sequence, 4294967294);
        assert_eq!(tx.outputs[0].value, 150000);
        assert_eq!(tx.outputs[1].value, 990586409);
        assert_eq!(
            tx.inputs[0].outpoint.txid.to_be_hex(),
            "e44ad3fcbe3551c48308563a531806a764156bbf3279365e0b30136bc983f7f3"
        );
        assert_eq!(encode(&tx), V4_TX);
    }

    #[test]
    fn it_assigns_branch_ids_from_selectors() {
        let options = ParseOptions {
            version: Some(VERSION4_BRANCH_CANOPY),
            strict: true,
        };
        let tx = decode_with(V4_TX, &options).unwrap();
        assert_eq!(tx.zcash().unwrap().consensus_branch_id, CANOPY_BRANCH_ID);

        let options = ParseOptions {
            version: Some(4),
            strict: true,
        };
        let tx = decode_with(V4_TX, &options).unwrap();
        assert_eq!(tx.zcash().unwrap().consensus_branch_id, NU5_BRANCH_ID);

        let options = ParseOptions {
            version: Some(VERSION5_BRANCH_NU5),
            strict: true,
        };
        assert!(matches!(
            decode_with(V4_TX, &options),
            Err(UtxoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn it_uses_the_komodo_branch_table() {
        let bytes = hex::decode(V4_TX).unwrap();
        let tx: UtxoTransaction<u64> =
            ZcashCodec::decode(&mut bytes.as_slice(), Network::Komodo, &ParseOptions::default())
                .unwrap();
        assert_eq!(tx.zcash().unwrap().consensus_branch_id, SAPLING_BRANCH_ID);
    }

    #[test]
    fn it_refuses_shielded_content() {
        let tail = V4_TX.len() - 22;
        let cases = [
            // nonzero value balance
            format!("{}0100000000000000000000", &V4_TX[..tail]),
            // a sapling spend
            format!("{}0000000000000000010000", &V4_TX[..tail]),
            // a join-split
            format!("{}0000000000000000000001", &V4_TX[..tail]),
        ];
        for case in cases.iter() {
            match decode_with(case, &ParseOptions::default()) {
                Err(UtxoError::UnsupportedTransaction(_)) => {}
                e => panic!("expected UnsupportedTransaction, got {:?}", e),
            }
        }
    }

    #[test]
    fn it_refuses_inconsistent_headers() {
        // v4 without the overwintered bit
        let unflagged = format!("04000000{}", &V4_TX[8..]);
        assert!(matches!(
            decode_with(&unflagged, &ParseOptions::default()),
            Err(UtxoError::UnsupportedTransaction(_))
        ));
        // v6
        let v6 = format!("06000080{}", &V4_TX[8..]);
        assert!(matches!(
            decode_with(&v6, &ParseOptions::default()),
            Err(UtxoError::UnsupportedTransaction(_))
        ));
    }

    #[test]
    fn it_round_trips_every_version() {
        let v4 = decode_with(V4_TX, &ParseOptions::default()).unwrap();
        for version in 1..=5 {
            let mut tx = v4.clone();
            tx.version = version;
            let ext = tx.zcash_mut().unwrap();
            ext.overwintered = version >= 3;
            ext.version_group_id = default_version_group_id(version as u32);
            if version < 3 {
                ext.expiry_height = 0;
            }
            ext.consensus_branch_id = ZCASH_BRANCH_TABLE.branch_id(version as u32).unwrap();

            let hex_tx = encode(&tx);
            let parsed = decode_with(&hex_tx, &ParseOptions::default()).unwrap();
            assert_eq!(parsed, tx);
            assert_eq!(encode(&parsed), hex_tx);
        }
    }

    #[test]
    fn it_refuses_to_encode_inconsistent_headers() {
        let v4 = decode_with(V4_TX, &ParseOptions::default()).unwrap();

        let mut unflagged = v4.clone();
        unflagged.zcash_mut().unwrap().overwintered = false;
        assert!(matches!(
            ZcashCodec::byte_length(&unflagged, true),
            Err(UtxoError::InvalidArgument(_))
        ));
        let mut buf: Vec<u8> = vec![];
        assert!(matches!(
            ZcashCodec::encode(&unflagged, &mut buf, true),
            Err(UtxoError::InvalidArgument(_))
        ));

        let mut flagged_v2 = v4;
        flagged_v2.version = 2;
        flagged_v2.zcash_mut().unwrap().version_group_id = 0;
        assert!(matches!(
            ZcashCodec::encode(&flagged_v2, &mut buf, true),
            Err(UtxoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn it_hashes_v4_txids_with_sha256d() {
        let tx = decode_with(V4_TX, &ParseOptions::default()).unwrap();
        let bytes = hex::decode(V4_TX).unwrap();
        assert_eq!(
            ZcashCodec::txid(&tx).unwrap().0,
            utxo_core::hashes::hash256(&bytes)
        );
    }

    #[test]
    fn it_requires_values_for_overwinter_digests() {
        let tx = decode_with(V4_TX, &ParseOptions::default()).unwrap();
        let script = Script::deserialize_hex("1976a914a767bab91d8ce7a869d69cd956e35a526d45d82888ac").unwrap();
        assert!(matches!(
            ZcashCodec::signature_hash(&tx, 0, &script, SighashType::ALL, None),
            Err(UtxoError::InvalidArgument(_))
        ));
    }

    #[test]
    fn it_refuses_other_families() {
        let tx = UtxoTransaction::<u64>::new(Network::Bitcoin, 1, vec![], vec![], 0, Extension::None)
            .unwrap();
        assert!(matches!(
            ZcashCodec::txid(&tx),
            Err(UtxoError::IllegalState(_))
        ));
    }
}
