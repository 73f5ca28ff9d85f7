//! The network family dispatcher.
//!
//! Every entry point here resolves the network to its `NetworkFamily` and selects the codec for
//! that family with one exhaustive match. Adding a family means adding a variant to
//! `NetworkFamily` and an arm to `with_codec!`. The compiler finds everything else.
//!
//! ```
//! use utxo_tx::prelude::*;
//!
//! let raw = hex::decode(
//!     "0100000001813f79011acb80925dfe69b3def355fe914bd1d96a3f5f71bf8303c6a989c7d1000000006b48\
//!      3045022100ed81ff192e75a3fd2304004dcadb746fa5e24c5031ccfcf21320b0277457c98f02207a986d95\
//!      5c6e0cb35d446a89d3f56100f4d7f67801c31967743a9c8e10615bed01210349fc4e631e3624a545de3f89\
//!      f5d8684c7b8138bd94bdd531d2e213bf016b278afeffffff02a135ef01000000001976a914bc3b654dca7e\
//!      56b04dca18f2566cdaf02e8d9ada88ac99c39800000000001976a9141c4bc762dd5423e332166702cb75f4\
//!      0df79fea1288ac19430600",
//! )
//! .unwrap();
//!
//! let tx: UtxoTransaction = parse_transaction(&raw, Network::BitcoinCash, &ParseOptions::default()).unwrap();
//! assert_eq!(serialize_transaction(&tx).unwrap(), raw);
//! assert_eq!(byte_length(&tx).unwrap(), raw.len());
//! ```

use std::io::Write;

use crate::{
    amount::Amount,
    dash::DashCodec,
    error::{UtxoError, UtxoResult},
    hashes::{SighashDigest, TXID, WTXID},
    legacy::BitcoinCodec,
    nets::{Network, NetworkFamily},
    tx::{BuildOptions, ParseOptions, UtxoTransaction},
    types::{Script, SighashType},
    zcash::ZcashCodec,
};

/// A family wire codec. Implementors are unit structs. The transaction carries its own network,
/// so codecs never need state.
pub trait TxCodec {
    /// Decode a transaction from the front of `reader`, advancing it past the consumed bytes.
    /// Trailing bytes are left in the reader. Rejecting them is the dispatcher's job.
    fn decode<V: Amount>(
        reader: &mut &[u8],
        network: Network,
        options: &ParseOptions,
    ) -> UtxoResult<UtxoTransaction<V>>;

    /// Encode the transaction to `writer`. Return the number of bytes written.
    ///
    /// `with_witness` requests the BIP144 witness serialization. Families without segwit ignore
    /// it, and transactions without witnesses are always written without the marker.
    fn encode<V: Amount, W: Write>(
        tx: &UtxoTransaction<V>,
        writer: &mut W,
        with_witness: bool,
    ) -> UtxoResult<usize>;

    /// The exact number of bytes `encode` would write.
    fn byte_length<V: Amount>(tx: &UtxoTransaction<V>, with_witness: bool) -> UtxoResult<usize>;
}

/// A family digest strategy.
pub trait SignatureHasher {
    /// Calculate the digest a signature on input `index` commits to.
    ///
    /// `value` is the value of the spent output. If it is `None`, the value recorded on the input
    /// is used. Value-committing digests fail with `InvalidArgument` when neither is available.
    fn signature_hash<V: Amount>(
        tx: &UtxoTransaction<V>,
        index: usize,
        prevout_script: &Script,
        sighash: SighashType,
        value: Option<V>,
    ) -> UtxoResult<SighashDigest>;

    /// Calculate the transaction id
    fn txid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<TXID>;
}

/// Run `$body` with `$codec` bound to the codec type of `$network`'s family.
macro_rules! with_codec {
    ($network:expr, $codec:ident => $body:expr) => {
        match $network.family() {
            NetworkFamily::Bitcoin
            | NetworkFamily::BitcoinCash
            | NetworkFamily::Ecash
            | NetworkFamily::BitcoinSv
            | NetworkFamily::BitcoinGold
            | NetworkFamily::Litecoin
            | NetworkFamily::Dogecoin => {
                type $codec = BitcoinCodec;
                $body
            }
            NetworkFamily::Dash => {
                type $codec = DashCodec;
                $body
            }
            NetworkFamily::Zcash => {
                type $codec = ZcashCodec;
                $body
            }
        }
    };
}

/// Fail if the transaction's extension does not belong to its network
fn check_extension<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<()> {
    if tx.extension.matches(tx.network.family()) {
        Ok(())
    } else {
        Err(UtxoError::IllegalState(format!(
            "transaction on {} carries extension {:?}",
            tx.network, tx.extension
        )))
    }
}

/// Parse a transaction for `network`.
///
/// ## Errors
///
/// - `TrailingData` if `options.strict` is set and bytes remain after the transaction.
/// - `UnsupportedTransaction` for shielded Zcash content or unknown Dash types.
/// - `InvalidArgument` for an unknown Zcash version selector, or one that does not match the
///   transaction's version.
#[tracing::instrument(skip_all, fields(network = %network, len = bytes.len()), err)]
pub fn parse_transaction<V: Amount>(
    bytes: &[u8],
    network: Network,
    options: &ParseOptions,
) -> UtxoResult<UtxoTransaction<V>> {
    let mut reader = bytes;
    let tx = with_codec!(network, C => C::decode(&mut reader, network, options)?);
    check_trailing(bytes, reader, options)?;
    Ok(tx)
}

/// Parse a transaction in its non-witness serialization, the form a PSBT carries. On segwit
/// networks a zero byte after the version is read as an empty input vector.
#[tracing::instrument(skip_all, fields(network = %network, len = bytes.len()), err)]
pub fn parse_unsigned_transaction<V: Amount>(
    bytes: &[u8],
    network: Network,
    options: &ParseOptions,
) -> UtxoResult<UtxoTransaction<V>> {
    if !network.params().supports_segwit {
        return parse_transaction(bytes, network, options);
    }
    let mut reader = bytes;
    let tx = BitcoinCodec::decode_without_witness(&mut reader, network)?;
    check_trailing(bytes, reader, options)?;
    Ok(tx)
}

fn check_trailing(bytes: &[u8], rest: &[u8], options: &ParseOptions) -> UtxoResult<()> {
    if options.strict && !rest.is_empty() {
        return Err(UtxoError::TrailingData {
            parsed: bytes.len() - rest.len(),
            total: bytes.len(),
        });
    }
    Ok(())
}

/// Serialize a transaction, including witnesses if it has any.
#[tracing::instrument(skip_all, fields(network = %tx.network), err)]
pub fn serialize_transaction<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<Vec<u8>> {
    check_extension(tx)?;
    let mut buf = Vec::with_capacity(byte_length(tx)?);
    with_codec!(tx.network, C => C::encode(tx, &mut buf, true)?);
    Ok(buf)
}

/// The length of `serialize_transaction(tx)`.
pub fn byte_length<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<usize> {
    check_extension(tx)?;
    with_codec!(tx.network, C => C::byte_length(tx, true))
}

/// The transaction id.
pub fn txid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<TXID> {
    check_extension(tx)?;
    with_codec!(tx.network, C => C::txid(tx))
}

/// The witness transaction id. Fails with `WitnessUnsupported` on families without segwit.
pub fn wtxid<V: Amount>(tx: &UtxoTransaction<V>) -> UtxoResult<WTXID> {
    check_extension(tx)?;
    if !tx.network.params().supports_segwit {
        return Err(UtxoError::WitnessUnsupported(tx.network.to_string()));
    }
    BitcoinCodec::wtxid(tx)
}

/// Calculate the signature digest of input `index`.
///
/// The sighash byte is validated for the network's family first. The digest algorithm then
/// follows the family and, for Zcash, the transaction version: legacy, fork-id BIP143, ZIP243 or
/// ZIP244.
///
/// ## Errors
///
/// - `UnknownSighash` if the family does not accept the sighash byte.
/// - `InvalidArgument` if the digest commits to a value and none is available.
#[tracing::instrument(skip_all, fields(network = %tx.network, index = index, sighash = ?sighash), err)]
pub fn compute_signature_hash<V: Amount>(
    tx: &UtxoTransaction<V>,
    index: usize,
    prevout_script: &Script,
    sighash: SighashType,
    value: Option<V>,
) -> UtxoResult<SighashDigest> {
    check_extension(tx)?;
    SighashType::from_u8(tx.network.family(), sighash.0)?;
    with_codec!(tx.network, C => C::signature_hash(tx, index, prevout_script, sighash, value))
}

/// Resolve the version a builder should use. An explicit version must be on the network's
/// allow-list. For Zcash the result may be an upgrade selector such as 450.
///
/// ## Errors
///
/// - `InvalidArgument` if the requested version is not allowed.
pub fn resolve_build_version(network: Network, options: &BuildOptions) -> UtxoResult<u32> {
    let params = network.params();
    match options.version {
        None => Ok(params.default_version),
        Some(version) if params.allowed_versions.contains(&version) => Ok(version),
        Some(version) => Err(UtxoError::InvalidArgument(format!(
            "version {} is not allowed on {}. Allowed: {:?}",
            version, network, params.allowed_versions
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{tx::Extension, types::Outpoint};
    use utxo_core::ser::ByteFormat;

    // from riemann
    static TWO_INPUT_TX: &str = "0200000002ee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffffee9242c89e79ab2aa537408839329895392b97505b3496d5543d6d2f531b94d20000000000fdffffff0273d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f18773d301000000000017a914bba5acbec4e6e3374a0345bf3609fa7cfea825f18700000000";
    static TWO_INPUT_PREVOUT: &str = "160014758ce550380d964051086798d6546bebdca27a73";

    fn parse(hex_tx: &str, network: Network) -> UtxoResult<UtxoTransaction<u64>> {
        parse_transaction(&hex::decode(hex_tx).unwrap(), network, &ParseOptions::default())
    }

    #[test]
    fn it_reproduces_legacy_sighash_vectors() {
        let tx = parse(TWO_INPUT_TX, Network::Bitcoin).unwrap();
        assert_eq!(byte_length(&tx).unwrap(), TWO_INPUT_TX.len() / 2);
        assert_eq!(
            hex::encode(txid(&tx).unwrap().0),
            "40157948972c5c97a2bafff861ee2f8745151385c7f9fbd03991ddf59b76ac81"
        );

        let script = Script::deserialize_hex(TWO_INPUT_PREVOUT).unwrap();
        let cases = [
            (0x01, "3ab40bf1287b7be9a5c67ed0f97f80b38c5f68e53ec93bffd3893901eaaafdb2"),
            (0x81, "2d5802fed31e1ef6a857346cc0a9085ea452daeeb3a0b5afcb16a2203ce5689d"),
            (0x03, "ea52b62b26c1f0db838c952fa50806fb8e39ba4c92a9a88d1b4ba7e9c094517d"),
            (0x83, "9e2aca0a04afa6e1e5e00ff16b06a247a0da1e7bbaa7cd761c066a82bb3b07d0"),
        ];
        for (sighash, expected) in cases.iter() {
            let digest =
                compute_signature_hash(&tx, 1, &script, SighashType(*sighash), None).unwrap();
            assert_eq!(hex::encode(digest.0), *expected);
        }
    }

    #[test]
    fn it_rejects_trailing_bytes_in_strict_mode() {
        let padded = format!("{}00", TWO_INPUT_TX);
        match parse(&padded, Network::Bitcoin) {
            Err(UtxoError::TrailingData { parsed, total }) => {
                assert_eq!(parsed, TWO_INPUT_TX.len() / 2);
                assert_eq!(total, parsed + 1);
            }
            other => panic!("expected TrailingData, got {:?}", other),
        }

        let lenient = ParseOptions {
            version: None,
            strict: false,
        };
        let bytes = hex::decode(&padded).unwrap();
        assert!(parse_transaction::<u64>(&bytes, Network::Bitcoin, &lenient).is_ok());
    }

    #[test]
    fn it_validates_sighash_bytes_per_family() {
        let tx = parse(TWO_INPUT_TX, Network::Bitcoin).unwrap();
        let script = Script::deserialize_hex(TWO_INPUT_PREVOUT).unwrap();
        assert!(matches!(
            compute_signature_hash(&tx, 0, &script, SighashType(0x41), None),
            Err(UtxoError::UnknownSighash(0x41))
        ));
        assert!(matches!(
            compute_signature_hash(&tx, 0, &script, SighashType(0x04), None),
            Err(UtxoError::UnknownSighash(0x04))
        ));

        let bch = parse(TWO_INPUT_TX, Network::BitcoinCash).unwrap();
        assert!(compute_signature_hash(&bch, 0, &script, SighashType(0x41), Some(1u64)).is_ok());
    }

    #[test]
    fn it_honors_the_alternate_fork_id_flag_on_bitcoin_gold() {
        let btg = parse(TWO_INPUT_TX, Network::BitcoinGold).unwrap();
        let script = Script::deserialize_hex(TWO_INPUT_PREVOUT).unwrap();

        let hash_type = crate::forkid::add_fork_id(Network::BitcoinGold, SighashType(0x11));
        assert_eq!(hash_type, 0x4f11);
        let expected =
            crate::witness::witness_v0_signature_hash(&btg, 0, &script, 1000u64, hash_type)
                .unwrap();
        let digest =
            compute_signature_hash(&btg, 0, &script, SighashType(0x11), Some(1000u64)).unwrap();
        assert_eq!(digest, expected);

        let standard =
            compute_signature_hash(&btg, 0, &script, SighashType(0x41), Some(1000u64)).unwrap();
        assert_ne!(digest, standard);

        let bch = parse(TWO_INPUT_TX, Network::BitcoinCash).unwrap();
        assert!(matches!(
            compute_signature_hash(&bch, 0, &script, SighashType(0x11), Some(1000u64)),
            Err(UtxoError::UnknownSighash(0x11))
        ));
    }

    #[test]
    fn it_refuses_mismatched_extensions() {
        let mut tx = parse(TWO_INPUT_TX, Network::Bitcoin).unwrap();
        tx.extension = Extension::for_family(NetworkFamily::Dash);
        assert!(matches!(
            serialize_transaction(&tx),
            Err(UtxoError::IllegalState(_))
        ));
        assert!(matches!(txid(&tx), Err(UtxoError::IllegalState(_))));
    }

    #[test]
    fn it_only_computes_wtxids_on_segwit_networks() {
        let tx = UtxoTransaction::<u64>::new(
            Network::Dogecoin,
            1,
            vec![crate::types::TxIn::new(Outpoint::null(), vec![0u8], 0)],
            vec![],
            0,
            Extension::None,
        )
        .unwrap();
        assert!(matches!(wtxid(&tx), Err(UtxoError::WitnessUnsupported(_))));

        let btc = parse(TWO_INPUT_TX, Network::Bitcoin).unwrap();
        assert_eq!(wtxid(&btc).unwrap().0, txid(&btc).unwrap().0);
    }

    #[test]
    fn it_resolves_build_versions() {
        let default = BuildOptions::default();
        assert_eq!(resolve_build_version(Network::Bitcoin, &default).unwrap(), 1);
        assert_eq!(resolve_build_version(Network::BitcoinCashTestnet, &default).unwrap(), 2);
        assert_eq!(resolve_build_version(Network::Zcash, &default).unwrap(), 450);

        let v5 = BuildOptions { version: Some(500) };
        assert_eq!(resolve_build_version(Network::ZcashTest, &v5).unwrap(), 500);
        assert!(matches!(
            resolve_build_version(Network::Komodo, &v5),
            Err(UtxoError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve_build_version(Network::Bitcoin, &BuildOptions { version: Some(3) }),
            Err(UtxoError::InvalidArgument(_))
        ));
    }
}
