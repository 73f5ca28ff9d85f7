//! The base BIP174 PSBT, generalized over every supported network.
//!
//! The unsigned transaction is decoded with the network's codec and held in memory as a
//! `UtxoTransaction`. It is written back as the `PSBT_GLOBAL_UNSIGNED_TX` entry on
//! serialization, so Dash payloads and Zcash envelope fields survive a round trip.

use std::{
    io::{Read, Write},
    ops::Deref,
};

use base64::{engine::general_purpose::STANDARD, Engine};

use utxo_core::ser::{ByteFormat, SerError};
use utxo_tx::{
    compute_signature_hash,
    forkid::compute_witness_v0_signature_hash,
    hashes::SighashDigest,
    parse_unsigned_transaction, serialize_transaction,
    prelude::{Script, SighashType, TxIn, TxOut},
    BuildOptions, Network, ParseOptions, UtxoError, UtxoTransaction, UtxoTxBuilder,
};

use crate::{
    common::{PsbtError, PsbtKey, PsbtResult, PsbtValidate, PsbtValue, PstMap},
    global::{GlobalKey, PsbtGlobal},
    input::{InputKey, PsbtInput},
    output::PsbtOutput,
};

/// A 4-byte prefix used to identify partially signed transactions. Followed by `0xff`.
pub const MAGIC_BYTES: [u8; 4] = *b"psbt";

/// A BIP174 Partially Signed Transaction on any supported network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoPsbt {
    /// The unsigned transaction. Script sigs and witnesses are always empty.
    tx: UtxoTransaction,
    /// Global attributes
    global: PsbtGlobal,
    /// Per-input attribute maps
    inputs: Vec<PsbtInput>,
    /// Per-output attribute maps
    outputs: Vec<PsbtOutput>,
}

/// A global map entry that exists only while the guard lives. Dropping the guard restores the
/// map, including on unwind.
struct GlobalEntry<'a> {
    psbt: &'a mut UtxoPsbt,
    key: PsbtKey,
    previous: Option<PsbtValue>,
}

impl<'a> GlobalEntry<'a> {
    fn insert(psbt: &'a mut UtxoPsbt, key: PsbtKey, value: PsbtValue) -> Self {
        let previous = psbt.global.insert(key.clone(), value);
        Self {
            psbt,
            key,
            previous,
        }
    }
}

impl Deref for GlobalEntry<'_> {
    type Target = UtxoPsbt;

    fn deref(&self) -> &UtxoPsbt {
        &*self.psbt
    }
}

impl Drop for GlobalEntry<'_> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => {
                self.psbt.global.insert(self.key.clone(), value);
            }
            None => {
                self.psbt.global.remove(&self.key);
            }
        }
    }
}

/// The P2PKH script code BIP143 substitutes for a P2WPKH program
fn p2pkh_script_code(pubkey_hash: &[u8]) -> Script {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[0x88, 0xac]);
    script.into()
}

/// The hash committed to by a v0 witness program, if `script` is one
fn witness_v0_program(script: &[u8]) -> Option<&[u8]> {
    match script {
        [0x00, 0x14, rest @ ..] if rest.len() == 20 => Some(rest),
        [0x00, 0x20, rest @ ..] if rest.len() == 32 => Some(rest),
        _ => None,
    }
}

impl UtxoPsbt {
    fn from_unsigned(tx: UtxoTransaction) -> Self {
        Self {
            global: PsbtGlobal::default(),
            inputs: vec![PsbtInput::default(); tx.inputs.len()],
            outputs: vec![PsbtOutput::default(); tx.outputs.len()],
            tx,
        }
    }

    /// Instantiate an empty PSBT for `network`. The transaction version follows the network's
    /// default, or `options.version` if it is on the network's allow-list.
    pub fn new(network: Network, options: &BuildOptions) -> PsbtResult<Self> {
        let tx = UtxoTxBuilder::<u64>::for_network(network, options)?.build()?;
        Ok(Self::from_unsigned(tx))
    }

    /// Instantiate a PSBT from a transaction. If script sigs or witnesses are present in the tx,
    /// this extracts them and stores them in the appropriate map under the finalized key.
    pub fn from_transaction(tx: &UtxoTransaction) -> PsbtResult<Self> {
        let mut unsigned = tx.clone();
        for input in unsigned.inputs.iter_mut() {
            *input = input.unsigned();
            input.clear_prevout();
        }
        let mut psbt = Self::from_unsigned(unsigned);

        for (input, map) in tx.inputs.iter().zip(psbt.inputs.iter_mut()) {
            if !input.script_sig.is_empty() {
                map.insert_script_sig(&input.script_sig);
            }
            if input.has_witness() {
                map.insert_witness(&input.witness)?;
            }
        }
        Ok(psbt)
    }

    /// The network of the unsigned transaction
    pub fn network(&self) -> Network {
        self.tx.network
    }

    /// The unsigned transaction
    pub fn tx(&self) -> &UtxoTransaction {
        &self.tx
    }

    pub(crate) fn tx_mut(&mut self) -> &mut UtxoTransaction {
        &mut self.tx
    }

    /// The serialized unsigned transaction, as stored under `PSBT_GLOBAL_UNSIGNED_TX`
    pub fn tx_bytes(&self) -> PsbtResult<Vec<u8>> {
        Ok(serialize_transaction(&self.tx)?)
    }

    /// Return a reference to the global attributes
    pub fn global_map(&self) -> &PsbtGlobal {
        &self.global
    }

    /// Return a mutable reference to the global attributes
    pub fn global_map_mut(&mut self) -> &mut PsbtGlobal {
        &mut self.global
    }

    /// Return a reference to the vector of input maps
    pub fn input_maps(&self) -> &[PsbtInput] {
        &self.inputs
    }

    /// Return a mutable reference to the vector of input maps
    pub fn input_maps_mut(&mut self) -> &mut [PsbtInput] {
        &mut self.inputs
    }

    /// Return a reference to the vector of output maps
    pub fn output_maps(&self) -> &[PsbtOutput] {
        &self.outputs
    }

    /// Return a mutable reference to the vector of output maps
    pub fn output_maps_mut(&mut self) -> &mut [PsbtOutput] {
        &mut self.outputs
    }

    /// Return the input map at `index`
    pub fn input_map(&self, index: usize) -> PsbtResult<&PsbtInput> {
        self.inputs.get(index).ok_or_else(|| {
            PsbtError::MissingInfo(format!(
                "input {} of a PSBT with {} inputs",
                index,
                self.inputs.len()
            ))
        })
    }

    /// Return the input map at `index` mutably
    pub fn input_map_mut(&mut self, index: usize) -> PsbtResult<&mut PsbtInput> {
        let len = self.inputs.len();
        self.inputs.get_mut(index).ok_or_else(|| {
            PsbtError::MissingInfo(format!("input {} of a PSBT with {} inputs", index, len))
        })
    }

    /// Insert an input into the PSBT. Updates the TX, and inserts an `Input` map at the same
    /// index. If the index is larger than the length of the vector, the Input will be appended
    /// to the end of the vector instead. Returns the index used.
    pub fn insert_input(&mut self, index: usize, tx_in: TxIn) -> usize {
        let index = std::cmp::min(index, self.inputs.len());
        let mut tx_in = tx_in.unsigned();
        tx_in.clear_prevout();
        self.tx.inputs.insert(index, tx_in);
        self.inputs.insert(index, Default::default());
        index
    }

    /// Insert an output into the PSBT. Updates the TX, and inserts an `Output` map at the same
    /// index. If the index is larger than the length of the vector, the Output will be appended
    /// to the end of the vector instead. Returns the index used.
    pub fn insert_output(&mut self, index: usize, tx_out: TxOut) -> usize {
        let index = std::cmp::min(index, self.outputs.len());
        self.tx.outputs.insert(index, tx_out);
        self.outputs.insert(index, Default::default());
        index
    }

    /// Push a tx_in to the end of the PSBT's vector. This creates a new empty map.
    pub fn add_input(&mut self, tx_in: TxIn) -> usize {
        self.insert_input(usize::MAX, tx_in)
    }

    /// Push a tx_out to the end of the PSBT's vector. This creates a new empty map.
    pub fn add_output(&mut self, tx_out: TxOut) -> usize {
        self.insert_output(usize::MAX, tx_out)
    }

    /// Run validation checks on every map, then the PSBT-level consistency checks
    pub fn validate(&self) -> PsbtResult<()> {
        let network = self.network();
        self.global.validate(network)?;
        for input in self.inputs.iter() {
            input.validate(network)?;
        }
        for output in self.outputs.iter() {
            output.validate(network)?;
        }
        self.consistency_checks()
    }

    /// Check that the maps line up with the transaction, and that it carries no signatures
    pub fn consistency_checks(&self) -> PsbtResult<()> {
        if self.tx.inputs.len() != self.inputs.len() {
            return Err(PsbtError::VinLengthMismatch {
                tx_ins: self.tx.inputs.len(),
                maps: self.inputs.len(),
            });
        }
        if self.tx.outputs.len() != self.outputs.len() {
            return Err(PsbtError::VoutLengthMismatch {
                tx_outs: self.tx.outputs.len(),
                maps: self.outputs.len(),
            });
        }
        if self.tx.inputs.iter().any(|i| !i.script_sig.is_empty()) {
            return Err(PsbtError::ScriptSigInTx);
        }
        if self.tx.has_witnesses() {
            return Err(PsbtError::InvalidPsbt("unsigned tx carries witnesses".to_owned()));
        }
        Ok(())
    }

    /// True if any input carries a partial or final signature
    pub fn has_signatures(&self) -> bool {
        self.inputs.iter().any(PsbtInput::has_signatures)
    }

    /// True if every input is finalized
    pub fn is_finalized(&self) -> bool {
        self.inputs.iter().all(PsbtInput::is_finalized)
    }

    /// The sighash type input `index` should be signed with: its PSBT_IN_SIGHASH_TYPE, or the
    /// network's default.
    pub fn sighash_type(&self, index: usize) -> PsbtResult<SighashType> {
        let map = self.input_map(index)?;
        if map.contains_key(&InputKey::SighashType.into()) {
            map.sighash(self.network().family())
        } else {
            Ok(self.network().params().default_sighash_type)
        }
    }

    /// A copy of the transaction with every known spent output recorded on its input. Inputs
    /// whose UTXO is unknown are left without a value.
    fn tx_with_prevouts(&self) -> UtxoTransaction {
        let network = self.network();
        let mut tx = self.tx.clone();
        for (input, map) in tx.inputs.iter_mut().zip(self.inputs.iter()) {
            if let Ok(spent) = map.spent_output(&input.outpoint, network) {
                input.set_prevout(spent.value, spent.script_pubkey);
            }
        }
        tx
    }

    /// The script code signed for input `index`, and whether it is spent through a v0 witness
    /// program
    fn script_code(&self, map: &PsbtInput, spent: &TxOut) -> PsbtResult<(Script, bool)> {
        let program: Script = if map.has_redeem_script() {
            map.redeem_script()?
        } else {
            spent.script_pubkey.items().into()
        };
        if self.network().params().supports_segwit {
            match witness_v0_program(program.items()) {
                Some(hash) if hash.len() == 20 => return Ok((p2pkh_script_code(hash), true)),
                Some(_) => return Ok((map.witness_script()?, true)),
                None => {}
            }
        }
        Ok((program, false))
    }

    /// Calculate the signature digest of input `index` from the UTXO information in its map.
    ///
    /// `sighash` defaults to `sighash_type(index)`. Legacy (non-witness) spends require the full
    /// previous transaction, so that the spent value cannot be misrepresented.
    ///
    /// ## Errors
    ///
    /// - `MissingKey(0)` if a legacy spend has only a witness UTXO.
    /// - `MissingKey(5)` if a P2WSH spend has no witness script.
    /// - `UtxoError` from the digest routines.
    pub fn signature_hash(
        &self,
        index: usize,
        sighash: Option<SighashType>,
    ) -> PsbtResult<SighashDigest> {
        self.signature_hash_with(index, sighash, false)
    }

    /// As `signature_hash`. If `value_only` is set, a witness UTXO is accepted for legacy spends.
    pub(crate) fn signature_hash_with(
        &self,
        index: usize,
        sighash: Option<SighashType>,
        value_only: bool,
    ) -> PsbtResult<SighashDigest> {
        let network = self.network();
        let sighash = match sighash {
            Some(sighash) => SighashType::from_u8(network.family(), sighash.0)?,
            None => self.sighash_type(index)?,
        };
        let map = self.input_map(index)?;
        let tx_in = self.tx.inputs.get(index).ok_or(PsbtError::VinLengthMismatch {
            tx_ins: self.tx.inputs.len(),
            maps: self.inputs.len(),
        })?;

        let spent = map.spent_output(&tx_in.outpoint, network)?;
        let (script, witness) = self.script_code(map, &spent)?;
        if !witness && !value_only && !map.has_non_witness_utxo() {
            return Err(PsbtError::MissingKey(InputKey::NonWitnessUtxo as u8));
        }

        let tx = self.tx_with_prevouts();
        let digest = if witness {
            compute_witness_v0_signature_hash(&tx, index, &script, sighash, Some(spent.value))?
        } else {
            compute_signature_hash(&tx, index, &script, sighash, Some(spent.value))?
        };
        tracing::trace!(index, witness, sighash = ?sighash, "computed psbt signature hash");
        Ok(digest)
    }

    /// Extract the signed transaction. Every input must be finalized.
    ///
    /// ## Errors
    ///
    /// - `UnfinalizedInput` naming the first input without a final script sig or witness.
    pub fn extract_tx(&self) -> PsbtResult<UtxoTransaction> {
        self.consistency_checks()?;
        let mut tx = self.tx.clone();
        for (i, (input, map)) in tx.inputs.iter_mut().zip(self.inputs.iter()).enumerate() {
            if !map.is_finalized() {
                return Err(PsbtError::UnfinalizedInput(i));
            }
            if let Ok(script_sig) = map.finalized_script_sig() {
                input.script_sig = script_sig;
            }
            if map.contains_key(&InputKey::FinalScriptWitness.into()) {
                input.witness = map.finalized_script_witness()?;
            }
        }
        Ok(tx)
    }

    /// Run `f` with `key` set to `value` in the global map. The map is restored afterwards, even
    /// if `f` fails or panics.
    pub fn with_global_entry<T>(
        &mut self,
        key: PsbtKey,
        value: PsbtValue,
        f: impl FnOnce(&UtxoPsbt) -> T,
    ) -> T {
        let entry = GlobalEntry::insert(self, key, value);
        f(&*entry)
    }

    /// Read a PSBT for `network`. `options` applies to the unsigned transaction.
    ///
    /// ## Errors
    ///
    /// - `BadPrefix` if the magic bytes are missing.
    /// - `MissingKey(0)` if there is no unsigned transaction.
    /// - `ScriptSigInTx` if the unsigned transaction has script sigs.
    /// - Any schema or consistency failure.
    pub fn read_from<R: Read>(
        reader: &mut R,
        network: Network,
        options: &ParseOptions,
    ) -> PsbtResult<Self> {
        let mut prefix = [0u8; 5];
        reader.read_exact(&mut prefix)?;
        if prefix[..4] != MAGIC_BYTES || prefix[4] != 0xff {
            return Err(PsbtError::BadPrefix);
        }

        let mut global = PsbtGlobal::read_from(reader, 0)?;
        let tx_val = global
            .remove(&GlobalKey::UnsignedTx.into())
            .ok_or(PsbtError::MissingKey(GlobalKey::UnsignedTx as u8))?;
        let tx: UtxoTransaction = parse_unsigned_transaction(tx_val.items(), network, options)?;
        if tx.inputs.iter().any(|i| !i.script_sig.is_empty()) {
            return Err(PsbtError::ScriptSigInTx);
        }

        let inputs = Vec::<PsbtInput>::read_from(reader, tx.inputs.len())?;
        let outputs = Vec::<PsbtOutput>::read_from(reader, tx.outputs.len())?;

        let psbt = Self {
            tx,
            global,
            inputs,
            outputs,
        };
        psbt.validate()?;
        Ok(psbt)
    }

    /// Write the PSBT. Validates first.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> PsbtResult<usize> {
        self.validate()?;
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_all(&[0xff])?;
        let mut len = 5;
        // the unsigned tx key sorts before every other valid global key
        len += PsbtKey::from(GlobalKey::UnsignedTx).write_to(writer)?;
        len += PsbtValue::from(self.tx_bytes()?).write_to(writer)?;
        len += self.global.write_to(writer)?;
        len += self.inputs.write_to(writer)?;
        len += self.outputs.write_to(writer)?;
        Ok(len)
    }

    /// Parse a PSBT from bytes. With `options.strict`, trailing bytes are an error.
    pub fn parse(bytes: &[u8], network: Network, options: &ParseOptions) -> PsbtResult<Self> {
        let mut reader = bytes;
        let psbt = Self::read_from(&mut reader, network, options)?;
        if options.strict && !reader.is_empty() {
            return Err(UtxoError::TrailingData {
                parsed: bytes.len() - reader.len(),
                total: bytes.len(),
            }
            .into());
        }
        Ok(psbt)
    }

    /// Parse a hex-encoded PSBT
    pub fn parse_hex(s: &str, network: Network, options: &ParseOptions) -> PsbtResult<Self> {
        let bytes = hex::decode(s).map_err(SerError::from)?;
        Self::parse(&bytes, network, options)
    }

    /// Parse a base64-encoded PSBT
    pub fn parse_base64(s: &str, network: Network, options: &ParseOptions) -> PsbtResult<Self> {
        let bytes = STANDARD.decode(s).map_err(SerError::from)?;
        Self::parse(&bytes, network, options)
    }

    /// Serialize the PSBT
    pub fn serialize(&self) -> PsbtResult<Vec<u8>> {
        let mut buf = vec![];
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Serialize the PSBT as hex
    pub fn serialize_hex(&self) -> PsbtResult<String> {
        Ok(hex::encode(self.serialize()?))
    }

    /// Serialize the PSBT as base64
    pub fn serialize_base64(&self) -> PsbtResult<String> {
        Ok(STANDARD.encode(self.serialize()?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use utxo_tx::prelude::{Outpoint, ScriptSig, WitnessStackItem};

    macro_rules! assert_err {
        ($hex:expr, $err:pat) => {
            match UtxoPsbt::parse_hex($hex, Network::Bitcoin, &ParseOptions::default()) {
                Err($err) => {}
                e => panic!("expected an error, got {:?}", e),
            }
        };
    }

    #[test]
    fn it_deserializes_without_modifying() {
        let valid_cases = [
            "70736274ff0100750200000001268171371edff285e937adeea4b37b78000c0566cbb3ad64641713ca42171bf60000000000feffffff02d3dff505000000001976a914d0c59903c5bac2868760e90fd521a4665aa7652088ac00e1f5050000000017a9143545e6e33b832c47050f24d3eeb93c9c03948bc787b32e1300000100fda5010100000000010289a3c71eab4d20e0371bbba4cc698fa295c9463afa2e397f8533ccb62f9567e50100000017160014be18d152a9b012039daf3da7de4f53349eecb985ffffffff86f8aa43a71dff1448893a530a7237ef6b4608bbb2dd2d0171e63aec6a4890b40100000017160014fe3e9ef1a745e974d902c4355943abcb34bd5353ffffffff0200c2eb0b000000001976a91485cff1097fd9e008bb34af709c62197b38978a4888ac72fef84e2c00000017a914339725ba21efd62ac753a9bcd067d6c7a6a39d05870247304402202712be22e0270f394f568311dc7ca9a68970b8025fdd3b240229f07f8a5f3a240220018b38d7dcd314e734c9276bd6fb40f673325bc4baa144c800d2f2f02db2765c012103d2e15674941bad4a996372cb87e1856d3652606d98562fe39c5e9e7e413f210502483045022100d12b852d85dcd961d2f5f4ab660654df6eedcc794c0c33ce5cc309ffb5fce58d022067338a8e0e1725c197fb1a88af59f51e44e4255b20167c8684031c05d1f2592a01210223b72beef0965d10be0778efecd61fcac6f79a4ea169393380734464f84f2ab300000000000000",
            "70736274ff0100a00200000002ab0949a08c5af7c49b8212f417e2f15ab3f5c33dcf153821a8139f877a5b7be40000000000feffffffab0949a08c5af7c49b8212f417e2f15ab3f5c33dcf153821a8139f877a5b7be40100000000feffffff02603bea0b000000001976a914768a40bbd740cbe81d988e71de2a4d5c71396b1d88ac8e240000000000001976a9146f4620b553fa095e721b9ee0efe9fa039cca459788ac000000000001076a47304402204759661797c01b036b25928948686218347d89864b719e1f7fcf57d1e511658702205309eabf56aa4d8891ffd111fdf1336f3a29da866d7f8486d75546ceedaf93190121035cdc61fc7ba971c0b501a646a2a83b102cb43881217ca682dc86e2d73fa882920001012000e1f5050000000017a9143545e6e33b832c47050f24d3eeb93c9c03948bc787010416001485d13537f2e265405a34dbafa9e3dda01fb82308000000",
            "70736274ff0100750200000001268171371edff285e937adeea4b37b78000c0566cbb3ad64641713ca42171bf60000000000feffffff02d3dff505000000001976a914d0c59903c5bac2868760e90fd521a4665aa7652088ac00e1f5050000000017a9143545e6e33b832c47050f24d3eeb93c9c03948bc787b32e1300000100fda5010100000000010289a3c71eab4d20e0371bbba4cc698fa295c9463afa2e397f8533ccb62f9567e50100000017160014be18d152a9b012039daf3da7de4f53349eecb985ffffffff86f8aa43a71dff1448893a530a7237ef6b4608bbb2dd2d0171e63aec6a4890b40100000017160014fe3e9ef1a745e974d902c4355943abcb34bd5353ffffffff0200c2eb0b000000001976a91485cff1097fd9e008bb34af709c62197b38978a4888ac72fef84e2c00000017a914339725ba21efd62ac753a9bcd067d6c7a6a39d05870247304402202712be22e0270f394f568311dc7ca9a68970b8025fdd3b240229f07f8a5f3a240220018b38d7dcd314e734c9276bd6fb40f673325bc4baa144c800d2f2f02db2765c012103d2e15674941bad4a996372cb87e1856d3652606d98562fe39c5e9e7e413f210502483045022100d12b852d85dcd961d2f5f4ab660654df6eedcc794c0c33ce5cc309ffb5fce58d022067338a8e0e1725c197fb1a88af59f51e44e4255b20167c8684031c05d1f2592a01210223b72beef0965d10be0778efecd61fcac6f79a4ea169393380734464f84f2ab30000000001030401000000000000",
        ];
        for case in valid_cases.iter() {
            let p = UtxoPsbt::parse_hex(case, Network::Bitcoin, &ParseOptions::default()).unwrap();
            assert_eq!(p.serialize_hex().unwrap(), *case);

            let b64 = p.serialize_base64().unwrap();
            let q = UtxoPsbt::parse_base64(&b64, Network::Bitcoin, &ParseOptions::default())
                .unwrap();
            assert_eq!(p, q);
        }
    }

    #[test]
    fn it_reads_the_sighash_type() {
        let psbt = UtxoPsbt::parse_hex("70736274ff0100750200000001268171371edff285e937adeea4b37b78000c0566cbb3ad64641713ca42171bf60000000000feffffff02d3dff505000000001976a914d0c59903c5bac2868760e90fd521a4665aa7652088ac00e1f5050000000017a9143545e6e33b832c47050f24d3eeb93c9c03948bc787b32e1300000100fda5010100000000010289a3c71eab4d20e0371bbba4cc698fa295c9463afa2e397f8533ccb62f9567e50100000017160014be18d152a9b012039daf3da7de4f53349eecb985ffffffff86f8aa43a71dff1448893a530a7237ef6b4608bbb2dd2d0171e63aec6a4890b40100000017160014fe3e9ef1a745e974d902c4355943abcb34bd5353ffffffff0200c2eb0b000000001976a91485cff1097fd9e008bb34af709c62197b38978a4888ac72fef84e2c00000017a914339725ba21efd62ac753a9bcd067d6c7a6a39d05870247304402202712be22e0270f394f568311dc7ca9a68970b8025fdd3b240229f07f8a5f3a240220018b38d7dcd314e734c9276bd6fb40f673325bc4baa144c800d2f2f02db2765c012103d2e15674941bad4a996372cb87e1856d3652606d98562fe39c5e9e7e413f210502483045022100d12b852d85dcd961d2f5f4ab660654df6eedcc794c0c33ce5cc309ffb5fce58d022067338a8e0e1725c197fb1a88af59f51e44e4255b20167c8684031c05d1f2592a01210223b72beef0965d10be0778efecd61fcac6f79a4ea169393380734464f84f2ab30000000001030401000000000000", Network::Bitcoin, &ParseOptions::default()).unwrap();
        assert_eq!(psbt.sighash_type(0).unwrap(), SighashType::ALL);
        assert!(psbt.input_map(0).unwrap().has_non_witness_utxo());
        assert!(!psbt.has_signatures());
        assert!(!psbt.is_finalized());
    }

    #[test]
    fn invalid_psbt_network_tx() {
        assert_err!(
            "0200000001268171371edff285e937adeea4b37b78000c0566cbb3ad64641713ca42171bf6000000006a473044022070b2245123e6bf474d60c5b50c043d4c691a5d2435f09a34a7662a9dc251790a022001329ca9dacf280bdf30740ec0390422422c81cb45839457aeb76fc12edd95b3012102657d118d3357b8e0f4c2cd46db7b39f6d9c38d9a70abcb9b2de5dc8dbfe4ce31feffffff02d3dff505000000001976a914d0c59903c5bac2868760e90fd521a4665aa7652088ac00e1f5050000000017a9143545e6e33b832c47050f24d3eeb93c9c03948bc787b32e1300",
            PsbtError::BadPrefix
        );
    }

    #[test]
    fn invalid_psbt_vout_mismatch() {
        assert_err!(
            "70736274ff0100750200000001268171371edff285e937adeea4b37b78000c0566cbb3ad64641713ca42171bf60000000000feffffff02d3dff505000000001976a914d0c59903c5bac2868760e90fd521a4665aa7652088ac00e1f5050000000017a9143545e6e33b832c47050f24d3eeb93c9c03948bc787b32e1300000100fda5010100000000010289a3c71eab4d20e0371bbba4cc698fa295c9463afa2e397f8533ccb62f9567e50100000017160014be18d152a9b012039daf3da7de4f53349eecb985ffffffff86f8aa43a71dff1448893a530a7237ef6b4608bbb2dd2d0171e63aec6a4890b40100000017160014fe3e9ef1a745e974d902c4355943abcb34bd5353ffffffff0200c2eb0b000000001976a91485cff1097fd9e008bb34af709c62197b38978a4888ac72fef84e2c00000017a914339725ba21efd62ac753a9bcd067d6c7a6a39d05870247304402202712be22e0270f394f568311dc7ca9a68970b8025fdd3b240229f07f8a5f3a240220018b38d7dcd314e734c9276bd6fb40f673325bc4baa144c800d2f2f02db2765c012103d2e15674941bad4a996372cb87e1856d3652606d98562fe39c5e9e7e413f210502483045022100d12b852d85dcd961d2f5f4ab660654df6eedcc794c0c33ce5cc309ffb5fce58d022067338a8e0e1725c197fb1a88af59f51e44e4255b20167c8684031c05d1f2592a01210223b72beef0965d10be0778efecd61fcac6f79a4ea169393380734464f84f2ab30000000000",
            _
        );
    }

    #[test]
    fn invalid_psbt_filled_script_sig() {
        assert_err!(
            "70736274ff0100fd0a010200000002ab0949a08c5af7c49b8212f417e2f15ab3f5c33dcf153821a8139f877a5b7be4000000006a47304402204759661797c01b036b25928948686218347d89864b719e1f7fcf57d1e511658702205309eabf56aa4d8891ffd111fdf1336f3a29da866d7f8486d75546ceedaf93190121035cdc61fc7ba971c0b501a646a2a83b102cb43881217ca682dc86e2d73fa88292feffffffab0949a08c5af7c49b8212f417e2f15ab3f5c33dcf153821a8139f877a5b7be40100000000feffffff02603bea0b000000001976a914768a40bbd740cbe81d988e71de2a4d5c71396b1d88ac8e240000000000001976a9146f4620b553fa095e721b9ee0efe9fa039cca459788ac00000000000001012000e1f5050000000017a9143545e6e33b832c47050f24d3eeb93c9c03948bc787010416001485d13537f2e265405a34dbafa9e3dda01fb82308000000",
            PsbtError::ScriptSigInTx
        );
    }

    #[test]
    fn invalid_psbt_missing_unsigned_tx() {
        assert_err!("70736274ff000100fda5010100000000010289a3c71eab4d20e0371bbba4cc698fa295c9463afa2e397f8533ccb62f9567e50100000017160014be18d152a9b012039daf3da7de4f53349eecb985ffffffff86f8aa43a71dff1448893a530a7237ef6b4608bbb2dd2d0171e63aec6a4890b40100000017160014fe3e9ef1a745e974d902c4355943abcb34bd5353ffffffff0200c2eb0b000000001976a91485cff1097fd9e008bb34af709c62197b38978a4888ac72fef84e2c00000017a914339725ba21efd62ac753a9bcd067d6c7a6a39d05870247304402202712be22e0270f394f568311dc7ca9a68970b8025fdd3b240229f07f8a5f3a240220018b38d7dcd314e734c9276bd6fb40f673325bc4baa144c800d2f2f02db2765c012103d2e15674941bad4a996372cb87e1856d3652606d98562fe39c5e9e7e413f210502483045022100d12b852d85dcd961d2f5f4ab660654df6eedcc794c0c33ce5cc309ffb5fce58d022067338a8e0e1725c197fb1a88af59f51e44e4255b20167c8684031c05d1f2592a01210223b72beef0965d10be0778efecd61fcac6f79a4ea169393380734464f84f2ab300000000000000", PsbtError::MissingKey(0));
    }

    #[test]
    fn it_instantiates_empty_psbts() {
        let psbt = UtxoPsbt::new(Network::Bitcoin, &BuildOptions::default()).unwrap();
        assert_eq!(psbt.serialize_hex().unwrap(), "70736274ff01000a0100000000000000000000");
        let parsed = UtxoPsbt::parse(&psbt.serialize().unwrap(), Network::Bitcoin, &ParseOptions::default())
            .unwrap();
        assert_eq!(parsed, psbt);

        assert!(UtxoPsbt::new(Network::Bitcoin, &BuildOptions { version: Some(3) }).is_err());
    }

    #[test]
    fn it_adds_inputs_and_outputs() {
        let mut psbt = UtxoPsbt::new(Network::Litecoin, &BuildOptions::default()).unwrap();
        let mut tx_in = TxIn::new(Outpoint::null(), vec![0x51u8], 0xffff_fffe);
        tx_in.witness.push(WitnessStackItem::new(vec![1]));
        assert_eq!(psbt.add_input(tx_in.clone()), 0);
        assert_eq!(psbt.insert_input(0, tx_in), 0);
        assert_eq!(psbt.add_output(TxOut::new(1u64, vec![0x51u8])), 0);

        assert_eq!(psbt.tx().inputs.len(), 2);
        assert_eq!(psbt.input_maps().len(), 2);
        assert_eq!(psbt.output_maps().len(), 1);
        assert!(psbt.tx().inputs.iter().all(|i| i.script_sig.is_empty() && !i.has_witness()));
        assert!(psbt.validate().is_ok());
    }

    #[test]
    fn it_restores_global_entries() {
        let mut psbt = UtxoPsbt::new(Network::Bitcoin, &BuildOptions::default()).unwrap();
        let key = PsbtKey::new(vec![0xfc, 0x01, 0x61, 0x00]);
        let before = psbt.serialize().unwrap();

        let during = psbt
            .with_global_entry(key.clone(), PsbtValue::new(vec![7]), |p| p.serialize())
            .unwrap();
        assert_ne!(during, before);
        assert!(psbt.global_map().get(&key).is_none());
        assert_eq!(psbt.serialize().unwrap(), before);

        psbt.global_map_mut().insert(key.clone(), PsbtValue::new(vec![1]));
        let failed: PsbtResult<()> = psbt.with_global_entry(key.clone(), PsbtValue::new(vec![2]), |_| {
            Err(PsbtError::MissingInfo("test".to_owned()))
        });
        assert!(failed.is_err());
        assert_eq!(psbt.global_map().get(&key), Some(&PsbtValue::new(vec![1])));
    }

    #[test]
    fn it_extracts_finalized_transactions() {
        let tx: UtxoTransaction = UtxoTxBuilder::for_network(Network::Bitcoin, &BuildOptions::default())
            .unwrap()
            .insert_input(0, TxIn::new(Outpoint::null(), vec![0x51u8], 0xffff_ffff))
            .pay_script_pubkey(1u64, vec![0x51u8])
            .build()
            .unwrap();
        let mut psbt = UtxoPsbt::from_transaction(&tx).unwrap();
        assert!(psbt.is_finalized());
        assert!(psbt.has_signatures());
        assert_eq!(psbt.extract_tx().unwrap(), tx);

        psbt.input_maps_mut()[0] = PsbtInput::default();
        assert!(matches!(psbt.extract_tx(), Err(PsbtError::UnfinalizedInput(0))));

        psbt.input_maps_mut()[0].finalize(&ScriptSig::new(vec![0x52]), &[]).unwrap();
        assert_eq!(psbt.extract_tx().unwrap().inputs[0].script_sig, ScriptSig::new(vec![0x52]));
    }
}
