use utxo_psbt::prelude::*;

static P2PKH: &str = "76a914bc3b654dca7e56b04dca18f2566cdaf02e8d9ada88ac";

fn p2pkh() -> Vec<u8> {
    hex::decode(P2PKH).unwrap()
}

fn funding_tx(network: Network) -> UtxoTransaction {
    UtxoTxBuilder::for_network(network, &BuildOptions::default())
        .unwrap()
        .spend(Outpoint::null(), 0xffff_ffff)
        .pay_script_pubkey(250_000u64, p2pkh())
        .build()
        .unwrap()
}

fn spending_tx(network: Network, prevout: &UtxoTransaction) -> UtxoTransaction {
    let outpoint = Outpoint::new(txid(prevout).unwrap(), 0);
    UtxoTxBuilder::for_network(network, &BuildOptions::default())
        .unwrap()
        .spend(outpoint, 0xffff_fffd)
        .pay_script_pubkey(240_000u64, p2pkh())
        .build()
        .unwrap()
}

#[test]
fn it_signs_native_segwit_inputs_from_witness_utxos() {
    // BIP143 native P2WPKH example
    let unsigned = hex::decode("0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000").unwrap();
    let tx: UtxoTransaction = parse_transaction(&unsigned, Network::Bitcoin, &ParseOptions::default()).unwrap();
    let mut psbt = UtxoPsbt::from_transaction(&tx).unwrap();

    let spent = TxOut::new(
        600_000_000u64,
        hex::decode("00141d0f172a0ecb48aee1be1f2687d2963ae33f71a1").unwrap(),
    );
    psbt.input_maps_mut()[1].insert_witness_utxo(&spent).unwrap();

    let digest = psbt.signature_hash(1, None).unwrap();
    assert_eq!(
        hex::encode(digest.0),
        "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
    );

    assert!(matches!(
        psbt.signature_hash(0, None),
        Err(PsbtError::MissingKey(0))
    ));
    psbt.input_maps_mut()[0]
        .insert_witness_utxo(&TxOut::new(1u64, p2pkh()))
        .unwrap();
    assert!(matches!(
        psbt.signature_hash(0, None),
        Err(PsbtError::MissingKey(0))
    ));

    let bytes = psbt.serialize().unwrap();
    let parsed = UtxoPsbt::parse(&bytes, Network::Bitcoin, &ParseOptions::default()).unwrap();
    assert_eq!(parsed.tx(), psbt.tx());
    assert_eq!(parsed.signature_hash(1, None).unwrap(), digest);
}

#[test]
fn it_signs_fork_id_inputs_from_previous_transactions() {
    let network = Network::BitcoinCash;
    let prevout = funding_tx(network);
    let tx = spending_tx(network, &prevout);

    let mut psbt = UtxoPsbt::from_transaction(&tx).unwrap();
    psbt.input_maps_mut()[0]
        .insert_witness_utxo(&prevout.outputs[0])
        .unwrap();
    assert!(matches!(
        psbt.signature_hash(0, None),
        Err(PsbtError::MissingKey(0))
    ));

    psbt.input_maps_mut()[0]
        .insert_non_witness_utxo(&prevout)
        .unwrap();
    assert_eq!(psbt.sighash_type(0).unwrap(), SighashType::ALL_FORKID);

    let expected = compute_signature_hash(
        &tx,
        0,
        &Script::new(p2pkh()),
        SighashType::ALL_FORKID,
        Some(250_000u64),
    )
    .unwrap();
    assert_eq!(psbt.signature_hash(0, None).unwrap(), expected);
}

#[test]
fn it_rejects_mismatched_previous_transactions() {
    let network = Network::Dogecoin;
    let prevout = funding_tx(network);
    let tx = spending_tx(network, &prevout);

    let mut psbt = UtxoPsbt::from_transaction(&tx).unwrap();
    psbt.input_maps_mut()[0]
        .insert_non_witness_utxo(&tx)
        .unwrap();
    assert!(matches!(
        psbt.signature_hash(0, None),
        Err(PsbtError::InvalidPsbt(_))
    ));
}

#[test]
fn it_round_trips_dash_payloads() {
    let tx = UtxoTxBuilder::for_network(Network::Dash, &BuildOptions::default())
        .unwrap()
        .spend(Outpoint::null(), 0xffff_ffff)
        .pay_script_pubkey(1_000u64, p2pkh())
        .dash_type(DashTxType::Coinbase)
        .unwrap()
        .extra_payload(vec![2, 0, 0x10, 0x27, 0, 0])
        .unwrap()
        .build()
        .unwrap();

    let mut psbt = psbt_from_transaction(&tx).unwrap();
    assert!(matches!(psbt, AnyPsbt::Utxo(_)));
    let b64 = psbt.psbt().serialize_base64().unwrap();
    let bytes = serialize_psbt(&mut psbt).unwrap();

    let parsed = parse_psbt(&bytes, Network::Dash, &ParseOptions::default()).unwrap();
    assert_eq!(parsed.psbt().tx(), &tx);
    assert_eq!(
        UtxoPsbt::parse_base64(&b64, Network::Dash, &ParseOptions::default()).unwrap(),
        *parsed.psbt()
    );
}

#[test]
fn it_extracts_what_it_was_given() {
    let network = Network::Litecoin;
    let mut tx = spending_tx(network, &funding_tx(network));
    tx.inputs[0].script_sig = ScriptSig::new(vec![0x00]);
    tx.inputs[0].witness = vec![
        WitnessStackItem::new(vec![0x30, 0x01]),
        WitnessStackItem::new(vec![0x02; 33]),
    ];

    let psbt = UtxoPsbt::from_transaction(&tx).unwrap();
    assert!(psbt.tx().inputs[0].script_sig.is_empty());
    assert!(!psbt.tx().has_witnesses());
    assert!(psbt.is_finalized());

    let bytes = psbt.serialize().unwrap();
    let parsed = UtxoPsbt::parse(&bytes, network, &ParseOptions::default()).unwrap();
    assert_eq!(parsed.extract_tx().unwrap(), tx);
}

#[test]
fn it_rejects_trailing_bytes_when_strict() {
    let psbt = UtxoPsbt::new(Network::Bitcoin, &BuildOptions::default()).unwrap();
    let mut bytes = psbt.serialize().unwrap();
    bytes.push(0);

    assert!(matches!(
        UtxoPsbt::parse(&bytes, Network::Bitcoin, &ParseOptions::default()),
        Err(PsbtError::UtxoError(UtxoError::TrailingData { .. }))
    ));
    let lenient = ParseOptions {
        strict: false,
        ..Default::default()
    };
    assert_eq!(UtxoPsbt::parse(&bytes, Network::Bitcoin, &lenient).unwrap(), psbt);
}
