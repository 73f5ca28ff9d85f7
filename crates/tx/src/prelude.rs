//! Re-exports of common types, traits and entry points.
pub use crate::{
    amount::{convert_amount, to_amount, Amount, AmountInput},
    builder::UtxoTxBuilder,
    dash::{DashCodec, DashTxType},
    dispatch::*,
    error::{UtxoError, UtxoResult},
    hashes::{SighashDigest, TXID, WTXID},
    legacy::BitcoinCodec,
    nets::{Network, NetworkFamily, NetworkParams},
    tx::*,
    types::*,
    zcash::ZcashCodec,
};

pub use utxo_core::prelude::*;
