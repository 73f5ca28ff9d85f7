//! Re-exports of the PSBT types, map traits and entry points.
pub use crate::{
    common::{PsbtError, PsbtKey, PsbtResult, PsbtValidate, PsbtValue, PstMap},
    dispatch::*,
    global::{GlobalKey, PsbtGlobal},
    input::{InputKey, PartialSig, PsbtInput},
    output::{OutputKey, PsbtOutput},
    proprietary::{ProprietaryKey, ProprietaryKeySubtype},
    psbt::UtxoPsbt,
    schema::KeyDerivation,
    zcash::ZcashPsbt,
};

pub use utxo_tx::prelude::*;
