//! TxOut type, generic over the output value representation.

use std::io::{Read, Write};

use utxo_core::ser::ByteFormat;

use crate::{
    amount::{convert_amount, Amount},
    error::{UtxoError, UtxoResult},
    types::script::ScriptPubkey,
};

/// An Output. This describes a new UTXO to be created. The value is encoded as an LE u64 on the
/// wire, and held in memory as `V`. The script pubkey encodes the spending constraints.
///
/// `TxOut::null()` returns the "null" TxOut, which has a value of 0xffff_ffff_ffff_ffff, and an
/// empty `script_pubkey`. This null output is used within legacy sighash calculations.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct TxOut<V: Amount = u64> {
    /// The value of the output in the chain's base unit
    pub value: V,
    /// The `ScriptPubkey` which locks the UTXO.
    pub script_pubkey: ScriptPubkey,
}

impl<V: Amount> TxOut<V> {
    /// Instantiate a new TxOut.
    pub fn new<T>(value: V, script_pubkey: T) -> Self
    where
        T: Into<ScriptPubkey>,
    {
        TxOut {
            value,
            script_pubkey: script_pubkey.into(),
        }
    }

    /// Instantiate the null TxOut, which is used in Legacy Sighash.
    pub fn null() -> Self {
        TxOut {
            value: V::from_u64(0xffff_ffff_ffff_ffff),
            script_pubkey: ScriptPubkey::null(),
        }
    }

    /// Deep-copy the output, converting its value.
    pub fn convert_amount<W: Amount>(&self) -> UtxoResult<TxOut<W>> {
        Ok(TxOut {
            value: convert_amount(self.value)?,
            script_pubkey: self.script_pubkey.clone(),
        })
    }
}

impl<V: Amount> ByteFormat for TxOut<V> {
    type Error = UtxoError;

    fn serialized_length(&self) -> usize {
        let mut len = 8; // value
        len += self.script_pubkey.serialized_length();
        len
    }

    fn read_from<R>(reader: &mut R, _limit: usize) -> UtxoResult<Self>
    where
        R: Read,
        Self: std::marker::Sized,
    {
        let value = Self::read_u64_le(reader)?;
        Ok(TxOut {
            value: V::from_u64(value),
            script_pubkey: ScriptPubkey::read_from(reader, 0)?,
        })
    }

    fn write_to<W>(&self, writer: &mut W) -> UtxoResult<usize>
    where
        W: Write,
    {
        let mut len = Self::write_u64_le(writer, self.value.as_wire_value()?)?;
        len += self.script_pubkey.write_to(writer)?;
        Ok(len)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethnum::U256;

    #[test]
    fn it_serializes_and_derializes_outputs() {
        let cases = [
            (TxOut::<u64>::new(0, vec![]), "000000000000000000", 9),
            (TxOut::<u64>::null(), "ffffffffffffffff00", 9),
            (
                TxOut::<u64>::new(32_454_049, hex::decode("a914bc3b654dca7e56b04dca18f2566cdaf02e8d9ada87").unwrap()),
                "a135ef010000000017a914bc3b654dca7e56b04dca18f2566cdaf02e8d9ada87",
                32,
            ),
        ];
        for case in cases.iter() {
            assert_eq!(case.0.serialized_length(), case.2);
            assert_eq!(case.0.serialize_hex().unwrap(), case.1);
            assert_eq!(TxOut::<u64>::deserialize_hex(case.1).unwrap(), case.0);
        }
    }

    #[test]
    fn it_writes_u256_values_that_fit() {
        let out = TxOut::new(U256::from(1u64), vec![0x51u8]);
        assert_eq!(out.serialize_hex().unwrap(), "01000000000000000151");

        let big = TxOut::new(U256::from(u64::MAX) + U256::ONE, vec![0x51u8]);
        match big.serialize_hex() {
            Err(UtxoError::InvalidArgument(_)) => {}
            e => panic!("expected InvalidArgument, got {:?}", e),
        }
    }
}
