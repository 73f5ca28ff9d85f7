//! Simple types for Script and Witness stack datastructures, each of which are treated as opaque,
//! wrapped `Vec<u8>` instances.
//!
//! We do not handle assembly, disassembly, or Script execution. The only script-level operation
//! is removal of `OP_CODESEPARATOR` for legacy signature digests, which needs to know push
//! boundaries and nothing else.
//!
//! Scripts can be freely converted between eachother using `From` and `Into`. This merely rewraps
//! the underlying `Vec<u8>` in the new type.

use utxo_core::{impl_script_conversion, wrap_prefixed_byte_vector};

/// `OP_CODESEPARATOR`
pub const OP_CODESEPARATOR: u8 = 0xab;
/// `OP_PUSHDATA1`
pub const OP_PUSHDATA1: u8 = 0x4c;
/// `OP_PUSHDATA2`
pub const OP_PUSHDATA2: u8 = 0x4d;
/// `OP_PUSHDATA4`
pub const OP_PUSHDATA4: u8 = 0x4e;

wrap_prefixed_byte_vector!(
    /// A Script is marked Vec<u8> for use as an opaque `Script` in signature digests.
    ///
    /// `Script::null()` and `Script::default()` return the empty byte vector with a 0
    /// prefix, which represents numerical 0, boolean `false`, or null bytestring.
    Script
);
wrap_prefixed_byte_vector!(
    /// A ScriptSig is a marked Vec<u8> for use in the script_sig.
    ///
    /// `ScriptSig::null()` and `ScriptSig::default()` return the empty byte vector with a 0
    /// prefix, which represents numerical 0, boolean `false`, or null bytestring.
    ScriptSig
);
wrap_prefixed_byte_vector!(
    /// A WitnessStackItem is a marked `Vec<u8>` intended for use in witnesses. Each
    /// Witness is a prefixed `Vec<WitnessStackItem>`.
    WitnessStackItem
);
wrap_prefixed_byte_vector!(
    /// A ScriptPubkey is a marked Vec<u8> locking an output.
    ScriptPubkey
);

impl_script_conversion!(Script, ScriptPubkey);
impl_script_conversion!(Script, ScriptSig);
impl_script_conversion!(Script, WitnessStackItem);
impl_script_conversion!(ScriptPubkey, ScriptSig);
impl_script_conversion!(ScriptPubkey, WitnessStackItem);
impl_script_conversion!(ScriptSig, WitnessStackItem);

/// A Witness is a prefixed vector of `WitnessStackItem`s. This witness corresponds to a single
/// input.
pub type Witness = Vec<WitnessStackItem>;

/// Determine the header length and data length of the instruction starting at `script[pos]`.
/// Returns `None` if the instruction claims more bytes than the script holds.
fn instruction_len(script: &[u8], pos: usize) -> Option<usize> {
    let op = script[pos];
    let (header, data) = match op {
        0x01..=0x4b => (1, op as usize),
        OP_PUSHDATA1 => (2, *script.get(pos + 1)? as usize),
        OP_PUSHDATA2 => {
            let b = script.get(pos + 1..pos + 3)?;
            (3, u16::from_le_bytes([b[0], b[1]]) as usize)
        }
        OP_PUSHDATA4 => {
            let b = script.get(pos + 1..pos + 5)?;
            (5, u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
        }
        _ => (1, 0),
    };
    let total = header + data;
    if pos + total > script.len() {
        None
    } else {
        Some(total)
    }
}

impl Script {
    /// Return a copy of the script with every `OP_CODESEPARATOR` opcode removed. Pushed data is
    /// never inspected, so a `0xab` byte inside a push survives. A malformed trailing push is
    /// kept verbatim.
    pub fn without_code_separators(&self) -> Script {
        let script = self.items();
        let mut out = Vec::with_capacity(script.len());
        let mut pos = 0;
        while pos < script.len() {
            match instruction_len(script, pos) {
                Some(len) => {
                    if script[pos] != OP_CODESEPARATOR {
                        out.extend_from_slice(&script[pos..pos + len]);
                    }
                    pos += len;
                }
                None => {
                    out.extend_from_slice(&script[pos..]);
                    break;
                }
            }
        }
        out.into()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use utxo_core::ser::ByteFormat;

    #[test]
    fn it_serializes_and_deserializes_scripts() {
        let cases = [
            (
                Script::new(hex::decode("0014758ce550380d964051086798d6546bebdca27a73").unwrap()),
                "160014758ce550380d964051086798d6546bebdca27a73",
                22,
            ),
            (Script::new(vec![]), "00", 0),
            (Script::null(), "00", 0),
        ];
        for case in cases.iter() {
            assert_eq!(Script::deserialize_hex(case.1).unwrap(), case.0);
            assert_eq!(case.0.serialize_hex().unwrap(), case.1);
            assert_eq!(case.0.len(), case.2);
            assert_eq!(case.0.serialized_length(), case.2 + 1);
        }
    }

    #[test]
    fn it_strips_code_separators() {
        let cases = [
            // bare separators
            ("ab76ab", "76"),
            // a 0xab inside a direct push survives
            ("02abab87ab", "02abab87"),
            // PUSHDATA1 carrying a 0xab
            ("4c01abab51", "4c01ab51"),
            // PUSHDATA2
            ("4d0200abab", "4d0200abab"),
            // truncated push is kept as-is
            ("ab05abab", "05abab"),
            ("", ""),
        ];
        for (input, expected) in cases.iter() {
            let script = Script::new(hex::decode(input).unwrap());
            assert_eq!(hex::encode(script.without_code_separators().items()), *expected);
        }
    }

    #[test]
    fn it_converts_between_script_types() {
        let pubkey = ScriptPubkey::new(vec![0x51]);
        let script: Script = (&pubkey).into();
        let sig: ScriptSig = (&script).into();
        assert_eq!(sig.items(), pubkey.items());
    }
}
