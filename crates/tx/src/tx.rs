//! The transaction model shared by every chain family.
//!
//! A `UtxoTransaction` holds the fields all families have in common, plus an `Extension`
//! carrying the fields only one family has. The extension always matches the transaction's
//! network family: `Extension::Dash` on Dash networks, `Extension::Zcash` on Zcash networks, and
//! `Extension::None` everywhere else. Codecs and digest routines rely on that pairing.

use crate::{
    amount::Amount,
    dash::DashTxType,
    error::{UtxoError, UtxoResult},
    nets::{Network, NetworkFamily},
    types::{TxIn, TxOut},
};

/// Options accepted by the parser.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParseOptions {
    /// A version selector. Only meaningful for Zcash-family networks, where it picks the
    /// consensus branch id of a v4 transaction (e.g. 450 for NU5). Other families ignore it.
    pub version: Option<u32>,
    /// Reject unconsumed trailing bytes. Defaults to true.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            version: None,
            strict: true,
        }
    }
}

/// Options accepted by transaction and PSBT builders.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuildOptions {
    /// The requested version. Must be one of the network's allowed versions. Defaults to the
    /// network's default version.
    pub version: Option<u32>,
}

/// Dash special-transaction fields.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub struct DashExtension {
    /// The special-transaction type, carried in the high half of the version field
    pub tx_type: DashTxType,
    /// The opaque special-transaction payload. Serialized with a length prefix if present.
    pub extra_payload: Option<Vec<u8>>,
}

/// Zcash envelope fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub struct ZcashExtension {
    /// The overwintered bit of the header
    pub overwintered: bool,
    /// The version group id. Serialized for v3 and later.
    pub version_group_id: u32,
    /// The expiry height. Serialized for overwintered v3 and later.
    pub expiry_height: u32,
    /// The consensus branch id. Serialized only in v5, otherwise assigned from a table or by the
    /// caller.
    pub consensus_branch_id: u32,
}

/// Family-specific transaction fields.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum Extension {
    /// No extension. Bitcoin and its fork-id forks, Litecoin and Dogecoin.
    #[default]
    None,
    /// Dash special-transaction fields
    Dash(DashExtension),
    /// Zcash envelope fields
    Zcash(ZcashExtension),
}

impl Extension {
    /// The default extension for a family
    pub fn for_family(family: NetworkFamily) -> Self {
        match family {
            NetworkFamily::Dash => Extension::Dash(DashExtension::default()),
            NetworkFamily::Zcash => Extension::Zcash(ZcashExtension::default()),
            _ => Extension::None,
        }
    }

    /// True if this extension may accompany a transaction of `family`
    pub fn matches(&self, family: NetworkFamily) -> bool {
        matches!(
            (self, family),
            (Extension::Dash(_), NetworkFamily::Dash) | (Extension::Zcash(_), NetworkFamily::Zcash)
        ) || (matches!(self, Extension::None)
            && !matches!(family, NetworkFamily::Dash | NetworkFamily::Zcash))
    }
}

/// A transaction on any supported network. `V` is the output value representation, shared by
/// every output and every cached input value.
///
/// Cloning is always deep. Two transactions never share inputs or witness stacks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UtxoTransaction<V: Amount = u64> {
    /// The network this transaction belongs to
    pub network: Network,
    /// The version. For Dash this is the low 16 bits of the wire field. For Zcash it excludes the
    /// overwintered bit.
    pub version: i32,
    /// The vector of inputs
    pub inputs: Vec<TxIn<V>>,
    /// The vector of outputs
    pub outputs: Vec<TxOut<V>>,
    /// The nLocktime field
    pub locktime: u32,
    /// Family-specific fields
    pub extension: Extension,
}

impl<V: Amount> UtxoTransaction<V> {
    /// Instantiate a transaction. Fails if the extension does not match the network's family.
    pub fn new(
        network: Network,
        version: i32,
        inputs: Vec<TxIn<V>>,
        outputs: Vec<TxOut<V>>,
        locktime: u32,
        extension: Extension,
    ) -> UtxoResult<Self> {
        if !extension.matches(network.family()) {
            return Err(UtxoError::InvalidArgument(format!(
                "extension {:?} does not belong to network {}",
                extension, network
            )));
        }
        Ok(Self {
            network,
            version,
            inputs,
            outputs,
            locktime,
            extension,
        })
    }

    /// Copy the transaction, converting every output value and cached input value to `W`.
    /// Inputs and witnesses are deep-copied.
    pub fn convert_amounts<W: Amount>(&self) -> UtxoResult<UtxoTransaction<W>> {
        Ok(UtxoTransaction {
            network: self.network,
            version: self.version,
            inputs: self
                .inputs
                .iter()
                .map(|input| input.convert_amount::<W>())
                .collect::<UtxoResult<_>>()?,
            outputs: self
                .outputs
                .iter()
                .map(|output| output.convert_amount::<W>())
                .collect::<UtxoResult<_>>()?,
            locktime: self.locktime,
            extension: self.extension.clone(),
        })
    }

    /// True if any input carries a witness stack
    pub fn has_witnesses(&self) -> bool {
        self.inputs.iter().any(TxIn::has_witness)
    }

    /// The Dash fields, if this is a Dash transaction
    pub fn dash(&self) -> Option<&DashExtension> {
        match &self.extension {
            Extension::Dash(ext) => Some(ext),
            _ => None,
        }
    }

    /// Mutable access to the Dash fields
    pub fn dash_mut(&mut self) -> Option<&mut DashExtension> {
        match &mut self.extension {
            Extension::Dash(ext) => Some(ext),
            _ => None,
        }
    }

    /// The Zcash fields, if this is a Zcash transaction
    pub fn zcash(&self) -> Option<&ZcashExtension> {
        match &self.extension {
            Extension::Zcash(ext) => Some(ext),
            _ => None,
        }
    }

    /// Mutable access to the Zcash fields
    pub fn zcash_mut(&mut self) -> Option<&mut ZcashExtension> {
        match &mut self.extension {
            Extension::Zcash(ext) => Some(ext),
            _ => None,
        }
    }

    /// The Zcash fields, or `IllegalState` naming the calling operation
    pub(crate) fn require_zcash(&self, op: &str) -> UtxoResult<&ZcashExtension> {
        self.zcash().ok_or_else(|| {
            UtxoError::IllegalState(format!("{} called on {} transaction", op, self.network))
        })
    }

    /// The Dash fields, or `IllegalState` naming the calling operation
    pub(crate) fn require_dash(&self, op: &str) -> UtxoResult<&DashExtension> {
        self.dash().ok_or_else(|| {
            UtxoError::IllegalState(format!("{} called on {} transaction", op, self.network))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{Outpoint, WitnessStackItem};
    use ethnum::U256;

    #[test]
    fn it_rejects_mismatched_extensions() {
        let tx = UtxoTransaction::<u64>::new(
            Network::Bitcoin,
            1,
            vec![],
            vec![],
            0,
            Extension::Zcash(ZcashExtension::default()),
        );
        assert!(matches!(tx, Err(UtxoError::InvalidArgument(_))));
        assert!(UtxoTransaction::<u64>::new(Network::Dash, 1, vec![], vec![], 0, Extension::None).is_err());
        assert!(UtxoTransaction::<u64>::new(
            Network::DashTest,
            3,
            vec![],
            vec![],
            0,
            Extension::for_family(NetworkFamily::Dash)
        )
        .is_ok());
    }

    #[test]
    fn it_deep_copies_on_conversion() {
        let mut input = TxIn::<u64>::new(Outpoint::null(), vec![], 0);
        input.witness.push(WitnessStackItem::new(vec![1, 2, 3]));
        let tx = UtxoTransaction::new(
            Network::Litecoin,
            2,
            vec![input],
            vec![TxOut::new(5u64, vec![0x51u8])],
            10,
            Extension::None,
        )
        .unwrap();

        let mut converted = tx.convert_amounts::<U256>().unwrap();
        assert_eq!(converted.outputs[0].value, U256::from(5u64));
        converted.inputs[0].witness[0] = WitnessStackItem::new(vec![1, 2, 3, 4]);
        assert_eq!(tx.inputs[0].witness[0].len(), 3);

        let back = converted.convert_amounts::<u64>().unwrap();
        assert_eq!(back.locktime, 10);
        assert_eq!(back.inputs[0].witness[0].len(), 4);
    }
}
