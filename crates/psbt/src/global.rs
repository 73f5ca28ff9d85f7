use std::collections::btree_map;

use utxo_tx::Network;

use crate::{
    common::{PsbtKey, PsbtResult, PsbtValidate, PsbtValue, PstMap},
    proprietary::try_val_as_u32,
    schema,
};

psbt_map!(
    /// The PSBT global map. The unsigned transaction is held by the PSBT itself, so this map
    /// never contains a `PSBT_GLOBAL_UNSIGNED_TX` entry in memory.
    PsbtGlobal
);

/// PSBT Global Key Types
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum GlobalKey {
    /// Global key type for PSBT_GLOBAL_UNSIGNED_TX as defined in BIP174
    UnsignedTx = 0,
    /// Global key type for PSBT_GLOBAL_XPUB as defined in BIP174
    Xpub = 1,
    /// Global key type for PSBT_GLOBAL_VERSION as defined in BIP174
    Version = 0xfb,
    /// Global key type for PSBT_GLOBAL_PROPRIETARY as defined in BIP174
    Proprietary = 0xfc,
}

impl From<GlobalKey> for PsbtKey {
    fn from(k: GlobalKey) -> PsbtKey {
        vec![k as u8].into()
    }
}

impl PsbtValidate for PsbtGlobal {
    fn consistency_checks(&self) -> PsbtResult<()> {
        Ok(())
    }

    fn standard_schema(_network: Network) -> schema::KvTypeSchema {
        let mut s: schema::KvTypeSchema = Default::default();
        s.insert(
            GlobalKey::UnsignedTx as u8,
            Box::new(|k, v| schema::global::validate_tx(k, v)),
        );
        s.insert(
            GlobalKey::Xpub as u8,
            Box::new(|k, v| schema::global::validate_xpub(k, v)),
        );
        s.insert(
            GlobalKey::Version as u8,
            Box::new(|k, v| schema::global::validate_version(k, v)),
        );
        s
    }
}

impl PsbtGlobal {
    /// Get a range of XPUBs
    pub fn xpubs(&self) -> btree_map::Range<'_, PsbtKey, PsbtValue> {
        self.range_by_key_type(GlobalKey::Xpub as u8)
    }

    /// Return the raw 78-byte xpubs and their key origins
    pub fn parsed_xpubs(&self) -> PsbtResult<Vec<(Vec<u8>, schema::KeyDerivation)>> {
        self.xpubs()
            .map(|(k, v)| Ok((k.items()[1..].to_vec(), schema::try_val_as_key_derivation(v)?)))
            .collect()
    }

    /// Insert an xpub with its key origin
    pub fn insert_xpub(&mut self, xpub: &[u8], deriv: &schema::KeyDerivation) {
        let mut key = vec![GlobalKey::Xpub as u8];
        key.extend_from_slice(xpub);
        self.insert(key.into(), deriv.to_value());
    }

    /// Get the global PSBT version. 0 if absent.
    pub fn version(&self) -> PsbtResult<u32> {
        match self.get(&GlobalKey::Version.into()) {
            Some(version_val) => try_val_as_u32(version_val),
            None => Ok(0),
        }
    }

    /// Set the global PSBT version
    pub fn set_version(&mut self, version: u32) {
        self.insert(
            GlobalKey::Version.into(),
            version.to_le_bytes().to_vec().into(),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::PsbtError;

    #[test]
    fn it_reads_and_writes_the_version() {
        let mut global = PsbtGlobal::default();
        assert_eq!(global.version().unwrap(), 0);
        global.set_version(2);
        assert_eq!(global.version().unwrap(), 2);
        assert!(global.validate(Network::Bitcoin).is_ok());
    }

    #[test]
    fn it_validates_xpub_depth() {
        let deriv = schema::KeyDerivation {
            fingerprint: [1, 2, 3, 4],
            path: vec![0x8000_002c, 0x8000_0000],
        };
        let mut xpub = vec![0x04, 0x88, 0xb2, 0x1e, 2];
        xpub.extend_from_slice(&[0u8; 73]);

        let mut global = PsbtGlobal::default();
        global.insert_xpub(&xpub, &deriv);
        assert!(global.validate(Network::Bitcoin).is_ok());
        assert_eq!(global.parsed_xpubs().unwrap(), vec![(xpub.clone(), deriv.clone())]);

        xpub[4] = 3;
        let mut global = PsbtGlobal::default();
        global.insert_xpub(&xpub, &deriv);
        assert!(matches!(
            global.validate(Network::Bitcoin),
            Err(PsbtError::Bip32DepthMismatch)
        ));
    }
}
