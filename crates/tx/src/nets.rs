//! The `nets` module contains network definitions. A `Network` identifies a chain and its
//! mainnet/testnet variant. Every network resolves to a mainnet, and every mainnet belongs to a
//! `NetworkFamily`. The family is the key for all codec and digest dispatch.
//!
//! ```
//! use utxo_tx::nets::{Network, NetworkFamily};
//!
//! let net: Network = "bitcoincashTestnet".parse().unwrap();
//! assert_eq!(net.mainnet(), Network::BitcoinCash);
//! assert_eq!(net.family(), NetworkFamily::BitcoinCash);
//! assert_eq!(net.params().fork_id, 0);
//! ```

use once_cell::sync::Lazy;
use std::{collections::HashMap, fmt, str::FromStr};

use crate::{
    error::UtxoError,
    types::sighash::SighashType,
    zcash::consensus::{self, BranchTable},
};

/// A supported network.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Network {
    /// Bitcoin mainnet
    Bitcoin,
    /// Bitcoin testnet
    Testnet,
    /// Bitcoin Cash mainnet
    BitcoinCash,
    /// Bitcoin Cash testnet
    BitcoinCashTestnet,
    /// eCash mainnet
    Ecash,
    /// eCash testnet
    EcashTest,
    /// Bitcoin SV mainnet
    BitcoinSv,
    /// Bitcoin SV testnet
    BitcoinSvTestnet,
    /// Bitcoin Gold mainnet
    BitcoinGold,
    /// Bitcoin Gold testnet
    BitcoinGoldTestnet,
    /// Dash mainnet
    Dash,
    /// Dash testnet
    DashTest,
    /// Dogecoin mainnet
    Dogecoin,
    /// Dogecoin testnet
    DogecoinTest,
    /// Litecoin mainnet
    Litecoin,
    /// Litecoin testnet
    LitecoinTest,
    /// Zcash mainnet
    Zcash,
    /// Zcash testnet
    ZcashTest,
    /// Komodo mainnet. Uses the Zcash transaction format.
    Komodo,
}

/// The chain families. Each family has one codec and one digest strategy.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum NetworkFamily {
    /// Bitcoin. Legacy and BIP143 segwit digests.
    Bitcoin,
    /// Bitcoin Cash. Fork-id digests.
    BitcoinCash,
    /// eCash. Fork-id digests.
    Ecash,
    /// Bitcoin SV. Fork-id digests.
    BitcoinSv,
    /// Bitcoin Gold. Fork-id digests with fork id 79.
    BitcoinGold,
    /// Dash. Special transactions with an extra payload.
    Dash,
    /// Dogecoin. Legacy digests only.
    Dogecoin,
    /// Litecoin. Legacy and BIP143 segwit digests.
    Litecoin,
    /// Zcash and its forks. Versioned envelope, ZIP243/ZIP244 digests.
    Zcash,
}

/// Per-network protocol constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    /// The 24-bit fork id folded into fork-id sighash types. 0 for most families.
    pub fork_id: u32,
    /// Whether the fork-id sighash path is available at all
    pub supports_fork_id: bool,
    /// Whether the alternate fork-id flag (0x10) also requests the fork-id path
    pub supports_alt_fork_id_flag: bool,
    /// Whether the BIP144 witness serialization is recognized
    pub supports_segwit: bool,
    /// The default transaction version used by builders
    pub default_version: u32,
    /// Versions a caller may explicitly request from a builder
    pub allowed_versions: &'static [u32],
    /// The sighash type PSBT signers should use when none is specified
    pub default_sighash_type: SighashType,
    /// Default consensus branch ids by wire version. Only Zcash-family networks have one.
    pub branch_ids: Option<BranchTable>,
}

const NETWORKS: [Network; 19] = [
    Network::Bitcoin,
    Network::Testnet,
    Network::BitcoinCash,
    Network::BitcoinCashTestnet,
    Network::Ecash,
    Network::EcashTest,
    Network::BitcoinSv,
    Network::BitcoinSvTestnet,
    Network::BitcoinGold,
    Network::BitcoinGoldTestnet,
    Network::Dash,
    Network::DashTest,
    Network::Dogecoin,
    Network::DogecoinTest,
    Network::Litecoin,
    Network::LitecoinTest,
    Network::Zcash,
    Network::ZcashTest,
    Network::Komodo,
];

static PARAMS: Lazy<HashMap<Network, NetworkParams>> = Lazy::new(|| {
    NETWORKS
        .iter()
        .map(|net| (*net, build_params(net.mainnet())))
        .collect()
});

fn build_params(mainnet: Network) -> NetworkParams {
    let legacy = NetworkParams {
        fork_id: 0,
        supports_fork_id: false,
        supports_alt_fork_id_flag: false,
        supports_segwit: false,
        default_version: 1,
        allowed_versions: &[1, 2],
        default_sighash_type: SighashType::ALL,
        branch_ids: None,
    };
    let fork_id = NetworkParams {
        supports_fork_id: true,
        default_version: 2,
        allowed_versions: &[1, 2],
        default_sighash_type: SighashType::ALL_FORKID,
        ..legacy.clone()
    };
    match mainnet.family() {
        NetworkFamily::Bitcoin | NetworkFamily::Litecoin => NetworkParams {
            supports_segwit: true,
            ..legacy
        },
        NetworkFamily::Dash => NetworkParams {
            allowed_versions: &[1, 2, 3],
            ..legacy
        },
        NetworkFamily::Dogecoin => legacy,
        NetworkFamily::BitcoinCash | NetworkFamily::Ecash | NetworkFamily::BitcoinSv => fork_id,
        NetworkFamily::BitcoinGold => NetworkParams {
            fork_id: 79,
            supports_alt_fork_id_flag: true,
            supports_segwit: true,
            ..fork_id
        },
        NetworkFamily::Zcash if mainnet == Network::Komodo => NetworkParams {
            default_version: 4,
            allowed_versions: &[1, 2, 3, 4],
            branch_ids: Some(consensus::KOMODO_BRANCH_TABLE),
            ..legacy
        },
        NetworkFamily::Zcash => NetworkParams {
            default_version: consensus::VERSION4_BRANCH_NU5,
            allowed_versions: &[
                4,
                5,
                consensus::VERSION4_BRANCH_CANOPY,
                consensus::VERSION4_BRANCH_NU5,
                consensus::VERSION4_BRANCH_NU6,
                consensus::VERSION5_BRANCH_NU5,
                consensus::VERSION5_BRANCH_NU6,
            ],
            branch_ids: Some(consensus::ZCASH_BRANCH_TABLE),
            ..legacy
        },
    }
}

impl Network {
    /// All supported networks
    pub fn all() -> &'static [Network] {
        &NETWORKS
    }

    /// Resolve a testnet to its mainnet. Mainnets resolve to themselves.
    pub fn mainnet(&self) -> Network {
        match self {
            Network::Bitcoin | Network::Testnet => Network::Bitcoin,
            Network::BitcoinCash | Network::BitcoinCashTestnet => Network::BitcoinCash,
            Network::Ecash | Network::EcashTest => Network::Ecash,
            Network::BitcoinSv | Network::BitcoinSvTestnet => Network::BitcoinSv,
            Network::BitcoinGold | Network::BitcoinGoldTestnet => Network::BitcoinGold,
            Network::Dash | Network::DashTest => Network::Dash,
            Network::Dogecoin | Network::DogecoinTest => Network::Dogecoin,
            Network::Litecoin | Network::LitecoinTest => Network::Litecoin,
            Network::Zcash | Network::ZcashTest => Network::Zcash,
            Network::Komodo => Network::Komodo,
        }
    }

    /// True if the network is a mainnet
    pub fn is_mainnet(&self) -> bool {
        self.mainnet() == *self
    }

    /// The chain family of this network
    pub fn family(&self) -> NetworkFamily {
        match self.mainnet() {
            Network::Bitcoin => NetworkFamily::Bitcoin,
            Network::BitcoinCash => NetworkFamily::BitcoinCash,
            Network::Ecash => NetworkFamily::Ecash,
            Network::BitcoinSv => NetworkFamily::BitcoinSv,
            Network::BitcoinGold => NetworkFamily::BitcoinGold,
            Network::Dash => NetworkFamily::Dash,
            Network::Dogecoin => NetworkFamily::Dogecoin,
            Network::Litecoin => NetworkFamily::Litecoin,
            Network::Zcash | Network::Komodo => NetworkFamily::Zcash,
            // `mainnet()` never returns a testnet
            _ => NetworkFamily::Bitcoin,
        }
    }

    /// The protocol constants of this network
    pub fn params(&self) -> &'static NetworkParams {
        // every variant of `NETWORKS` is inserted on first access
        &PARAMS[self]
    }

    /// The stable lowercase name of this network
    pub fn name(&self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::BitcoinCash => "bitcoincash",
            Network::BitcoinCashTestnet => "bitcoincashTestnet",
            Network::Ecash => "ecash",
            Network::EcashTest => "ecashTest",
            Network::BitcoinSv => "bitcoinsv",
            Network::BitcoinSvTestnet => "bitcoinsvTestnet",
            Network::BitcoinGold => "bitcoingold",
            Network::BitcoinGoldTestnet => "bitcoingoldTestnet",
            Network::Dash => "dash",
            Network::DashTest => "dashTest",
            Network::Dogecoin => "dogecoin",
            Network::DogecoinTest => "dogecoinTest",
            Network::Litecoin => "litecoin",
            Network::LitecoinTest => "litecoinTest",
            Network::Zcash => "zcash",
            Network::ZcashTest => "zcashTest",
            Network::Komodo => "komodo",
        }
    }

    /// True for the Zcash family (including forks using the Zcash format)
    pub fn is_zcash(&self) -> bool {
        self.family() == NetworkFamily::Zcash
    }

    /// True for the Dash family
    pub fn is_dash(&self) -> bool {
        self.family() == NetworkFamily::Dash
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = UtxoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NETWORKS
            .iter()
            .find(|n| n.name() == s)
            .copied()
            .ok_or_else(|| UtxoError::InvalidNetwork(s.to_owned()))
    }
}

impl serde::Serialize for Network {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
