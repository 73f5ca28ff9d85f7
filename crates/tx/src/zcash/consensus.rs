//! Zcash network-upgrade constants.
//!
//! Transactions before v5 do not carry their consensus branch id on the wire. It is assigned
//! from a per-network table keyed by wire version, or picked explicitly with a version selector
//! such as `VERSION4_BRANCH_NU5`. A selector is a wire version times 100, plus a small offset
//! naming the upgrade.

use crate::error::{UtxoError, UtxoResult};

/// Overwinter consensus branch id
pub const OVERWINTER_BRANCH_ID: u32 = 0x5ba8_1b19;
/// Sapling consensus branch id
pub const SAPLING_BRANCH_ID: u32 = 0x76b8_09bb;
/// Blossom consensus branch id
pub const BLOSSOM_BRANCH_ID: u32 = 0x2bb4_0e60;
/// Heartwood consensus branch id
pub const HEARTWOOD_BRANCH_ID: u32 = 0xf5b9_230b;
/// Canopy consensus branch id
pub const CANOPY_BRANCH_ID: u32 = 0xe9ff_75a6;
/// NU5 consensus branch id
pub const NU5_BRANCH_ID: u32 = 0xc2d6_d0b4;
/// NU6 consensus branch id
pub const NU6_BRANCH_ID: u32 = 0xc8e7_1055;

/// Version group id of v3 (Overwinter) transactions
pub const OVERWINTER_VERSION_GROUP_ID: u32 = 0x03c4_8270;
/// Version group id of v4 (Sapling) transactions
pub const SAPLING_VERSION_GROUP_ID: u32 = 0x892f_2085;
/// Version group id of v5 (ZIP225) transactions
pub const ZIP225_VERSION_GROUP_ID: u32 = 0x26a7_270a;

/// v4 with the Canopy branch id
pub const VERSION4_BRANCH_CANOPY: u32 = 400;
/// v4 with the NU5 branch id
pub const VERSION4_BRANCH_NU5: u32 = 450;
/// v4 with the NU6 branch id
pub const VERSION4_BRANCH_NU6: u32 = 460;
/// v5 with the NU5 branch id
pub const VERSION5_BRANCH_NU5: u32 = 500;
/// v5 with the NU6 branch id
pub const VERSION5_BRANCH_NU6: u32 = 560;

/// The highest wire version understood by the codec
pub const MAX_VERSION: u32 = 5;

/// Default consensus branch ids by wire version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchTable {
    entries: &'static [(u32, u32)],
}

/// The Zcash mainnet and testnet table
pub const ZCASH_BRANCH_TABLE: BranchTable = BranchTable {
    entries: &[
        (1, 0),
        (2, 0),
        (3, OVERWINTER_BRANCH_ID),
        (4, NU5_BRANCH_ID),
        (5, NU5_BRANCH_ID),
    ],
};

/// The Komodo table. Komodo never activated upgrades past Sapling.
pub const KOMODO_BRANCH_TABLE: BranchTable = BranchTable {
    entries: &[
        (1, 0),
        (2, 0),
        (3, OVERWINTER_BRANCH_ID),
        (4, SAPLING_BRANCH_ID),
    ],
};

impl BranchTable {
    /// Look up the default branch id for a wire version
    pub fn branch_id(&self, version: u32) -> UtxoResult<u32> {
        self.entries
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, id)| *id)
            .ok_or_else(|| {
                UtxoError::InvalidArgument(format!("no consensus branch id for version {}", version))
            })
    }
}

/// A resolved version request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionSelection {
    /// The version written on the wire
    pub wire_version: u32,
    /// The branch id named by the selector, if it names one
    pub branch_id: Option<u32>,
}

/// Resolve a plain wire version or an upgrade selector.
///
/// ## Errors
///
/// - `InvalidArgument` if the number is neither.
pub fn resolve_version(selector: u32) -> UtxoResult<VersionSelection> {
    let branch_id = match selector {
        1..=MAX_VERSION => {
            return Ok(VersionSelection {
                wire_version: selector,
                branch_id: None,
            })
        }
        VERSION4_BRANCH_CANOPY => CANOPY_BRANCH_ID,
        VERSION4_BRANCH_NU5 | VERSION5_BRANCH_NU5 => NU5_BRANCH_ID,
        VERSION4_BRANCH_NU6 | VERSION5_BRANCH_NU6 => NU6_BRANCH_ID,
        _ => {
            return Err(UtxoError::InvalidArgument(format!(
                "unknown zcash version {}",
                selector
            )))
        }
    };
    Ok(VersionSelection {
        wire_version: selector / 100,
        branch_id: Some(branch_id),
    })
}

/// The version group id for a wire version. 0 before Overwinter.
pub fn default_version_group_id(version: u32) -> u32 {
    match version {
        3 => OVERWINTER_VERSION_GROUP_ID,
        4 => SAPLING_VERSION_GROUP_ID,
        5 => ZIP225_VERSION_GROUP_ID,
        _ => 0,
    }
}
