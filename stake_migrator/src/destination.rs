//! Destination resolution for a single position

use crate::contracts::VaultInfo;
use crate::types::{Destination, Position};

/// Picks where `position` is staked.
///
/// Vaults win when `prefer_vaults` is set and an active vault stakes the same
/// LP token on `chain_id`. Otherwise the farm pid decides between the single
/// asset pool (pid 0) and a regular farm.
pub fn resolve_destination(
    position: &Position,
    vaults: &[VaultInfo],
    chain_id: u64,
    prefer_vaults: bool,
) -> Destination {
    if prefer_vaults {
        if let Some(vault) = matching_vault(position, vaults, chain_id) {
            return Destination::Vault { pid: vault.pid };
        }
    }

    match position.farm_pid {
        0 => Destination::Pool,
        pid => Destination::Farm { pid },
    }
}

/// First active vault whose stake token is the position's LP token
pub fn matching_vault<'a>(position: &Position, vaults: &'a [VaultInfo], chain_id: u64) -> Option<&'a VaultInfo> {
    vaults.iter().filter(|vault| !vault.inactive).find(|vault| {
        vault
            .stake_token_on(chain_id)
            .map_or(false, |address| address.eq_ignore_ascii_case(&position.lp_address))
    })
}
