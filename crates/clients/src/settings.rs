//! Plain data types shared by the registry clients.

use crate::Error;
use alloy::primitives::{
    aliases::{U24, U96},
    Address, Bytes, U256,
};
use keeper_contracts::{keeper_registry_1_2::Config1_2, keeper_registry_1_3::Config1_3};

/// Tunable registry settings, shared by both registry versions.
///
/// The transcoder and registrar addresses are not part of this struct; they
/// have separate setters on chain and are preserved across `setConfig` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Payment premium rate keepers receive on top of the gas reimbursement,
    /// in parts per billion.
    pub payment_premium_ppb: u32,
    /// Flat fee charged for each upkeep, in micro LINK.
    pub flat_fee_micro_link: u32,
    /// Number of blocks in each keeper's turn before the next keeper may
    /// submit.
    pub block_count_per_turn: u32,
    /// Gas limit when checking for upkeep.
    pub check_gas_limit: u32,
    /// Seconds feed data may be stale before the fallback prices are used.
    pub staleness_seconds: u32,
    /// Multiplier applied to the fast gas feed price when calculating the
    /// payment ceiling.
    pub gas_ceiling_multiplier: u16,
    /// Minimum LINK an upkeep must have spent before its remaining funds can
    /// be withdrawn.
    pub min_upkeep_spend: U96,
    /// Max gas an upkeep may use in `performUpkeep`.
    pub max_perform_gas: u32,
    /// Gas price used if the gas feed is stale.
    pub fallback_gas_price: U256,
    /// LINK price used if the LINK price feed is stale.
    pub fallback_link_price: U256,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            payment_premium_ppb: 200_000_000,
            flat_fee_micro_link: 0,
            block_count_per_turn: 10,
            check_gas_limit: 2_500_000,
            staleness_seconds: 90_000,
            gas_ceiling_multiplier: 1,
            min_upkeep_spend: U96::ZERO,
            max_perform_gas: 5_000_000,
            fallback_gas_price: U256::from(200_000_000_000u64),
            fallback_link_price: U256::from(2_000_000_000_000_000_000u64),
        }
    }
}

impl RegistrySettings {
    /// Convert into the v1.2 on-chain config tuple.
    pub fn as_config_1_2(&self, transcoder: Address, registrar: Address) -> Config1_2 {
        Config1_2 {
            paymentPremiumPPB: self.payment_premium_ppb,
            flatFeeMicroLink: self.flat_fee_micro_link,
            blockCountPerTurn: U24::from(self.block_count_per_turn),
            checkGasLimit: self.check_gas_limit,
            stalenessSeconds: U24::from(self.staleness_seconds),
            gasCeilingMultiplier: self.gas_ceiling_multiplier,
            minUpkeepSpend: self.min_upkeep_spend,
            maxPerformGas: self.max_perform_gas,
            fallbackGasPrice: self.fallback_gas_price,
            fallbackLinkPrice: self.fallback_link_price,
            transcoder,
            registrar,
        }
    }

    /// Convert into the v1.3 on-chain config tuple.
    pub fn as_config_1_3(&self, transcoder: Address, registrar: Address) -> Config1_3 {
        Config1_3 {
            paymentPremiumPPB: self.payment_premium_ppb,
            flatFeeMicroLink: self.flat_fee_micro_link,
            blockCountPerTurn: U24::from(self.block_count_per_turn),
            checkGasLimit: self.check_gas_limit,
            stalenessSeconds: U24::from(self.staleness_seconds),
            gasCeilingMultiplier: self.gas_ceiling_multiplier,
            minUpkeepSpend: self.min_upkeep_spend,
            maxPerformGas: self.max_perform_gas,
            fallbackGasPrice: self.fallback_gas_price,
            fallbackLinkPrice: self.fallback_link_price,
            transcoder,
            registrar,
        }
    }

    pub(crate) fn from_config_1_2(config: &Config1_2) -> Self {
        Self {
            payment_premium_ppb: config.paymentPremiumPPB,
            flat_fee_micro_link: config.flatFeeMicroLink,
            block_count_per_turn: config.blockCountPerTurn.to::<u32>(),
            check_gas_limit: config.checkGasLimit,
            staleness_seconds: config.stalenessSeconds.to::<u32>(),
            gas_ceiling_multiplier: config.gasCeilingMultiplier,
            min_upkeep_spend: config.minUpkeepSpend,
            max_perform_gas: config.maxPerformGas,
            fallback_gas_price: config.fallbackGasPrice,
            fallback_link_price: config.fallbackLinkPrice,
        }
    }

    pub(crate) fn from_config_1_3(config: &Config1_3) -> Self {
        Self {
            payment_premium_ppb: config.paymentPremiumPPB,
            flat_fee_micro_link: config.flatFeeMicroLink,
            block_count_per_turn: config.blockCountPerTurn.to::<u32>(),
            check_gas_limit: config.checkGasLimit,
            staleness_seconds: config.stalenessSeconds.to::<u32>(),
            gas_ceiling_multiplier: config.gasCeilingMultiplier,
            min_upkeep_spend: config.minUpkeepSpend,
            max_perform_gas: config.maxPerformGas,
            fallback_gas_price: config.fallbackGasPrice,
            fallback_link_price: config.fallbackLinkPrice,
        }
    }
}

/// A registered upkeep's state, normalized across registry versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpkeepInfo {
    /// Contract the upkeep executes against.
    pub target: Address,
    /// Gas limit passed to the target's `performUpkeep`.
    pub execute_gas: u32,
    /// Data passed to the target's `checkUpkeep`.
    pub check_data: Bytes,
    /// Remaining LINK balance, in juels.
    pub balance: U96,
    /// Keeper which most recently performed this upkeep.
    pub last_keeper: Address,
    /// Address allowed to manage the upkeep.
    pub admin: Address,
    /// Last block at which the upkeep may be performed. `u64::MAX` until the
    /// upkeep is canceled.
    pub max_valid_blocknumber: u64,
    /// Total LINK spent by the upkeep, in juels.
    pub amount_spent: U96,
    /// Whether the upkeep is paused. Always `false` on v1.2, which has no
    /// upkeep pausing.
    pub paused: bool,
}

/// A keeper's status and balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperInfo {
    /// Address the keeper's payments are sent to.
    pub payee: Address,
    /// Whether the keeper is in the active set.
    pub active: bool,
    /// Accrued payment balance, in juels.
    pub balance: U96,
}

/// A decoded `UpkeepPerformed` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpkeepPerformedLog {
    /// Upkeep that was performed.
    pub id: U256,
    /// Whether the target's `performUpkeep` call succeeded.
    pub success: bool,
    /// Keeper that performed the upkeep.
    pub from: Address,
}

/// Peer registry migration permission, as stored on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MigrationPermission {
    /// No migration allowed.
    None = 0,
    /// Upkeeps may migrate to the peer.
    Outgoing = 1,
    /// Upkeeps may migrate from the peer.
    Incoming = 2,
    /// Migration allowed in both directions.
    Bidirectional = 3,
}

impl MigrationPermission {
    /// The raw on-chain enum value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MigrationPermission {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Outgoing),
            2 => Ok(Self::Incoming),
            3 => Ok(Self::Bidirectional),
            other => Err(Error::InvalidMigrationPermission(other)),
        }
    }
}
