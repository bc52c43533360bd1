//! Client for the keeper registrar contract.
//!
//! Upkeep registration requests reach the registrar as the calldata of a
//! LINK `transferAndCall`; [`encode_registration`] builds that payload.

use crate::{send_tx, Error, HttpProvider, HttpTransport};
use alloy::{
    primitives::{aliases::U96, Address, Bytes, U256},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use keeper_contracts::keeper_registrar::KeeperRegistrar as RegistrarBinding;
use tracing::info;

type RegistrarContract = RegistrarBinding::KeeperRegistrarInstance<HttpTransport, HttpProvider>;

/// Registrar configuration.
#[derive(Debug, Clone)]
pub struct RegistrarSettings {
    /// Auto-approval mode (0 disabled, 1 approve all, 2 approve allowlist).
    pub auto_approve_config_type: u8,
    /// Max registrations that will be auto-approved.
    pub auto_approve_max_allowed: u16,
    /// Registry the registrar registers upkeeps into.
    pub registry: Address,
    /// Minimum LINK that must accompany a registration, in juels.
    pub min_link_juels: U96,
}

/// An upkeep registration request.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Display name of the upkeep.
    pub name: String,
    /// Encrypted admin contact, opaque to the contract.
    pub encrypted_email: Bytes,
    /// Contract the upkeep executes against.
    pub upkeep_contract: Address,
    /// Gas limit for the upkeep's perform.
    pub gas_limit: u32,
    /// Address allowed to manage the upkeep.
    pub admin: Address,
    /// Data passed to the target's `checkUpkeep`.
    pub check_data: Bytes,
    /// LINK sent along with the request, in juels.
    pub amount: U96,
    /// Origin tag of the registration (UI, CLI, ...).
    pub source: u8,
    /// Address the request is sent from.
    pub sender: Address,
}

/// Encode a registration request as the `register` calldata the registrar
/// expects through LINK `transferAndCall`.
pub fn encode_registration(request: &RegistrationRequest) -> Bytes {
    let call = RegistrarBinding::registerCall {
        name: request.name.clone(),
        encryptedEmail: request.encrypted_email.clone(),
        upkeepContract: request.upkeep_contract,
        gasLimit: request.gas_limit,
        adminAddress: request.admin,
        checkData: request.check_data.clone(),
        amount: request.amount,
        source: request.source,
        sender: request.sender,
    };

    call.abi_encode().into()
}

/// The keeper registrar contract.
#[derive(Debug)]
pub struct KeeperRegistrar {
    address: Address,
    contract: RegistrarContract,
}

impl KeeperRegistrar {
    /// Deploy a registrar and return a client for it.
    pub async fn deploy(
        http_rpc_url: &str,
        signer: PrivateKeySigner,
        link: Address,
        settings: RegistrarSettings,
    ) -> Result<Self, Error> {
        let provider = crate::http_provider(http_rpc_url, signer)?;
        let contract = RegistrarBinding::deploy(
            provider,
            link,
            settings.auto_approve_config_type,
            settings.auto_approve_max_allowed,
            settings.registry,
            settings.min_link_juels,
        )
        .await
        .map_err(Error::TxBroadcast)?;
        let address = *contract.address();

        info!(%address, "deployed keeper registrar");

        Ok(Self { address, contract })
    }

    /// Wrap an already deployed registrar.
    pub fn from_address(
        address: Address,
        http_rpc_url: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, Error> {
        let provider = crate::http_provider(http_rpc_url, signer)?;
        Ok(Self { address, contract: RegistrarBinding::new(address, provider) })
    }

    /// Address of the registrar contract.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Update the registrar configuration.
    pub async fn set_registration_config(
        &self,
        settings: RegistrarSettings,
    ) -> Result<TransactionReceipt, Error> {
        send_tx(self.contract.setRegistrationConfig(
            settings.auto_approve_config_type,
            settings.auto_approve_max_allowed,
            settings.registry,
            settings.min_link_juels,
        ))
        .await
    }

    /// Read the registrar configuration and the approved-registration count.
    pub async fn registration_config(&self) -> Result<(RegistrarSettings, u32), Error> {
        let config = self.contract.getRegistrationConfig().call().await.map_err(Error::Call)?;

        let settings = RegistrarSettings {
            auto_approve_config_type: config.autoApproveConfigType,
            auto_approve_max_allowed: config.autoApproveMaxAllowed as u16,
            registry: config.keeperRegistry,
            min_link_juels: config.minLINKJuels.to::<U96>(),
        };

        Ok((settings, config.approvedCount))
    }
}
