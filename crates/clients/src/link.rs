//! Client for the LINK (ERC-677) token contract.

use crate::{send_tx, Error, HttpProvider, HttpTransport};
use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionReceipt,
    signers::local::PrivateKeySigner,
};
use keeper_contracts::link_token::LinkToken as LinkTokenBinding;
use tracing::info;

type LinkTokenContract = LinkTokenBinding::LinkTokenInstance<HttpTransport, HttpProvider>;

/// Juels per LINK.
pub const JUELS_PER_LINK: u64 = 1_000_000_000_000_000_000;

/// Convert whole LINK to juels.
pub fn juels(link: u64) -> U256 {
    U256::from(link) * U256::from(JUELS_PER_LINK)
}

/// The LINK token contract. The deployer receives the entire supply.
#[derive(Debug)]
pub struct LinkToken {
    address: Address,
    contract: LinkTokenContract,
}

impl LinkToken {
    /// Deploy the LINK token and return a client for it.
    pub async fn deploy(http_rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, Error> {
        let provider = crate::http_provider(http_rpc_url, signer)?;
        let contract = LinkTokenBinding::deploy(provider).await.map_err(Error::TxBroadcast)?;
        let address = *contract.address();

        info!(%address, "deployed LINK token");

        Ok(Self { address, contract })
    }

    /// Wrap an already deployed LINK token.
    pub fn from_address(
        address: Address,
        http_rpc_url: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, Error> {
        let provider = crate::http_provider(http_rpc_url, signer)?;
        Ok(Self { address, contract: LinkTokenBinding::new(address, provider) })
    }

    /// Address of the token contract.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// LINK balance of `owner`, in juels.
    pub async fn balance_of(&self, owner: Address) -> Result<U256, Error> {
        Ok(self.contract.balanceOf(owner).call().await.map_err(Error::Call)?.balance)
    }

    /// Transfer `amount` juels to `to`.
    pub async fn transfer(&self, to: Address, amount: U256) -> Result<TransactionReceipt, Error> {
        send_tx(self.contract.transfer(to, amount)).await
    }

    /// Approve `spender` for `amount` juels.
    pub async fn approve(
        &self,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionReceipt, Error> {
        send_tx(self.contract.approve(spender, amount)).await
    }

    /// ERC-677 transfer: move `amount` juels to `to` and call its
    /// `onTokenTransfer` with `data`.
    pub async fn transfer_and_call(
        &self,
        to: Address,
        amount: U256,
        data: Bytes,
    ) -> Result<TransactionReceipt, Error> {
        send_tx(self.contract.transferAndCall(to, amount, data)).await
    }
}
