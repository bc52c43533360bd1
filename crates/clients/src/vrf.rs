//! Client for the VRF coordinator contract.
//!
//! Randomness requests do not call the coordinator directly: they arrive as
//! a LINK `transferAndCall` whose payload is `abi.encode(keyHash, seed)`, and
//! the coordinator announces them with a `RandomnessRequest` log. Fulfillment
//! is a direct call carrying the serialized VRF proof.

use crate::{link::LinkToken, send_tx, Error, HttpProvider, HttpTransport};
use alloy::{
    primitives::{aliases::U96, Address, Bytes, B256, U256},
    rpc::types::{Log, TransactionReceipt},
    signers::local::PrivateKeySigner,
    sol_types::SolValue,
};
use keeper_contracts::vrf_coordinator::VRFCoordinator;
use tracing::info;

type CoordinatorContract = VRFCoordinator::VRFCoordinatorInstance<HttpTransport, HttpProvider>;

/// A registered service agreement between the coordinator and an oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAgreement {
    /// Oracle that fulfills requests under this key hash.
    pub oracle: Address,
    /// Fee charged per request, in juels.
    pub fee: U96,
    /// Job id the oracle runs for this agreement.
    pub job_id: B256,
}

/// An in-flight randomness request's callback record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    /// Contract to call back with the random value.
    pub callback_contract: Address,
    /// Fee escrowed for the fulfillment, in juels.
    pub randomness_fee: U96,
    /// Commitment to the request's seed and block number.
    pub seed_and_block_num: B256,
}

/// A decoded `RandomnessRequest` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomnessRequested {
    /// Proving key hash the request is for.
    pub key_hash: B256,
    /// Seed the coordinator derived for the request.
    pub seed: U256,
    /// Job id of the serving oracle.
    pub job_id: B256,
    /// Address the LINK payment came from.
    pub sender: Address,
    /// Paid fee, in juels.
    pub fee: U256,
    /// Request id the fulfillment must reference.
    pub request_id: B256,
}

/// Encode the LINK `transferAndCall` payload for a randomness request.
pub fn encode_randomness_request(key_hash: B256, seed: U256) -> Bytes {
    (key_hash, seed).abi_encode().into()
}

/// The VRF coordinator contract.
#[derive(Debug)]
pub struct VrfCoordinator {
    address: Address,
    contract: CoordinatorContract,
}

impl VrfCoordinator {
    /// Deploy a coordinator and return a client for it.
    pub async fn deploy(
        http_rpc_url: &str,
        signer: PrivateKeySigner,
        link: Address,
        blockhash_store: Address,
    ) -> Result<Self, Error> {
        let provider = crate::http_provider(http_rpc_url, signer)?;
        let contract = VRFCoordinator::deploy(provider, link, blockhash_store)
            .await
            .map_err(Error::TxBroadcast)?;
        let address = *contract.address();

        info!(%address, "deployed VRF coordinator");

        Ok(Self { address, contract })
    }

    /// Wrap an already deployed coordinator.
    pub fn from_address(
        address: Address,
        http_rpc_url: &str,
        signer: PrivateKeySigner,
    ) -> Result<Self, Error> {
        let provider = crate::http_provider(http_rpc_url, signer)?;
        Ok(Self { address, contract: VRFCoordinator::new(address, provider) })
    }

    /// Address of the coordinator contract.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Register an oracle's proving key, returning the key hash announced in
    /// the `NewServiceAgreement` log.
    pub async fn register_proving_key(
        &self,
        fee: U256,
        oracle: Address,
        public_key: [U256; 2],
        job_id: B256,
    ) -> Result<(B256, TransactionReceipt), Error> {
        let receipt =
            send_tx(self.contract.registerProvingKey(fee, oracle, public_key, job_id)).await?;

        let key_hash = receipt
            .inner
            .as_receipt()
            .ok_or(Error::MissingLog("NewServiceAgreement"))?
            .logs
            .iter()
            .find_map(|log| {
                log.log_decode::<VRFCoordinator::NewServiceAgreement>()
                    .ok()
                    .map(|l| l.data().keyHash)
            })
            .ok_or(Error::MissingLog("NewServiceAgreement"))?;

        info!(%oracle, key_hash = %key_hash, "registered proving key");

        Ok((key_hash, receipt))
    }

    /// The key hash the coordinator computes for a public proving key.
    pub async fn hash_of_key(&self, public_key: [U256; 2]) -> Result<B256, Error> {
        Ok(self.contract.hashOfKey(public_key).call().await.map_err(Error::Call)?._0)
    }

    /// Request randomness by sending `fee` juels to the coordinator through
    /// LINK `transferAndCall`, returning the decoded `RandomnessRequest`.
    pub async fn request_randomness(
        &self,
        link: &LinkToken,
        fee: U256,
        key_hash: B256,
        seed: U256,
    ) -> Result<(RandomnessRequested, TransactionReceipt), Error> {
        let payload = encode_randomness_request(key_hash, seed);
        let receipt = link.transfer_and_call(self.address, fee, payload).await?;

        let request = receipt
            .inner
            .as_receipt()
            .ok_or(Error::MissingLog("RandomnessRequest"))?
            .logs
            .iter()
            .find_map(|log| self.parse_randomness_request_log(log).ok())
            .ok_or(Error::MissingLog("RandomnessRequest"))?;

        info!(request_id = %request.request_id, key_hash = %key_hash, "requested randomness");

        Ok((request, receipt))
    }

    /// Fulfill a randomness request with a serialized VRF proof.
    pub async fn fulfill_randomness_request(
        &self,
        proof: Bytes,
    ) -> Result<TransactionReceipt, Error> {
        send_tx(self.contract.fulfillRandomnessRequest(proof)).await
    }

    /// Read an in-flight request's callback record.
    pub async fn callback(&self, request_id: B256) -> Result<Callback, Error> {
        let callback = self.contract.callbacks(request_id).call().await.map_err(Error::Call)?;

        Ok(Callback {
            callback_contract: callback.callbackContract,
            randomness_fee: callback.randomnessFee,
            seed_and_block_num: callback.seedAndBlockNum,
        })
    }

    /// Read the service agreement registered under a key hash.
    pub async fn service_agreement(&self, key_hash: B256) -> Result<ServiceAgreement, Error> {
        let agreement =
            self.contract.serviceAgreements(key_hash).call().await.map_err(Error::Call)?;

        Ok(ServiceAgreement {
            oracle: agreement.vRFOracle,
            fee: agreement.fee,
            job_id: agreement.jobID,
        })
    }

    /// LINK withdrawable by `oracle`, in juels.
    pub async fn withdrawable_tokens(&self, oracle: Address) -> Result<U256, Error> {
        Ok(self.contract.withdrawableTokens(oracle).call().await.map_err(Error::Call)?._0)
    }

    /// Withdraw earned LINK to `recipient`.
    pub async fn withdraw(
        &self,
        recipient: Address,
        amount: U256,
    ) -> Result<TransactionReceipt, Error> {
        send_tx(self.contract.withdraw(recipient, amount)).await
    }

    /// Decode a `RandomnessRequest` log, returning an error on any other log.
    pub fn parse_randomness_request_log(&self, log: &Log) -> Result<RandomnessRequested, Error> {
        let decoded = log.log_decode::<VRFCoordinator::RandomnessRequest>()?;
        let data = decoded.data();

        Ok(RandomnessRequested {
            key_hash: data.keyHash,
            seed: data.seed,
            job_id: data.jobID,
            sender: data.sender,
            fee: data.fee,
            request_id: data.requestID,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn randomness_request_payload_is_a_two_word_tuple() {
        let key_hash = B256::repeat_byte(0x11);
        let seed = U256::from(77);

        let payload = encode_randomness_request(key_hash, seed);

        assert_eq!(payload.len(), 64);
        assert_eq!(&payload[..32], key_hash.as_slice());
        assert_eq!(U256::from_be_slice(&payload[32..]), seed);
    }
}
