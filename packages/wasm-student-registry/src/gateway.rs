//! Remote record gateway
//!
//! Typed read/write access to the registry contract. Writes always go
//! simulate -> submit -> confirm; reads are direct `eth_call` queries on
//! the read client.

use crate::client::{CallRequest, ReadClient, WriteClient};
use crate::config::NetworkConfig;
use crate::contract::{
    getCompletedCoursesCall, getStudentByMSSVCall, getStudentsInRangeCall, getTotalStudentsCall,
    record_from_return, u256_to_u64, ContractCall, RevertReason,
};
use crate::error::RegistryError;
use crate::provider::Sleeper;
use crate::session::Session;
use crate::types::{Receipt, Record};
use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use log::{debug, info, trace};
use std::rc::Rc;

/// Read/write façade over the registry contract
#[derive(Clone)]
pub struct RecordGateway {
    contract: String,
    chain_id: u64,
    read: ReadClient,
    write: Option<WriteClient>,
    epoch: Option<u64>,
    poll_interval_ms: u32,
    max_polls: Option<u32>,
    sleeper: Rc<dyn Sleeper>,
}

impl RecordGateway {
    /// Read-only gateway; attach a session with [`RecordGateway::with_session`]
    pub fn new(config: &NetworkConfig, read: ReadClient, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            contract: config.contract_address.clone(),
            chain_id: config.chain_id,
            read,
            write: None,
            epoch: None,
            poll_interval_ms: config.poll_interval_ms,
            max_polls: config.max_confirmation_polls,
            sleeper,
        }
    }

    /// Bind writes to the session's account and remember its epoch
    pub fn with_session(self, session: &Session) -> Self {
        self.with_write(session.clients().write.clone(), session.epoch())
    }

    pub fn with_write(mut self, write: WriteClient, epoch: u64) -> Self {
        self.write = Some(write);
        self.epoch = Some(epoch);
        self
    }

    pub fn can_write(&self) -> bool {
        self.write.is_some()
    }

    /// Account writes are submitted from
    pub fn account(&self) -> Option<&str> {
        self.write.as_ref().map(WriteClient::account)
    }

    /// Epoch of the session the write client was taken from
    pub fn session_epoch(&self) -> Option<u64> {
        self.epoch
    }

    /// Dry-run `call` from the session account, then submit it.
    ///
    /// Returns the transaction hash. A revert during the dry run fails with
    /// `SimulationReverted` and nothing is broadcast.
    pub async fn simulate_and_submit(&self, call: &ContractCall) -> Result<String, RegistryError> {
        let write = self.write.as_ref().ok_or(RegistryError::NotConnected)?;
        let data = call.data_hex();

        debug!("Simulating {} from {}", call.signature(), write.account());
        let request = CallRequest {
            from: Some(write.account().to_string()),
            to: self.contract.clone(),
            data: data.clone(),
        };
        if let Err(err) = self.read.call(&request).await {
            return Err(match RevertReason::from_rpc_error(&err) {
                Some(reason) => {
                    debug!("{} reverted in simulation: {}", call.function_name(), reason);
                    RegistryError::SimulationReverted(reason)
                }
                None => RegistryError::SubmissionFailed(err.message),
            });
        }

        let wallet_chain = write
            .chain_id()
            .await
            .map_err(|e| RegistryError::SubmissionFailed(e.message))?;
        if wallet_chain != self.chain_id {
            return Err(RegistryError::SubmissionFailed(format!(
                "wallet is connected to chain {} but chain {} is required",
                wallet_chain, self.chain_id
            )));
        }

        let hash = write
            .send_transaction(&self.contract, data)
            .await
            .map_err(|e| RegistryError::SubmissionFailed(e.message))?;
        info!("Submitted {} as {}", call.function_name(), hash);
        Ok(hash)
    }

    /// Poll for the receipt of `hash` until it is included.
    ///
    /// A reverted receipt is returned as such, not as an error. Polling
    /// stops after `max_confirmation_polls` empty results when configured.
    pub async fn confirm(&self, hash: &str) -> Result<Receipt, RegistryError> {
        let mut polls: u32 = 0;
        loop {
            let receipt = self
                .read
                .transaction_receipt(hash)
                .await
                .map_err(|e| RegistryError::QueryFailed(e.raw_reason()))?;
            polls += 1;
            if let Some(receipt) = receipt {
                debug!(
                    "Receipt for {} after {} polls: {:?}",
                    hash, polls, receipt.status
                );
                return Ok(receipt);
            }
            if self.max_polls.is_some_and(|max| polls >= max) {
                return Err(RegistryError::ConfirmationTimeout {
                    hash: hash.to_string(),
                    polls,
                });
            }
            trace!("{} not yet included, poll {}", hash, polls);
            self.sleeper.sleep(self.poll_interval_ms).await;
        }
    }

    /// Stateless view call on the read client
    pub async fn query<C: SolCall>(&self, call: &C) -> Result<C::Return, RegistryError> {
        let request = CallRequest {
            from: None,
            to: self.contract.clone(),
            data: format!("0x{}", hex::encode(call.abi_encode())),
        };
        let data = self.read.call(&request).await.map_err(|err| {
            match RevertReason::from_rpc_error(&err) {
                Some(reason) => RegistryError::QueryFailed(format!("{}: {}", C::SIGNATURE, reason)),
                None => RegistryError::QueryFailed(err.message),
            }
        })?;
        C::abi_decode_returns(&data, true)
            .map_err(|e| RegistryError::QueryFailed(format!("{}: {}", C::SIGNATURE, e)))
    }

    /// `getStudentByMSSV`; a missing id yields a record with `exists == false`
    pub async fn get_student(&self, id: u64) -> Result<Record, RegistryError> {
        let ret = self
            .query(&getStudentByMSSVCall { id: U256::from(id) })
            .await?;
        record_from_return(ret)
    }

    /// `getStudentsInRange`; bounds are passed to the contract unchanged
    pub async fn get_students_in_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<u64>, RegistryError> {
        let ret = self
            .query(&getStudentsInRangeCall {
                start: U256::from(start),
                end: U256::from(end),
            })
            .await?;
        ret.ids.into_iter().map(|id| u256_to_u64(id, "id")).collect()
    }

    pub async fn get_total_students(&self) -> Result<u64, RegistryError> {
        let ret = self.query(&getTotalStudentsCall {}).await?;
        u256_to_u64(ret.total, "total")
    }

    pub async fn get_completed_courses(&self, id: u64) -> Result<Vec<u64>, RegistryError> {
        let ret = self
            .query(&getCompletedCoursesCall { id: U256::from(id) })
            .await?;
        ret.courses
            .into_iter()
            .map(|course| u256_to_u64(course, "courseId"))
            .collect()
    }
}
