// Single-order verification workflow
//
// Flow (by local order id):
// 1. Load record; if none, build creation payload and create the remote order
// 2. Persist new record (not_dispatched)
// 3. State machine check: dispatch must be legal
// 4. Remote verify call
// 5. Apply transition and save (optimistic)
//
// Store writes happen only after the remote call succeeds and the state
// machine accepts the transition.

use std::sync::Arc;

use crate::api_client::VerificationApi;
use crate::db::VerificationStore;
use crate::models::errors::VerifyError;
use crate::models::order::{OrderCreationPayload, SalesOrder};
use crate::models::verification::VerificationRecord;
use crate::models::verification_fsm;

/// Read-only access to the store's order repository.
pub trait OrderSource: Send + Sync {
    /// Metadata for the requested ids; unknown ids are simply absent.
    fn load_orders(&self, order_ids: &[u64]) -> Result<Vec<SalesOrder>, VerifyError>;

    /// Creation payload for the remote mirror of one order.
    fn creation_payload(&self, order_id: u64) -> Result<OrderCreationPayload, VerifyError>;
}

/// Outcome of a status refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Updated(VerificationRecord),
    NoUpdate,
}

pub struct OrderVerifier {
    store: Arc<VerificationStore>,
    api: Arc<dyn VerificationApi>,
    orders: Arc<dyn OrderSource>,
}

impl OrderVerifier {
    pub fn new(
        store: Arc<VerificationStore>,
        api: Arc<dyn VerificationApi>,
        orders: Arc<dyn OrderSource>,
    ) -> Self {
        Self { store, api, orders }
    }

    /// Verify an order identified by its local store id, creating the remote
    /// mirror first when none exists yet.
    pub async fn verify_by_order_id(&self, order_id: u64) -> Result<VerificationRecord, VerifyError> {
        let record = match self.store.load_by_order_id(order_id)? {
            Some(record) => record,
            None => self.create_remote_mirror(order_id).await?,
        };
        self.dispatch(record).await
    }

    /// Verify an order identified by its remote id. The record must exist.
    pub async fn verify_by_remote_id(
        &self,
        remote_order_id: &str,
    ) -> Result<VerificationRecord, VerifyError> {
        let record = self
            .store
            .load_by_remote_id(remote_order_id)?
            .ok_or_else(|| VerifyError::NotFound {
                id: remote_order_id.to_string(),
            })?;
        self.dispatch(record).await
    }

    /// Pull the latest verification status for a dispatched, not yet
    /// verified order and merge it into the local record.
    pub async fn refresh_status(&self, remote_order_id: &str) -> Result<RefreshOutcome, VerifyError> {
        let mut record = self
            .store
            .load_by_remote_id(remote_order_id)?
            .ok_or_else(|| VerifyError::NotFound {
                id: remote_order_id.to_string(),
            })?;

        // Must fail before any remote call is issued
        verification_fsm::ensure_refreshable(&record)?;

        let result = match self
            .api
            .retrieve_verification_status(remote_order_id.to_string())
            .await?
        {
            Some(result) => result,
            None => return Ok(RefreshOutcome::NoUpdate),
        };

        if !result.has_update() {
            return Ok(RefreshOutcome::NoUpdate);
        }

        if !verification_fsm::apply_status_refresh(&mut record, &result)? {
            return Ok(RefreshOutcome::NoUpdate);
        }

        let saved = self.store.save(&record)?;
        log::info!(
            "order {} verification status refreshed, state {}",
            saved.order_id,
            saved.verification_state
        );
        Ok(RefreshOutcome::Updated(saved))
    }

    async fn create_remote_mirror(&self, order_id: u64) -> Result<VerificationRecord, VerifyError> {
        let payload = self.orders.creation_payload(order_id)?;
        let remote = self
            .api
            .create_remote_order(payload)
            .await
            .map_err(|e| VerifyError::CreationFailed {
                order_id,
                reason: e.to_string(),
            })?;

        let record = VerificationRecord::new(order_id, remote.remote_order_id);
        self.store.insert_new(&record)?;
        log::info!(
            "created remote order {} for order {}",
            record.remote_order_id,
            order_id
        );
        Ok(record)
    }

    async fn dispatch(&self, mut record: VerificationRecord) -> Result<VerificationRecord, VerifyError> {
        // Illegal dispatch skips the remote call entirely
        verification_fsm::ensure_dispatchable(&record)?;

        let result = self
            .api
            .verify_remote_order(record.remote_order_id.clone())
            .await?;

        if !verification_fsm::apply_dispatch(&mut record, &result)? {
            // Response carried no state; nothing to persist
            return Ok(record);
        }

        let saved = self.store.save(&record)?;
        log::info!(
            "order {} dispatched for verification, state {}",
            saved.order_id,
            saved.verification_state
        );
        Ok(saved)
    }
}
