use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::eligibility::EligibilityRules;
use crate::models::errors::VerifyError;
use crate::models::verification::VerificationRecord;
use crate::workflow::{OrderSource, OrderVerifier};

/// Request name tagging deferred mass-verification jobs.
pub const MASS_VERIFICATION_REQUEST: &str = "mass_order_verification";

/// A batch of orders handed off to the asynchronous worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredBatchRequest {
    pub request_name: String,
    pub order_ids: Vec<u64>,
}

impl DeferredBatchRequest {
    pub fn new(order_ids: Vec<u64>) -> Self {
        Self {
            request_name: MASS_VERIFICATION_REQUEST.to_string(),
            order_ids,
        }
    }
}

pub type QueueFuture<'a> = Pin<Box<dyn Future<Output = Result<(), VerifyError>> + Send + 'a>>;

/// FIFO hand-off to the deferred batch worker.
pub trait BatchQueue: Send + Sync {
    fn enqueue(&self, request: DeferredBatchRequest) -> QueueFuture<'_>;
}

/// Sled-backed FIFO queue for deferred batches. Keys are monotonically
/// increasing, so iteration order equals enqueue order.
pub struct SledBatchQueue {
    db: sled::Db,
    tree: sled::Tree,
}

impl SledBatchQueue {
    pub fn open(db: &sled::Db) -> Result<Self, VerifyError> {
        Ok(Self {
            db: db.clone(),
            tree: db.open_tree("deferred_batches")?,
        })
    }

    fn enqueue_sync(&self, request: &DeferredBatchRequest) -> Result<(), VerifyError> {
        let seq = self.db.generate_id()?;
        let bytes = serde_json::to_vec(request)?;
        self.tree.insert(seq.to_be_bytes(), bytes)?;
        self.tree.flush()?;
        Ok(())
    }

    /// Pop the oldest pending batch, if any. Consumed exactly once.
    pub fn dequeue(&self) -> Result<Option<DeferredBatchRequest>, VerifyError> {
        match self.tree.pop_min()? {
            Some((_key, bytes)) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn pending(&self) -> usize {
        self.tree.len()
    }
}

impl BatchQueue for SledBatchQueue {
    fn enqueue(&self, request: DeferredBatchRequest) -> QueueFuture<'_> {
        let result = self.enqueue_sync(&request);
        Box::pin(async move { result })
    }
}

/// Outcome of a mass verification request.
#[derive(Debug)]
pub enum MassVerifyOutcome {
    /// Exactly one eligible order: it was verified synchronously.
    Verified(VerificationRecord),
    /// More than one eligible order: a deferred batch was enqueued.
    Scheduled { order_count: usize },
}

/// Reduces a multi-order selection to a synchronous single dispatch or a
/// deferred batch job, under the configured send limit and eligibility rules.
pub struct MassVerifier {
    rules: EligibilityRules,
    send_limit: u32,
    orders: Arc<dyn OrderSource>,
    verifier: Arc<OrderVerifier>,
    queue: Arc<dyn BatchQueue>,
}

impl MassVerifier {
    pub fn new(
        rules: EligibilityRules,
        send_limit: u32,
        orders: Arc<dyn OrderSource>,
        verifier: Arc<OrderVerifier>,
        queue: Arc<dyn BatchQueue>,
    ) -> Self {
        Self {
            rules,
            send_limit,
            orders,
            verifier,
            queue,
        }
    }

    pub async fn mass_verify(&self, requested: &[u64]) -> Result<MassVerifyOutcome, VerifyError> {
        if requested.is_empty() {
            return Err(VerifyError::NoOrdersSelected);
        }

        // A limit of zero means unlimited
        if self.send_limit > 0 && requested.len() > self.send_limit as usize {
            return Err(VerifyError::LimitExceeded {
                limit: self.send_limit,
            });
        }

        let orders = self.orders.load_orders(requested)?;
        let eligible = self.rules.filter(&orders);
        if eligible.is_empty() {
            return Err(VerifyError::NoEligibleOrders);
        }

        if eligible.len() == 1 {
            let record = self.verifier.verify_by_order_id(eligible[0]).await?;
            return Ok(MassVerifyOutcome::Verified(record));
        }

        let order_count = eligible.len();
        self.queue.enqueue(DeferredBatchRequest::new(eligible)).await?;
        log::info!("scheduled deferred verification batch of {} orders", order_count);
        Ok(MassVerifyOutcome::Scheduled { order_count })
    }
}

/// Consumption contract for the deferred batch worker: one single-order
/// dispatch per id, in order. Ids that were already dispatched resolve to a
/// duplicate-dispatch rejection and are skipped, so re-delivery of a batch is
/// harmless. Returns the number of orders actually dispatched.
pub async fn process_deferred_batch(
    verifier: &OrderVerifier,
    request: &DeferredBatchRequest,
) -> usize {
    let mut dispatched = 0;
    for &order_id in &request.order_ids {
        match verifier.verify_by_order_id(order_id).await {
            Ok(_) => dispatched += 1,
            Err(VerifyError::DuplicateDispatch { .. }) => {
                log::info!("order {} already dispatched, skipping", order_id);
            }
            Err(e) => {
                log::warn!("deferred verification of order {} failed: {}", order_id, e);
            }
        }
    }
    dispatched
}
