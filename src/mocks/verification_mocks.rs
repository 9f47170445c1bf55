/// Scripted collaborators for workflow and batcher tests
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::api_client::{ApiFuture, VerificationApi};
use crate::batcher::{BatchQueue, DeferredBatchRequest, QueueFuture};
use crate::models::errors::VerifyError;
use crate::models::order::{OrderCreationPayload, SalesOrder};
use crate::models::verification::{RemoteOrder, VerificationResult};
use crate::workflow::OrderSource;

/// Remote API double. Responses are scripted per operation and consumed in
/// order; call counters expose how often the wire was hit.
#[derive(Default)]
pub struct MockVerificationApi {
    create_responses: Mutex<VecDeque<Result<RemoteOrder, VerifyError>>>,
    verify_responses: Mutex<VecDeque<Result<VerificationResult, VerifyError>>>,
    retrieve_responses: Mutex<VecDeque<Result<Option<VerificationResult>, VerifyError>>>,
    create_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
}

impl MockVerificationApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_create_ok(&self, remote_order_id: &str) {
        self.create_responses.lock().unwrap().push_back(Ok(RemoteOrder {
            remote_order_id: remote_order_id.to_string(),
        }));
    }

    pub fn script_create_err(&self, err: VerifyError) {
        self.create_responses.lock().unwrap().push_back(Err(err));
    }

    pub fn script_verify_ok(&self, result: VerificationResult) {
        self.verify_responses.lock().unwrap().push_back(Ok(result));
    }

    pub fn script_verify_err(&self, err: VerifyError) {
        self.verify_responses.lock().unwrap().push_back(Err(err));
    }

    pub fn script_retrieve(&self, result: Option<VerificationResult>) {
        self.retrieve_responses.lock().unwrap().push_back(Ok(result));
    }

    pub fn script_retrieve_err(&self, err: VerifyError) {
        self.retrieve_responses.lock().unwrap().push_back(Err(err));
    }

    pub fn create_call_count(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn verify_call_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    pub fn retrieve_call_count(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    fn next<T>(queue: &Mutex<VecDeque<Result<T, VerifyError>>>) -> Result<T, VerifyError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(VerifyError::Transport("no scripted response".to_string())))
    }
}

impl VerificationApi for MockVerificationApi {
    fn create_remote_order(&self, _payload: OrderCreationPayload) -> ApiFuture<'_, RemoteOrder> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let result = Self::next(&self.create_responses);
        Box::pin(async move { result })
    }

    fn verify_remote_order(&self, _remote_order_id: String) -> ApiFuture<'_, VerificationResult> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let result = Self::next(&self.verify_responses);
        Box::pin(async move { result })
    }

    fn retrieve_verification_status(
        &self,
        _remote_order_id: String,
    ) -> ApiFuture<'_, Option<VerificationResult>> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        let result = Self::next(&self.retrieve_responses);
        Box::pin(async move { result })
    }
}

/// In-memory order repository.
#[derive(Default)]
pub struct MockOrderSource {
    orders: Mutex<HashMap<u64, SalesOrder>>,
}

impl MockOrderSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_order(&self, order: SalesOrder) {
        self.orders.lock().unwrap().insert(order.order_id, order);
    }
}

impl OrderSource for MockOrderSource {
    fn load_orders(&self, order_ids: &[u64]) -> Result<Vec<SalesOrder>, VerifyError> {
        let orders = self.orders.lock().unwrap();
        Ok(order_ids
            .iter()
            .filter_map(|id| orders.get(id).cloned())
            .collect())
    }

    fn creation_payload(&self, order_id: u64) -> Result<OrderCreationPayload, VerifyError> {
        let orders = self.orders.lock().unwrap();
        let order = orders.get(&order_id).ok_or_else(|| VerifyError::NotFound {
            id: order_id.to_string(),
        })?;

        Ok(OrderCreationPayload {
            order_id: order.order_id,
            increment_id: format!("1000000{}", order.order_id),
            currency: "USD".to_string(),
            grand_total: "100.00".to_string(),
            customer_email: format!("customer{}@example.com", order.order_id),
            payment_method: order.payment_method.clone(),
            shipping_country: order.shipping_country.clone(),
        })
    }
}

/// Queue double that records every enqueued batch.
#[derive(Default)]
pub struct MockBatchQueue {
    requests: Arc<Mutex<Vec<DeferredBatchRequest>>>,
}

impl MockBatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<DeferredBatchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl BatchQueue for MockBatchQueue {
    fn enqueue(&self, request: DeferredBatchRequest) -> QueueFuture<'_> {
        self.requests.lock().unwrap().push(request);
        Box::pin(async { Ok(()) })
    }
}
