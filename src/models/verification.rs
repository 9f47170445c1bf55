use serde::{Deserialize, Serialize};
use std::fmt;

/// Status text used when the remote reports an order verified without
/// sending an explicit verification state.
pub const VERIFIED_STATUS_TEXT: &str = "Order is verified";

/// Lifecycle tag of a remote order. `NotDispatched` is the only state that
/// does not originate from the remote service; everything else is an opaque
/// tag reported by it (e.g. "verified", "pending", "rejected").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tag", rename_all = "snake_case")]
pub enum VerificationState {
    NotDispatched,
    Remote(String),
}

impl VerificationState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotDispatched => "not_dispatched",
            Self::Remote(tag) => tag,
        }
    }

    pub fn is_not_dispatched(&self) -> bool {
        matches!(self, Self::NotDispatched)
    }
}

impl fmt::Display for VerificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Local mirror of a remote order's verification state, one per store order.
/// Created on the first successful remote-order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub order_id: u64,
    pub remote_order_id: String,
    pub verification_state: VerificationState,
    pub verification_status: Option<String>,
    pub verification_strategy: Option<String>,
    pub is_verified: bool,
    /// Millisecond timestamp, set only when verified without an explicit
    /// state payload.
    pub verification_date: Option<i64>,
    /// Concurrency token, bumped by the store on every successful save.
    pub version: u64,
}

impl VerificationRecord {
    pub fn new(order_id: u64, remote_order_id: String) -> Self {
        Self {
            order_id,
            remote_order_id,
            verification_state: VerificationState::NotDispatched,
            verification_status: None,
            verification_strategy: None,
            is_verified: false,
            verification_date: None,
            version: 0,
        }
    }
}

/// Remote representation of a local store order, as returned by creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub remote_order_id: String,
}

/// Logical contents of a verify / retrieve-status response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: bool,
    pub code: i64,
    pub verification_state: Option<String>,
    pub verification_status: Option<String>,
    pub verification_strategy: Option<String>,
    pub verification_date: Option<i64>,
    pub is_verified: Option<bool>,
}

impl VerificationResult {
    /// A response with neither a state nor a verified flag carries nothing
    /// to merge into the local record.
    pub fn has_update(&self) -> bool {
        self.verification_state.is_some() || self.is_verified.unwrap_or(false)
    }
}
