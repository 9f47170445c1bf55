// Error types for the order verification core
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum VerifyError {
    // Selection errors
    NoOrdersSelected,
    LimitExceeded { limit: u32 },
    NoEligibleOrders,

    // State machine errors
    DuplicateDispatch { id: String },
    NotDispatchedYet { remote_order_id: String },
    AlreadyVerified { remote_order_id: String },

    // Remote API errors
    CreationFailed { order_id: u64, reason: String },
    RemoteRejection { code: i64, message: String },
    Transport(String),

    // Record store errors
    NotFound { id: String },
    ConcurrentModification { order_id: u64 },
    Storage(String),
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOrdersSelected => write!(f, "No orders selected for verification"),
            Self::LimitExceeded { limit } => {
                write!(f, "Maximum allowed orders per request is {}", limit)
            }
            Self::NoEligibleOrders => write!(f, "Only open orders can be verified"),
            Self::DuplicateDispatch { id } => {
                write!(f, "A verification request has already been submitted for order {}", id)
            }
            Self::NotDispatchedYet { remote_order_id } => {
                write!(
                    f,
                    "Order {} has no verification request placed yet",
                    remote_order_id
                )
            }
            Self::AlreadyVerified { remote_order_id } => {
                write!(f, "Order {} is already verified", remote_order_id)
            }
            Self::CreationFailed { order_id, reason } => {
                write!(f, "Could not submit order {} data: {}", order_id, reason)
            }
            Self::RemoteRejection { code, message } => {
                write!(f, "Verification rejected (code {}): {}", code, message)
            }
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::NotFound { id } => write!(f, "Verification record {} not found", id),
            Self::ConcurrentModification { order_id } => {
                write!(f, "Record for order {} was modified concurrently", order_id)
            }
            Self::Storage(msg) => write!(f, "Record store error: {}", msg),
        }
    }
}

impl std::error::Error for VerifyError {}

impl From<sled::Error> for VerifyError {
    fn from(err: sled::Error) -> Self {
        VerifyError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for VerifyError {
    fn from(err: serde_json::Error) -> Self {
        VerifyError::Storage(err.to_string())
    }
}

impl From<anyhow::Error> for VerifyError {
    fn from(err: anyhow::Error) -> Self {
        VerifyError::Storage(err.to_string())
    }
}

// Error code mapping for the presentation boundary
impl VerifyError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoOrdersSelected => "NO_ORDERS_SELECTED",
            Self::LimitExceeded { .. } => "LIMIT_EXCEEDED",
            Self::NoEligibleOrders => "NO_ELIGIBLE_ORDERS",
            Self::DuplicateDispatch { .. } => "DUPLICATE_DISPATCH",
            Self::NotDispatchedYet { .. } => "NOT_DISPATCHED_YET",
            Self::AlreadyVerified { .. } => "ALREADY_VERIFIED",
            Self::CreationFailed { .. } => "CREATION_FAILED",
            Self::RemoteRejection { .. } => "REMOTE_REJECTION",
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::NotFound { .. } => "RECORD_NOT_FOUND",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Retry is a decision for the calling layer; this only marks which
    /// failures are plausibly transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Storage(_))
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NoOrdersSelected | Self::LimitExceeded { .. } | Self::NoEligibleOrders
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = VerifyError::LimitExceeded { limit: 5 };
        assert_eq!(err.error_code(), "LIMIT_EXCEEDED");
        assert!(!err.is_retryable());
        assert!(err.is_user_error());

        let err2 = VerifyError::Transport("connect timeout".to_string());
        assert_eq!(err2.error_code(), "TRANSPORT_ERROR");
        assert!(err2.is_retryable());
        assert!(!err2.is_user_error());
    }

    #[test]
    fn test_error_display() {
        let err = VerifyError::LimitExceeded { limit: 5 };
        assert_eq!(err.to_string(), "Maximum allowed orders per request is 5");

        let err = VerifyError::RemoteRejection {
            code: 4000,
            message: "invalid order payload".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Verification rejected (code 4000): invalid order payload"
        );
    }
}
