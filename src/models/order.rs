use serde::{Deserialize, Serialize};

/// Statuses that always mark an order as closed for verification purposes.
/// Store-specific canceled statuses from config are merged on top of these.
pub const BASE_CLOSED_ORDER_STATUSES: [&str; 3] = ["canceled", "closed", "complete"];

/// Order metadata consumed by the eligibility filter.
/// Read-only view of the store's order repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesOrder {
    pub order_id: u64,
    pub status: String,
    /// True when this order is the child of another order (e.g. an edit).
    pub has_parent: bool,
    pub payment_method: String,
    pub shipping_country: String,
}

/// Order data submitted to the remote service when creating the mirror order.
/// Built by the order source; the core never assembles this itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreationPayload {
    pub order_id: u64,
    pub increment_id: String,
    pub currency: String,
    pub grand_total: String,
    pub customer_email: String,
    pub payment_method: String,
    pub shipping_country: String,
}
