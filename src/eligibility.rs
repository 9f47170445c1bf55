use std::collections::HashSet;

use crate::configure::{parse_csv_list, AppConfig};
use crate::models::order::{SalesOrder, BASE_CLOSED_ORDER_STATUSES};

/// Eligibility rules for sending orders to verification.
///
/// An order qualifies when it is not in a closed status, is not the child of
/// another order, and passes the optional payment-method / shipping-country
/// allow-lists. An absent or empty allow-list means no filtering on that axis.
#[derive(Debug, Clone)]
pub struct EligibilityRules {
    closed_statuses: HashSet<String>,
    payment_methods: Option<HashSet<String>>,
    shipping_countries: Option<HashSet<String>>,
}

impl EligibilityRules {
    pub fn new(
        custom_canceled_statuses: Vec<String>,
        payment_methods: Option<Vec<String>>,
        shipping_countries: Option<Vec<String>>,
    ) -> Self {
        let mut closed_statuses: HashSet<String> = BASE_CLOSED_ORDER_STATUSES
            .iter()
            .map(|s| s.to_string())
            .collect();
        closed_statuses.extend(custom_canceled_statuses);

        Self {
            closed_statuses,
            payment_methods: payment_methods.filter(|list| !list.is_empty()).map(
                |list| list.into_iter().collect(),
            ),
            shipping_countries: shipping_countries
                .filter(|list| !list.is_empty())
                .map(|list| list.into_iter().collect()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let payment_methods = config
            .payment_filter_enabled
            .then(|| parse_csv_list(&config.payment_filter_methods));
        let shipping_countries = config
            .country_filter_enabled
            .then(|| parse_csv_list(&config.country_filter_countries));

        Self::new(
            parse_csv_list(&config.custom_canceled_statuses),
            payment_methods,
            shipping_countries,
        )
    }

    pub fn closed_statuses(&self) -> &HashSet<String> {
        &self.closed_statuses
    }

    pub fn is_eligible(&self, order: &SalesOrder) -> bool {
        if self.closed_statuses.contains(&order.status) {
            return false;
        }
        if order.has_parent {
            return false;
        }
        if let Some(methods) = &self.payment_methods {
            if !methods.contains(&order.payment_method) {
                return false;
            }
        }
        if let Some(countries) = &self.shipping_countries {
            if !countries.contains(&order.shipping_country) {
                return false;
            }
        }
        true
    }

    /// Filter a selection down to eligible order ids, preserving input order.
    pub fn filter(&self, orders: &[SalesOrder]) -> Vec<u64> {
        orders
            .iter()
            .filter(|order| self.is_eligible(order))
            .map(|order| order.order_id)
            .collect()
    }
}
