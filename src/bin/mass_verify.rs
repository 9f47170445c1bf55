// Demo driver: submits the given store orders for remote fraud verification
// using the configured API endpoint. Order metadata normally comes from the
// store's order repository; this demo stubs it with open orders.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;

use ordersync::api_client::RemoteApiClient;
use ordersync::batcher::{MassVerifier, MassVerifyOutcome, SledBatchQueue};
use ordersync::configure::load_config;
use ordersync::db::VerificationStore;
use ordersync::eligibility::EligibilityRules;
use ordersync::logger::setup_logger;
use ordersync::models::errors::VerifyError;
use ordersync::models::order::{OrderCreationPayload, SalesOrder};
use ordersync::workflow::{OrderSource, OrderVerifier};

#[derive(Parser, Debug)]
#[command(about = "Submit store orders for remote fraud verification")]
struct Args {
    /// Local order ids to verify
    #[arg(required = true)]
    order_ids: Vec<u64>,

    /// Payment method reported for the stubbed orders
    #[arg(long, default_value = "checkmo")]
    payment_method: String,

    /// Shipping country reported for the stubbed orders
    #[arg(long, default_value = "US")]
    shipping_country: String,
}

/// Stand-in for the store's order repository: every requested id is an open,
/// parentless order.
struct StubOrderSource {
    payment_method: String,
    shipping_country: String,
}

impl OrderSource for StubOrderSource {
    fn load_orders(&self, order_ids: &[u64]) -> Result<Vec<SalesOrder>, VerifyError> {
        Ok(order_ids
            .iter()
            .map(|&order_id| SalesOrder {
                order_id,
                status: "processing".to_string(),
                has_parent: false,
                payment_method: self.payment_method.clone(),
                shipping_country: self.shipping_country.clone(),
            })
            .collect())
    }

    fn creation_payload(&self, order_id: u64) -> Result<OrderCreationPayload, VerifyError> {
        Ok(OrderCreationPayload {
            order_id,
            increment_id: format!("1000000{}", order_id),
            currency: "USD".to_string(),
            grand_total: "0.00".to_string(),
            customer_email: format!("customer{}@example.com", order_id),
            payment_method: self.payment_method.clone(),
            shipping_country: self.shipping_country.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();
    let config = load_config()?;
    setup_logger(&config).map_err(|e| anyhow::anyhow!("logger setup failed: {}", e))?;

    let store = Arc::new(VerificationStore::open(&config.db_path)?);
    let queue = Arc::new(SledBatchQueue::open(store.sled_db())?);
    let api = Arc::new(RemoteApiClient::from_config(&config));
    let orders = Arc::new(StubOrderSource {
        payment_method: args.payment_method,
        shipping_country: args.shipping_country,
    });

    let verifier = Arc::new(OrderVerifier::new(store, api, orders.clone()));
    let mass_verifier = MassVerifier::new(
        EligibilityRules::from_config(&config),
        config.send_orders_limit,
        orders,
        verifier,
        queue,
    );

    match mass_verifier.mass_verify(&args.order_ids).await {
        Ok(MassVerifyOutcome::Verified(record)) => {
            log::info!(
                "order {} verified: state={} status={:?}",
                record.order_id,
                record.verification_state,
                record.verification_status
            );
        }
        Ok(MassVerifyOutcome::Scheduled { order_count }) => {
            log::info!("verification batch scheduled for {} orders", order_count);
        }
        Err(e) => {
            log::error!("mass verification failed [{}]: {}", e.error_code(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
