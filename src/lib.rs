pub mod api_client;
pub mod batcher;
pub mod common_utils;
pub mod configure;
pub mod db;
pub mod eligibility;
pub mod logger;
pub mod mocks;
pub mod models;
pub mod workflow;
