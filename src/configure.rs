use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: String,
    pub account_id: u64,
    pub store_id: u64,
    pub send_orders_limit: u32,
    pub payment_filter_enabled: bool,
    pub payment_filter_methods: String,
    pub country_filter_enabled: bool,
    pub country_filter_countries: String,
    pub custom_canceled_statuses: String,
    pub log_level: String,
    pub log_to_file: bool,
    pub log_file: String,
    pub db_path: String,
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    let s = Config::builder()
        // Set defaults
        .set_default("enabled", true)?
        .set_default("api_url", "https://api.keyverify.example")?
        .set_default("api_key", "")?
        .set_default("account_id", 0)?
        .set_default("store_id", 0)?
        .set_default("send_orders_limit", 0)?
        .set_default("payment_filter_enabled", false)?
        .set_default("payment_filter_methods", "")?
        .set_default("country_filter_enabled", false)?
        .set_default("country_filter_countries", "")?
        .set_default("custom_canceled_statuses", "")?
        .set_default("log_level", "info")?
        .set_default("log_to_file", false)?
        .set_default("log_file", "log/ordersync.log")?
        .set_default("db_path", "data/ordersync_db")?
        // Add configuration from a file
        .add_source(File::with_name("config/config.yaml").required(false))
        // Add configuration from environment variables
        .add_source(config::Environment::with_prefix("APP"))
        .build()?;

    s.try_deserialize()
}

/// Split a comma-separated config value into trimmed, non-empty entries.
pub fn parse_csv_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_list() {
        assert_eq!(
            parse_csv_list(" checkmo, banktransfer ,cashondelivery"),
            vec!["checkmo", "banktransfer", "cashondelivery"]
        );
    }

    #[test]
    fn test_parse_csv_list_empty() {
        assert!(parse_csv_list("").is_empty());
        assert!(parse_csv_list(" , ,").is_empty());
    }
}
