use secrecy::Secret;
use serde::Deserialize;

use crate::services::validation::is_valid_address;

const DEFAULT_CHAIN_ID: u64 = 11_155_111;
const DEFAULT_STORAGE_UPLOAD_URL: &str = "https://storage.thirdweb.com/ipfs/upload";
const DEFAULT_FALLBACK_STORAGE_URL: &str = "https://api.pinata.cloud";
const DEFAULT_IPFS_GATEWAY: &str = "ipfs.io";
const DEFAULT_RECONCILE_CRON: &str = "0 */10 * * * *";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub base_url: String,
    pub host: String,
    pub port: u16,

    // Chain
    pub rpc_url: String,
    pub chain_id: u64,
    pub chain_name: String,
    pub token_contract_address: String,
    pub registry_contract_address: String,
    pub receipt_timeout_secs: u64,

    // IPFS storage
    pub storage_client_id: Secret<String>,
    pub storage_upload_url: String,
    pub fallback_storage_url: String,
    pub fallback_storage_jwt: Option<Secret<String>>,
    pub ipfs_gateway: String,

    // Background jobs
    pub reconcile_cron: String,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        let token_contract_address: String = config.get("token_contract_address")?;
        let registry_contract_address: String = config.get("registry_contract_address")?;

        for (key, address) in [
            ("token_contract_address", &token_contract_address),
            ("registry_contract_address", &registry_contract_address),
        ] {
            if !is_valid_address(address) {
                return Err(config::ConfigError::Message(format!(
                    "{key} is not a valid 0x address: {address}"
                )));
            }
        }

        Ok(Self {
            database_url: config.get("database_url")?,
            base_url: config.get("base_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            rpc_url: config.get("rpc_url")?,
            chain_id: config.get("chain_id").unwrap_or(DEFAULT_CHAIN_ID),
            chain_name: config
                .get("chain_name")
                .unwrap_or_else(|_| "sepolia".to_string()),
            token_contract_address,
            registry_contract_address,
            receipt_timeout_secs: config.get("receipt_timeout_secs").unwrap_or(120),

            storage_client_id: Secret::new(config.get("storage_client_id")?),
            storage_upload_url: config
                .get("storage_upload_url")
                .unwrap_or_else(|_| DEFAULT_STORAGE_UPLOAD_URL.to_string()),
            fallback_storage_url: config
                .get("fallback_storage_url")
                .unwrap_or_else(|_| DEFAULT_FALLBACK_STORAGE_URL.to_string()),
            fallback_storage_jwt: config
                .get::<String>("fallback_storage_jwt")
                .ok()
                .filter(|jwt| !jwt.trim().is_empty())
                .map(Secret::new),
            ipfs_gateway: config
                .get("ipfs_gateway")
                .unwrap_or_else(|_| DEFAULT_IPFS_GATEWAY.to_string()),

            reconcile_cron: config
                .get("reconcile_cron")
                .unwrap_or_else(|_| DEFAULT_RECONCILE_CRON.to_string()),
        })
    }

    /// Public URL of the verification page for a token.
    pub fn verification_url(&self, token_id: &str) -> String {
        format!("{}/verify/{}", self.base_url.trim_end_matches('/'), token_id)
    }
}
