//! # Credential contract adapter
//!
//! Talks to the credential token contract and the registry contract over EVM
//! JSON-RPC.
//!
//! Transactions go out through `eth_sendTransaction` with the connected
//! wallet as `from`. Key custody belongs to the RPC endpoint's signer and
//! the service never holds private keys. Callers only reach this adapter
//! after proving control of that wallet (`services::wallet_auth`). After submission the adapter polls
//! `eth_getTransactionReceipt` until the transaction is mined (one
//! confirmation) or the receipt timeout elapses.
//!
//! ## Token contract
//!
//! ```solidity
//! function issueCredential(address student, bytes32 credentialHash, string metadataURI) returns (uint256);
//! function revokeCredential(uint256 tokenId);
//! function authorizeIssuer(address issuer);
//! function credentialIssuers(uint256 tokenId) view returns (address);
//! function authorizedIssuers(address issuer) view returns (bool);
//! function revokedCredentials(uint256 tokenId) view returns (bool);
//! function tokenURI(uint256 tokenId) view returns (string);
//! function owner() view returns (address);
//! ```
//!
//! The mint emits an event whose first indexed argument is the token id;
//! that topic is the only accepted source of the id.
//!
//! ## Registry contract
//!
//! ```solidity
//! function registerCredential(uint256 tokenId, address student, bytes32 credentialHash);
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use primitive_types::U256;
use serde_json::{json, Value as JsonValue};

use crate::services::abi::{self, AbiError, Token};
use crate::services::validation::{is_valid_address, same_wallet};

const ISSUE_CREDENTIAL: &str = "issueCredential(address,bytes32,string)";
const REVOKE_CREDENTIAL: &str = "revokeCredential(uint256)";
const AUTHORIZE_ISSUER: &str = "authorizeIssuer(address)";
const REGISTER_CREDENTIAL: &str = "registerCredential(uint256,address,bytes32)";
const CREDENTIAL_ISSUERS: &str = "credentialIssuers(uint256)";
const AUTHORIZED_ISSUERS: &str = "authorizedIssuers(address)";
const REVOKED_CREDENTIALS: &str = "revokedCredentials(uint256)";
const TOKEN_URI: &str = "tokenURI(uint256)";
const OWNER: &str = "owner()";

#[derive(thiserror::Error, Debug)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("RPC endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    #[error("Invalid token id: {0}")]
    InvalidTokenId(String),

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Timed out waiting for receipt of {tx_hash}")]
    ReceiptTimeout { tx_hash: String },

    #[error("Mint transaction {tx_hash} emitted no token id")]
    MissingTokenId { tx_hash: String },

    /// The node accepted the transaction but its receipt could not be read.
    #[error("Transaction {tx_hash} was submitted but its outcome is unknown: {source}")]
    AfterSubmit {
        tx_hash: String,
        #[source]
        source: Box<ChainError>,
    },
}

impl ChainError {
    /// Whether resubmitting the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainError::HttpError(_)
                | ChainError::HttpStatus(_)
                | ChainError::ReceiptTimeout { .. }
                | ChainError::MissingTokenId { .. }
        )
    }

    /// Whether the transaction may have been mined despite the error, so the
    /// outcome has to be checked before anyone resubmits.
    pub fn may_have_landed(&self) -> bool {
        matches!(
            self,
            ChainError::HttpError(_)
                | ChainError::InvalidResponse(_)
                | ChainError::ReceiptTimeout { .. }
                | ChainError::MissingTokenId { .. }
                | ChainError::AfterSubmit { .. }
        )
    }

    /// Hash of the submitted transaction, when the error happened after submission.
    pub fn transaction_hash(&self) -> Option<&str> {
        match self {
            ChainError::Reverted { tx_hash }
            | ChainError::ReceiptTimeout { tx_hash }
            | ChainError::MissingTokenId { tx_hash }
            | ChainError::AfterSubmit { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }
}

/// Outcome of a successful mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    /// Decimal token id parsed from the mint event.
    pub token_id: String,
    pub transaction_hash: String,
}

/// Read and write access to the credential contracts.
#[async_trait]
pub trait CredentialLedger: Send + Sync {
    async fn issue_credential(
        &self,
        signer: &str,
        student: &str,
        credential_hash: [u8; 32],
        metadata_uri: &str,
    ) -> Result<MintReceipt, ChainError>;

    async fn revoke_credential(&self, signer: &str, token_id: &str) -> Result<String, ChainError>;

    async fn register_credential(
        &self,
        signer: &str,
        token_id: &str,
        student: &str,
        credential_hash: [u8; 32],
    ) -> Result<String, ChainError>;

    async fn authorize_issuer(&self, signer: &str, issuer: &str) -> Result<String, ChainError>;

    /// Lowercase address of the wallet that minted `token_id`.
    async fn credential_issuer(&self, token_id: &str) -> Result<String, ChainError>;

    async fn is_authorized_issuer(&self, wallet: &str) -> Result<bool, ChainError>;

    async fn is_revoked(&self, token_id: &str) -> Result<bool, ChainError>;

    async fn token_uri(&self, token_id: &str) -> Result<String, ChainError>;

    /// Lowercase address of the token contract owner.
    async fn owner(&self) -> Result<String, ChainError>;
}

#[derive(Debug, Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    pub chain_name: String,
    pub chain_id: u64,
    pub token_contract: String,
    pub registry_contract: String,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl EvmConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            rpc_url: config.rpc_url.clone(),
            chain_name: config.chain_name.clone(),
            chain_id: config.chain_id,
            token_contract: config.token_contract_address.clone(),
            registry_contract: config.registry_contract_address.clone(),
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            poll_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvmContracts {
    client: reqwest::Client,
    config: EvmConfig,
}

impl EvmContracts {
    pub fn new(config: EvmConfig) -> Result<Self, ChainError> {
        for address in [&config.token_contract, &config.registry_contract] {
            if !is_valid_address(address) {
                return Err(ChainError::Abi(AbiError::InvalidAddress(address.clone())));
            }
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EvmConfig {
        &self.config
    }

    async fn rpc_call(&self, method: &str, params: JsonValue) -> Result<JsonValue, ChainError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChainError::HttpStatus(response.status().as_u16()));
        }

        let payload: JsonValue = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            return Err(ChainError::Rpc(message.to_string()));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::InvalidResponse(format!("{method}: missing result")))
    }

    /// Chain id reported by the RPC endpoint.
    pub async fn remote_chain_id(&self) -> Result<u64, ChainError> {
        let result = self.rpc_call("eth_chainId", json!([])).await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| ChainError::InvalidResponse(format!("eth_chainId: {result}")))
    }

    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let result = self
            .rpc_call(
                "eth_call",
                json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;

        let hex_data = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse("eth_call returned non-string".to_string()))?;
        Ok(abi::decode_hex(hex_data)?)
    }

    async fn send_transaction(&self, from: &str, to: &str, data: Vec<u8>) -> Result<String, ChainError> {
        abi::parse_address(from)?;

        let tx = json!({
            "from": from,
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
        });

        let result = self.rpc_call("eth_sendTransaction", json!([tx])).await?;
        let tx_hash = result.as_str().map(str::to_string).ok_or_else(|| {
            ChainError::InvalidResponse("eth_sendTransaction returned non-string".to_string())
        })?;

        tracing::debug!(tx_hash = %tx_hash, from = %from, to = %to, "Transaction submitted");
        Ok(tx_hash)
    }

    /// Polls until the receipt is available; fails on revert or timeout.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<JsonValue, ChainError> {
        let started = Instant::now();

        loop {
            let receipt = self
                .rpc_call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if !receipt.is_null() {
                let status = receipt
                    .get("status")
                    .and_then(|s| s.as_str())
                    .unwrap_or("0x0");
                if status == "0x0" {
                    return Err(ChainError::Reverted {
                        tx_hash: tx_hash.to_string(),
                    });
                }

                tracing::debug!(
                    tx_hash = %tx_hash,
                    wait_ms = started.elapsed().as_millis(),
                    "Transaction mined"
                );
                return Ok(receipt);
            }

            if started.elapsed() >= self.config.receipt_timeout {
                return Err(ChainError::ReceiptTimeout {
                    tx_hash: tx_hash.to_string(),
                });
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn transact(&self, from: &str, to: &str, data: Vec<u8>) -> Result<(String, JsonValue), ChainError> {
        let tx_hash = self.send_transaction(from, to, data).await?;

        match self.wait_for_receipt(&tx_hash).await {
            Ok(receipt) => Ok((tx_hash, receipt)),
            Err(e @ (ChainError::Reverted { .. } | ChainError::ReceiptTimeout { .. })) => Err(e),
            Err(e) => {
                tracing::warn!(tx_hash = %tx_hash, error = %e, "Lost track of submitted transaction");
                Err(ChainError::AfterSubmit {
                    tx_hash,
                    source: Box::new(e),
                })
            }
        }
    }
}

#[async_trait]
impl CredentialLedger for EvmContracts {
    #[tracing::instrument(skip(self, credential_hash), fields(chain = %self.config.chain_name))]
    async fn issue_credential(
        &self,
        signer: &str,
        student: &str,
        credential_hash: [u8; 32],
        metadata_uri: &str,
    ) -> Result<MintReceipt, ChainError> {
        let data = abi::encode_call(
            ISSUE_CREDENTIAL,
            &[
                Token::Address(abi::parse_address(student)?),
                Token::FixedBytes32(credential_hash),
                Token::String(metadata_uri.to_string()),
            ],
        );

        let (tx_hash, receipt) = self
            .transact(signer, &self.config.token_contract, data)
            .await?;

        let token_id = token_id_from_receipt(&receipt, &self.config.token_contract)
            .ok_or_else(|| ChainError::MissingTokenId {
                tx_hash: tx_hash.clone(),
            })?;

        tracing::info!(token_id = %token_id, tx_hash = %tx_hash, "Credential minted");

        Ok(MintReceipt {
            token_id,
            transaction_hash: tx_hash,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn revoke_credential(&self, signer: &str, token_id: &str) -> Result<String, ChainError> {
        let data = abi::encode_call(REVOKE_CREDENTIAL, &[Token::Uint(parse_token_id(token_id)?)]);
        let (tx_hash, _) = self
            .transact(signer, &self.config.token_contract, data)
            .await?;

        tracing::info!(token_id = %token_id, tx_hash = %tx_hash, "Credential revoked on-chain");
        Ok(tx_hash)
    }

    #[tracing::instrument(skip(self, credential_hash))]
    async fn register_credential(
        &self,
        signer: &str,
        token_id: &str,
        student: &str,
        credential_hash: [u8; 32],
    ) -> Result<String, ChainError> {
        let data = abi::encode_call(
            REGISTER_CREDENTIAL,
            &[
                Token::Uint(parse_token_id(token_id)?),
                Token::Address(abi::parse_address(student)?),
                Token::FixedBytes32(credential_hash),
            ],
        );
        let (tx_hash, _) = self
            .transact(signer, &self.config.registry_contract, data)
            .await?;
        Ok(tx_hash)
    }

    #[tracing::instrument(skip(self))]
    async fn authorize_issuer(&self, signer: &str, issuer: &str) -> Result<String, ChainError> {
        let data = abi::encode_call(
            AUTHORIZE_ISSUER,
            &[Token::Address(abi::parse_address(issuer)?)],
        );
        let (tx_hash, _) = self
            .transact(signer, &self.config.token_contract, data)
            .await?;
        Ok(tx_hash)
    }

    async fn credential_issuer(&self, token_id: &str) -> Result<String, ChainError> {
        let data = abi::encode_call(CREDENTIAL_ISSUERS, &[Token::Uint(parse_token_id(token_id)?)]);
        let out = self.call(&self.config.token_contract, data).await?;
        Ok(abi::format_address(&abi::decode_address(&out, 0)?))
    }

    async fn is_authorized_issuer(&self, wallet: &str) -> Result<bool, ChainError> {
        let data = abi::encode_call(
            AUTHORIZED_ISSUERS,
            &[Token::Address(abi::parse_address(wallet)?)],
        );
        let out = self.call(&self.config.token_contract, data).await?;
        Ok(abi::decode_bool(&out, 0)?)
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, ChainError> {
        let data = abi::encode_call(REVOKED_CREDENTIALS, &[Token::Uint(parse_token_id(token_id)?)]);
        let out = self.call(&self.config.token_contract, data).await?;
        Ok(abi::decode_bool(&out, 0)?)
    }

    async fn token_uri(&self, token_id: &str) -> Result<String, ChainError> {
        let data = abi::encode_call(TOKEN_URI, &[Token::Uint(parse_token_id(token_id)?)]);
        let out = self.call(&self.config.token_contract, data).await?;
        Ok(abi::decode_string(&out, 0)?)
    }

    async fn owner(&self) -> Result<String, ChainError> {
        let out = self
            .call(&self.config.token_contract, abi::encode_call(OWNER, &[]))
            .await?;
        Ok(abi::format_address(&abi::decode_address(&out, 0)?))
    }
}

/// Parses a decimal token id.
pub fn parse_token_id(token_id: &str) -> Result<U256, ChainError> {
    U256::from_dec_str(token_id.trim()).map_err(|_| ChainError::InvalidTokenId(token_id.to_string()))
}

fn parse_quantity(hex_quantity: &str) -> Option<u64> {
    u64::from_str_radix(hex_quantity.trim_start_matches("0x"), 16).ok()
}

/// Extracts the minted token id: `topics[1]` of the last log emitted by the
/// token contract.
pub fn token_id_from_receipt(receipt: &JsonValue, token_contract: &str) -> Option<String> {
    let logs = receipt.get("logs")?.as_array()?;

    let log = logs.iter().rev().find(|log| {
        log.get("address")
            .and_then(|a| a.as_str())
            .map(|a| same_wallet(a, token_contract))
            .unwrap_or(false)
    })?;

    let topic = log.get("topics")?.as_array()?.get(1)?.as_str()?;
    let bytes = abi::decode_hex(topic).ok()?;
    if bytes.len() != 32 {
        return None;
    }

    Some(U256::from_big_endian(&bytes).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0x00000000000000000000000000000000000000aa";
    const OTHER: &str = "0x00000000000000000000000000000000000000bb";

    fn topic(n: u64) -> String {
        format!("0x{:064x}", n)
    }

    #[test]
    fn token_id_comes_from_last_token_contract_log() {
        let receipt = json!({
            "status": "0x1",
            "logs": [
                { "address": TOKEN, "topics": [topic(0xdead), topic(7)] },
                { "address": TOKEN.to_uppercase().replace("0X", "0x"), "topics": [topic(0xbeef), topic(42), topic(1)] },
                { "address": OTHER, "topics": [topic(0xcafe), topic(99)] }
            ]
        });

        assert_eq!(token_id_from_receipt(&receipt, TOKEN).as_deref(), Some("42"));
    }

    #[test]
    fn receipt_without_token_log_has_no_id() {
        let receipt = json!({
            "status": "0x1",
            "logs": [{ "address": OTHER, "topics": [topic(1), topic(2)] }]
        });
        assert_eq!(token_id_from_receipt(&receipt, TOKEN), None);

        let no_topics = json!({ "logs": [{ "address": TOKEN, "topics": [topic(1)] }] });
        assert_eq!(token_id_from_receipt(&no_topics, TOKEN), None);

        assert_eq!(token_id_from_receipt(&json!({}), TOKEN), None);
    }

    #[test]
    fn large_token_ids_keep_full_precision() {
        let receipt = json!({
            "logs": [{ "address": TOKEN, "topics": [topic(0), format!("0x{}", "ff".repeat(32))] }]
        });
        assert_eq!(
            token_id_from_receipt(&receipt, TOKEN).unwrap(),
            U256::MAX.to_string()
        );
    }

    #[test]
    fn token_id_parsing() {
        assert_eq!(parse_token_id("12").unwrap(), U256::from(12u64));
        assert!(matches!(
            parse_token_id("0x0c"),
            Err(ChainError::InvalidTokenId(_))
        ));
    }

    #[test]
    fn retryable_errors() {
        assert!(ChainError::MissingTokenId { tx_hash: "0x1".into() }.is_retryable());
        assert!(ChainError::ReceiptTimeout { tx_hash: "0x1".into() }.is_retryable());
        assert!(!ChainError::Reverted { tx_hash: "0x1".into() }.is_retryable());
        assert!(!ChainError::Rpc("execution reverted".into()).is_retryable());
    }

    #[test]
    fn errors_that_leave_the_outcome_unknown() {
        assert!(ChainError::ReceiptTimeout { tx_hash: "0x1".into() }.may_have_landed());
        assert!(ChainError::MissingTokenId { tx_hash: "0x1".into() }.may_have_landed());
        assert!(!ChainError::Reverted { tx_hash: "0x1".into() }.may_have_landed());
        assert!(!ChainError::Rpc("insufficient funds".into()).may_have_landed());

        let lost = ChainError::AfterSubmit {
            tx_hash: "0x1".into(),
            source: Box::new(ChainError::HttpStatus(503)),
        };
        assert!(lost.may_have_landed());
        assert!(!lost.is_retryable());
        assert_eq!(lost.transaction_hash(), Some("0x1"));
        assert_eq!(ChainError::Rpc("nonce too low".into()).transaction_hash(), None);
    }

    #[test]
    fn rejects_invalid_contract_addresses() {
        let config = EvmConfig {
            rpc_url: "http://localhost:8545".to_string(),
            chain_name: "sepolia".to_string(),
            chain_id: 11_155_111,
            token_contract: "not-an-address".to_string(),
            registry_contract: OTHER.to_string(),
            receipt_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
        };
        assert!(EvmContracts::new(config).is_err());
    }
}
