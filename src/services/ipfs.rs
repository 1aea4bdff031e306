use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Returned by [`gateway_url`] when there is nothing to resolve.
pub const MISSING_URL: &str = "#";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{provider} upload failed with status {status}: {body}")]
    ApiError {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} returned an unexpected response: {detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: String,
    },

    #[error("Primary upload failed ({primary}) and no fallback provider is configured")]
    FallbackNotConfigured { primary: String },

    #[error("All IPFS providers failed (primary: {primary}; fallback: {fallback})")]
    AllProvidersFailed { primary: String, fallback: String },
}

/// Content-addressed storage for credential documents and metadata.
#[async_trait]
pub trait ContentStorage: Send + Sync {
    /// Uploads raw bytes and returns the CID.
    async fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    /// Uploads a JSON document and returns the CID.
    async fn upload_json(&self, value: &JsonValue) -> Result<String, StorageError>;
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// IPFS uploads through a managed upload API, with a pinning service as the
/// single fallback hop.
#[derive(Debug, Clone)]
pub struct IpfsStorage {
    client: Client,
    upload_url: String,
    client_id: Secret<String>,
    fallback_url: String,
    fallback_jwt: Option<Secret<String>>,
}

const PRIMARY: &str = "storage";
const FALLBACK: &str = "pinning";

impl IpfsStorage {
    pub fn new(
        upload_url: impl Into<String>,
        client_id: Secret<String>,
        fallback_url: impl Into<String>,
        fallback_jwt: Option<Secret<String>>,
    ) -> Self {
        Self {
            client: Client::new(),
            upload_url: upload_url.into(),
            client_id,
            fallback_url: fallback_url.into(),
            fallback_jwt,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            config.storage_upload_url.clone(),
            config.storage_client_id.clone(),
            config.fallback_storage_url.clone(),
            config.fallback_storage_jwt.clone(),
        )
    }

    fn file_form(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<Form, StorageError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        Ok(Form::new().part("file", part))
    }

    async fn primary_upload(&self, form: Form) -> Result<String, StorageError> {
        let response = self
            .client
            .post(&self.upload_url)
            .header("x-client-id", self.client_id.expose_secret())
            .multipart(form)
            .send()
            .await?;

        read_cid(PRIMARY, response).await
    }

    async fn fallback_file_upload(
        &self,
        jwt: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let url = format!(
            "{}/pinning/pinFileToIPFS",
            self.fallback_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(jwt)
            .multipart(Self::file_form(file_name, content_type, bytes)?)
            .send()
            .await?;

        read_cid(FALLBACK, response).await
    }

    async fn fallback_json_upload(&self, jwt: &str, value: &JsonValue) -> Result<String, StorageError> {
        let url = format!(
            "{}/pinning/pinJSONToIPFS",
            self.fallback_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(jwt)
            .json(&serde_json::json!({ "pinataContent": value }))
            .send()
            .await?;

        read_cid(FALLBACK, response).await
    }

    fn fallback_jwt_or(&self, primary: &StorageError) -> Result<&str, StorageError> {
        self.fallback_jwt
            .as_ref()
            .map(|jwt| jwt.expose_secret().as_str())
            .ok_or_else(|| StorageError::FallbackNotConfigured {
                primary: primary.to_string(),
            })
    }
}

#[async_trait]
impl ContentStorage for IpfsStorage {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let form = Self::file_form(file_name, content_type, bytes.clone())?;
        let primary_err = match self.primary_upload(form).await {
            Ok(cid) => {
                tracing::info!(cid = %cid, "File uploaded to IPFS");
                return Ok(cid);
            }
            Err(e) => e,
        };

        tracing::warn!(error = %primary_err, "Primary IPFS upload failed, trying fallback");
        let jwt = self.fallback_jwt_or(&primary_err)?;

        match self
            .fallback_file_upload(jwt, file_name, content_type, bytes)
            .await
        {
            Ok(cid) => {
                tracing::info!(cid = %cid, "File uploaded to IPFS via fallback");
                Ok(cid)
            }
            Err(fallback_err) => Err(StorageError::AllProvidersFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }

    #[tracing::instrument(skip(self, value))]
    async fn upload_json(&self, value: &JsonValue) -> Result<String, StorageError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StorageError::InvalidResponse {
            provider: PRIMARY,
            detail: format!("metadata is not serializable: {e}"),
        })?;
        let form = Self::file_form("metadata.json", "application/json", bytes)?;

        let primary_err = match self.primary_upload(form).await {
            Ok(cid) => {
                tracing::info!(cid = %cid, "Metadata uploaded to IPFS");
                return Ok(cid);
            }
            Err(e) => e,
        };

        tracing::warn!(error = %primary_err, "Primary IPFS upload failed, trying fallback");
        let jwt = self.fallback_jwt_or(&primary_err)?;

        self.fallback_json_upload(jwt, value)
            .await
            .map_err(|fallback_err| StorageError::AllProvidersFailed {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            })
    }
}

async fn read_cid(provider: &'static str, response: reqwest::Response) -> Result<String, StorageError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(StorageError::ApiError {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    let pin: PinResponse = response
        .json()
        .await
        .map_err(|e| StorageError::InvalidResponse {
            provider,
            detail: e.to_string(),
        })?;

    if pin.ipfs_hash.trim().is_empty() {
        return Err(StorageError::InvalidResponse {
            provider,
            detail: "empty IpfsHash".to_string(),
        });
    }

    Ok(pin.ipfs_hash)
}

/// `ipfs://` URI for a CID.
pub fn ipfs_uri(cid: &str) -> String {
    format!("ipfs://{}", cid.trim_start_matches("ipfs://"))
}

/// Resolves a CID or `ipfs://` URI to an HTTP gateway URL.
///
/// Returns [`MISSING_URL`] for absent or placeholder input so callers can
/// branch on it instead of handling an error. Any sub-path after the CID is
/// preserved; HTTP(S) URLs pass through untouched.
pub fn gateway_url(gateway: &str, cid_or_uri: Option<&str>) -> String {
    let raw = match cid_or_uri.map(str::trim) {
        None | Some("") | Some("undefined") | Some("null") => return MISSING_URL.to_string(),
        Some(raw) => raw,
    };

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }

    let path = raw.strip_prefix("ipfs://").unwrap_or(raw);
    let path = path.strip_prefix("ipfs/").unwrap_or(path);
    let path = path.trim_start_matches('/');

    let (cid, rest) = match path.split_once('/') {
        Some((cid, rest)) => (cid, Some(rest)),
        None => (path, None),
    };

    if cid.is_empty() {
        return MISSING_URL.to_string();
    }

    let host = gateway
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');

    match rest.filter(|r| !r.is_empty()) {
        Some(rest) => format!("https://{host}/ipfs/{cid}/{rest}"),
        None => format!("https://{host}/ipfs/{cid}"),
    }
}
