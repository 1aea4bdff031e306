use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::{CredentialStore, PgStore};
use crate::services::{
    contracts::{CredentialLedger, EvmContracts},
    credential_service::CredentialService,
    ipfs::{ContentStorage, IpfsStorage},
    verifier::Verifier,
    wallet_auth::WalletAuthenticator,
};

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub evm: EvmContracts,
    pub store: Arc<dyn CredentialStore>,
    pub ledger: Arc<dyn CredentialLedger>,
    pub credentials: CredentialService,
    pub verifier: Verifier,
    pub wallet_auth: WalletAuthenticator,
}

impl AppState {
    /// Wires the production adapters together.
    pub fn new(pool: PgPool, config: Config, evm: EvmContracts) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));
        let ledger = Arc::new(evm.clone());
        let storage = Arc::new(IpfsStorage::from_config(&config));

        Self::from_parts(pool, config, evm, store, ledger, storage)
    }

    pub fn from_parts(
        pool: PgPool,
        config: Config,
        evm: EvmContracts,
        store: Arc<dyn CredentialStore>,
        ledger: Arc<dyn CredentialLedger>,
        storage: Arc<dyn ContentStorage>,
    ) -> Self {
        let credentials = CredentialService::new(store.clone(), ledger.clone(), storage);
        let verifier = Verifier::new(store.clone(), ledger.clone(), config.ipfs_gateway.clone());
        let wallet_auth = WalletAuthenticator::new(store.clone());

        Self {
            pool,
            config,
            evm,
            store,
            ledger,
            credentials,
            verifier,
            wallet_auth,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
