// Services module - Business logic

pub mod abi;
pub mod contracts;
pub mod credential_service;
pub mod ipfs;
pub mod issuer_admin;
pub mod metadata;
pub mod qr_generator;
pub mod validation;
pub mod verifier;
pub mod wallet_auth;
