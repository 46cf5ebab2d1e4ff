//! RPC façade: submit/confirm transactions, poll signature status, query
//! native/token balances. The trade execution core depends only on the
//! [`ChainClient`] trait; the production [`SolanaChainClient`] binding and
//! key material live here, isolated from everything upstream of it.

pub mod client;
pub mod solana;

pub use client::{ChainClient, ConfirmationStatus, SignatureStatus, SubmitError};
pub use solana::SolanaChainClient;
