//! Ledger abstractions
//!
//! The ledger is the system of record for product history. This module
//! only defines the contract the dispatcher relies on, plus an in-memory
//! implementation of the supply-chain contract for the CLI and tests.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lifecycle::{History, Product, ProductState};

pub use memory::InMemoryLedger;

/// Ledger key holding the list of product keys.
pub const PRODUCT_INDEX_KEY: &str = "productIDs";
const PRODUCT_KEY_PREFIX: &str = "product_";

pub const CREATE_PRODUCT_METHOD: &str = "createProduct";
pub const UPDATE_PRODUCT_STATE_METHOD: &str = "updateProductState";

pub fn product_key(id: &str) -> String {
    format!("{PRODUCT_KEY_PREFIX}{id}")
}

/// Inverse of [`product_key`].
pub fn product_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(PRODUCT_KEY_PREFIX).filter(|id| !id.is_empty())
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("no ledger entry for key '{key}'")]
    NotFound { key: String },
    #[error("ledger entry '{key}' already exists")]
    Conflict { key: String },
    #[error("transaction endorsement failed: {reason}")]
    Endorsement { reason: String },
    #[error("ledger unavailable: {message}")]
    Unavailable { message: String },
    #[error("malformed ledger payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// A product as the contract stores it: the id lives in the key, not the value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub state: ProductState,
    pub history: History,
}

impl LedgerRecord {
    pub fn into_product(self, id: impl Into<String>) -> Product {
        Product {
            id: id.into(),
            state: self.state,
            history: self.history,
        }
    }
}

impl From<&Product> for LedgerRecord {
    fn from(product: &Product) -> Self {
        Self {
            state: product.state,
            history: product.history.clone(),
        }
    }
}

/// Connection to the supply-chain contract on the ledger.
///
/// Every call is made on behalf of a named user; implementations pick the
/// matching signing identity. Payloads are JSON strings as returned by the
/// contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Read-only query, e.g. `product_ABC123` or [`PRODUCT_INDEX_KEY`].
    async fn evaluate(&self, username: &str, key: &str) -> Result<String, LedgerError>;

    /// State-changing transaction. Returns once the transaction is committed.
    async fn submit(
        &self,
        username: &str,
        method: &str,
        args: &[String],
    ) -> Result<String, LedgerError>;
}
