use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{
    product_id_from_key, product_key, LedgerError, LedgerGateway, LedgerRecord,
    CREATE_PRODUCT_METHOD, PRODUCT_INDEX_KEY, UPDATE_PRODUCT_STATE_METHOD,
};
use crate::lifecycle::{self, Product};

/// In-process stand-in for the supply-chain contract.
///
/// Applies the same rules the deployed contract does: ids are unique, and a
/// transition only commits from the state it belongs to.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: RwLock<BTreeMap<String, LedgerRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger directly, bypassing the contract checks.
    pub async fn insert(&self, product: &Product) {
        self.records
            .write()
            .await
            .insert(product_key(&product.id), LedgerRecord::from(product));
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Ids of every stored product, in key order.
    pub async fn product_ids(&self) -> Vec<String> {
        self.records
            .read()
            .await
            .keys()
            .filter_map(|key| product_id_from_key(key))
            .map(str::to_string)
            .collect()
    }

    async fn create_product(&self, id: &str) -> Result<LedgerRecord, LedgerError> {
        let key = product_key(id);
        let mut records = self.records.write().await;
        if records.contains_key(&key) {
            return Err(LedgerError::Conflict { key });
        }
        let record = LedgerRecord::from(&lifecycle::create_product(id, Utc::now()));
        records.insert(key, record.clone());
        info!(product.id = %id, "product created on ledger");
        Ok(record)
    }

    async fn update_product_state(
        &self,
        id: &str,
        action: &str,
    ) -> Result<LedgerRecord, LedgerError> {
        let key = product_key(id);
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&key)
            .ok_or_else(|| LedgerError::NotFound { key: key.clone() })?;

        let rule = lifecycle::transition_for_action(action).ok_or_else(|| {
            LedgerError::Endorsement {
                reason: format!("unknown transition '{action}'"),
            }
        })?;
        if rule.from != record.state {
            return Err(LedgerError::Endorsement {
                reason: format!("cannot {action} a product that is {}", record.state),
            });
        }

        let current = record.clone().into_product(id);
        let next = lifecycle::advance(&current, Utc::now()).ok_or_else(|| {
            LedgerError::Endorsement {
                reason: format!("product {id} is {}", record.state),
            }
        })?;
        *record = LedgerRecord::from(&next);
        info!(product.id = %id, action, state = %record.state, "product state committed");
        Ok(record.clone())
    }
}

fn expect_args<'a>(method: &str, args: &'a [String], expected: usize) -> Result<&'a [String], LedgerError> {
    if args.len() == expected {
        Ok(args)
    } else {
        Err(LedgerError::Endorsement {
            reason: format!("{method} expects {expected} argument(s), got {}", args.len()),
        })
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedger {
    async fn evaluate(&self, username: &str, key: &str) -> Result<String, LedgerError> {
        debug!(user = %username, key, "ledger query");
        let records = self.records.read().await;

        if key == PRODUCT_INDEX_KEY {
            let keys: Vec<&String> = records.keys().collect();
            return Ok(serde_json::to_string(&keys)?);
        }

        let record = records
            .get(key)
            .ok_or_else(|| LedgerError::NotFound { key: key.to_string() })?;
        Ok(serde_json::to_string(record)?)
    }

    async fn submit(
        &self,
        username: &str,
        method: &str,
        args: &[String],
    ) -> Result<String, LedgerError> {
        debug!(user = %username, method, ?args, "ledger submit");
        let record = match method {
            CREATE_PRODUCT_METHOD => {
                let args = expect_args(method, args, 1)?;
                self.create_product(&args[0]).await?
            }
            UPDATE_PRODUCT_STATE_METHOD => {
                let args = expect_args(method, args, 2)?;
                self.update_product_state(&args[0], &args[1]).await?
            }
            other => {
                return Err(LedgerError::Endorsement {
                    reason: format!("unknown contract method '{other}'"),
                })
            }
        };
        Ok(serde_json::to_string(&record)?)
    }
}
