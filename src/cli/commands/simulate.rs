use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

use crate::config::SupplyChainConfig;
use crate::dispatcher::{Dispatcher, Mutation, Operation, Request};
use crate::ledger::{InMemoryLedger, LedgerGateway};
use crate::lifecycle::{generate_serial_number, Identity, OptimisticTracker, Permissions};

pub struct SimulateCommand {
    pub id: Option<String>,
    pub identity: Identity,
}

impl SimulateCommand {
    pub fn new(id: Option<String>, user: String, encoded_permissions: &str) -> Self {
        Self {
            id,
            identity: Identity::new(user, Permissions::from_delimited(encoded_permissions)),
        }
    }

    pub async fn execute(&self, config: &SupplyChainConfig) -> Result<()> {
        let ledger: Arc<dyn LedgerGateway> = Arc::new(InMemoryLedger::new());
        let dispatcher = Dispatcher::from_config(ledger, config);
        let target = dispatcher.ledger_target();
        println!(
            "🔗 Simulating {}/{} as member {}",
            target.channel_name,
            target.chaincode_id,
            target.member_name.as_deref().unwrap_or("(unset)")
        );

        let id = self.id.clone().unwrap_or_else(generate_serial_number);
        println!("🏭 Creating product {id} as {}", self.identity.username);

        let created = dispatcher
            .dispatch(&Request::new(
                self.identity.clone(),
                Operation::Mutation(Mutation::CreateProduct { id: id.clone() }),
            ))
            .await?;
        println!("{}", serde_json::to_string_pretty(&created)?);

        let Some(mut product) = created.into_product() else {
            anyhow::bail!("ledger returned a product list for createProduct");
        };
        let mut tracker = OptimisticTracker::new(product.clone());

        loop {
            match dispatcher
                .update_product_state_optimistic(&self.identity, &product, &mut tracker, Utc::now())
                .await
            {
                Ok(next) => {
                    println!("➡️  {} → {}", product.state, next.state);
                    println!("{}", serde_json::to_string_pretty(&next)?);
                    product = next;
                }
                Err(e) if e.is_noop() => {
                    println!("🏁 {} reached its final state: {}", product.id, product.state);
                    break;
                }
                Err(e) => {
                    println!("⛔ stopped at {}: {e}", product.state);
                    break;
                }
            }
        }
        Ok(())
    }
}
