// Supply Chain Library - product lifecycle on a permissioned ledger
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod ledger;
pub mod lifecycle;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{config, init_config, SupplyChainConfig};
pub use dispatcher::{
    identity_from_resolver, DispatchError, DispatchTimeouts, Dispatcher, Mutation, Operation, Query,
    Request, Response,
};
pub use errors::{HistoryError, RejectionReason};
pub use ledger::{InMemoryLedger, LedgerError, LedgerGateway};
pub use lifecycle::{
    apply_transition, can_transition, create_product, Identity, OptimisticTracker, Permissions,
    Product, ProductState,
};
pub use telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};
