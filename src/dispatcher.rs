//! Request dispatcher
//!
//! Bridges GraphQL-style requests to the supply-chain contract. The
//! lifecycle engine acts as the pre-flight check; the ledger has the final
//! say. Ledger failures are surfaced as typed errors, never swallowed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn, Instrument};

use crate::config::{DispatchConfig, LedgerConfig, SupplyChainConfig};
use crate::errors::{HistoryError, RejectionReason};
use crate::ledger::{
    product_id_from_key, product_key, LedgerError, LedgerGateway, LedgerRecord,
    CREATE_PRODUCT_METHOD, PRODUCT_INDEX_KEY, UPDATE_PRODUCT_STATE_METHOD,
};
use crate::lifecycle::{
    self, Identity, OptimisticEvent, OptimisticTracker, Permissions, Product,
    MANUFACTURE_PERMISSION,
};
use crate::telemetry::{create_dispatch_span, generate_correlation_id};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request rejected: {0}")]
    Rejected(#[from] RejectionReason),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("ledger {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("product id is required")]
    MissingProductId,
    #[error("resolver event carries no caller identity")]
    MissingIdentity,
    #[error("unsupported field {parent}.{field}")]
    UnsupportedField { parent: String, field: String },
    #[error("ledger record for product '{id}' is inconsistent: {reason}")]
    InconsistentRecord { id: String, reason: String },
    #[error("ledger record for product '{id}' has invalid history: {source}")]
    InvalidHistory {
        id: String,
        #[source]
        source: HistoryError,
    },
}

impl DispatchError {
    /// Rejections the caller may treat as a no-op rather than a failure.
    pub fn is_noop(&self) -> bool {
        matches!(self, DispatchError::Rejected(reason) if reason.is_noop())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Product { id: String },
    Products,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateProduct { id: String },
    UpdateProductState { id: String, transition: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Query(Query),
    Mutation(Mutation),
}

impl Operation {
    pub fn parent_type_name(&self) -> &'static str {
        match self {
            Operation::Query(_) => "Query",
            Operation::Mutation(_) => "Mutation",
        }
    }

    pub fn field_name(&self) -> &'static str {
        match self {
            Operation::Query(Query::Product { .. }) => "product",
            Operation::Query(Query::Products) => "products",
            Operation::Mutation(Mutation::CreateProduct { .. }) => "createProduct",
            Operation::Mutation(Mutation::UpdateProductState { .. }) => "updateProductState",
        }
    }

    pub fn product_id(&self) -> Option<&str> {
        match self {
            Operation::Query(Query::Product { id })
            | Operation::Mutation(Mutation::CreateProduct { id })
            | Operation::Mutation(Mutation::UpdateProductState { id, .. }) => Some(id),
            Operation::Query(Query::Products) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub identity: Identity,
    pub operation: Operation,
}

impl Request {
    pub fn new(identity: Identity, operation: Operation) -> Self {
        Self {
            identity,
            operation,
        }
    }

    /// Build a request from a resolver invocation: parent type, field name
    /// and the GraphQL arguments object.
    pub fn from_resolver(
        identity: Identity,
        parent_type_name: &str,
        field_name: &str,
        arguments: &Value,
    ) -> Result<Self, DispatchError> {
        let id = || {
            arguments
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or(DispatchError::MissingProductId)
        };

        let operation = match (parent_type_name, field_name) {
            ("Query", "product") => Operation::Query(Query::Product { id: id()? }),
            ("Query", "products") => Operation::Query(Query::Products),
            ("Mutation", "createProduct") => {
                Operation::Mutation(Mutation::CreateProduct { id: id()? })
            }
            ("Mutation", "updateProductState") => {
                let id = id()?;
                let transition = arguments
                    .get("transition")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Operation::Mutation(Mutation::UpdateProductState { id, transition })
            }
            (parent, field) => {
                return Err(DispatchError::UnsupportedField {
                    parent: parent.to_string(),
                    field: field.to_string(),
                })
            }
        };
        Ok(Self::new(identity, operation))
    }

    /// Build a request from a whole resolver event:
    /// `{ identity, info: { parentTypeName, fieldName }, arguments }`.
    pub fn from_resolver_event(event: &Value) -> Result<Self, DispatchError> {
        let identity = identity_from_resolver(event.get("identity").unwrap_or(&Value::Null))?;
        let info = event.get("info").unwrap_or(&Value::Null);
        let field = |name: &str| info.get(name).and_then(Value::as_str).unwrap_or_default();
        Self::from_resolver(
            identity,
            field("parentTypeName"),
            field("fieldName"),
            event.get("arguments").unwrap_or(&Value::Null),
        )
    }
}

/// Read the caller from a resolver identity object.
///
/// The username comes from the `cognito:username` claim, falling back to the
/// top-level `username`. Permissions come from the `custom:permissions`
/// claim in its `_`-delimited form; a missing claim means no permissions.
pub fn identity_from_resolver(identity: &Value) -> Result<Identity, DispatchError> {
    let claims = identity.get("claims");
    let claim = |name: &str| {
        claims
            .and_then(|claims| claims.get(name))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    };

    let username = claim("cognito:username")
        .or_else(|| {
            identity
                .get("username")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
        })
        .ok_or(DispatchError::MissingIdentity)?;
    let permissions = claim("custom:permissions")
        .map(Permissions::from_delimited)
        .unwrap_or_default();

    Ok(Identity::new(username, permissions))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Product(Product),
    Products(Vec<Product>),
}

impl Response {
    pub fn into_product(self) -> Option<Product> {
        match self {
            Response::Product(product) => Some(product),
            Response::Products(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTimeouts {
    pub query: Duration,
    pub submit: Duration,
}

impl From<&DispatchConfig> for DispatchTimeouts {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            query: config.query_timeout(),
            submit: config.submit_timeout(),
        }
    }
}

impl Default for DispatchTimeouts {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

pub struct Dispatcher {
    ledger: Arc<dyn LedgerGateway>,
    timeouts: DispatchTimeouts,
    target: LedgerConfig,
}

impl Dispatcher {
    pub fn new(ledger: Arc<dyn LedgerGateway>, timeouts: DispatchTimeouts) -> Self {
        Self {
            ledger,
            timeouts,
            target: LedgerConfig::default(),
        }
    }

    /// Dispatcher using the configured timeouts and ledger target.
    pub fn from_config(ledger: Arc<dyn LedgerGateway>, config: &SupplyChainConfig) -> Self {
        Self::new(ledger, DispatchTimeouts::from(&config.dispatch))
            .with_ledger_target(config.ledger.clone())
    }

    /// Channel, contract and member recorded on every dispatch span.
    pub fn with_ledger_target(mut self, target: LedgerConfig) -> Self {
        self.target = target;
        self
    }

    pub fn ledger_target(&self) -> &LedgerConfig {
        &self.target
    }

    pub fn timeouts(&self) -> DispatchTimeouts {
        self.timeouts
    }

    pub async fn dispatch(&self, request: &Request) -> Result<Response, DispatchError> {
        let correlation_id = generate_correlation_id();
        let span = create_dispatch_span(
            request.operation.parent_type_name(),
            request.operation.field_name(),
            &request.identity.username,
            request.operation.product_id(),
            &self.target,
            &correlation_id,
        );

        async {
            let result = self.dispatch_inner(request).await;
            match &result {
                Ok(response) => debug!(?response, "request dispatched"),
                Err(e) if e.is_noop() => debug!(error = %e, "request was a no-op"),
                Err(DispatchError::Rejected(reason)) => warn!(%reason, "request rejected"),
                Err(e) => error!(error = %e, "request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn dispatch_inner(&self, request: &Request) -> Result<Response, DispatchError> {
        let identity = &request.identity;
        match &request.operation {
            Operation::Query(Query::Product { id }) => {
                let id = require_id(id)?;
                Ok(Response::Product(self.fetch_product(identity, id).await?))
            }
            Operation::Query(Query::Products) => {
                Ok(Response::Products(self.fetch_products(identity).await?))
            }
            Operation::Mutation(Mutation::CreateProduct { id }) => {
                let id = require_id(id)?;
                Ok(Response::Product(self.create_product(identity, id).await?))
            }
            Operation::Mutation(Mutation::UpdateProductState { id, transition }) => {
                let id = require_id(id)?;
                Ok(Response::Product(
                    self.update_product_state(identity, id, transition).await?,
                ))
            }
        }
    }

    async fn fetch_product(&self, identity: &Identity, id: &str) -> Result<Product, DispatchError> {
        let payload = self
            .with_timeout(
                "query",
                self.timeouts.query,
                self.ledger.evaluate(&identity.username, &product_key(id)),
            )
            .await?;
        parse_product(id, &payload)
    }

    async fn fetch_products(&self, identity: &Identity) -> Result<Vec<Product>, DispatchError> {
        let payload = self
            .with_timeout(
                "query",
                self.timeouts.query,
                self.ledger.evaluate(&identity.username, PRODUCT_INDEX_KEY),
            )
            .await?;
        let keys: Vec<String> = serde_json::from_str(&payload).map_err(LedgerError::from)?;

        let mut products = Vec::with_capacity(keys.len());
        for key in keys {
            let id = product_id_from_key(&key).ok_or_else(|| DispatchError::InconsistentRecord {
                id: key.clone(),
                reason: "index entry is not a product key".to_string(),
            })?;
            let payload = self
                .with_timeout(
                    "query",
                    self.timeouts.query,
                    self.ledger.evaluate(&identity.username, &key),
                )
                .await?;
            products.push(parse_product(id, &payload)?);
        }
        Ok(products)
    }

    async fn create_product(&self, identity: &Identity, id: &str) -> Result<Product, DispatchError> {
        if !identity.can(MANUFACTURE_PERMISSION) {
            return Err(RejectionReason::Unauthorized {
                action: MANUFACTURE_PERMISSION.to_string(),
                required: MANUFACTURE_PERMISSION.to_string(),
            }
            .into());
        }
        lifecycle::validate_product_id(id)?;

        let already_exists = match self.fetch_product(identity, id).await {
            Ok(_) => true,
            Err(DispatchError::Ledger(LedgerError::NotFound { .. })) => false,
            Err(e) => return Err(e),
        };
        if already_exists {
            return Err(RejectionReason::DuplicateId { id: id.to_string() }.into());
        }

        let submitted = self
            .with_timeout(
                "submit",
                self.timeouts.submit,
                self.ledger
                    .submit(&identity.username, CREATE_PRODUCT_METHOD, &[id.to_string()]),
            )
            .await;
        let payload = match submitted {
            // Lost a race with another creator between the check and the submit
            Err(DispatchError::Ledger(LedgerError::Conflict { .. })) => {
                return Err(RejectionReason::DuplicateId { id: id.to_string() }.into())
            }
            other => other?,
        };
        parse_product(id, &payload)
    }

    async fn update_product_state(
        &self,
        identity: &Identity,
        id: &str,
        transition: &str,
    ) -> Result<Product, DispatchError> {
        let rule = lifecycle::transition_for_action(transition).ok_or_else(|| {
            RejectionReason::UnknownAction {
                action: transition.to_string(),
            }
        })?;

        // Terminal products are a no-op whoever asks, same as apply_transition
        let current = self.fetch_product(identity, id).await?;
        if lifecycle::transition_for_state(current.state).is_none() {
            return Err(RejectionReason::NoTransitionAvailable {
                state: current.state,
            }
            .into());
        }
        if !identity.can(rule.required_permission) {
            return Err(RejectionReason::Unauthorized {
                action: rule.action.to_string(),
                required: rule.required_permission.to_string(),
            }
            .into());
        }
        if current.state != rule.from {
            return Err(RejectionReason::InvalidTransition {
                action: rule.action.to_string(),
                from: current.state,
            }
            .into());
        }

        let payload = self
            .with_timeout(
                "submit",
                self.timeouts.submit,
                self.ledger.submit(
                    &identity.username,
                    UPDATE_PRODUCT_STATE_METHOD,
                    &[id.to_string(), rule.action.to_string()],
                ),
            )
            .await?;
        parse_product(id, &payload)
    }

    /// Advance `product` locally, show the result through `tracker`, and
    /// reconcile with the ledger: confirmed records replace the optimistic
    /// one, failures restore `product` verbatim.
    pub async fn update_product_state_optimistic(
        &self,
        identity: &Identity,
        product: &Product,
        tracker: &mut OptimisticTracker,
        now: DateTime<Utc>,
    ) -> Result<Product, DispatchError> {
        let optimistic = lifecycle::apply_transition(product, identity, now)?;
        let action = lifecycle::transition_for_state(product.state)
            .map(|rule| rule.action)
            .unwrap_or_default();

        tracker.handle(&OptimisticEvent::Begin {
            previous: product.clone(),
            optimistic,
        });

        let request = Request::new(
            identity.clone(),
            Operation::Mutation(Mutation::UpdateProductState {
                id: product.id.clone(),
                transition: action.to_string(),
            }),
        );
        let committed = self
            .dispatch(&request)
            .await
            .map(|response| response.into_product());

        match committed {
            Ok(Some(authoritative)) => {
                tracker.handle(&OptimisticEvent::Confirm {
                    authoritative: authoritative.clone(),
                });
                Ok(authoritative)
            }
            Ok(None) => {
                let reason = "ledger returned a product list for a mutation".to_string();
                tracker.handle(&OptimisticEvent::Fail {
                    reason: reason.clone(),
                });
                Err(DispatchError::InconsistentRecord {
                    id: product.id.clone(),
                    reason,
                })
            }
            Err(e) => {
                tracker.handle(&OptimisticEvent::Fail {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn with_timeout<F>(
        &self,
        operation: &str,
        limit: Duration,
        call: F,
    ) -> Result<String, DispatchError>
    where
        F: Future<Output = Result<String, LedgerError>>,
    {
        match tokio::time::timeout(limit, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DispatchError::Timeout {
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
        }
    }
}

fn require_id(id: &str) -> Result<&str, DispatchError> {
    if id.is_empty() {
        Err(DispatchError::MissingProductId)
    } else {
        Ok(id)
    }
}

fn parse_product(id: &str, payload: &str) -> Result<Product, DispatchError> {
    let record: LedgerRecord = serde_json::from_str(payload).map_err(LedgerError::from)?;
    let product = record.into_product(id);
    product
        .check_history()
        .map_err(|source| DispatchError::InvalidHistory {
            id: id.to_string(),
            source,
        })?;
    Ok(product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedgerGateway;
    use crate::lifecycle::{create_product, Permissions, ProductState};
    use serde_json::json;

    fn worker(perms: &str) -> Identity {
        Identity::new("worker1", Permissions::from_delimited(perms))
    }

    fn record_json(product: &Product) -> String {
        serde_json::to_string(&LedgerRecord::from(product)).unwrap()
    }

    #[test]
    fn test_from_resolver_maps_fields() {
        let request = Request::from_resolver(
            worker("inspect"),
            "Mutation",
            "updateProductState",
            &json!({ "id": "ABC123", "transition": "inspect" }),
        )
        .unwrap();
        assert_eq!(
            request.operation,
            Operation::Mutation(Mutation::UpdateProductState {
                id: "ABC123".to_string(),
                transition: "inspect".to_string(),
            })
        );

        let request = Request::from_resolver(worker(""), "Query", "products", &json!({})).unwrap();
        assert_eq!(request.operation, Operation::Query(Query::Products));
    }

    #[test]
    fn test_from_resolver_requires_id() {
        let err = Request::from_resolver(worker(""), "Query", "product", &json!({})).unwrap_err();
        assert!(matches!(err, DispatchError::MissingProductId));

        let err = Request::from_resolver(worker(""), "Mutation", "createProduct", &json!({ "id": "" }))
            .unwrap_err();
        assert!(matches!(err, DispatchError::MissingProductId));
    }

    #[test]
    fn test_from_resolver_rejects_unknown_field() {
        let err = Request::from_resolver(worker(""), "Mutation", "deleteProduct", &json!({ "id": "A" }))
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedField { .. }));
    }

    fn sold_product() -> Product {
        let mut sold = create_product("ABC123", Utc::now());
        sold.state = ProductState::Sold;
        for state in ProductState::ALL {
            sold.history.set(state, Utc::now());
        }
        sold
    }

    #[test]
    fn test_identity_from_resolver_prefers_cognito_claim() {
        let identity = identity_from_resolver(&json!({
            "username": "a1b2-c3d4",
            "claims": {
                "cognito:username": "worker1",
                "custom:permissions": "inspect_ship"
            }
        }))
        .unwrap();
        assert_eq!(identity.username, "worker1");
        assert!(identity.can("inspect"));
        assert!(identity.can("ship"));
        assert!(!identity.can("sell"));

        let identity = identity_from_resolver(&json!({ "username": "worker2", "claims": {} })).unwrap();
        assert_eq!(identity.username, "worker2");
        assert!(identity.permissions.is_empty());

        let err = identity_from_resolver(&json!({ "claims": {} })).unwrap_err();
        assert!(matches!(err, DispatchError::MissingIdentity));
    }

    #[test]
    fn test_from_resolver_event_reads_identity_and_info() {
        let request = Request::from_resolver_event(&json!({
            "identity": {
                "username": "a1b2-c3d4",
                "claims": {
                    "cognito:username": "worker1",
                    "custom:permissions": "manufacture"
                }
            },
            "info": { "parentTypeName": "Mutation", "fieldName": "createProduct" },
            "arguments": { "id": "ABC123" }
        }))
        .unwrap();
        assert_eq!(request.identity, worker("manufacture"));
        assert_eq!(
            request.operation,
            Operation::Mutation(Mutation::CreateProduct {
                id: "ABC123".to_string(),
            })
        );

        let err = Request::from_resolver_event(&json!({
            "info": { "parentTypeName": "Query", "fieldName": "products" },
            "arguments": {}
        }))
        .unwrap_err();
        assert!(matches!(err, DispatchError::MissingIdentity));
    }

    #[test]
    fn test_from_config_applies_timeouts_and_target() {
        let mut config = SupplyChainConfig::default();
        config.dispatch.query_timeout_seconds = 3;
        config.dispatch.endorse_timeout_seconds = 4;
        config.dispatch.commit_timeout_seconds = 5;
        config.ledger.channel_name = "testchannel".to_string();
        config.ledger.member_name = Some("m-ABC".to_string());

        let dispatcher = Dispatcher::from_config(Arc::new(MockLedgerGateway::new()), &config);
        assert_eq!(dispatcher.timeouts().query, Duration::from_secs(3));
        assert_eq!(dispatcher.timeouts().submit, Duration::from_secs(9));
        assert_eq!(dispatcher.ledger_target().channel_name, "testchannel");
        assert_eq!(dispatcher.ledger_target().chaincode_id, "supplychaincc");
        assert_eq!(dispatcher.ledger_target().member_name.as_deref(), Some("m-ABC"));
    }

    #[tokio::test]
    async fn test_terminal_product_is_noop_even_without_permission() {
        let stored = record_json(&sold_product());
        let mut ledger = MockLedgerGateway::new();
        ledger
            .expect_evaluate()
            .returning(move |_, _| Ok(stored.clone()));
        ledger.expect_submit().never();
        let dispatcher = Dispatcher::new(Arc::new(ledger), DispatchTimeouts::default());

        let request = Request::new(
            worker(""),
            Operation::Mutation(Mutation::UpdateProductState {
                id: "ABC123".to_string(),
                transition: "sell".to_string(),
            }),
        );
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rejected(RejectionReason::NoTransitionAvailable {
                state: ProductState::Sold
            })
        ));
        assert!(err.is_noop());
    }

    #[tokio::test]
    async fn test_unauthorized_update_never_submits() {
        let stored = record_json(&create_product("ABC123", Utc::now()));
        let mut ledger = MockLedgerGateway::new();
        ledger
            .expect_evaluate()
            .returning(move |_, _| Ok(stored.clone()));
        ledger.expect_submit().never();
        let dispatcher = Dispatcher::new(Arc::new(ledger), DispatchTimeouts::default());

        let request = Request::new(
            worker("ship"),
            Operation::Mutation(Mutation::UpdateProductState {
                id: "ABC123".to_string(),
                transition: "inspect".to_string(),
            }),
        );
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rejected(RejectionReason::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_checks_current_state_before_submit() {
        let product = create_product("ABC123", Utc::now());
        let stored = record_json(&product);

        let mut ledger = MockLedgerGateway::new();
        ledger
            .expect_evaluate()
            .returning(move |_, _| Ok(stored.clone()));
        ledger.expect_submit().never();
        let dispatcher = Dispatcher::new(Arc::new(ledger), DispatchTimeouts::default());

        let request = Request::new(
            worker("ship"),
            Operation::Mutation(Mutation::UpdateProductState {
                id: "ABC123".to_string(),
                transition: "ship".to_string(),
            }),
        );
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rejected(RejectionReason::InvalidTransition {
                from: ProductState::Manufactured,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_ledger_failure_is_propagated() {
        let mut ledger = MockLedgerGateway::new();
        ledger.expect_evaluate().returning(|_, _| {
            Err(LedgerError::Unavailable {
                message: "peer unreachable".to_string(),
            })
        });
        let dispatcher = Dispatcher::new(Arc::new(ledger), DispatchTimeouts::default());

        let request = Request::new(
            worker(""),
            Operation::Query(Query::Product {
                id: "ABC123".to_string(),
            }),
        );
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(err, DispatchError::Ledger(LedgerError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_inconsistent_ledger_record_is_reported() {
        let mut broken = create_product("ABC123", Utc::now());
        broken.state = ProductState::Shipped;
        let stored = record_json(&broken);

        let mut ledger = MockLedgerGateway::new();
        ledger
            .expect_evaluate()
            .returning(move |_, _| Ok(stored.clone()));
        let dispatcher = Dispatcher::new(Arc::new(ledger), DispatchTimeouts::default());

        let request = Request::new(
            worker(""),
            Operation::Query(Query::Product {
                id: "ABC123".to_string(),
            }),
        );
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidHistory {
                source: HistoryError::MissingTimestamp {
                    missing: ProductState::Inspected,
                    ..
                },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_create_conflict_maps_to_duplicate_id() {
        let mut ledger = MockLedgerGateway::new();
        ledger.expect_evaluate().returning(|_, key| {
            Err(LedgerError::NotFound {
                key: key.to_string(),
            })
        });
        ledger.expect_submit().times(1).returning(|_, _, _| {
            Err(LedgerError::Conflict {
                key: "product_ABC123".to_string(),
            })
        });
        let dispatcher = Dispatcher::new(Arc::new(ledger), DispatchTimeouts::default());

        let request = Request::new(
            worker("manufacture"),
            Operation::Mutation(Mutation::CreateProduct {
                id: "ABC123".to_string(),
            }),
        );
        let err = dispatcher.dispatch(&request).await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Rejected(RejectionReason::DuplicateId { .. })
        ));
    }
}
