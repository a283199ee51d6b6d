use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::config::{LedgerConfig, ObservabilityConfig};

/// Initialize structured logging.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies.
pub fn init_telemetry(observability: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&observability.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if observability.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?;
    }

    tracing::info!("Supply-chain telemetry initialized with structured logging");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping one dispatched request
pub fn create_dispatch_span(
    parent_type: &str,
    field: &str,
    username: &str,
    product_id: Option<&str>,
    target: &LedgerConfig,
    correlation_id: &str,
) -> tracing::Span {
    tracing::info_span!(
        "dispatch_request",
        parent_type = parent_type,
        field = field,
        user = username,
        product.id = product_id,
        ledger.channel = %target.channel_name,
        ledger.chaincode = %target.chaincode_id,
        ledger.member = target.member_name.as_deref(),
        correlation.id = correlation_id,
        otel.kind = "server"
    )
}

/// Shutdown telemetry gracefully
pub fn shutdown_telemetry() {
    tracing::info!("Supply-chain telemetry shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fmt;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, Layer};

    /// Collects the fields of every span opened while it is installed.
    #[derive(Clone, Default)]
    struct SpanFields(Arc<Mutex<BTreeMap<String, String>>>);

    impl Visit for SpanFields {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0
                .lock()
                .unwrap()
                .insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0
                .lock()
                .unwrap()
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for SpanFields {
        fn on_new_span(
            &self,
            attrs: &tracing::span::Attributes<'_>,
            _id: &tracing::span::Id,
            _ctx: Context<'_, S>,
        ) {
            attrs.record(&mut self.clone());
        }
    }

    #[test]
    fn test_dispatch_span_records_ledger_target() {
        let fields = SpanFields::default();
        let subscriber = tracing_subscriber::registry().with(fields.clone());
        let target = LedgerConfig {
            member_name: Some("m-ABC".to_string()),
            channel_name: "testchannel".to_string(),
            chaincode_id: "testcc".to_string(),
        };

        tracing::subscriber::with_default(subscriber, || {
            let _span = create_dispatch_span(
                "Mutation",
                "createProduct",
                "worker1",
                Some("ABC123"),
                &target,
                "corr-1",
            );
        });

        let fields = fields.0.lock().unwrap();
        assert_eq!(fields["ledger.channel"], "testchannel");
        assert_eq!(fields["ledger.chaincode"], "testcc");
        assert_eq!(fields["ledger.member"], "m-ABC");
        assert_eq!(fields["product.id"], "ABC123");
        assert_eq!(fields["correlation.id"], "corr-1");
    }

    #[test]
    fn test_correlation_ids_are_unique_uuids() {
        let a = generate_correlation_id();
        let b = generate_correlation_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
