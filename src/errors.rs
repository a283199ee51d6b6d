use thiserror::Error;

use crate::lifecycle::ProductState;

/// Why the lifecycle engine refused a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("identity lacks permission '{required}' required for '{action}'")]
    Unauthorized { action: String, required: String },

    #[error("product '{id}' already exists")]
    DuplicateId { id: String },

    #[error("product is {state}; no further transition is available")]
    NoTransitionAvailable { state: ProductState },

    #[error("unknown transition '{action}'")]
    UnknownAction { action: String },

    #[error("transition '{action}' cannot be applied to a product that is {from}")]
    InvalidTransition { action: String, from: ProductState },

    #[error("invalid product id '{id}': expected ASCII letters and digits only")]
    InvalidProductId { id: String },
}

impl RejectionReason {
    /// Terminal-state requests are a no-op, not something to alarm on.
    pub fn is_noop(&self) -> bool {
        matches!(self, RejectionReason::NoTransitionAvailable { .. })
    }
}

/// A product whose history does not match its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("product is {current} but has no timestamp for {missing}")]
    MissingTimestamp {
        current: ProductState,
        missing: ProductState,
    },

    #[error("product is {current} but already has a timestamp for {premature}")]
    PrematureTimestamp {
        current: ProductState,
        premature: ProductState,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown product state '{0}'")]
pub struct ParseStateError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_terminal_rejection_is_noop() {
        assert!(RejectionReason::NoTransitionAvailable {
            state: ProductState::Sold
        }
        .is_noop());
        assert!(!RejectionReason::Unauthorized {
            action: "ship".to_string(),
            required: "ship".to_string(),
        }
        .is_noop());
        assert!(!RejectionReason::DuplicateId {
            id: "ABC123".to_string()
        }
        .is_noop());
    }

    #[test]
    fn test_rejection_messages() {
        let err = RejectionReason::Unauthorized {
            action: "inspect".to_string(),
            required: "inspect".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "identity lacks permission 'inspect' required for 'inspect'"
        );

        let err = RejectionReason::NoTransitionAvailable {
            state: ProductState::Sold,
        };
        assert_eq!(err.to_string(), "product is sold; no further transition is available");

        let err = HistoryError::MissingTimestamp {
            current: ProductState::Shipped,
            missing: ProductState::Shipped,
        };
        assert_eq!(err.to_string(), "product is shipped but has no timestamp for shipped");
    }
}
