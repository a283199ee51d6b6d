// Lifecycle engine: the transition table and the authorization gate.
//
// Everything here is a pure function of its inputs. The ledger is the
// system of record; these functions only decide whether a request is legal
// and what the product should look like afterwards.

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

use super::types::{History, Identity, Permissions, Product, ProductState, TransitionRule};
use crate::errors::RejectionReason;

/// Permission needed to create products. Not part of the transition table
/// because creation has no source state.
pub const MANUFACTURE_PERMISSION: &str = "manufacture";

/// One rule per non-terminal state, in lifecycle order.
pub const TRANSITIONS: [TransitionRule; 5] = [
    TransitionRule {
        action: "inspect",
        required_permission: "inspect",
        from: ProductState::Manufactured,
        to: ProductState::Inspected,
    },
    TransitionRule {
        action: "ship",
        required_permission: "ship",
        from: ProductState::Inspected,
        to: ProductState::Shipped,
    },
    TransitionRule {
        action: "receive",
        required_permission: "receive",
        from: ProductState::Shipped,
        to: ProductState::Stocked,
    },
    TransitionRule {
        action: "label",
        required_permission: "label",
        from: ProductState::Stocked,
        to: ProductState::Labeled,
    },
    TransitionRule {
        action: "sell",
        required_permission: "sell",
        from: ProductState::Labeled,
        to: ProductState::Sold,
    },
];

/// Alphabet for generated serial numbers; omits 0/O and I/1 look-alikes.
pub const SERIAL_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZ";
pub const SERIAL_LENGTH: usize = 8;

// Ledger keys are `product_<id>` and get split on '_', so ids must not contain it.
static PRODUCT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("product id pattern is valid"));

/// The outgoing transition of `state`, or `None` when it is terminal.
pub fn transition_for_state(state: ProductState) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|rule| rule.from == state)
}

/// Look up a transition by its action name (`"inspect"`, `"ship"`, ...).
pub fn transition_for_action(action: &str) -> Option<&'static TransitionRule> {
    TRANSITIONS.iter().find(|rule| rule.action == action)
}

pub fn next_state(state: ProductState) -> Option<ProductState> {
    transition_for_state(state).map(|rule| rule.to)
}

/// Whether holders of `permissions` may move a product out of `current_state`.
/// Always false for the terminal state.
pub fn can_transition(current_state: ProductState, permissions: &Permissions) -> bool {
    transition_for_state(current_state)
        .map(|rule| permissions.contains(rule.required_permission))
        .unwrap_or(false)
}

/// Same as [`can_transition`] for a raw state label. Unknown labels have no
/// transition.
pub fn can_transition_label(current_state: &str, permissions: &Permissions) -> bool {
    current_state
        .parse::<ProductState>()
        .map(|state| can_transition(state, permissions))
        .unwrap_or(false)
}

/// Compute the product as it should look after `identity` advances it at `now`.
///
/// The input is borrowed and never modified, so a rejected request leaves the
/// caller's copy exactly as it was.
pub fn apply_transition(
    product: &Product,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<Product, RejectionReason> {
    let Some(rule) = transition_for_state(product.state) else {
        tracing::debug!(product.id = %product.id, state = %product.state, "no transition from terminal state");
        return Err(RejectionReason::NoTransitionAvailable {
            state: product.state,
        });
    };

    if !identity.can(rule.required_permission) {
        tracing::warn!(
            product.id = %product.id,
            user = %identity.username,
            action = rule.action,
            "transition rejected: missing permission"
        );
        return Err(RejectionReason::Unauthorized {
            action: rule.action.to_string(),
            required: rule.required_permission.to_string(),
        });
    }

    let next = advance_by(rule, product, now);
    tracing::debug!(
        product.id = %product.id,
        from = %rule.from,
        to = %rule.to,
        "transition computed"
    );
    Ok(next)
}

/// Advance without an authorization check. Used by ledger-side code that
/// has already authorized the caller.
pub fn advance(product: &Product, now: DateTime<Utc>) -> Option<Product> {
    transition_for_state(product.state).map(|rule| advance_by(rule, product, now))
}

fn advance_by(rule: &TransitionRule, product: &Product, now: DateTime<Utc>) -> Product {
    let mut next = product.clone();
    next.state = rule.to;
    next.history.set(rule.to, now);
    next
}

/// A freshly manufactured product.
pub fn create_product(id: impl Into<String>, now: DateTime<Utc>) -> Product {
    let mut history = History::default();
    history.set(ProductState::initial(), now);
    Product {
        id: id.into(),
        state: ProductState::initial(),
        history,
    }
}

/// [`create_product`] plus the caller-side checks: the id must be well formed
/// and must not already exist in the caller's store.
pub fn create_product_checked(
    id: &str,
    now: DateTime<Utc>,
    already_exists: bool,
) -> Result<Product, RejectionReason> {
    validate_product_id(id)?;
    if already_exists {
        return Err(RejectionReason::DuplicateId { id: id.to_string() });
    }
    Ok(create_product(id, now))
}

pub fn validate_product_id(id: &str) -> Result<(), RejectionReason> {
    if PRODUCT_ID_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(RejectionReason::InvalidProductId { id: id.to_string() })
    }
}

/// Random serial number for a new product, e.g. `"7KQ2MZ4D"`.
pub fn generate_serial_number() -> String {
    let mut rng = rand::rng();
    (0..SERIAL_LENGTH)
        .map(|_| SERIAL_ALPHABET[rng.random_range(0..SERIAL_ALPHABET.len())] as char)
        .collect()
}
