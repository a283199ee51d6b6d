// Product lifecycle: fixed state ordering, transition table, authorization
// gate, and the caller-side optimistic update tracker.

pub mod engine;
pub mod optimistic;
pub mod types;

pub use engine::{
    advance, apply_transition, can_transition, can_transition_label, create_product,
    create_product_checked, generate_serial_number, next_state, transition_for_action,
    transition_for_state, validate_product_id, MANUFACTURE_PERMISSION, TRANSITIONS,
};
pub use optimistic::{OptimisticEvent, OptimisticTracker, OptimisticUpdate, UpdatePhase};
pub use types::{History, Identity, Permissions, Product, ProductState, TransitionRule};
