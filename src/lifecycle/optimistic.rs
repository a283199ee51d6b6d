use serde::{Deserialize, Serialize};
use statig::prelude::*;

use super::types::Product;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimisticEvent {
    /// A transition was computed locally and handed to the ledger.
    Begin { previous: Product, optimistic: Product },
    /// The ledger committed; adopt its record.
    Confirm { authoritative: Product },
    /// The ledger call failed or timed out; put the previous record back.
    Fail { reason: String },
    Reset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdatePhase {
    #[default]
    Idle,
    Pending,
    Confirmed,
    RolledBack,
}

/// Caller-side bookkeeping for one product row while a transition is in flight.
///
/// The engine never rolls anything back itself; this machine keeps the
/// pre-transition record so the caller can restore it verbatim.
#[derive(Debug, Default)]
pub struct OptimisticUpdate {
    displayed: Option<Product>,
    previous: Option<Product>,
    last_failure: Option<String>,
    phase: UpdatePhase,
}

impl OptimisticUpdate {
    pub fn new(current: Product) -> Self {
        Self {
            displayed: Some(current),
            ..Default::default()
        }
    }

    fn begin(&mut self, previous: &Product, optimistic: &Product) {
        self.previous = Some(previous.clone());
        self.displayed = Some(optimistic.clone());
        self.last_failure = None;
        self.phase = UpdatePhase::Pending;
        tracing::debug!(
            product.id = %optimistic.id,
            from = %previous.state,
            to = %optimistic.state,
            "optimistic update pending"
        );
    }
}

#[state_machine(initial = "State::idle()")]
impl OptimisticUpdate {
    #[state]
    fn idle(&mut self, event: &OptimisticEvent) -> Outcome<State> {
        match event {
            OptimisticEvent::Begin { previous, optimistic } => {
                self.begin(previous, optimistic);
                Transition(State::pending())
            }
            _ => Handled,
        }
    }

    #[state]
    fn pending(&mut self, event: &OptimisticEvent) -> Outcome<State> {
        match event {
            OptimisticEvent::Confirm { authoritative } => {
                tracing::info!(
                    product.id = %authoritative.id,
                    state = %authoritative.state,
                    "ledger confirmed transition"
                );
                self.displayed = Some(authoritative.clone());
                self.previous = None;
                self.phase = UpdatePhase::Confirmed;
                Transition(State::confirmed())
            }
            OptimisticEvent::Fail { reason } => {
                tracing::warn!(reason = %reason, "ledger rejected transition, restoring previous record");
                self.displayed = self.previous.take();
                self.last_failure = Some(reason.clone());
                self.phase = UpdatePhase::RolledBack;
                Transition(State::rolled_back())
            }
            OptimisticEvent::Begin { optimistic, .. } => {
                tracing::warn!(product.id = %optimistic.id, "update already in flight, ignoring");
                Handled
            }
            OptimisticEvent::Reset => Handled,
        }
    }

    #[state]
    fn confirmed(&mut self, event: &OptimisticEvent) -> Outcome<State> {
        match event {
            OptimisticEvent::Begin { previous, optimistic } => {
                self.begin(previous, optimistic);
                Transition(State::pending())
            }
            OptimisticEvent::Reset => {
                self.phase = UpdatePhase::Idle;
                Transition(State::idle())
            }
            _ => Handled,
        }
    }

    #[state]
    fn rolled_back(&mut self, event: &OptimisticEvent) -> Outcome<State> {
        match event {
            OptimisticEvent::Begin { previous, optimistic } => {
                self.begin(previous, optimistic);
                Transition(State::pending())
            }
            OptimisticEvent::Reset => {
                self.last_failure = None;
                self.phase = UpdatePhase::Idle;
                Transition(State::idle())
            }
            _ => Handled,
        }
    }
}

impl OptimisticUpdate {
    /// What the caller should be showing right now.
    pub fn displayed(&self) -> Option<&Product> {
        self.displayed.as_ref()
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.phase == UpdatePhase::Pending
    }
}

/// Owns a running [`OptimisticUpdate`] machine.
pub struct OptimisticTracker {
    machine: statig::blocking::StateMachine<OptimisticUpdate>,
}

impl OptimisticTracker {
    pub fn new(current: Product) -> Self {
        Self {
            machine: OptimisticUpdate::new(current).state_machine(),
        }
    }

    pub fn handle(&mut self, event: &OptimisticEvent) {
        self.machine.handle(event);
    }

    pub fn update(&self) -> &OptimisticUpdate {
        self.machine.inner()
    }
}
