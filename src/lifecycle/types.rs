// Core types for the product lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::errors::{HistoryError, ParseStateError};

/// Lifecycle states of a product, declared in lifecycle order.
///
/// The derived `Ord` follows declaration order, so `a < b` means `a` is
/// reached before `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductState {
    Manufactured,
    Inspected,
    Shipped,
    Stocked,
    Labeled,
    Sold,
}

impl ProductState {
    /// Every state in lifecycle order. Also the display order for tables.
    pub const ALL: [ProductState; 6] = [
        ProductState::Manufactured,
        ProductState::Inspected,
        ProductState::Shipped,
        ProductState::Stocked,
        ProductState::Labeled,
        ProductState::Sold,
    ];

    pub const fn initial() -> Self {
        ProductState::Manufactured
    }

    pub const fn terminal() -> Self {
        ProductState::Sold
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProductState::Manufactured => "manufactured",
            ProductState::Inspected => "inspected",
            ProductState::Shipped => "shipped",
            ProductState::Stocked => "stocked",
            ProductState::Labeled => "labeled",
            ProductState::Sold => "sold",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::terminal()
    }
}

impl fmt::Display for ProductState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ProductState {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseStateError(s.to_string()))
    }
}

/// A row of the transition table: moving `from` to `to` is called `action`
/// and needs `required_permission`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub action: &'static str,
    pub required_permission: &'static str,
    pub from: ProductState,
    pub to: ProductState,
}

/// Permission labels granted to an identity.
///
/// Unordered on input; kept sorted so logs and serialized output are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    /// Separator used by the identity provider's `custom:permissions` attribute.
    pub const LEGACY_SEPARATOR: &'static str = "_";

    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the legacy attribute encoding, e.g. `"inspect_ship"`.
    /// Empty segments are ignored.
    pub fn from_delimited(encoded: &str) -> Self {
        encoded
            .split(Self::LEGACY_SEPARATOR)
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect()
    }

    pub fn to_delimited(&self) -> String {
        self.0
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(Self::LEGACY_SEPARATOR)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn grant(&mut self, label: impl Into<String>) {
        self.0.insert(label.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// An authenticated caller. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub permissions: Permissions,
}

impl Identity {
    pub fn new(username: impl Into<String>, permissions: Permissions) -> Self {
        Self {
            username: username.into(),
            permissions,
        }
    }

    pub fn can(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// When each lifecycle state was entered. `None` until reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub manufactured: Option<DateTime<Utc>>,
    pub inspected: Option<DateTime<Utc>>,
    pub shipped: Option<DateTime<Utc>>,
    pub stocked: Option<DateTime<Utc>>,
    pub labeled: Option<DateTime<Utc>>,
    pub sold: Option<DateTime<Utc>>,
}

impl History {
    pub fn get(&self, state: ProductState) -> Option<DateTime<Utc>> {
        match state {
            ProductState::Manufactured => self.manufactured,
            ProductState::Inspected => self.inspected,
            ProductState::Shipped => self.shipped,
            ProductState::Stocked => self.stocked,
            ProductState::Labeled => self.labeled,
            ProductState::Sold => self.sold,
        }
    }

    pub fn set(&mut self, state: ProductState, at: DateTime<Utc>) {
        let slot = match state {
            ProductState::Manufactured => &mut self.manufactured,
            ProductState::Inspected => &mut self.inspected,
            ProductState::Shipped => &mut self.shipped,
            ProductState::Stocked => &mut self.stocked,
            ProductState::Labeled => &mut self.labeled,
            ProductState::Sold => &mut self.sold,
        };
        *slot = Some(at);
    }

    /// `(state, timestamp)` pairs in lifecycle order.
    pub fn entries(&self) -> impl Iterator<Item = (ProductState, Option<DateTime<Utc>>)> + '_ {
        ProductState::ALL.into_iter().map(|state| (state, self.get(state)))
    }
}

/// A tracked product as exchanged with the ledger and its callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub state: ProductState,
    pub history: History,
}

impl Product {
    /// Check that history is populated for the current state and every
    /// earlier one, and empty for every later one.
    pub fn check_history(&self) -> Result<(), HistoryError> {
        for (state, at) in self.history.entries() {
            match (state <= self.state, at) {
                (true, None) => {
                    return Err(HistoryError::MissingTimestamp {
                        current: self.state,
                        missing: state,
                    })
                }
                (false, Some(_)) => {
                    return Err(HistoryError::PrematureTimestamp {
                        current: self.state,
                        premature: state,
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}
