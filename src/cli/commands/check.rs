use anyhow::Result;

use crate::lifecycle::{can_transition_label, next_state, Permissions, ProductState};

pub struct CheckCommand {
    pub state: String,
    pub permissions: Permissions,
}

impl CheckCommand {
    pub fn new(state: String, encoded_permissions: &str) -> Self {
        Self {
            state,
            permissions: Permissions::from_delimited(encoded_permissions),
        }
    }

    pub fn execute(&self) -> Result<()> {
        let allowed = can_transition_label(&self.state, &self.permissions);
        let next = self.state.parse::<ProductState>().ok().and_then(next_state);

        match (allowed, next) {
            (true, Some(next)) => println!("✅ may advance {} → {}", self.state, next),
            (false, Some(next)) => println!(
                "❌ may not advance {} → {} with [{}]",
                self.state,
                next,
                self.permissions.to_delimited()
            ),
            (_, None) => println!("⏹️  no transition available from '{}'", self.state),
        }
        Ok(())
    }
}
