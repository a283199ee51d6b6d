use anyhow::Result;

use crate::lifecycle::{transition_for_state, ProductState, MANUFACTURE_PERMISSION};

pub struct StatesCommand;

impl StatesCommand {
    pub fn execute(&self) -> Result<()> {
        println!("📋 PRODUCT LIFECYCLE");
        println!("────────────────────");
        println!("   create       → manufactured   (needs '{MANUFACTURE_PERMISSION}')");
        for state in ProductState::ALL {
            match transition_for_state(state) {
                Some(rule) => println!(
                    "   {:<12} → {:<14} (needs '{}')",
                    rule.action, rule.to, rule.required_permission
                ),
                None => println!("   {state} is terminal"),
            }
        }
        Ok(())
    }
}
