use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "supply-chain")]
#[command(about = "Supply-chain product lifecycle on a permissioned ledger")]
#[command(long_about = "Tracks products through manufactured → inspected → shipped → stocked → \
                       labeled → sold. Each step needs the matching worker permission. \
                       Start with 'supply-chain states' to see the lifecycle.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the lifecycle states and the permission each transition needs
    States,
    /// Check whether a permission set may advance a product from a state
    Check {
        /// Current product state, e.g. "manufactured"
        #[arg(long, help = "Current state label of the product")]
        state: String,
        /// Permissions in the identity provider's format, e.g. "inspect_ship"
        #[arg(long, default_value = "", help = "Underscore-separated permission labels")]
        permissions: String,
    },
    /// Create a product on an in-memory ledger and advance it as far as allowed
    Simulate {
        /// Product id (a serial number is generated when omitted)
        #[arg(long, help = "Product id to create; ASCII letters and digits")]
        id: Option<String>,
        /// Permissions of the simulated worker
        #[arg(
            long,
            default_value = "manufacture_inspect_ship_receive_label_sell",
            help = "Underscore-separated permission labels"
        )]
        permissions: String,
        /// Username of the simulated worker
        #[arg(long, default_value = "worker1", help = "Username the ledger calls are made for")]
        user: String,
    },
    /// Print a fresh product serial number
    Serial,
}
