use anyhow::Result;

pub mod check;
pub mod simulate;
pub mod states;

pub use check::CheckCommand;
pub use simulate::SimulateCommand;
pub use states::StatesCommand;

pub async fn show_how_to_get_started() -> Result<()> {
    println!("📦 Supply Chain - product lifecycle on a permissioned ledger");
    println!();
    println!("Commands:");
    println!("  📋 supply-chain states      # Lifecycle and required permissions");
    println!("  🔐 supply-chain check       # Can these permissions advance a product?");
    println!("  🚚 supply-chain simulate    # Walk a product through the lifecycle");
    println!("  🏷️  supply-chain serial      # Generate a product serial number");
    Ok(())
}

pub fn serial_command() -> Result<()> {
    println!("{}", crate::lifecycle::generate_serial_number());
    Ok(())
}
