//! Generate a pairing code.

use anyhow::Result;
use clipsync_core::generate_pairing_code;

/// Run the pair-code command.
pub fn run() -> Result<()> {
    let code = generate_pairing_code()?;
    println!("{}", code.as_str());
    eprintln!();
    eprintln!("On each device run: clipsync listen --pair {}", code.as_str());
    Ok(())
}
