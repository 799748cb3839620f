use anyhow::Result;

pub fn execute() -> Result<()> {
    println!("reefmon version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
