//! Forget the stored session token.

use anyhow::Result;
use std::path::Path;

use crate::config::Settings;

/// Run the logout command.
pub async fn run(data_dir: &Path) -> Result<()> {
    let mut settings = Settings::load(data_dir).await?;
    if settings.auth_token.take().is_none() {
        println!("Not logged in.");
        return Ok(());
    }
    settings.save(data_dir).await?;
    println!("Logged out.");
    Ok(())
}
