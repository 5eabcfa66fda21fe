//! Export command - print the replication message for the current ledger

use std::path::Path;

use anyhow::{Context, Result};

use allowance_core::domain::ReplicationMessage;

use super::{close_context, get_context};
use crate::output;

pub async fn run(output_path: Option<&Path>) -> Result<()> {
    let ctx = get_context().await?;
    let blob = ctx.ledger.snapshot().encode()?;
    let count = ctx.ledger.accounts().len();
    close_context(ctx).await?;

    let message = ReplicationMessage::seal(&blob)?;
    match output_path {
        Some(path) => {
            std::fs::write(path, &message)
                .with_context(|| format!("Failed to write {:?}", path))?;
            output::success(&format!("Exported {} accounts to {}", count, path.display()));
        }
        None => println!("{}", String::from_utf8_lossy(&message)),
    }
    Ok(())
}
