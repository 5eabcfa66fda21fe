//! Receive command - apply a snapshot from another device

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::Confirm;

use allowance_core::domain::ReplicationMessage;

use super::{close_context, get_context};
use crate::output;

pub async fn run(file: &Path, force: bool) -> Result<()> {
    let raw = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    // accept the replication envelope or a bare snapshot
    let blob = ReplicationMessage::open(&raw).unwrap_or(raw);

    let mut ctx = get_context().await?;

    if !force && !ctx.ledger.accounts().is_empty() {
        println!(
            "\n{}",
            "This replaces the whole local ledger. Local changes not on the other device are lost."
                .yellow()
        );
        if !Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let count = ctx
        .ledger
        .apply_remote(&blob)
        .context("Snapshot could not be applied; local ledger unchanged")?;
    close_context(ctx).await?;

    output::success(&format!("Ledger replaced ({} accounts)", count));
    Ok(())
}
