//! Settle command - pay out tithing or withdraw savings in full

use anyhow::Result;
use clap::Subcommand;

use super::{close_context, get_context, resolve_account};
use crate::output::{self, format_money};

#[derive(Subcommand)]
pub enum SettleCommands {
    /// Record a tithing payment for everything currently due
    Tithing {
        /// Account name or id
        account: String,
    },
    /// Record a savings withdrawal for everything currently due
    Savings {
        /// Account name or id
        account: String,
    },
}

pub async fn run(command: SettleCommands) -> Result<()> {
    let mut ctx = get_context().await?;

    let (label, settled) = match command {
        SettleCommands::Tithing { account } => {
            let id = resolve_account(&ctx.ledger, &account)?;
            ("Tithing", ctx.ledger.settle_tithing(id)?)
        }
        SettleCommands::Savings { account } => {
            let id = resolve_account(&ctx.ledger, &account)?;
            ("Savings", ctx.ledger.settle_savings(id)?)
        }
    };
    close_context(ctx).await?;

    match settled {
        Some(tx) => output::success(&format!("{} settled: {}", label, format_money(tx.amount()))),
        None => output::info(&format!("{}: nothing due", label)),
    }
    Ok(())
}
