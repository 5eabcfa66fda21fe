//! Transaction command - record, edit and delete ledger entries

use anyhow::{anyhow, Result};
use clap::Subcommand;
use dialoguer::Input;

use allowance_core::{Transaction, TransactionKind};

use super::{close_context, get_context, parse_amount, resolve_account, resolve_transaction};
use crate::output::{self, format_money};

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a new transaction
    Record {
        /// Account name or id
        account: String,
        /// deposit, withdrawal, tithing or savings
        kind: TransactionKind,
        /// Amount (prompted if omitted)
        amount: Option<String>,
        /// Free-text note
        #[arg(long, short, default_value = "")]
        note: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an existing transaction; its date is kept
    Edit {
        /// Account name or id
        account: String,
        /// Transaction id or id prefix
        transaction: String,
        #[arg(long)]
        kind: Option<TransactionKind>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long, short)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a transaction
    Delete {
        /// Account name or id
        account: String,
        /// Transaction id or id prefix
        transaction: String,
    },
}

pub async fn run(command: TxCommands) -> Result<()> {
    match command {
        TxCommands::Record { account, kind, amount, note, json } => {
            run_record(&account, kind, amount, &note, json).await
        }
        TxCommands::Edit { account, transaction, kind, amount, note, json } => {
            run_edit(&account, &transaction, kind, amount.as_deref(), note, json).await
        }
        TxCommands::Delete { account, transaction } => run_delete(&account, &transaction).await,
    }
}

async fn run_record(
    key: &str,
    kind: TransactionKind,
    amount: Option<String>,
    note: &str,
    json: bool,
) -> Result<()> {
    let amount_str = match amount {
        Some(a) => a,
        None => Input::new().with_prompt("Amount").interact_text()?,
    };
    let amount = parse_amount(&amount_str)?;

    let mut ctx = get_context().await?;
    let id = resolve_account(&ctx.ledger, key)?;
    let tx = ctx.ledger.record_transaction(id, kind, amount, note)?;
    let account = ctx.ledger.account(id).cloned();
    close_context(ctx).await?;

    print_result("Recorded", &tx, json)?;
    if let (false, Some(account)) = (json, account) {
        println!("  Balance now:  {}", format_money(account.balance()));
    }
    Ok(())
}

async fn run_edit(
    key: &str,
    tx_key: &str,
    kind: Option<TransactionKind>,
    amount: Option<&str>,
    note: Option<String>,
    json: bool,
) -> Result<()> {
    let amount = amount.map(parse_amount).transpose()?;

    let mut ctx = get_context().await?;
    let account_id = resolve_account(&ctx.ledger, key)?;
    let tx_id = resolve_transaction(&ctx.ledger, account_id, tx_key)?;
    let existing = ctx
        .ledger
        .account(account_id)
        .and_then(|a| a.transaction(tx_id))
        .cloned()
        .ok_or_else(|| anyhow!("Transaction '{}' not found", tx_key))?;

    // unspecified fields keep their current value
    let tx = ctx.ledger.edit_transaction(
        account_id,
        tx_id,
        kind.unwrap_or(existing.kind()),
        amount.unwrap_or(existing.amount()),
        note.as_deref().unwrap_or(existing.note()),
    )?;
    close_context(ctx).await?;

    print_result("Updated", &tx, json)
}

async fn run_delete(key: &str, tx_key: &str) -> Result<()> {
    let mut ctx = get_context().await?;
    let account_id = resolve_account(&ctx.ledger, key)?;
    let tx_id = resolve_transaction(&ctx.ledger, account_id, tx_key)?;

    ctx.ledger.delete_transaction(account_id, tx_id)?;
    close_context(ctx).await?;
    output::success("Transaction deleted");
    Ok(())
}

fn print_result(verb: &str, tx: &Transaction, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tx)?);
    } else {
        output::success(&format!(
            "{} {} of {} ({})",
            verb,
            tx.kind(),
            format_money(tx.amount()),
            &tx.id().to_string()[..8]
        ));
    }
    Ok(())
}
