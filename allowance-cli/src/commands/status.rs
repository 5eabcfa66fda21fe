//! Status command - balances for every child

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};

use super::{close_context, get_context};
use crate::output::{self, create_table, format_money, money_cell};

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let summary = ctx.ledger.summary();

    close_context(ctx).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    if summary.accounts.is_empty() {
        output::info("No accounts yet. Add one with `allow account add <name> <birth-year>`.");
        return Ok(());
    }

    println!("{}", "Allowance Status".bold());
    println!();

    let mut table = create_table();
    table.set_header(vec![
        "Name", "Age", "Balance", "Tithing Due", "Savings Due", "Available", "Entries",
    ]);
    for account in &summary.accounts {
        table.add_row(vec![
            Cell::new(&account.name),
            Cell::new(account.age).set_alignment(CellAlignment::Right),
            money_cell(account.balance),
            money_cell(account.tithing_due),
            money_cell(account.savings_due),
            money_cell(account.net_balance),
            Cell::new(account.transactions).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
    println!();

    println!(
        "{} accounts, {} transactions, {} available of {} total",
        summary.total_accounts,
        summary.total_transactions,
        format_money(summary.total_net_balance).bold(),
        format_money(summary.total_balance),
    );

    Ok(())
}
