//! Account command - add, remove, list, show and configure children

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, CellAlignment};
use dialoguer::Confirm;

use allowance_core::domain::current_year;
use allowance_core::{Account, AccountSettings, SettingsUpdate};

use super::{close_context, get_context, parse_rate, resolve_account};
use crate::output::{self, create_table, format_money, format_rate, money_cell};

/// Transactions shown by `account show` unless --all is given
const RECENT_LIMIT: usize = 10;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Add a child
    Add {
        /// Display name
        name: String,
        /// Year of birth
        birth_year: i32,
        /// Do not accrue tithing on deposits
        #[arg(long)]
        no_tithing: bool,
        /// Set aside this share of every deposit (e.g. 0.2 or 20%)
        #[arg(long)]
        savings: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a child and all of their transactions
    Remove {
        /// Account name or id
        account: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// List children, youngest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one child's balances and transactions
    Show {
        /// Account name or id
        account: String,
        /// Show every transaction instead of the most recent ones
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a child's settings
    Settings {
        /// Account name or id
        account: String,
        #[arg(long)]
        birth_year: Option<i32>,
        /// Turn tithing on or off
        #[arg(long)]
        tithing: Option<bool>,
        /// Turn savings on or off
        #[arg(long)]
        savings: Option<bool>,
        /// Savings rate (e.g. 0.2 or 20%); applies to all past deposits
        #[arg(long)]
        savings_rate: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::Add { name, birth_year, no_tithing, savings, json } => {
            run_add(&name, birth_year, no_tithing, savings.as_deref(), json).await
        }
        AccountCommands::Remove { account, force } => run_remove(&account, force).await,
        AccountCommands::List { json } => run_list(json).await,
        AccountCommands::Show { account, all, json } => run_show(&account, all, json).await,
        AccountCommands::Settings { account, birth_year, tithing, savings, savings_rate, json } => {
            let update = SettingsUpdate {
                birth_year,
                tithing_enabled: tithing,
                savings_enabled: savings,
                savings_rate: savings_rate.as_deref().map(parse_rate).transpose()?,
            };
            run_settings(&account, update, json).await
        }
    }
}

async fn run_add(
    name: &str,
    birth_year: i32,
    no_tithing: bool,
    savings: Option<&str>,
    json: bool,
) -> Result<()> {
    let savings_rate = savings.map(parse_rate).transpose()?;
    let settings = AccountSettings {
        tithing_enabled: !no_tithing,
        savings_enabled: savings_rate.is_some(),
        savings_rate: savings_rate.unwrap_or_default(),
    };

    let mut ctx = get_context().await?;
    let account = ctx.ledger.add_account(name, birth_year, settings)?;
    close_context(ctx).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        output::success(&format!("Added {} ({})", account.name(), account.id()));
    }
    Ok(())
}

async fn run_remove(key: &str, force: bool) -> Result<()> {
    let mut ctx = get_context().await?;
    let id = resolve_account(&ctx.ledger, key)?;

    if !force {
        let (name, count) = ctx
            .ledger
            .account(id)
            .map(|a| (a.name().to_string(), a.transactions().len()))
            .unwrap_or_default();
        println!(
            "\n{}",
            format!("This will remove {} and {} transactions.", name, count).yellow()
        );
        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.ledger.remove_account(id);
    close_context(ctx).await?;
    output::success("Account removed");
    Ok(())
}

async fn run_list(json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let accounts: Vec<Account> = ctx.ledger.sorted_accounts().into_iter().cloned().collect();
    close_context(ctx).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }
    if accounts.is_empty() {
        output::info("No accounts");
        return Ok(());
    }

    let year = current_year();
    let mut table = create_table();
    table.set_header(vec!["ID", "Name", "Age", "Tithing", "Savings", "Balance"]);
    for account in &accounts {
        let settings = account.settings();
        table.add_row(vec![
            Cell::new(&account.id().to_string()[..8]),
            Cell::new(account.name()),
            Cell::new(account.age(year)).set_alignment(CellAlignment::Right),
            Cell::new(if settings.tithing_enabled { "on" } else { "off" }),
            Cell::new(if settings.savings_enabled {
                format_rate(settings.savings_rate)
            } else {
                "off".to_string()
            }),
            money_cell(account.balance()),
        ]);
    }
    println!("{}", table);
    Ok(())
}

async fn run_show(key: &str, all: bool, json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let id = resolve_account(&ctx.ledger, key)?;
    let account = ctx
        .ledger
        .account(id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Account '{}' not found", key))?;
    close_context(ctx).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
        return Ok(());
    }

    println!(
        "{} {}",
        account.name().bold(),
        format!("(age {}, {})", account.age(current_year()), account.id()).dimmed()
    );
    println!();
    println!("  Balance:      {}", format_money(account.balance()));
    if account.settings().tithing_enabled {
        println!("  Tithing due:  {}", format_money(account.tithing_due()));
    }
    if account.settings().savings_enabled {
        println!(
            "  Savings due:  {} ({})",
            format_money(account.savings_due()),
            format_rate(account.settings().savings_rate)
        );
    }
    println!("  Available:    {}", format_money(account.net_balance()).bold());
    println!();

    let transactions = if all {
        account.sorted_transactions()
    } else {
        account.recent_transactions(RECENT_LIMIT)
    };
    if transactions.is_empty() {
        output::info("No transactions");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Date", "Kind", "Amount", "Note"]);
    for tx in &transactions {
        let amount = tx.signed_amount();
        table.add_row(vec![
            Cell::new(&tx.id().to_string()[..8]),
            Cell::new(tx.timestamp().format("%Y-%m-%d %H:%M")),
            Cell::new(tx.kind()),
            money_cell(amount),
            Cell::new(tx.note()),
        ]);
    }
    println!("{}", table);

    let hidden = account.transactions().len() - transactions.len();
    if hidden > 0 {
        output::info(&format!("{} older transactions hidden; use --all", hidden));
    }
    Ok(())
}

async fn run_settings(key: &str, update: SettingsUpdate, json: bool) -> Result<()> {
    if update.is_empty() {
        output::warning("Nothing to change");
        return Ok(());
    }

    let mut ctx = get_context().await?;
    let id = resolve_account(&ctx.ledger, key)?;
    let account = ctx.ledger.update_account_settings(id, update)?;
    close_context(ctx).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        output::success(&format!("Updated {}", account.name()));
        println!("  Tithing due:  {}", format_money(account.tithing_due()));
        println!("  Savings due:  {}", format_money(account.savings_due()));
    }
    Ok(())
}
