//! CLI command implementations

pub mod account;
pub mod config;
pub mod export;
pub mod receive;
pub mod settle;
pub mod status;
pub mod tx;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use allowance_core::services::LedgerStore;
use allowance_core::AllowanceContext;

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("ALLOWANCE_DIR").filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".allowance"))
        .ok_or_else(|| anyhow!("Could not find home directory; set ALLOWANCE_DIR"))
}

/// Open the ledger under the data directory
pub async fn get_context() -> Result<AllowanceContext> {
    let data_dir = get_data_dir()?;
    AllowanceContext::open(&data_dir)
        .await
        .context("Failed to open allowance ledger")
}

/// Flush pending writes; reports but does not fail on storage trouble
pub async fn close_context(ctx: AllowanceContext) -> Result<()> {
    let stats = ctx.close().await?;
    if stats.save_failures > 0 && stats.saved == 0 {
        crate::output::warning("Changes were applied but could not be saved");
    }
    Ok(())
}

/// Find an account by id, id prefix or (case-insensitive) name
pub fn resolve_account(ledger: &LedgerStore, key: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key) {
        if ledger.account(id).is_some() {
            return Ok(id);
        }
        bail!("Account '{}' not found", key);
    }

    let key_lower = key.trim().to_lowercase();
    let matches: Vec<Uuid> = ledger
        .accounts()
        .iter()
        .filter(|a| {
            a.name().to_lowercase() == key_lower || a.id().to_string().starts_with(&key_lower)
        })
        .map(|a| a.id())
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!("Account '{}' not found", key)),
        _ => Err(anyhow!("'{}' matches several accounts; use the account id", key)),
    }
}

/// Find a transaction of an account by id or id prefix
pub fn resolve_transaction(ledger: &LedgerStore, account_id: Uuid, key: &str) -> Result<Uuid> {
    let account = ledger
        .account(account_id)
        .ok_or_else(|| anyhow!("Account '{}' not found", account_id))?;
    let key_lower = key.trim().to_lowercase();

    let matches: Vec<Uuid> = account
        .transactions()
        .iter()
        .map(|t| t.id())
        .filter(|id| id.to_string().starts_with(&key_lower))
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!("Transaction '{}' not found", key)),
        _ => Err(anyhow!("'{}' matches several transactions; use more characters", key)),
    }
}

/// Parse a user-entered amount such as `12`, `12.50` or `$12.50`
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let cleaned = raw.trim().trim_start_matches('$').replace(',', "");
    cleaned
        .parse::<Decimal>()
        .map_err(|_| anyhow!("Invalid amount '{}'", raw))
}

/// Parse a savings rate given as a fraction (`0.2`) or a percentage (`20%`)
pub fn parse_rate(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    match trimmed.strip_suffix('%') {
        Some(pct) => pct
            .trim()
            .parse::<Decimal>()
            .map(|p| p / Decimal::ONE_HUNDRED)
            .map_err(|_| anyhow!("Invalid percentage '{}'", raw)),
        None => trimmed
            .parse::<Decimal>()
            .map_err(|_| anyhow!("Invalid rate '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allowance_core::AccountSettings;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12").unwrap(), Decimal::new(12, 0));
        assert_eq!(parse_amount(" $1,250.50 ").unwrap(), Decimal::new(125050, 2));
        assert!(parse_amount("twelve").is_err());
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("0.2").unwrap(), Decimal::new(2, 1));
        assert_eq!(parse_rate("20%").unwrap(), Decimal::new(20, 2));
        assert!(parse_rate("lots").is_err());
    }

    #[test]
    fn test_resolve_account() {
        let mut ledger = LedgerStore::new();
        let alex = ledger.add_account("Alex", 2015, AccountSettings::default()).unwrap().id();
        ledger.add_account("Sam", 2017, AccountSettings::default()).unwrap();

        assert_eq!(resolve_account(&ledger, "alex").unwrap(), alex);
        assert_eq!(resolve_account(&ledger, &alex.to_string()).unwrap(), alex);
        assert_eq!(resolve_account(&ledger, &alex.to_string()[..8]).unwrap(), alex);
        assert!(resolve_account(&ledger, "Jordan").is_err());
        assert!(resolve_account(&ledger, &Uuid::new_v4().to_string()).is_err());
    }
}
