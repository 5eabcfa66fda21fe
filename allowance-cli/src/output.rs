//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.dimmed());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format an amount with two decimals and a currency sign
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

/// Right-aligned money cell, red when negative
pub fn money_cell(amount: Decimal) -> Cell {
    let text = format_money(amount);
    let cell = if amount < Decimal::ZERO {
        Cell::new(text.red())
    } else {
        Cell::new(text)
    };
    cell.set_alignment(CellAlignment::Right)
}

/// Format a fraction as a whole-number percentage
pub fn format_rate(rate: Decimal) -> String {
    format!("{}%", (rate * Decimal::ONE_HUNDRED).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(d("12.5")), "$12.50");
        assert_eq!(format_money(d("-3")), "-$3.00");
        assert_eq!(format_money(d("0.004")), "$0.00");
        assert_eq!(format_money(d("-0.001")), "$0.00");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(d("0.10")), "10%");
        assert_eq!(format_rate(d("0.125")), "12.5%");
        assert_eq!(format_rate(Decimal::ZERO), "0%");
    }
}
