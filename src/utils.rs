use colored::Colorize;

use crate::ledger::{Amount, FeeStatus};

/// Group digits in threes: 1234567 -> "1,234,567"
pub fn group_digits(amount: Amount) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a currency amount with color
pub fn format_amount(amount: Amount) -> String {
    group_digits(amount).yellow().to_string()
}

/// Percentage colored by how close it is to full clearance
pub fn format_percentage(percentage: f64) -> String {
    let text = format!("{:.1}%", percentage);
    if percentage >= 99.9 {
        text.green().to_string()
    } else if percentage >= 50.0 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

pub fn format_status(status: FeeStatus) -> String {
    match status {
        FeeStatus::Paid => status.as_str().green().to_string(),
        FeeStatus::Partial => status.as_str().yellow().to_string(),
        FeeStatus::Pending => status.as_str().red().to_string(),
    }
}

pub fn format_flag(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Prompt user for yes/no confirmation
pub fn confirm_action(prompt: &str) -> bool {
    use std::io::{self, Write};

    print!("{} (y/N): ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }

    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (i, col) in columns.iter().enumerate() {
        if i < widths.len() {
            row.push_str(&format!("{:<width$}  ", col, width = widths[i]));
        }
    }
    println!("{}", row.trim_end());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1_234_567), "1,234,567");
        assert_eq!(group_digits(-25_000), "-25,000");
    }
}
