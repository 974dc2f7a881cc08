//! Transfer command - record a transfer between two linked banks

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use rust_decimal::Decimal;
use uuid::Uuid;

use bankdash_core::domain::TransactionDate;
use bankdash_core::TransferTransaction;

use super::{get_context, resolve_user};
use crate::output::{format_money, success};

#[derive(Subcommand)]
pub enum TransferCommands {
    /// Record a transfer
    Add {
        /// Sending bank link id
        #[arg(long)]
        from: String,
        /// Receiving bank link id
        #[arg(long)]
        to: String,
        /// Amount, e.g. 25.50
        #[arg(long)]
        amount: String,
        /// Description
        #[arg(long, default_value = "Transfer")]
        name: String,
        #[arg(long, default_value = "Transfer")]
        category: String,
        #[arg(long, default_value = "online")]
        channel: String,
        /// Date (YYYY-MM-DD or RFC 3339), defaults to now
        #[arg(long)]
        date: Option<String>,
        /// Recording user (defaults to the logged-in user)
        #[arg(long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: TransferCommands) -> Result<()> {
    match command {
        TransferCommands::Add { from, to, amount, name, category, channel, date, user, json } => {
            let ctx = get_context()?;
            let account_id = resolve_user(&ctx, user)?;

            let amount: Decimal = amount
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid amount '{}'", amount))?;
            let created_at = match date {
                Some(d) => parse_date(&d)?,
                None => Utc::now(),
            };

            for link_id in [&from, &to] {
                if ctx.repository.get_bank_link(link_id)?.is_none() {
                    return Err(anyhow!("No bank link with id {}", link_id));
                }
            }

            let transfer = TransferTransaction {
                id: Uuid::new_v4().simple().to_string(),
                name,
                amount,
                created_at,
                channel,
                category,
                sender_bank_id: from,
                receiver_bank_id: to,
                account_id,
            };
            ctx.repository.add_transfer(&transfer)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&transfer)?);
            } else {
                success(&format!(
                    "Recorded transfer {} of {}",
                    transfer.id,
                    format_money(transfer.amount)
                ));
            }
        }
    }

    Ok(())
}

fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    Ok(TransactionDate::parse(value)?.instant())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_date_accepts_core_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 12, 2, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2024-12-02").unwrap(), midnight);
        assert_eq!(parse_date("2024-12-02T00:00:00Z").unwrap(), midnight);
        assert_eq!(
            parse_date("2024-12-02T09:30:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 2, 9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-12-02 09:30:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 2, 9, 30, 0).unwrap()
        );
        assert!(parse_date("yesterday").is_err());
    }
}
