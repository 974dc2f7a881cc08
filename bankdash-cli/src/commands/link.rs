//! Link commands - store aggregator access tokens for a user

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use bankdash_core::BankLink;

use super::{get_context, resolve_user};
use crate::output::{create_table, success};

#[derive(Subcommand)]
pub enum LinkCommands {
    /// Link a bank by its aggregator access token
    Add {
        /// Aggregator access token
        access_token: String,
        /// Owner (defaults to the logged-in user)
        #[arg(long)]
        user: Option<String>,
        /// Public id others use to send transfers (generated if omitted)
        #[arg(long)]
        shareable_id: Option<String>,
        /// Aggregator account id
        #[arg(long)]
        account_id: Option<String>,
        /// Aggregator institution id
        #[arg(long)]
        institution_id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a user's links
    List {
        /// Owner (defaults to the logged-in user)
        #[arg(long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: LinkCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        LinkCommands::Add { access_token, user, shareable_id, account_id, institution_id, json } => {
            let user_id = resolve_user(&ctx, user)?;
            let shareable_id = shareable_id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());

            let mut link = BankLink::new(user_id, access_token, shareable_id);
            link.account_id = account_id;
            link.institution_id = institution_id;
            ctx.repository.add_bank_link(&link)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&link)?);
            } else {
                success(&format!("Linked bank {}", link.id));
                println!("  Shareable id: {}", link.shareable_id);
            }
        }
        LinkCommands::List { user, json } => {
            let user_id = resolve_user(&ctx, user)?;
            let links = ctx.repository.get_bank_links(&user_id)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&links)?);
                return Ok(());
            }
            if links.is_empty() {
                println!("No linked banks.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Link", "Shareable ID", "Institution", "Created"]);
            for link in &links {
                table.add_row(vec![
                    link.id.clone(),
                    link.shareable_id.clone(),
                    link.institution_id.clone().unwrap_or_else(|| "-".to_string()),
                    link.created_at.format("%Y-%m-%d").to_string(),
                ]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
