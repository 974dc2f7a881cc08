//! Accounts commands - account overview and single account detail

use anyhow::Result;
use colored::Colorize;
use comfy_table::Cell;

use bankdash_core::domain::TransferDirection;
use bankdash_core::{AccountView, MergedTransaction};

use super::{block_on, get_context, resolve_user};
use crate::output::{create_table, format_money, money_cell, warning};

/// `bankdash accounts`
pub fn run_list(user: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let user_id = resolve_user(&ctx, user)?;
    let service = ctx.account_service()?;

    let overview = block_on(service.get_accounts(&user_id))??;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    if overview.data.is_empty() && overview.failures.is_empty() {
        println!("No linked banks. Add one with `bankdash link add`.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Link", "Institution", "Account", "Type", "Current", "Available"]);
    for view in &overview.data {
        table.add_row(account_row(view));
    }
    println!("{}", table);

    println!(
        "{} {}   {} {}",
        "Banks:".bold(),
        overview.total_banks,
        "Total current balance:".bold(),
        format_money(overview.total_current_balance)
    );

    for failure in &overview.failures {
        warning(&format!(
            "Link {} could not be read ({:?}): {}",
            failure.link_id, failure.kind, failure.message
        ));
    }

    Ok(())
}

/// `bankdash account LINK_ID`
pub fn run_detail(link_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let service = ctx.account_service()?;

    let detail = block_on(service.get_account(link_id))??;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let mut summary = create_table();
    summary.set_header(vec!["Link", "Institution", "Account", "Type", "Current", "Available"]);
    summary.add_row(account_row(&detail.data));
    println!("{}", summary);
    println!();

    if detail.transactions.is_empty() {
        println!("No transactions.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Date", "Name", "Category", "Type", "Amount"]);
    for tx in &detail.transactions {
        let kind = match tx {
            MergedTransaction::Transfer(entry) => match entry.direction {
                TransferDirection::Debit => entry.direction.as_str().red().to_string(),
                TransferDirection::Credit => entry.direction.as_str().green().to_string(),
            },
            MergedTransaction::External(ext) if ext.pending => {
                format!("{} (pending)", ext.transaction_type).dimmed().to_string()
            }
            MergedTransaction::External(ext) => ext.transaction_type.clone(),
        };
        table.add_row(vec![
            Cell::new(tx.date().instant().format("%Y-%m-%d")),
            Cell::new(tx.name()),
            Cell::new(tx.category()),
            Cell::new(kind),
            money_cell(tx.amount()),
        ]);
    }
    println!("{}", table);
    println!("{} transactions", detail.transactions.len());

    Ok(())
}

fn account_row(view: &AccountView) -> Vec<Cell> {
    let institution = view
        .institution_name
        .clone()
        .unwrap_or_else(|| view.institution_id.clone());
    let account = match &view.mask {
        Some(mask) => format!("{} ••{}", view.name, mask),
        None => view.name.clone(),
    };
    let kind = match &view.subtype {
        Some(subtype) => format!("{}/{}", view.account_type, subtype),
        None => view.account_type.clone(),
    };

    vec![
        Cell::new(&view.link_id),
        Cell::new(institution),
        Cell::new(account),
        Cell::new(kind),
        money_cell(view.current_balance),
        view.available_balance
            .map(money_cell)
            .unwrap_or_else(|| Cell::new("-")),
    ]
}
