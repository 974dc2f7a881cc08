//! User commands - register users and manage the session

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use uuid::Uuid;

use bankdash_core::User;

use super::get_context;
use crate::output::{create_table, success};

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Add {
        /// Email address
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        /// Explicit user id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Log in as the new user
        #[arg(long)]
        login: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Make a user the logged-in user
    Login {
        /// User id or email
        user: String,
    },
    /// End the current session
    Logout,
    /// List users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    let ctx = get_context()?;
    let repo = &ctx.repository;

    match command {
        UserCommands::Add { email, first_name, last_name, id, login, json } => {
            if !email.contains('@') {
                return Err(anyhow!("'{}' is not an email address", email));
            }
            let mut user = User::new(
                id.unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
                email,
            );
            user.first_name = first_name;
            user.last_name = last_name;
            repo.add_user(&user)?;
            if login {
                repo.set_session_user(&user.id)?;
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                success(&format!("Added user {} ({})", user.display_name(), user.id));
                if login {
                    println!("Logged in as {}", user.email);
                }
            }
        }
        UserCommands::Login { user } => {
            let found = match repo.get_user(&user)? {
                Some(u) => u,
                None => repo
                    .get_users()?
                    .into_iter()
                    .find(|u| u.email.eq_ignore_ascii_case(&user))
                    .ok_or_else(|| anyhow!("No user with id or email '{}'", user))?,
            };
            repo.set_session_user(&found.id)?;
            success(&format!("Logged in as {}", found.display_name()));
        }
        UserCommands::Logout => {
            repo.clear_session()?;
            success("Logged out");
        }
        UserCommands::List { json } => {
            let users = repo.get_users()?;
            let current = repo.session_user_id()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
                return Ok(());
            }
            if users.is_empty() {
                println!("No users. Add one with `bankdash user add EMAIL`.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["", "ID", "Email", "Name"]);
            for user in &users {
                let marker = if current.as_deref() == Some(user.id.as_str()) {
                    "*".green().to_string()
                } else {
                    String::new()
                };
                table.add_row(vec![marker, user.id.clone(), user.email.clone(), user.display_name()]);
            }
            println!("{}", table);
        }
    }

    Ok(())
}
