//! Config commands - show and edit settings.json

use anyhow::Result;
use clap::Subcommand;

use bankdash_core::config::Config;

use super::get_data_dir;
use crate::output::{create_table, success};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show effective settings (environment overrides applied)
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a value in settings.json, e.g. `aggregator.countryCode CA`
    Set { key: String, value: String },
}

pub fn run(command: ConfigCommands) -> Result<()> {
    let data_dir = get_data_dir()?;

    match command {
        ConfigCommands::Show { json } => {
            let config = Config::load(&data_dir)?;
            let agg = &config.aggregator;
            let secret = if agg.secret.is_some() { "(set)" } else { "(not set)" };
            let base_url = agg
                .base_url
                .clone()
                .unwrap_or_else(|| agg.environment.base_url().to_string());

            if json {
                let value = serde_json::json!({
                    "environment": agg.environment,
                    "baseUrl": base_url,
                    "clientId": agg.client_id,
                    "secret": secret,
                    "countryCode": agg.country_code,
                    "timeoutSecs": agg.timeout_secs,
                    "batchPolicy": config.batch_policy,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }

            let mut table = create_table();
            table.add_row(vec!["Environment".to_string(), agg.environment.to_string()]);
            table.add_row(vec!["Base URL".to_string(), base_url]);
            table.add_row(vec![
                "Client ID".to_string(),
                agg.client_id.clone().unwrap_or_else(|| "(not set)".to_string()),
            ]);
            table.add_row(vec!["Secret".to_string(), secret.to_string()]);
            table.add_row(vec!["Country".to_string(), agg.country_code.clone()]);
            table.add_row(vec!["Timeout".to_string(), format!("{}s", agg.timeout_secs)]);
            table.add_row(vec!["Batch policy".to_string(), config.batch_policy.to_string()]);
            println!("{}", table);
        }
        ConfigCommands::Set { key, value } => {
            // Environment overrides are not written back
            let mut config = Config::load_file(&data_dir)?;
            config.set(&key, &value)?;
            config.save(&data_dir)?;
            success(&format!("Set {}", key));
        }
    }

    Ok(())
}
