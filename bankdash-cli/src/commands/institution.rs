//! Institution command - show institution metadata

use anyhow::Result;
use colored::Colorize;

use super::{block_on, get_context};
use crate::output::create_table;

pub fn run(institution_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let service = ctx.institution_service()?;

    let institution = block_on(service.get_institution(institution_id))??;

    if json {
        println!("{}", serde_json::to_string_pretty(&institution)?);
        return Ok(());
    }

    println!("{}", institution.name.bold());

    let mut table = create_table();
    table.add_row(vec!["Institution ID", institution.institution_id.as_str()]);
    table.add_row(vec!["Country", &institution.country_codes.join(", ")]);
    table.add_row(vec!["Products", &institution.products.join(", ")]);
    table.add_row(vec!["URL", institution.url.as_deref().unwrap_or("-")]);
    table.add_row(vec!["OAuth", if institution.oauth { "yes" } else { "no" }]);
    if !institution.routing_numbers.is_empty() {
        table.add_row(vec!["Routing numbers", &institution.routing_numbers.join(", ")]);
    }
    println!("{}", table);

    Ok(())
}
