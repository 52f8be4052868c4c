use crate::api::DatabaseSchema;
use crate::commands::{build_client, render, require_login};
use crate::config::Config;
use crate::error::{QuerychatError, Result};
use colored::Colorize;

/// Handle `querychat schema [DATABASE]`
pub async fn handle_schema(
    config: Config,
    database: Option<String>,
    table: Option<String>,
    samples: bool,
) -> Result<()> {
    let client = build_client(&config)?;
    require_login(&client)?;

    let Some(database) = database else {
        let databases = client.list_databases().await?;
        println!("\nDatabases:");
        render::print_databases(&databases);
        if let Some(first) = databases.first() {
            println!();
            println!(
                "Use {} to see its tables.",
                format!("querychat schema {}", first.name).cyan()
            );
        }
        println!();
        return Ok(());
    };

    let schema = client.database_schema(&database).await?;
    let schema = select_table(schema, table.as_deref())?;

    println!("\n{}", format!("Database: {}", schema.database).bold());
    if let Some(path) = &schema.database_path {
        println!("{}", path.dimmed());
    }
    if schema.tables.is_empty() {
        println!("{}", "No tables found.".yellow());
        return Ok(());
    }
    for table in &schema.tables {
        println!();
        render::print_table_schema(table, samples, &config.display);
    }
    println!();
    Ok(())
}

/// Keep only `table` when one is named
fn select_table(mut schema: DatabaseSchema, table: Option<&str>) -> Result<DatabaseSchema> {
    let Some(name) = table else {
        return Ok(schema);
    };
    schema.tables.retain(|t| t.name.eq_ignore_ascii_case(name));
    if schema.tables.is_empty() {
        return Err(QuerychatError::InvalidInput(format!(
            "no table '{}' in {}",
            name, schema.database
        ))
        .into());
    }
    Ok(schema)
}
